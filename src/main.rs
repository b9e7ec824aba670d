//! Oportuna - Academic-Program Opportunity Analyzer
//!
//! A CLI tool that combines SNIES enrollment/tuition statistics for a
//! program with an LLM-driven international benchmark and renders both
//! into a slide deck.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (data source, connection, write failure, etc.)

mod agent;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod snies;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use models::TrendReport;
use snies::aggregator::AnalysisWindow;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Oportuna v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the analysis pipeline
    match run_analysis(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Analysis failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .oportuna.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".oportuna.toml");

    if path.exists() {
        eprintln!("⚠️  .oportuna.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .oportuna.toml")?;

    println!("✅ Created .oportuna.toml with default settings.");
    println!("   Edit it to customize the model, analysis window, and region map.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete three-stage pipeline.
async fn run_analysis(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Step 1: User input (interactive prompts when missing)
    let programa = match args.programa.clone() {
        Some(p) => p,
        None => prompt("Ingrese el nombre del programa a analizar: ")?,
    };
    let descripcion = match args.descripcion.clone() {
        Some(d) => d,
        None => prompt("Ingrese una breve descripción del programa: ")?,
    };

    let output_dir: PathBuf = config
        .general
        .output_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("Reporte_{}", slug(&programa))));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    // Step 2: SNIES statistics (the matcher/aggregator core)
    println!("📥 Descargando tablas SNIES desde {}...", config.snies.base_url);
    let http = reqwest::Client::new();
    let dataset = snies::fetch::load_remote(&http, &config.snies.base_url).await?;
    println!(
        "   Maestro: {} | Oferta: {} | Programas: {} | Instituciones: {}",
        dataset.master.len(),
        dataset.offerings.len(),
        dataset.catalog.len(),
        dataset.institutions.len()
    );

    println!("📊 Iniciando análisis SNIES para: {}...", programa);
    let options = snies::AnalysisOptions {
        enrollment_process: config.snies.enrollment_process.clone(),
        window: AnalysisWindow {
            start: config.snies.window_start,
            end: config.snies.window_end,
        },
    };
    let bundle = snies::analyze(&programa, &dataset, &output_dir, &options);

    if !bundle.matched {
        warn!("no equivalent programs in SNIES; summaries will be empty");
        println!("⚠️  Advertencia: no se encontraron programas equivalentes exactos en SNIES.");
    }
    println!("   Análisis SNIES completado ({} gráficas)", bundle.charts.len());

    // Step 3: International benchmark (research agents)
    let research = if args.stats_only {
        println!("⏭️  Omitiendo la investigación de tendencias (--stats-only)");
        TrendReport::unavailable(&programa, &descripcion)
    } else {
        println!("🤖 Iniciando análisis de agentes para: {}...", programa);
        println!("   Modelo: {}", config.model.name);
        println!("   Ollama: {}", config.model.ollama_url);

        let trend_agent = agent::TrendAgent::new(agent::AgentConfig {
            ollama_url: config.model.ollama_url.clone(),
            model_name: config.model.name.clone(),
            temperature: config.model.temperature,
            timeout_seconds: config.model.timeout_seconds,
            max_iterations: config.model.max_iterations,
            max_subtask_iterations: config.model.max_subtask_iterations,
        })?;

        let report = trend_agent
            .research(&programa, &descripcion, &bundle.program_digest)
            .await?;
        println!("   Análisis de agentes completado ({} programas)", report.items.len());
        report
    };

    // Step 4: Render the deck
    println!("📝 Generando reporte...");
    let regions = config.region_map();

    let (file_name, content) = match args.format {
        OutputFormat::Markdown => (
            format!("Reporte_{}.md", slug(&programa)),
            report::generate_deck(&programa, &bundle, &research, &regions, &config.model.name),
        ),
        OutputFormat::Json => (
            format!("Reporte_{}.json", slug(&programa)),
            report::generate_json_report(&programa, &bundle, &research)?,
        ),
    };

    let output_file = output_dir.join(file_name);
    report::write_report(&content, &output_file)
        .with_context(|| format!("Failed to write report to {}", output_file.display()))?;

    // Summary
    let duration = start_time.elapsed().as_secs_f64();
    println!("\n📊 Resumen:");
    println!(
        "   Programas equivalentes (IES - programa): {}",
        bundle.tables.costo_vs_matriculados.len()
    );
    println!("   Gráficas generadas: {}", bundle.charts.len());
    println!("   Programas internacionales: {}", research.items.len());
    println!("   Duración: {:.1}s", duration);
    println!(
        "\n✅ Análisis completado. El reporte se ha guardado en: {}",
        output_file.display()
    );

    Ok(())
}

/// Read one non-empty line from stdin.
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read input")?;

    let trimmed = line.trim().to_string();
    if trimmed.is_empty() {
        anyhow::bail!("La entrada no puede estar vacía");
    }
    Ok(trimmed)
}

/// Deterministic directory/file fragment: whitespace → underscores.
fn slug(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .oportuna.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_replaces_whitespace() {
        assert_eq!(slug("Doctorado Matemáticas"), "Doctorado_Matemáticas");
        assert_eq!(slug("  Maestría   en  IA "), "Maestría_en_IA");
        assert_eq!(slug("Física"), "Física");
    }
}
