//! Slide deck generation.
//!
//! The deck is emitted as Marp-flavored Markdown (`---` separators) so
//! it can be turned into slides or read as-is. Chart slides look images
//! up by `ChartId`; an absent chart renders an explanatory line instead
//! of a broken reference. Research gaps render as "No disponible".

use crate::models::{ChartId, ProgramItem, Region, RegionMap, ResultBundle, TrendReport};
use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use std::path::Path;

const NOT_AVAILABLE: &str = "No disponible";

/// Generate the complete Markdown deck.
pub fn generate_deck(
    program: &str,
    bundle: &ResultBundle,
    research: &TrendReport,
    regions: &RegionMap,
    model_name: &str,
) -> String {
    let mut deck = String::new();

    deck.push_str("---\nmarp: true\npaginate: true\n---\n\n");
    deck.push_str(&title_slide(program));

    deck.push_str(&chart_slide(
        bundle,
        ChartId::CostoVsMatriculados,
        "Análisis SNIES: Costo vs. Matriculados (Colombia)",
    ));
    deck.push_str(&chart_slide(
        bundle,
        ChartId::PorDpto,
        "Análisis SNIES: Programas por Depto. (Top 10)",
    ));
    deck.push_str(&chart_slide(
        bundle,
        ChartId::EvolucionMatricula,
        "Análisis SNIES: Evolución Valor de Matrícula",
    ));
    deck.push_str(&chart_slide(
        bundle,
        ChartId::EstudiantesTiempo,
        "Análisis SNIES: Evolución de Estudiantes (Procesos)",
    ));

    let latam: Vec<&ProgramItem> = research
        .items
        .iter()
        .filter(|item| regions.classify(item.country.as_deref()) == Region::Latam)
        .collect();
    deck.push_str(&benchmark_slide(
        "Benchmark Internacional (LATAM)",
        &latam,
        "No se encontraron programas en LATAM.",
    ));

    let international: Vec<&ProgramItem> = research
        .items
        .iter()
        .filter(|item| regions.classify(item.country.as_deref()) == Region::Internacional)
        .collect();
    deck.push_str(&benchmark_slide(
        "Benchmark Internacional (EE.UU. y Europa)",
        &international,
        "No se encontraron programas en EE.UU. o Europa.",
    ));

    deck.push_str(&insights_slide(&research.insights));
    deck.push_str(&footer(model_name));

    deck
}

fn title_slide(program: &str) -> String {
    format!("# Análisis de Oportunidad\n\n## {}\n\n---\n\n", program)
}

/// One chart slide. The image lives next to the deck file, so the
/// reference is just the file name.
fn chart_slide(bundle: &ResultBundle, id: ChartId, title: &str) -> String {
    let mut slide = format!("## {}\n\n", title);

    if bundle.charts.contains_key(&id) {
        slide.push_str(&format!("![w:900]({})\n\n", id.file_name()));
    } else {
        slide.push_str("_Gráfica no disponible._\n\n");
    }

    slide.push_str("---\n\n");
    slide
}

fn benchmark_slide(title: &str, items: &[&ProgramItem], empty_message: &str) -> String {
    let mut slide = format!("## {}\n\n", title);

    if items.is_empty() {
        slide.push_str(empty_message);
        slide.push_str("\n\n---\n\n");
        return slide;
    }

    for item in items {
        slide.push_str(&format!(
            "- **{} - {} ({})**\n",
            item.program_name.as_deref().unwrap_or("N/A"),
            item.university.as_deref().unwrap_or("N/A"),
            item.country.as_deref().unwrap_or("N/A"),
        ));

        let courses = if item.courses_examples.is_empty() {
            "No disponibles".to_string()
        } else {
            item.courses_examples.join(", ")
        };
        slide.push_str(&format!("  - Cursos: {}\n", courses));
        slide.push_str(&format!(
            "  - Costo: {}\n",
            item.tuition.as_deref().unwrap_or(NOT_AVAILABLE)
        ));

        if let Some(url) = item.url.as_deref() {
            slide.push_str(&format!("  - Sitio: {}\n", url));
        }
    }

    slide.push_str("\n---\n\n");
    slide
}

fn insights_slide(insights: &[String]) -> String {
    let mut slide = String::from("## Análisis de Tendencias y Palabras Clave\n\n");

    if insights.is_empty() {
        slide.push_str("No se generaron insights.\n");
    } else {
        for insight in insights {
            slide.push_str(&format!("- {}\n", insight));
        }
    }

    slide.push_str("\n---\n\n");
    slide
}

fn footer(model_name: &str) -> String {
    format!(
        "<!-- Generado por oportuna v{} | modelo: {} | {} -->\n",
        env!("CARGO_PKG_VERSION"),
        model_name,
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// JSON variant of the report: the full bundle plus the research
/// report, for downstream tooling.
pub fn generate_json_report(
    program: &str,
    bundle: &ResultBundle,
    research: &TrendReport,
) -> Result<String> {
    let value = json!({
        "programa": program,
        "snies": bundle,
        "investigacion": research,
    });
    serde_json::to_string_pretty(&value).map_err(Into::into)
}

/// Write a report to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coverage, SummaryTables};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn region_map() -> RegionMap {
        let mut countries = BTreeMap::new();
        countries.insert("Colombia".to_string(), Region::Local);
        countries.insert("USA".to_string(), Region::Internacional);
        countries.insert("España".to_string(), Region::Internacional);
        countries.insert("Alemania".to_string(), Region::Internacional);
        RegionMap::new(countries)
    }

    fn sample_bundle() -> ResultBundle {
        let mut charts = BTreeMap::new();
        charts.insert(
            ChartId::PorDpto,
            PathBuf::from("salida/grafica_por_dpto.png"),
        );
        ResultBundle {
            matched: true,
            charts,
            tables: SummaryTables::default(),
            program_digest: "Programa 1: ...".to_string(),
        }
    }

    fn sample_research() -> TrendReport {
        TrendReport {
            input_program: "Doctorado Matemáticas".to_string(),
            input_description: "desc".to_string(),
            coverage: Coverage::default(),
            items: vec![
                ProgramItem {
                    program_name: Some("Doctorado en Matemática".to_string()),
                    university: Some("UNAM".to_string()),
                    country: Some("México".to_string()),
                    tuition: Some("MXN 50,000/año".to_string()),
                    courses_examples: vec!["Análisis".to_string(), "Álgebra".to_string()],
                    ..Default::default()
                },
                ProgramItem {
                    program_name: Some("PhD in Mathematics".to_string()),
                    university: Some("MIT".to_string()),
                    country: Some("USA".to_string()),
                    ..Default::default()
                },
            ],
            insights: vec!["Demanda creciente en ciencia de datos".to_string()],
        }
    }

    #[test]
    fn test_deck_has_every_slide() {
        let deck = generate_deck(
            "Doctorado Matemáticas",
            &sample_bundle(),
            &sample_research(),
            &region_map(),
            "llama3.2:latest",
        );

        assert!(deck.contains("# Análisis de Oportunidad"));
        assert!(deck.contains("Costo vs. Matriculados"));
        assert!(deck.contains("Benchmark Internacional (LATAM)"));
        assert!(deck.contains("Benchmark Internacional (EE.UU. y Europa)"));
        assert!(deck.contains("Análisis de Tendencias"));
    }

    #[test]
    fn test_present_chart_referenced_absent_chart_tolerated() {
        let deck = generate_deck(
            "X",
            &sample_bundle(),
            &sample_research(),
            &region_map(),
            "m",
        );

        // por_dpto was rendered; the others were not
        assert!(deck.contains("](grafica_por_dpto.png)"));
        assert!(!deck.contains("grafica_costo_matriculados.png"));
        assert!(deck.contains("_Gráfica no disponible._"));
    }

    #[test]
    fn test_items_split_by_region() {
        let deck = generate_deck(
            "X",
            &sample_bundle(),
            &sample_research(),
            &region_map(),
            "m",
        );

        let latam_at = deck.find("Benchmark Internacional (LATAM)").unwrap();
        let intl_at = deck.find("Benchmark Internacional (EE.UU. y Europa)").unwrap();
        let unam_at = deck.find("UNAM").unwrap();
        let mit_at = deck.find("MIT").unwrap();

        assert!(latam_at < unam_at && unam_at < intl_at);
        assert!(intl_at < mit_at);
    }

    #[test]
    fn test_missing_fields_render_placeholders() {
        let research = TrendReport {
            items: vec![ProgramItem {
                country: Some("Chile".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let deck = generate_deck("X", &sample_bundle(), &research, &region_map(), "m");

        assert!(deck.contains("**N/A - N/A (Chile)**"));
        assert!(deck.contains("Cursos: No disponibles"));
        assert!(deck.contains("Costo: No disponible"));
        assert!(deck.contains("No se generaron insights."));
    }

    #[test]
    fn test_empty_regions_use_fallback_lines() {
        let research = TrendReport::default();
        let deck = generate_deck("X", &sample_bundle(), &research, &region_map(), "m");
        assert!(deck.contains("No se encontraron programas en LATAM."));
        assert!(deck.contains("No se encontraron programas en EE.UU. o Europa."));
    }

    #[test]
    fn test_json_report_structure() {
        let json = generate_json_report("X", &sample_bundle(), &sample_research()).unwrap();
        assert!(json.contains("\"programa\""));
        assert!(json.contains("\"snies\""));
        assert!(json.contains("\"investigacion\""));
        assert!(json.contains("\"por_dpto\""));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reporte.md");
        write_report("# hola", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# hola");
    }
}
