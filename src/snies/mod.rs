//! SNIES analysis: fuzzy matching, cohort aggregation, chart rendering.

pub mod aggregator;
pub mod charts;
pub mod dataset;
pub mod fetch;
pub mod matcher;

use crate::models::{ChartId, ResultBundle};
use aggregator::{enrollment_slice, AnalysisWindow};
use dataset::SniesDataset;
use std::path::Path;
use tracing::{info, warn};

/// Tunables for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Process-type label that counts as enrollment.
    pub enrollment_process: String,
    pub window: AnalysisWindow,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            enrollment_process: "MATRICULADOS".to_string(),
            window: AnalysisWindow::default(),
        }
    }
}

/// Runs the full matcher/aggregator core against an in-memory dataset
/// and renders the charts into `output_dir`.
///
/// Zero matches is not an error: the bundle comes back with
/// `matched == false`, zero-filled tables and an empty digest. Chart
/// failures are logged and leave the corresponding key absent.
pub fn analyze(
    query: &str,
    dataset: &SniesDataset,
    output_dir: &Path,
    options: &AnalysisOptions,
) -> ResultBundle {
    let accepted = matcher::match_catalog(
        query,
        dataset.catalog.iter().map(|r| r.program_name.as_str()),
    );

    if accepted.is_empty() {
        warn!("no equivalent programs found in SNIES for '{}'", query);
    } else {
        info!("matched {} equivalent program name(s)", accepted.len());
    }

    let codes = aggregator::resolve_codes(&accepted, dataset);
    let cohort = aggregator::assemble_cohort(&codes, dataset);
    info!(
        "cohort: {} master rows across {} program codes",
        cohort.len(),
        codes.len()
    );

    let tables = aggregator::summarize(&cohort, &options.enrollment_process, options.window);
    let slice = enrollment_slice(&cohort, &options.enrollment_process, options.window);
    let tuition_series = aggregator::tuition_pivot(&slice);

    let mut bundle = ResultBundle {
        matched: !accepted.is_empty(),
        charts: Default::default(),
        program_digest: aggregator::program_digest(&cohort),
        tables,
    };

    let renders: [(ChartId, Result<(), crate::error::ChartError>); 4] = [
        (
            ChartId::CostoVsMatriculados,
            charts::render_cost_vs_enrollment(
                &bundle.tables.costo_vs_matriculados,
                &output_dir.join(ChartId::CostoVsMatriculados.file_name()),
            ),
        ),
        (
            ChartId::EvolucionMatricula,
            charts::render_tuition_evolution(
                &tuition_series,
                &output_dir.join(ChartId::EvolucionMatricula.file_name()),
            ),
        ),
        (
            ChartId::PorDpto,
            charts::render_department_bars(
                &bundle.tables.por_dpto,
                &output_dir.join(ChartId::PorDpto.file_name()),
            ),
        ),
        (
            ChartId::EstudiantesTiempo,
            charts::render_process_panels(
                &bundle.tables.estudiantes_tiempo,
                &output_dir.join(ChartId::EstudiantesTiempo.file_name()),
            ),
        ),
    ];

    for (id, result) in renders {
        match result {
            Ok(()) => {
                bundle.charts.insert(id, output_dir.join(id.file_name()));
            }
            Err(e) => warn!("skipping chart {}: {}", id, e),
        }
    }

    bundle
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::dataset::{CatalogRecord, MasterRecord, OfferingRecord};

    fn tiny_dataset() -> SniesDataset {
        SniesDataset::new(
            vec![MasterRecord {
                program_code: "101".to_string(),
                period: "2022-1".to_string(),
                proxy_period: 20221,
                process: "MATRICULADOS".to_string(),
                quantity: "30".to_string(),
                institution_code: "1".to_string(),
            }],
            vec![CatalogRecord {
                program_code: "101".to_string(),
                program_name: "Doctorado en Matemáticas".to_string(),
                institution: "U. Andina".to_string(),
                institution_code: "1".to_string(),
                department: "Antioquia".to_string(),
                municipality: "Medellín".to_string(),
            }],
            vec![OfferingRecord {
                program_code: "101".to_string(),
                period: "2022-1".to_string(),
                tuition: "5000000".to_string(),
            }],
            vec![],
        )
    }

    #[test]
    fn test_no_match_produces_flagged_empty_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = analyze(
            "Doctorado Astrofísica",
            &tiny_dataset(),
            dir.path(),
            &AnalysisOptions::default(),
        );

        assert!(!bundle.matched);
        assert!(bundle.program_digest.is_empty());
        assert!(bundle.tables.costo_vs_matriculados.is_empty());
        assert!(bundle.tables.estudiantes_tiempo.is_empty());
        // empty data means no charts, and no error either
        assert!(bundle.charts.is_empty());
    }

    #[test]
    fn test_match_populates_tables_and_digest() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = analyze(
            "Doctorado Matemáticas",
            &tiny_dataset(),
            dir.path(),
            &AnalysisOptions::default(),
        );

        assert!(bundle.matched);
        assert_eq!(bundle.tables.costo_vs_matriculados.len(), 1);
        assert!(bundle.program_digest.contains("U. Andina"));
    }
}
