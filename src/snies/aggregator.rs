//! Cohort assembly and summary statistics.
//!
//! Given the program names accepted by the matcher, this module resolves
//! their codes, left-joins the master rows with catalog and offering
//! attributes, and produces the grouped summaries plus the numbered
//! digest the research agent receives as context.

use crate::models::{
    LabelSeries, LocationCount, PeriodPresence, PeriodTotal, ProcessSeries, ProgramCostRow,
    SummaryTables,
};
use crate::snies::dataset::SniesDataset;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Label shown when a left join finds no catalog/offering attributes.
pub const UNKNOWN: &str = "Desconocido";

/// Closed interval of composite year+term codes kept in the windowed
/// enrollment slice.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisWindow {
    pub start: i32,
    pub end: i32,
}

impl AnalysisWindow {
    pub fn contains(&self, proxy_period: i32) -> bool {
        proxy_period >= self.start && proxy_period <= self.end
    }
}

impl Default for AnalysisWindow {
    fn default() -> Self {
        // 2021 term 1 through 2024 term 2
        Self {
            start: 20211,
            end: 20242,
        }
    }
}

/// One master row with its joined attributes. Left joins never drop
/// rows: missing catalog/offering attributes stay `None` and surface as
/// explicit unknowns where user-facing.
#[derive(Debug, Clone)]
pub struct CohortRow {
    pub program_code: String,
    pub period: String,
    pub proxy_period: i32,
    pub process: String,
    /// Parsed quantity; `None` when the raw field is unparseable (the
    /// row then drops out of quantity summaries only).
    pub quantity: Option<i64>,
    pub institution_code: String,
    pub program_name: Option<String>,
    pub institution: Option<String>,
    pub department: Option<String>,
    pub municipality: Option<String>,
    /// Parsed tuition; `None` for the "null" sentinel, a missing
    /// offering row, or an unparseable value.
    pub tuition: Option<f64>,
}

impl CohortRow {
    /// "INSTITUCION - PROGRAMA" composite label used by the grouped
    /// summaries.
    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            self.institution.as_deref().unwrap_or(UNKNOWN),
            self.program_name.as_deref().unwrap_or(UNKNOWN)
        )
    }
}

/// Intersects the accepted names with the catalog and returns the
/// distinct program codes, in first-seen order.
pub fn resolve_codes(accepted_names: &[String], dataset: &SniesDataset) -> Vec<String> {
    let wanted: HashSet<&str> = accepted_names.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut codes = Vec::new();

    for record in &dataset.catalog {
        if wanted.contains(record.program_name.as_str()) && seen.insert(record.program_code.clone())
        {
            codes.push(record.program_code.clone());
        }
    }

    codes
}

fn parse_quantity(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().map(|v| v as i64))
}

fn parse_tuition(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") || trimmed.eq_ignore_ascii_case("nan")
    {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

fn clean(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") || trimmed.eq_ignore_ascii_case("nan")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Filters MAESTRO to the resolved codes and left-joins catalog and
/// offering attributes (offerings join on code AND period). The row
/// count always equals the filtered MAESTRO count. Institution names
/// missing from the catalog fall back to the IES table.
pub fn assemble_cohort(codes: &[String], dataset: &SniesDataset) -> Vec<CohortRow> {
    let wanted: HashSet<&str> = codes.iter().map(String::as_str).collect();

    let catalog_by_code: HashMap<&str, &crate::snies::dataset::CatalogRecord> = dataset
        .catalog
        .iter()
        .map(|r| (r.program_code.as_str(), r))
        .collect();

    let offering_by_key: HashMap<(&str, &str), &crate::snies::dataset::OfferingRecord> = dataset
        .offerings
        .iter()
        .map(|r| ((r.program_code.as_str(), r.period.as_str()), r))
        .collect();

    let institution_by_code: HashMap<&str, &str> = dataset
        .institutions
        .iter()
        .map(|r| (r.institution_code.as_str(), r.name.as_str()))
        .collect();

    dataset
        .master
        .iter()
        .filter(|m| wanted.contains(m.program_code.as_str()))
        .map(|m| {
            let catalog = catalog_by_code.get(m.program_code.as_str());
            let offering = offering_by_key.get(&(m.program_code.as_str(), m.period.as_str()));

            let institution = catalog
                .and_then(|c| clean(&c.institution))
                .or_else(|| {
                    institution_by_code
                        .get(m.institution_code.as_str())
                        .copied()
                        .and_then(clean)
                });

            CohortRow {
                program_code: m.program_code.clone(),
                period: m.period.clone(),
                proxy_period: m.proxy_period,
                process: m.process.clone(),
                quantity: parse_quantity(&m.quantity),
                institution_code: m.institution_code.clone(),
                program_name: catalog.and_then(|c| clean(&c.program_name)),
                institution,
                department: catalog.and_then(|c| clean(&c.department)),
                municipality: catalog.and_then(|c| clean(&c.municipality)),
                tuition: offering.and_then(|o| parse_tuition(&o.tuition)),
            }
        })
        .collect()
}

/// The windowed enrollment slice: rows of the given process type inside
/// the window, with a parseable tuition. Rows excluded here still count
/// toward the full time series elsewhere.
pub fn enrollment_slice<'a>(
    cohort: &'a [CohortRow],
    process: &str,
    window: AnalysisWindow,
) -> Vec<&'a CohortRow> {
    cohort
        .iter()
        .filter(|row| row.process == process)
        .filter(|row| window.contains(row.proxy_period))
        .filter(|row| row.tuition.is_some())
        .collect()
}

/// Last tuition (in period order) and mean enrollment per label.
pub fn institution_program_summary(slice: &[&CohortRow]) -> Vec<ProgramCostRow> {
    let mut groups: BTreeMap<String, Vec<&CohortRow>> = BTreeMap::new();
    for &row in slice {
        groups.entry(row.label()).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|(label, mut rows)| {
            rows.sort_by_key(|r| r.proxy_period);
            // tuition is Some for every slice row
            let last_tuition = rows.last().and_then(|r| r.tuition).unwrap_or(0.0);

            let quantities: Vec<i64> = rows.iter().filter_map(|r| r.quantity).collect();
            let mean_enrollment = if quantities.is_empty() {
                0.0
            } else {
                quantities.iter().sum::<i64>() as f64 / quantities.len() as f64
            };

            ProgramCostRow {
                label,
                last_tuition,
                mean_enrollment,
            }
        })
        .collect()
}

/// Which location attribute to count distinct programs by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    Department,
    Municipality,
}

/// Distinct program codes per department or municipality, descending by
/// count (ties by name, for stable output).
pub fn location_counts(slice: &[&CohortRow], kind: LocationKind) -> Vec<LocationCount> {
    let mut codes_by_location: BTreeMap<String, HashSet<&str>> = BTreeMap::new();

    for row in slice {
        let location = match kind {
            LocationKind::Department => row.department.as_deref(),
            LocationKind::Municipality => row.municipality.as_deref(),
        };
        codes_by_location
            .entry(location.unwrap_or(UNKNOWN).to_string())
            .or_default()
            .insert(row.program_code.as_str());
    }

    let mut counts: Vec<LocationCount> = codes_by_location
        .into_iter()
        .map(|(location, codes)| LocationCount {
            location,
            programs: codes.len(),
        })
        .collect();

    counts.sort_by(|a, b| {
        b.programs
            .cmp(&a.programs)
            .then_with(|| a.location.cmp(&b.location))
    });

    counts
}

/// Distinct institutions and programs per period, over the full cohort.
pub fn presence_over_time(cohort: &[CohortRow]) -> Vec<PeriodPresence> {
    let mut by_period: BTreeMap<&str, (HashSet<&str>, HashSet<&str>)> = BTreeMap::new();

    for row in cohort {
        let entry = by_period.entry(row.period.as_str()).or_default();
        entry.0.insert(row.institution_code.as_str());
        entry.1.insert(row.program_code.as_str());
    }

    by_period
        .into_iter()
        .map(|(period, (institutions, programs))| PeriodPresence {
            period: period.to_string(),
            institutions: institutions.len(),
            programs: programs.len(),
        })
        .collect()
}

/// Total quantity per period per process type, over the full cohort
/// (unrestricted by the tuition window). Periods are sorted by their
/// composite code so the series plot left to right in time order.
pub fn quantity_pivot(cohort: &[CohortRow]) -> Vec<ProcessSeries> {
    let mut by_process: BTreeMap<&str, BTreeMap<(i32, &str), i64>> = BTreeMap::new();

    for row in cohort {
        let Some(quantity) = row.quantity else {
            continue;
        };
        *by_process
            .entry(row.process.as_str())
            .or_default()
            .entry((row.proxy_period, row.period.as_str()))
            .or_insert(0) += quantity;
    }

    by_process
        .into_iter()
        .map(|(process, periods)| ProcessSeries {
            process: process.to_string(),
            points: periods
                .into_iter()
                .map(|((_, period), total)| PeriodTotal {
                    period: period.to_string(),
                    total,
                })
                .collect(),
        })
        .collect()
}

/// Mean tuition per period per label over the windowed slice, for the
/// tuition-evolution chart.
pub fn tuition_pivot(slice: &[&CohortRow]) -> Vec<LabelSeries> {
    let mut by_label: BTreeMap<String, BTreeMap<(i32, &str), (f64, usize)>> = BTreeMap::new();

    for row in slice {
        let Some(tuition) = row.tuition else { continue };
        let entry = by_label
            .entry(row.label())
            .or_default()
            .entry((row.proxy_period, row.period.as_str()))
            .or_insert((0.0, 0));
        entry.0 += tuition;
        entry.1 += 1;
    }

    by_label
        .into_iter()
        .map(|(label, periods)| LabelSeries {
            label,
            points: periods
                .into_iter()
                .map(|((_, period), (sum, n))| (period.to_string(), sum / n as f64))
                .collect(),
        })
        .collect()
}

/// Numbered, human-readable enumeration of the distinct (institution,
/// program, municipality) triples in the full cohort. Passed verbatim as
/// context to the research agent.
pub fn program_digest(cohort: &[CohortRow]) -> String {
    let mut seen = HashSet::new();
    let mut digest = String::new();
    let mut index = 1;

    for row in cohort {
        let institution = row.institution.as_deref().unwrap_or(UNKNOWN);
        let program = row.program_name.as_deref().unwrap_or(UNKNOWN);
        let municipality = row.municipality.as_deref().unwrap_or(UNKNOWN);

        if !seen.insert((institution.to_string(), program.to_string(), municipality.to_string())) {
            continue;
        }

        digest.push_str(&format!(
            "Programa {}: Universidad: {}, Programa: {}, Ubicación o ciudad: {}. ",
            index, institution, program, municipality
        ));
        index += 1;
    }

    digest
}

/// All tabular summaries for the bundle. Every table is present even for
/// an empty cohort.
pub fn summarize(cohort: &[CohortRow], process: &str, window: AnalysisWindow) -> SummaryTables {
    let slice = enrollment_slice(cohort, process, window);

    SummaryTables {
        n_prog_ies_tiempo: presence_over_time(cohort),
        costo_vs_matriculados: institution_program_summary(&slice),
        por_dpto: location_counts(&slice, LocationKind::Department),
        por_mpio: location_counts(&slice, LocationKind::Municipality),
        estudiantes_tiempo: quantity_pivot(cohort),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snies::dataset::{
        CatalogRecord, InstitutionRecord, MasterRecord, OfferingRecord, SniesDataset,
    };

    fn master(code: &str, period: &str, proxy: i32, process: &str, qty: &str) -> MasterRecord {
        MasterRecord {
            program_code: code.to_string(),
            period: period.to_string(),
            proxy_period: proxy,
            process: process.to_string(),
            quantity: qty.to_string(),
            institution_code: format!("ies-{}", code),
        }
    }

    fn catalog(code: &str, name: &str, institution: &str, dept: &str, city: &str) -> CatalogRecord {
        CatalogRecord {
            program_code: code.to_string(),
            program_name: name.to_string(),
            institution: institution.to_string(),
            institution_code: format!("ies-{}", code),
            department: dept.to_string(),
            municipality: city.to_string(),
        }
    }

    fn offering(code: &str, period: &str, tuition: &str) -> OfferingRecord {
        OfferingRecord {
            program_code: code.to_string(),
            period: period.to_string(),
            tuition: tuition.to_string(),
        }
    }

    fn sample_dataset() -> SniesDataset {
        SniesDataset::new(
            vec![
                master("101", "2021-1", 20211, "MATRICULADOS", "40"),
                master("101", "2022-1", 20221, "MATRICULADOS", "60"),
                master("101", "2022-1", 20221, "ADMITIDOS", "25"),
                master("202", "2022-1", 20221, "MATRICULADOS", "10"),
                // outside the analysis window
                master("101", "2019-1", 20191, "MATRICULADOS", "100"),
            ],
            vec![
                catalog("101", "Doctorado en Matemáticas", "U. Andina", "Antioquia", "Medellín"),
                catalog("202", "Doctorado en Matemáticas Aplicadas", "U. del Sur", "Bogotá D.C", "Bogotá"),
            ],
            vec![
                offering("101", "2021-1", "8000000"),
                offering("101", "2022-1", "9000000"),
                // "null" sentinel: excluded from tuition summaries only
                offering("202", "2022-1", "null"),
            ],
            vec![InstitutionRecord {
                institution_code: "ies-101".to_string(),
                name: "U. Andina".to_string(),
            }],
        )
    }

    #[test]
    fn test_resolve_codes_distinct_and_ordered() {
        let ds = sample_dataset();
        let names = vec![
            "Doctorado en Matemáticas".to_string(),
            "Doctorado en Matemáticas Aplicadas".to_string(),
        ];
        assert_eq!(resolve_codes(&names, &ds), vec!["101", "202"]);
        assert!(resolve_codes(&[], &ds).is_empty());
    }

    #[test]
    fn test_left_join_preserves_every_master_row() {
        let ds = sample_dataset();
        let codes = vec!["101".to_string(), "202".to_string()];
        let cohort = assemble_cohort(&codes, &ds);

        let filtered_master = ds
            .master
            .iter()
            .filter(|m| codes.contains(&m.program_code))
            .count();
        assert_eq!(cohort.len(), filtered_master);
    }

    #[test]
    fn test_join_miss_surfaces_as_unknown() {
        let mut ds = sample_dataset();
        ds.master.push(master("999", "2022-1", 20221, "MATRICULADOS", "5"));
        let cohort = assemble_cohort(&["999".to_string()], &ds);

        assert_eq!(cohort.len(), 1);
        assert!(cohort[0].program_name.is_none());
        assert!(cohort[0].tuition.is_none());
        assert_eq!(cohort[0].label(), format!("{} - {}", UNKNOWN, UNKNOWN));
    }

    #[test]
    fn test_null_tuition_excluded_from_slice_but_counts_in_pivot() {
        let ds = sample_dataset();
        let cohort = assemble_cohort(&["101".to_string(), "202".to_string()], &ds);
        let slice = enrollment_slice(&cohort, "MATRICULADOS", AnalysisWindow::default());

        // program 202 has the "null" sentinel: not in the slice
        assert!(slice.iter().all(|r| r.program_code != "202"));

        // but its quantity still contributes to the full time series
        let pivot = quantity_pivot(&cohort);
        let enrolled = pivot
            .iter()
            .find(|s| s.process == "MATRICULADOS")
            .unwrap();
        let total_2022: i64 = enrolled
            .points
            .iter()
            .filter(|p| p.period == "2022-1")
            .map(|p| p.total)
            .sum();
        assert_eq!(total_2022, 70); // 60 from 101 + 10 from 202
    }

    #[test]
    fn test_window_filter_is_inclusive() {
        let ds = sample_dataset();
        let cohort = assemble_cohort(&["101".to_string()], &ds);
        let slice = enrollment_slice(&cohort, "MATRICULADOS", AnalysisWindow::default());

        // 2019 row falls outside; both windowed rows survive
        assert_eq!(slice.len(), 2);
        assert!(slice.iter().all(|r| r.proxy_period >= 20211));
    }

    #[test]
    fn test_summary_last_tuition_in_period_order_and_mean() {
        let ds = sample_dataset();
        let cohort = assemble_cohort(&["101".to_string()], &ds);
        let slice = enrollment_slice(&cohort, "MATRICULADOS", AnalysisWindow::default());
        let summary = institution_program_summary(&slice);

        assert_eq!(summary.len(), 1);
        let row = &summary[0];
        assert_eq!(row.label, "U. Andina - Doctorado en Matemáticas");
        assert_eq!(row.last_tuition, 9_000_000.0);
        assert_eq!(row.mean_enrollment, 50.0); // (40 + 60) / 2
    }

    #[test]
    fn test_location_counts_descending() {
        let ds = sample_dataset();
        let cohort = assemble_cohort(&["101".to_string(), "202".to_string()], &ds);
        let slice = enrollment_slice(&cohort, "MATRICULADOS", AnalysisWindow::default());
        let counts = location_counts(&slice, LocationKind::Department);

        assert!(!counts.is_empty());
        for pair in counts.windows(2) {
            assert!(pair[0].programs >= pair[1].programs);
        }
        let total_codes: usize = counts.iter().map(|c| c.programs).sum();
        assert!(total_codes >= 1);
    }

    #[test]
    fn test_empty_cohort_yields_zero_filled_tables() {
        let tables = summarize(&[], "MATRICULADOS", AnalysisWindow::default());
        assert!(tables.n_prog_ies_tiempo.is_empty());
        assert!(tables.costo_vs_matriculados.is_empty());
        assert!(tables.por_dpto.is_empty());
        assert!(tables.por_mpio.is_empty());
        assert!(tables.estudiantes_tiempo.is_empty());
        assert!(program_digest(&[]).is_empty());
    }

    #[test]
    fn test_digest_numbers_distinct_triples() {
        let ds = sample_dataset();
        let cohort = assemble_cohort(&["101".to_string(), "202".to_string()], &ds);
        let digest = program_digest(&cohort);

        assert!(digest.starts_with("Programa 1: Universidad: U. Andina"));
        assert!(digest.contains("Programa 2: Universidad: U. del Sur"));
        // five master rows, two distinct triples
        assert!(!digest.contains("Programa 3:"));
    }

    #[test]
    fn test_unparseable_quantity_is_row_level_exclusion() {
        let mut ds = sample_dataset();
        ds.master.push(master("101", "2023-1", 20231, "MATRICULADOS", "n/a"));
        ds.offerings.push(offering("101", "2023-1", "9500000"));
        let cohort = assemble_cohort(&["101".to_string()], &ds);

        // the row itself is kept (left-join invariant)
        assert_eq!(cohort.iter().filter(|r| r.period == "2023-1").count(), 1);
        // but contributes no quantity
        let pivot = quantity_pivot(&cohort);
        let enrolled = pivot.iter().find(|s| s.process == "MATRICULADOS").unwrap();
        assert!(enrolled.points.iter().all(|p| p.period != "2023-1"));
    }
}
