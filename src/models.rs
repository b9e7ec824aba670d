//! Data models shared across the pipeline.
//!
//! This module contains the aggregator's output bundle, the chart
//! identifiers both the aggregator and the renderer agree on, and the
//! structured report produced by the research agent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Identifier of a rendered chart.
///
/// The renderer looks charts up by these keys; sharing the enum between
/// both components keeps a typo from silently producing a blank slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartId {
    CostoVsMatriculados,
    EvolucionMatricula,
    PorDpto,
    EstudiantesTiempo,
}

impl ChartId {
    /// All chart identifiers, in slide order.
    pub const ALL: [ChartId; 4] = [
        ChartId::CostoVsMatriculados,
        ChartId::EvolucionMatricula,
        ChartId::PorDpto,
        ChartId::EstudiantesTiempo,
    ];

    /// Stable key, as the renderer and serialized bundles use it.
    pub fn key(&self) -> &'static str {
        match self {
            ChartId::CostoVsMatriculados => "costo_vs_matriculados",
            ChartId::EvolucionMatricula => "evolucion_matricula",
            ChartId::PorDpto => "por_dpto",
            ChartId::EstudiantesTiempo => "estudiantes_tiempo",
        }
    }

    /// Image file name inside the output directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            ChartId::CostoVsMatriculados => "grafica_costo_matriculados.png",
            ChartId::EvolucionMatricula => "grafica_evolucion_matricula.png",
            ChartId::PorDpto => "grafica_por_dpto.png",
            ChartId::EstudiantesTiempo => "grafica_estudiantes_tiempo.png",
        }
    }
}

impl fmt::Display for ChartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Distinct institution/program presence for one period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodPresence {
    pub period: String,
    pub institutions: usize,
    pub programs: usize,
}

/// One institution-program label with its last observed tuition and mean
/// enrollment over the analysis window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramCostRow {
    /// "INSTITUCION - PROGRAMA ACADEMICO" composite label.
    pub label: String,
    pub last_tuition: f64,
    pub mean_enrollment: f64,
}

/// Distinct program count for one department or municipality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationCount {
    pub location: String,
    pub programs: usize,
}

/// Total quantity per period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodTotal {
    pub period: String,
    pub total: i64,
}

/// Time series of total quantity for one process type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSeries {
    pub process: String,
    pub points: Vec<PeriodTotal>,
}

/// Mean tuition per period for one institution-program label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSeries {
    pub label: String,
    pub points: Vec<(String, f64)>,
}

/// The tabular summaries of the matched cohort. Every field is always
/// present; an empty cohort yields empty vectors, never missing keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryTables {
    /// Distinct institutions/programs per period, full cohort.
    pub n_prog_ies_tiempo: Vec<PeriodPresence>,
    /// Last tuition + mean enrollment per label, windowed slice.
    pub costo_vs_matriculados: Vec<ProgramCostRow>,
    /// Distinct program codes per department, descending.
    pub por_dpto: Vec<LocationCount>,
    /// Distinct program codes per municipality, descending.
    pub por_mpio: Vec<LocationCount>,
    /// Total quantity per period per process, full cohort.
    pub estudiantes_tiempo: Vec<ProcessSeries>,
}

/// Complete output of the SNIES analysis stage.
///
/// Constructed fresh each run and never mutated after being returned.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultBundle {
    /// False when the fuzzy matcher accepted no catalog entry; the
    /// tables are then zero-filled and the digest is empty.
    pub matched: bool,
    /// Rendered chart images. A missing key means "no chart available".
    pub charts: BTreeMap<ChartId, PathBuf>,
    pub tables: SummaryTables,
    /// Numbered enumeration of matched (institution, program, location)
    /// triples, used as context for the research agent.
    pub program_digest: String,
}

/// Coarse geographic bucket used when laying out the benchmark slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// Colombia (covered by the SNIES cohort, not by the agent).
    Local,
    /// Latin America outside Colombia.
    Latam,
    /// United States, Europe and everything else.
    Internacional,
}

impl Region {
    pub fn parse(tag: &str) -> Option<Region> {
        match tag.trim().to_lowercase().as_str() {
            "local" | "colombia" => Some(Region::Local),
            "latam" => Some(Region::Latam),
            "internacional" | "international" => Some(Region::Internacional),
            _ => None,
        }
    }
}

/// Country-name → region classifier, built from configuration.
///
/// Countries absent from the map classify as LATAM, so the map only
/// needs to name Colombia and the non-LATAM countries.
#[derive(Debug, Clone)]
pub struct RegionMap {
    countries: BTreeMap<String, Region>,
}

impl RegionMap {
    pub fn new(countries: BTreeMap<String, Region>) -> Self {
        let countries = countries
            .into_iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v))
            .collect();
        Self { countries }
    }

    pub fn classify(&self, country: Option<&str>) -> Region {
        match country {
            Some(name) => *self
                .countries
                .get(&name.trim().to_lowercase())
                .unwrap_or(&Region::Latam),
            None => Region::Latam,
        }
    }
}

/// One comparable international program found by the research agent.
///
/// Every field is optional: the renderer substitutes "No disponible"
/// rather than failing on gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramItem {
    #[serde(default)]
    pub program_name: Option<String>,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub courses_examples: Vec<String>,
    #[serde(default)]
    pub tuition: Option<String>,
    #[serde(default)]
    pub intake_per_year: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// How many programs the agent found per region bucket.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Coverage {
    #[serde(default)]
    pub local: u32,
    #[serde(default)]
    pub national: u32,
    #[serde(default)]
    pub international: u32,
}

/// Structured benchmark report returned by the planner agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendReport {
    #[serde(default)]
    pub input_program: String,
    #[serde(default)]
    pub input_description: String,
    #[serde(default)]
    pub coverage: Coverage,
    #[serde(default)]
    pub items: Vec<ProgramItem>,
    #[serde(default)]
    pub insights: Vec<String>,
}

impl TrendReport {
    /// Placeholder report used when the research stage is skipped or its
    /// output cannot be interpreted. The renderer still produces a deck.
    pub fn unavailable(program: &str, description: &str) -> Self {
        Self {
            input_program: program.to_string(),
            input_description: description.to_string(),
            coverage: Coverage::default(),
            items: Vec::new(),
            insights: vec!["Análisis de tendencias no disponible.".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_id_keys() {
        assert_eq!(ChartId::CostoVsMatriculados.key(), "costo_vs_matriculados");
        assert_eq!(ChartId::PorDpto.key(), "por_dpto");
        assert_eq!(ChartId::EstudiantesTiempo.key(), "estudiantes_tiempo");
        assert_eq!(ChartId::EvolucionMatricula.key(), "evolucion_matricula");
    }

    #[test]
    fn test_chart_id_serializes_to_key() {
        for id in ChartId::ALL {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.key()));
        }
    }

    #[test]
    fn test_result_bundle_always_has_table_keys() {
        let bundle = ResultBundle::default();
        let json = serde_json::to_value(&bundle).unwrap();
        let tables = json.get("tables").unwrap();
        for key in [
            "n_prog_ies_tiempo",
            "costo_vs_matriculados",
            "por_dpto",
            "por_mpio",
            "estudiantes_tiempo",
        ] {
            assert!(tables.get(key).is_some(), "missing table key {}", key);
        }
    }

    #[test]
    fn test_region_map_defaults_to_latam() {
        let mut countries = BTreeMap::new();
        countries.insert("Colombia".to_string(), Region::Local);
        countries.insert("España".to_string(), Region::Internacional);
        let map = RegionMap::new(countries);

        assert_eq!(map.classify(Some("colombia")), Region::Local);
        assert_eq!(map.classify(Some("España")), Region::Internacional);
        assert_eq!(map.classify(Some("México")), Region::Latam);
        assert_eq!(map.classify(None), Region::Latam);
    }

    #[test]
    fn test_trend_report_tolerates_missing_fields() {
        let report: TrendReport = serde_json::from_str(
            r#"{"input_program": "Doctorado", "items": [{"country": "Chile"}]}"#,
        )
        .unwrap();
        assert_eq!(report.input_program, "Doctorado");
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].country.as_deref(), Some("Chile"));
        assert!(report.items[0].program_name.is_none());
        assert!(report.insights.is_empty());
    }

    #[test]
    fn test_region_parse() {
        assert_eq!(Region::parse("LATAM"), Some(Region::Latam));
        assert_eq!(Region::parse("local"), Some(Region::Local));
        assert_eq!(Region::parse("Internacional"), Some(Region::Internacional));
        assert_eq!(Region::parse("marte"), None);
    }
}
