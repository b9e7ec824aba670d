//! Typed SNIES reference tables.
//!
//! The four tables are loaded once per run (see `fetch`) and injected
//! into the matching/aggregation logic as a read-only snapshot, so the
//! core is testable with synthetic in-memory tables.

/// One row of MAESTRO: a quantity for a (program, period, process).
#[derive(Debug, Clone)]
pub struct MasterRecord {
    pub program_code: String,
    /// Period label as published (e.g. "2023-1").
    pub period: String,
    /// Composite year+term code (e.g. 20231) used for window filtering.
    pub proxy_period: i32,
    /// Process type label, e.g. "MATRICULADOS", "ADMITIDOS".
    pub process: String,
    /// Raw quantity; parsed per-use so a bad row only drops out of the
    /// summaries that need the number.
    pub quantity: String,
    pub institution_code: String,
}

/// One row of PROGRAMAS: catalog attributes for a program code.
#[derive(Debug, Clone)]
pub struct CatalogRecord {
    pub program_code: String,
    pub program_name: String,
    pub institution: String,
    pub institution_code: String,
    pub department: String,
    pub municipality: String,
}

/// One row of OFERTA: tuition per (program, period).
#[derive(Debug, Clone)]
pub struct OfferingRecord {
    pub program_code: String,
    pub period: String,
    /// Raw tuition; may be the "null" sentinel or otherwise unparseable.
    pub tuition: String,
}

/// One row of IES: institution code → name.
#[derive(Debug, Clone)]
pub struct InstitutionRecord {
    pub institution_code: String,
    pub name: String,
}

/// The read-only reference snapshot for one run.
#[derive(Debug, Clone, Default)]
pub struct SniesDataset {
    pub master: Vec<MasterRecord>,
    pub catalog: Vec<CatalogRecord>,
    pub offerings: Vec<OfferingRecord>,
    pub institutions: Vec<InstitutionRecord>,
}

impl SniesDataset {
    pub fn new(
        master: Vec<MasterRecord>,
        catalog: Vec<CatalogRecord>,
        offerings: Vec<OfferingRecord>,
        institutions: Vec<InstitutionRecord>,
    ) -> Self {
        Self {
            master,
            catalog,
            offerings,
            institutions,
        }
    }
}
