//! Remote loading of the SNIES parquet tables.
//!
//! The four tables are downloaded from a fixed base URL at run start.
//! Anything wrong at this stage (unreachable host, undecodable file,
//! renamed/missing column) is fatal for the whole run.

use crate::error::DataError;
use crate::snies::dataset::{
    CatalogRecord, InstitutionRecord, MasterRecord, OfferingRecord, SniesDataset,
};
use bytes::Bytes;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Published location of the SNIES snapshots.
pub const DEFAULT_BASE_URL: &str = "https://robertohincapie.com/data/snies";

const MASTER_COLUMNS: [&str; 6] = [
    "CODIGO_SNIES",
    "PERIODO",
    "PROXY_PER",
    "PROCESO",
    "CANTIDAD",
    "CODIGO_INSTITUCION",
];
const CATALOG_COLUMNS: [&str; 6] = [
    "CODIGO_SNIES",
    "PROGRAMA_ACADEMICO",
    "INSTITUCION",
    "CODIGO_INSTITUCION",
    "DEPARTAMENTO_PROGRAMA",
    "MUNICIPIO_PROGRAMA",
];
const OFFERING_COLUMNS: [&str; 3] = ["CODIGO_SNIES", "PERIODO", "MATRICULA"];
const INSTITUTION_COLUMNS: [&str; 2] = ["CODIGO_INSTITUCION", "INSTITUCION"];

/// Downloads and decodes all four tables.
pub async fn load_remote(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<SniesDataset, DataError> {
    let master_bytes = download(client, base_url, "MAESTRO", "MAESTRO.parquet").await?;
    let offering_bytes = download(client, base_url, "OFERTA", "OFERTA.parquet").await?;
    let catalog_bytes = download(client, base_url, "PROGRAMAS", "PROGRAMAS.parquet").await?;
    let institution_bytes = download(client, base_url, "IES", "IES.parquet").await?;

    let master = read_rows("MAESTRO", master_bytes, &MASTER_COLUMNS)?
        .iter()
        .map(master_from_row)
        .collect::<Vec<_>>();
    let offerings = read_rows("OFERTA", offering_bytes, &OFFERING_COLUMNS)?
        .iter()
        .map(offering_from_row)
        .collect::<Vec<_>>();
    let catalog = read_rows("PROGRAMAS", catalog_bytes, &CATALOG_COLUMNS)?
        .iter()
        .map(catalog_from_row)
        .collect::<Vec<_>>();
    let institutions = read_rows("IES", institution_bytes, &INSTITUTION_COLUMNS)?
        .iter()
        .map(institution_from_row)
        .collect::<Vec<_>>();

    info!(
        "Loaded SNIES tables: MAESTRO={} OFERTA={} PROGRAMAS={} IES={}",
        master.len(),
        offerings.len(),
        catalog.len(),
        institutions.len()
    );

    Ok(SniesDataset::new(master, catalog, offerings, institutions))
}

async fn download(
    client: &reqwest::Client,
    base_url: &str,
    table: &'static str,
    file: &str,
) -> Result<Bytes, DataError> {
    let url = format!("{}/{}", base_url.trim_end_matches('/'), file);
    info!("Downloading {}", url);

    let response = client
        .get(&url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|source| DataError::Fetch {
            table,
            url: url.clone(),
            source,
        })?;

    response.bytes().await.map_err(|source| DataError::Fetch {
        table,
        url,
        source,
    })
}

type RawRow = HashMap<String, String>;

/// Decodes a parquet file into string-keyed rows, validating the schema
/// up front so drift fails the run before any row work.
fn read_rows(
    table: &'static str,
    data: Bytes,
    required: &[&'static str],
) -> Result<Vec<RawRow>, DataError> {
    let reader = SerializedFileReader::new(data)
        .map_err(|source| DataError::Decode { table, source })?;

    let present: HashSet<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.path().string())
        .collect();

    for column in required {
        if !present.contains(*column) {
            return Err(DataError::SchemaDrift { table, column });
        }
    }

    let mut rows = Vec::new();
    let row_iter = reader
        .get_row_iter(None)
        .map_err(|source| DataError::Decode { table, source })?;

    for row in row_iter {
        let row = row.map_err(|source| DataError::Decode { table, source })?;
        let mut map = RawRow::new();
        for (name, field) in row.get_column_iter() {
            if let Some(value) = field_to_string(field) {
                map.insert(name.clone(), value);
            }
        }
        rows.push(map);
    }

    Ok(rows)
}

/// Stringifies a parquet field. Nulls and unsupported shapes become a
/// missing entry, which downstream parsing treats as the field absent.
fn field_to_string(field: &Field) -> Option<String> {
    match field {
        Field::Null => None,
        Field::Str(s) => Some(s.clone()),
        Field::Bool(v) => Some(v.to_string()),
        Field::Byte(v) => Some(v.to_string()),
        Field::Short(v) => Some(v.to_string()),
        Field::Int(v) => Some(v.to_string()),
        Field::Long(v) => Some(v.to_string()),
        Field::UByte(v) => Some(v.to_string()),
        Field::UShort(v) => Some(v.to_string()),
        Field::UInt(v) => Some(v.to_string()),
        Field::ULong(v) => Some(v.to_string()),
        Field::Float(v) => Some(v.to_string()),
        Field::Double(v) => Some(v.to_string()),
        _ => None,
    }
}

fn get(row: &RawRow, column: &str) -> String {
    row.get(column).cloned().unwrap_or_default()
}

fn parse_proxy_period(raw: &str) -> i32 {
    // integer columns sometimes arrive as floats ("20211.0")
    raw.trim()
        .parse::<i32>()
        .ok()
        .or_else(|| raw.trim().parse::<f64>().ok().map(|v| v as i32))
        .unwrap_or(0)
}

fn master_from_row(row: &RawRow) -> MasterRecord {
    MasterRecord {
        program_code: get(row, "CODIGO_SNIES"),
        period: get(row, "PERIODO"),
        proxy_period: parse_proxy_period(&get(row, "PROXY_PER")),
        process: get(row, "PROCESO"),
        quantity: get(row, "CANTIDAD"),
        institution_code: get(row, "CODIGO_INSTITUCION"),
    }
}

fn catalog_from_row(row: &RawRow) -> CatalogRecord {
    CatalogRecord {
        program_code: get(row, "CODIGO_SNIES"),
        program_name: get(row, "PROGRAMA_ACADEMICO"),
        institution: get(row, "INSTITUCION"),
        institution_code: get(row, "CODIGO_INSTITUCION"),
        department: get(row, "DEPARTAMENTO_PROGRAMA"),
        municipality: get(row, "MUNICIPIO_PROGRAMA"),
    }
}

fn offering_from_row(row: &RawRow) -> OfferingRecord {
    OfferingRecord {
        program_code: get(row, "CODIGO_SNIES"),
        period: get(row, "PERIODO"),
        tuition: get(row, "MATRICULA"),
    }
}

fn institution_from_row(row: &RawRow) -> InstitutionRecord {
    InstitutionRecord {
        institution_code: get(row, "CODIGO_INSTITUCION"),
        name: get(row, "INSTITUCION"),
    }
}
