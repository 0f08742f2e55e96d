//! TUSS CSV → `TussCode` mapping
//!
//! ANS publishes one `;`-delimited, Latin-1 encoded CSV per terminology
//! table. Column headers vary between tables and releases, so each logical
//! field is looked up through an ordered alias list; the first alias present
//! in the header with a non-blank value wins. Rows without a code or a
//! description are skipped with a warning and never abort the file.

use clinic_common::db::TussCode;
use csv::{ByteRecord, ReaderBuilder};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::ImportError;

/// Table numbers imported from the archive; everything else is ignored
pub const RELEVANT_TABLES: &[&str] = &[
    "22", "23", "24", "39", "41", "43", "50", "52", "57", "63", "64",
];

/// Table number used when a file name carries none
pub const UNKNOWN_TABLE: &str = "0";

const CODE_COLUMNS: &[&str] = &[
    "Codigo",
    "codigo",
    "CODIGO",
    "CD_PROCEDIMENTO",
    "Código",
    "CÓDIGO",
];

const DESCRIPTION_COLUMNS: &[&str] = &[
    "Descricao",
    "descricao",
    "DESCRICAO",
    "DS_PROCEDIMENTO",
    "Descrição",
    "DESCRIÇÃO",
];

const CATEGORY_COLUMNS: &[&str] = &["Categoria", "categoria", "CATEGORIA"];

const SUBCATEGORY_COLUMNS: &[&str] = &["Subcategoria", "subcategoria", "SUBCATEGORIA"];

static TABLE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)tabela[\s_-]*(\d+)").expect("table number pattern is valid"));

/// Derive the table number from an archive entry name
///
/// `Tabela_22_Procedimentos.csv` → `"22"`; no `tabela` token or no digits
/// after it → `"0"`.
pub fn table_number_from_file_name(file_name: &str) -> String {
    TABLE_NUMBER_RE
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_TABLE.to_string())
}

pub fn is_relevant_table(table_number: &str) -> bool {
    RELEVANT_TABLES.contains(&table_number)
}

/// Display name for a table number
pub fn table_display_name(table_number: &str) -> String {
    let name = match table_number {
        "22" => "Procedimentos",
        "23" => "Procedimentos Odontológicos",
        "24" => "Procedimentos Fonoaudiológicos",
        "39" => "Classificação de Acidentes",
        "41" => "Motivo de Encerramento",
        "43" => "Tipo de Acomodação",
        "50" => "Via de Administração",
        "52" => "Tipo de Atendimento",
        "57" => "Origem da Receita",
        "63" => "Grupo de Despesas",
        "64" => "Tipo de Internação",
        other => return format!("Tabela {}", other),
    };
    name.to_string()
}

/// Records mapped from one CSV file
#[derive(Debug, Clone, Default)]
pub struct MappedTable {
    pub table_number: String,
    pub records: Vec<TussCode>,
    /// Rows dropped for lacking a code or description
    pub skipped_rows: usize,
}

/// Latin-1 maps every byte to the code point of the same value
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Column indexes per logical field, in alias priority order
#[derive(Debug, Default)]
struct FieldColumns {
    code: Vec<usize>,
    description: Vec<usize>,
    category: Vec<usize>,
    subcategory: Vec<usize>,
}

impl FieldColumns {
    fn resolve(headers: &[String]) -> Self {
        Self {
            code: alias_positions(headers, CODE_COLUMNS),
            description: alias_positions(headers, DESCRIPTION_COLUMNS),
            category: alias_positions(headers, CATEGORY_COLUMNS),
            subcategory: alias_positions(headers, SUBCATEGORY_COLUMNS),
        }
    }
}

fn alias_positions(headers: &[String], aliases: &[&str]) -> Vec<usize> {
    aliases
        .iter()
        .filter_map(|alias| headers.iter().position(|h| h == alias))
        .collect()
}

/// First non-blank value among `columns`, trimmed
fn first_value(record: &ByteRecord, columns: &[usize]) -> Option<String> {
    columns.iter().find_map(|&index| {
        let value = decode_latin1(record.get(index)?);
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn header_names(headers: &ByteRecord) -> Vec<String> {
    headers
        .iter()
        .enumerate()
        .map(|(i, field)| {
            // Tolerate a UTF-8 BOM in front of the first header
            let field = if i == 0 {
                field.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(field)
            } else {
                field
            };
            decode_latin1(field).trim().to_string()
        })
        .collect()
}

/// Map CSV content from any reader
///
/// `source` names the file in log messages. Only I/O failures are returned
/// as errors; row-level problems are logged and counted as skipped.
pub fn map_reader<R: Read>(
    reader: R,
    table_number: &str,
    source: &str,
) -> Result<MappedTable, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = header_names(rdr.byte_headers()?);
    let columns = FieldColumns::resolve(&headers);
    if columns.code.is_empty() || columns.description.is_empty() {
        tracing::warn!(
            file = %source,
            headers = ?headers,
            "No recognised code/description columns; every row will be skipped"
        );
    }

    let table_name = table_display_name(table_number);
    let mut mapped = MappedTable {
        table_number: table_number.to_string(),
        ..Default::default()
    };

    let mut record = ByteRecord::new();
    loop {
        match rdr.read_byte_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if e.is_io_error() => return Err(e),
            Err(e) => {
                tracing::warn!(file = %source, error = %e, "Skipping unreadable row");
                mapped.skipped_rows += 1;
                continue;
            }
        }

        let code = first_value(&record, &columns.code);
        let description = first_value(&record, &columns.description);

        match (code, description) {
            (Some(code), Some(description)) => mapped.records.push(TussCode {
                code,
                description,
                table_number: table_number.to_string(),
                table_name: table_name.clone(),
                category: first_value(&record, &columns.category),
                subcategory: first_value(&record, &columns.subcategory),
                is_active: true,
            }),
            _ => {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                tracing::warn!(file = %source, line, "Skipping row without code or description");
                mapped.skipped_rows += 1;
            }
        }
    }

    Ok(mapped)
}

/// Map one extracted CSV file
pub fn map_csv_file(path: &Path, table_number: &str) -> Result<MappedTable, ImportError> {
    let source = path.display().to_string();
    let file = File::open(path)?;
    let mapped = map_reader(file, table_number, &source).map_err(|e| ImportError::Csv {
        file: source.clone(),
        source: e,
    })?;

    tracing::info!(
        file = %source,
        table = %table_number,
        mapped = mapped.records.len(),
        skipped = mapped.skipped_rows,
        "CSV mapped"
    );
    Ok(mapped)
}
