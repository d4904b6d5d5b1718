//! CSV export and import of RNC records
//!
//! Import is two-phase: [`read_csv`] validates every row into [`NewRnc`]
//! forms without touching storage, and the caller decides whether to write.

use std::collections::HashMap;
use std::io::{Read, Write};

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use miette::Diagnostic;
use thiserror::Error;

use crate::core::numbering::RncNumber;
use crate::entities::rnc::{NewRnc, Rnc, RncStatus};

/// Columns written by export, in order
pub const EXPORT_HEADERS: [&str; 8] = [
    "number",
    "reporter",
    "date",
    "area",
    "cost_code",
    "title",
    "description",
    "status",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Header spellings accepted on import, mapped to their canonical column
const HEADER_ALIASES: &[(&str, &str)] = &[
    ("number", "number"),
    ("numero", "number"),
    ("número", "number"),
    ("reporter", "reporter"),
    ("emitente", "reporter"),
    ("date", "date"),
    ("data", "date"),
    ("report_date", "date"),
    ("area", "area"),
    ("área", "area"),
    ("cost_code", "cost_code"),
    ("cost-code", "cost_code"),
    ("pep", "cost_code"),
    ("title", "title"),
    ("titulo", "title"),
    ("título", "title"),
    ("description", "description"),
    ("descricao", "description"),
    ("descrição", "description"),
    ("status", "status"),
];

/// Date layouts accepted in the date column
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

#[derive(Debug, Error, Diagnostic)]
pub enum CsvError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("row {row}: {message}")]
    #[diagnostic(
        code(rnc::csv::invalid_row),
        help("fix the row, or pass --skip-errors to import the valid rows only")
    )]
    InvalidRow { row: usize, message: String },

    #[error("CSV has no title column (found: {found})")]
    #[diagnostic(help("run `rnc import --template` for the expected header"))]
    MissingTitleColumn { found: String },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Prefix a UTF-8 byte order mark so spreadsheet tools detect the encoding
    pub bom: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub skip_errors: bool,
}

/// A validated row ready to be created
#[derive(Debug, Clone)]
pub struct ParsedRow {
    /// 1-based line number in the file (the header is line 1)
    pub row: usize,
    pub new: NewRnc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

impl From<RowError> for CsvError {
    fn from(e: RowError) -> Self {
        CsvError::InvalidRow {
            row: e.row,
            message: e.message,
        }
    }
}

/// Result of validating an input file
#[derive(Debug, Default)]
pub struct ParsedCsv {
    pub rows: Vec<ParsedRow>,
    pub errors: Vec<RowError>,
}

/// Import statistics
#[derive(Debug, Default)]
pub struct ImportStats {
    pub rows_processed: usize,
    /// Numbers assigned, in file order; empty on a dry run
    pub created: Vec<RncNumber>,
    /// Rows that would be created on a dry run
    pub valid: usize,
    pub errors: Vec<RowError>,
}

/// Write records as CSV with [`EXPORT_HEADERS`]
pub fn write_csv<W: Write>(
    mut writer: W,
    records: &[Rnc],
    options: ExportOptions,
) -> Result<(), CsvError> {
    if options.bom {
        writer.write_all(UTF8_BOM)?;
    }

    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(EXPORT_HEADERS)?;
    for rnc in records {
        let number = rnc.number.to_string();
        let date = rnc.report_date.format("%Y-%m-%d").to_string();
        let status = rnc.status.to_string();
        wtr.write_record([
            number.as_str(),
            rnc.reporter.as_str(),
            date.as_str(),
            rnc.area.as_str(),
            rnc.pep.as_str(),
            rnc.title.as_str(),
            rnc.description.as_str(),
            status.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Header line plus one example row, for `rnc import --template`
pub fn template() -> String {
    let mut out = EXPORT_HEADERS[1..].join(",");
    out.push('\n');
    out.push_str("Ana Souza,2025-06-01,Line 3,PEP-0042,Weld porosity,Porosity found on seam 4,open\n");
    out
}

/// Validate every row; `today` fills in missing dates
pub fn read_csv<R: Read>(reader: R, today: NaiveDate) -> Result<ParsedCsv, CsvError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let header_map = build_header_map(&headers);
    if !header_map.contains_key("title") {
        return Err(CsvError::MissingTitleColumn {
            found: headers.iter().collect::<Vec<_>>().join(", "),
        });
    }

    let mut parsed = ParsedCsv::default();
    for (row_idx, result) in rdr.records().enumerate() {
        let row = row_idx + 2;
        let outcome = result
            .map_err(|e| RowError {
                row,
                message: format!("CSV parse error: {}", e),
            })
            .and_then(|record| parse_row(&record, &header_map, row, today));

        match outcome {
            Ok(new) => parsed.rows.push(ParsedRow { row, new }),
            Err(e) => parsed.errors.push(e),
        }
    }
    Ok(parsed)
}

/// Map canonical column name to index; unknown headers are ignored
fn build_header_map(headers: &StringRecord) -> HashMap<&'static str, usize> {
    let mut map = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        let name = header.trim_start_matches('\u{feff}').trim().to_lowercase();
        if let Some((_, canonical)) = HEADER_ALIASES.iter().find(|(alias, _)| *alias == name) {
            map.entry(*canonical).or_insert(idx);
        }
    }
    map
}

fn get_field(
    record: &StringRecord,
    header_map: &HashMap<&'static str, usize>,
    field: &str,
) -> Option<String> {
    header_map
        .get(field)
        .and_then(|&idx| record.get(idx))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<&'static str, usize>,
    row: usize,
    today: NaiveDate,
) -> Result<NewRnc, RowError> {
    let err = |message: String| RowError { row, message };

    let title = get_field(record, header_map, "title")
        .ok_or_else(|| err("missing required field 'title'".to_string()))?;

    let report_date = match get_field(record, header_map, "date") {
        Some(raw) => parse_date(&raw).ok_or_else(|| err(format!("invalid date '{}'", raw)))?,
        None => today,
    };

    let status = match get_field(record, header_map, "status") {
        Some(raw) => raw.parse::<RncStatus>().map_err(err)?,
        None => RncStatus::Open,
    };

    let field = |name: &str| get_field(record, header_map, name).unwrap_or_default();
    Ok(NewRnc::new(title)
        .with_reporter(field("reporter"))
        .with_report_date(report_date)
        .with_area(field("area"))
        .with_pep(field("cost_code"))
        .with_description(field("description"))
        .with_status(status))
}

/// Parse a date column value; a trailing time part (`2025-06-01 00:00:00`) is ignored
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    fn record(seq: u32, title: &str, status: RncStatus) -> Rnc {
        let new = NewRnc::new(title)
            .with_reporter("Ana, QA")
            .with_report_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
            .with_area("Line 3")
            .with_pep("PEP-0042")
            .with_description("Porosity on seam 4\nsecond line \"quoted\"")
            .with_status(status);
        let created = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        Rnc::from_new(RncNumber::new(2025, seq).unwrap(), new, created)
    }

    #[test]
    fn test_export_header_and_bom() {
        let mut out = Vec::new();
        write_csv(&mut out, &[], ExportOptions { bom: true }).unwrap();
        assert!(out.starts_with(UTF8_BOM));
        let text = String::from_utf8(out[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(
            text.trim_end(),
            "number,reporter,date,area,cost_code,title,description,status"
        );
    }

    #[test]
    fn test_export_then_import_preserves_fields() {
        let records = vec![
            record(2, "Paint run", RncStatus::Cancelled),
            record(1, "Weld defect", RncStatus::InProgress),
        ];
        let mut out = Vec::new();
        write_csv(&mut out, &records, ExportOptions { bom: true }).unwrap();

        let parsed = read_csv(out.as_slice(), today()).unwrap();
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.rows.len(), 2);

        for (row, original) in parsed.rows.iter().zip(&records) {
            assert_eq!(row.new.reporter, original.reporter);
            assert_eq!(row.new.report_date, original.report_date);
            assert_eq!(row.new.area, original.area);
            assert_eq!(row.new.pep, original.pep);
            assert_eq!(row.new.title, original.title);
            assert_eq!(row.new.description, original.description);
            assert_eq!(row.new.status, original.status);
        }
    }

    #[test]
    fn test_import_accepts_portuguese_headers() {
        let input = "Emitente,Data,Área,PEP,Título,Descrição,Status\n\
                     João,15/03/2025,Pátio,PEP-1,Vazamento,Óleo no piso,Encerrada\n";
        let parsed = read_csv(input.as_bytes(), today()).unwrap();
        assert!(parsed.errors.is_empty());

        let new = &parsed.rows[0].new;
        assert_eq!(new.reporter, "João");
        assert_eq!(new.report_date, NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
        assert_eq!(new.area, "Pátio");
        assert_eq!(new.pep, "PEP-1");
        assert_eq!(new.title, "Vazamento");
        assert_eq!(new.status, RncStatus::Closed);
    }

    #[test]
    fn test_import_defaults_and_row_errors() {
        let input = "title,date,status\n\
                     No date,,\n\
                     ,2025-01-01,open\n\
                     Bad date,2025-13-45,open\n\
                     Bad status,2025-01-01,pending\n\
                     Timestamp,2025-02-03 00:00:00,\n";
        let parsed = read_csv(input.as_bytes(), today()).unwrap();

        let rows: Vec<usize> = parsed.rows.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![2, 6]);
        assert_eq!(parsed.rows[0].new.report_date, today());
        assert_eq!(parsed.rows[0].new.status, RncStatus::Open);
        assert_eq!(
            parsed.rows[1].new.report_date,
            NaiveDate::from_ymd_opt(2025, 2, 3).unwrap()
        );

        let error_rows: Vec<usize> = parsed.errors.iter().map(|e| e.row).collect();
        assert_eq!(error_rows, vec![3, 4, 5]);
        assert!(parsed.errors[0].message.contains("title"));
        assert!(parsed.errors[1].message.contains("2025-13-45"));
    }

    #[test]
    fn test_import_requires_title_column() {
        let err = read_csv("reporter,date\nAna,2025-01-01\n".as_bytes(), today()).unwrap_err();
        assert!(matches!(err, CsvError::MissingTitleColumn { .. }));
    }

    #[test]
    fn test_template_parses_cleanly() {
        let parsed = read_csv(template().as_bytes(), today()).unwrap();
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].new.title, "Weld porosity");
    }
}
