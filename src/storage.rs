use crate::error::{EngineError, Result};
use crate::models::{Field, Record};
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use log::{debug, warn};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

/// Read records from a JSON array.
pub fn read_json<R: Read>(reader: R) -> Result<Vec<Record>> {
    Ok(serde_json::from_reader(reader)?)
}

/// Load records from a JSON array file.
pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let records = read_json(BufReader::new(File::open(path)?))?;
    debug!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Read records from CSV with camelCase headers. Empty cells are absent fields; rows
/// that do not parse (e.g. text in a measure column) are skipped with a warning.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
    let mut out = Vec::new();
    for (idx, row) in rdr.deserialize::<Record>().enumerate() {
        match row {
            Ok(rec) => out.push(rec),
            Err(e) => warn!("skipping CSV row {}: {}", idx + 2, e),
        }
    }
    Ok(out)
}

pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let records = read_csv(BufReader::new(File::open(path)?))?;
    debug!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Load records, choosing the format from the file extension (`.json` or `.csv`).
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let path = path.as_ref();
    match extension(path).as_str() {
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => Err(EngineError::UnsupportedFormat(format!(
            "'{}' ({})",
            other,
            path.display()
        ))),
    }
}

/// Columns of a flat export: every field present in at least one record, in schema order.
pub fn export_columns(records: &[Record]) -> Vec<Field> {
    Field::all()
        .filter(|f| records.iter().any(|r| r.cell(*f).is_some()))
        .collect()
}

/// Flatten records to CSV: header row, then one line per record. Every value is quoted
/// and absent fields are empty.
pub fn write_csv<W: Write>(records: &[Record], writer: W) -> Result<()> {
    let columns = export_columns(records);
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);
    wtr.write_record(columns.iter().map(|f| f.as_str()))?;
    for rec in records {
        wtr.write_record(
            columns
                .iter()
                .map(|f| rec.cell(*f).unwrap_or_default()),
        )?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_string(records: &[Record]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(records, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Save records as CSV with header.
pub fn save_csv<P: AsRef<Path>>(records: &[Record], path: P) -> Result<()> {
    write_csv(records, File::create(path)?)
}

/// Save records as pretty JSON array.
pub fn save_json<P: AsRef<Path>>(records: &[Record], path: P) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(records)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

/// Save records, choosing the format from the file extension.
pub fn save_records<P: AsRef<Path>>(records: &[Record], path: P) -> Result<()> {
    let path = path.as_ref();
    match extension(path).as_str() {
        "json" => save_json(records, path),
        "csv" => save_csv(records, path),
        other => Err(EngineError::UnsupportedFormat(format!(
            "'{}' ({})",
            other,
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dimension, Measure};
    use tempfile::tempdir;

    fn sample() -> Vec<Record> {
        vec![
            Record::new()
                .with_year(2024)
                .with_text(Dimension::Country, "USA")
                .with_measure(Measure::MarketValueUsd, 1500.0),
            Record::new()
                .with_year(2025)
                .with_text(Dimension::Brand, "Say \"hi\""),
        ]
    }

    #[test]
    fn write_and_reload_csv_and_json() {
        let dir = tempdir().unwrap();
        let csvp = dir.path().join("x.csv");
        let jsonp = dir.path().join("x.json");
        let recs = sample();
        save_records(&recs, &csvp).unwrap();
        save_records(&recs, &jsonp).unwrap();
        assert_eq!(load_records(&jsonp).unwrap(), recs);
        assert_eq!(load_records(&csvp).unwrap(), recs);
    }

    #[test]
    fn csv_quotes_everything_and_leaves_absent_fields_empty() {
        let text = to_csv_string(&sample()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            r#""year","country","brand","marketValueUsd""#
        );
        assert_eq!(lines.next().unwrap(), r#""2024","USA","","1500""#);
        assert_eq!(
            lines.next().unwrap(),
            "\"2025\",\"\",\"Say \"\"hi\"\"\",\"\""
        );
    }

    #[test]
    fn bad_csv_rows_are_skipped() {
        let data = "year,country,revenue\n2024,USA,10\n2025,Canada,lots\n2025,Mexico,\n";
        let recs = read_csv(data.as_bytes()).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[1].country.as_deref(), Some("Mexico"));
        assert_eq!(recs[1].revenue, None);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(
            load_records("data.xlsx"),
            Err(EngineError::UnsupportedFormat(_))
        ));
    }
}
