//! Record output for the command line.

use std::io::Write;

use serde::Serialize;

use crate::freestyle::Record;

/// Output format for multi-record dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// One comma-separated line per record.
    Csv,
    /// A JSON document with all records.
    Json,
}

#[derive(Serialize)]
struct RecordDump<'a> {
    command: &'a str,
    count: usize,
    records: &'a [Record],
}

/// Write records to `out` in the requested format. Returns the number written.
pub fn write_records<W: Write>(
    out: &mut W,
    command: &str,
    records: impl IntoIterator<Item = Record>,
    format: ExportFormat,
) -> anyhow::Result<usize> {
    match format {
        ExportFormat::Csv => {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_writer(&mut *out);
            let mut count = 0;
            for record in records {
                writer.write_record(&record)?;
                count += 1;
            }
            writer.flush()?;
            Ok(count)
        }
        ExportFormat::Json => {
            let records: Vec<Record> = records.into_iter().collect();
            let dump = RecordDump {
                command,
                count: records.len(),
                records: &records,
            };
            serde_json::to_writer_pretty(&mut *out, &dump)?;
            writeln!(out)?;
            Ok(records.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Record> {
        vec![
            vec!["10".to_string(), "25".to_string()],
            vec!["11".to_string(), "26".to_string()],
        ]
    }

    #[test]
    fn test_csv_output() {
        let mut out = Vec::new();
        let count = write_records(&mut out, "$result?", sample(), ExportFormat::Csv).unwrap();
        assert_eq!(count, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "10,25\n11,26\n");
    }

    #[test]
    fn test_json_output() {
        let mut out = Vec::new();
        let count = write_records(&mut out, "$result?", sample(), ExportFormat::Json).unwrap();
        assert_eq!(count, 2);

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["command"], "$result?");
        assert_eq!(value["count"], 2);
        assert_eq!(value["records"][1][0], "11");
    }

    #[test]
    fn test_csv_quotes_fields_with_commas() {
        let records = vec![vec!["1".to_string(), "Doe, Jane".to_string(), "say \"hi\"".to_string()]];
        let mut out = Vec::new();
        write_records(&mut out, "$x", records.clone(), ExportFormat::Csv).unwrap();
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "1,\"Doe, Jane\",\"say \"\"hi\"\"\"\n");

        let line = String::from_utf8(out).unwrap();
        let parsed = crate::freestyle::parse_record(line.trim_end()).unwrap();
        assert_eq!(parsed, records[0]);
    }

    #[test]
    fn test_empty_csv() {
        let mut out = Vec::new();
        assert_eq!(write_records(&mut out, "$x", Vec::new(), ExportFormat::Csv).unwrap(), 0);
        assert!(out.is_empty());
    }
}
