//! CSV rendering of report rows, optionally gzip-compressed.

use std::io::Write;

use anyhow::Context;
use flate2::write::GzEncoder;
use flate2::Compression;

use super::records::{ReportRecord, COLUMNS};

/// Header line plus one line per record, `\n` terminated.
pub fn to_csv(records: &[ReportRecord]) -> String {
    let mut out = COLUMNS.join(",");
    out.push('\n');
    for record in records {
        let row: Vec<String> = record.to_row().iter().map(|v| csv_escape(v)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Write the CSV gzip-compressed to `w`.
pub fn write_csv_gz<W: Write>(w: W, records: &[ReportRecord]) -> anyhow::Result<()> {
    let mut gz = GzEncoder::new(w, Compression::default());
    gz.write_all(to_csv(records).as_bytes())
        .context("write csv")?;
    gz.finish().context("finish gzip")?;
    Ok(())
}

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metric, PageSamples};
    use crate::report::records::RecordBuilder;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn records() -> Vec<ReportRecord> {
        let ts = chrono::DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let page = PageSamples::new("https://a.test/?q=1,2", "https://a.test/?q=1,2@open")
            .with_series(Metric::Total, vec![1000.0]);
        vec![RecordBuilder::new(ts, "reports").iteration(&page, 0)]
    }

    #[test]
    fn header_matches_columns_and_fields_are_escaped() {
        let csv = to_csv(&records());
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,name,identifier,type,loop,load_time,dom,tti,fcp,lcp,cls,tbt,fvc,lvc,file"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("\"https://a.test/?q=1,2\""), "{row}");
        assert!(row.contains(",page,1,1000,0,0,"), "{row}");
        assert!(lines.next().is_none());
    }

    #[test]
    fn gzip_round_trips_to_plain_csv() {
        let mut buf = Vec::new();
        write_csv_gz(&mut buf, &records()).unwrap();
        let mut plain = String::new();
        GzDecoder::new(buf.as_slice())
            .read_to_string(&mut plain)
            .unwrap();
        assert_eq!(plain, to_csv(&records()));
    }

    #[test]
    fn escape_quotes() {
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("plain"), "plain");
    }
}
