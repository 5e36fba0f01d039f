//! CSV summary: one row per file

use crate::analyzer::FileReport;
use std::io::{self, Write};

const HEADER: &str = "file_path,file_name,status,encoding,channels,sample_rate,bits_per_sample,chunks,positive,ratio,error";

pub fn write<W: Write>(writer: &mut W, reports: &[FileReport]) -> io::Result<()> {
    writeln!(writer, "{}", HEADER)?;

    for r in reports {
        let (encoding, channels, rate, bits) = match &r.header {
            Some(h) => (
                h.encoding.to_string(),
                h.channels.to_string(),
                h.sample_rate.to_string(),
                h.bits_per_sample.to_string(),
            ),
            None => Default::default(),
        };

        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{:.4},{}",
            escape(&r.file_path),
            escape(&r.file_name),
            r.status,
            escape(&encoding),
            channels,
            rate,
            bits,
            r.tally.processed,
            r.tally.positive,
            r.ratio,
            escape(r.error.as_deref().unwrap_or("")),
        )?;
    }

    Ok(())
}

/// Quote a field when it holds a comma, quote or newline
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::FileStatus;
    use crate::report::test_report;

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain.wav"), "plain.wav");
        assert_eq!(escape("a,b.wav"), "\"a,b.wav\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_rows() {
        let mut skipped = test_report(FileStatus::Skipped, 0, 0);
        skipped.error = Some("missing data chunk, x".to_string());
        let reports = vec![test_report(FileStatus::Completed, 8, 2), skipped];

        let mut out = Vec::new();
        write(&mut out, &reports).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "/sd/rec/a.wav,a.wav,completed,,,,,8,2,0.2500,");
        assert!(lines[2].starts_with("/sd/rec/a.wav,a.wav,skipped,"));
        assert!(lines[2].ends_with(",\"missing data chunk, x\""));
    }
}
