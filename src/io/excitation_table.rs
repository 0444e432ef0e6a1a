//! Tabulated ground acceleration files
//!
//! ```text
//! unit: g
//! 3
//! 0.0, 0.0
//! 0.01, 0.12
//! 0.02, -0.05
//! ```
//!
//! The first line names the acceleration unit (`g` or `m/s2`), the second the
//! number of rows, then one `time, acceleration` pair per line.

use std::io::{BufRead, Write};

use crate::error::{DynaError, DynaResult};
use crate::loads::GeneralExcitation;

/// Unit of the acceleration column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelerationUnit {
    /// Multiples of gravity
    G,
    /// m/s²
    MetersPerSecondSquared,
}

impl AccelerationUnit {
    fn header(&self) -> &'static str {
        match self {
            Self::G => "unit: g",
            Self::MetersPerSecondSquared => "unit: m/s2",
        }
    }

    fn from_header(line: &str, line_no: usize) -> DynaResult<Self> {
        let unit = line
            .trim()
            .strip_prefix("unit:")
            .ok_or_else(|| parse_error(line_no, "first line must be 'unit: g' or 'unit: m/s2'"))?;
        match unit.trim() {
            "g" => Ok(Self::G),
            "m/s2" | "m/s²" => Ok(Self::MetersPerSecondSquared),
            other => Err(parse_error(
                line_no,
                format!("unknown acceleration unit '{}'", other),
            )),
        }
    }

    /// Factor converting this unit to m/s²
    pub fn scale(&self, gravity: f64) -> f64 {
        match self {
            Self::G => gravity,
            Self::MetersPerSecondSquared => 1.0,
        }
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> DynaError {
    DynaError::Parse {
        line,
        message: message.into(),
    }
}

/// Next non-blank line, trimmed, advancing `line_no` past everything consumed
fn next_line<R: BufRead>(reader: &mut R, line_no: &mut usize) -> DynaResult<Option<String>> {
    let mut buffer = String::new();
    loop {
        buffer.clear();
        if reader.read_line(&mut buffer)? == 0 {
            return Ok(None);
        }
        *line_no += 1;
        if !buffer.trim().is_empty() {
            return Ok(Some(buffer.trim().to_string()));
        }
    }
}

/// Read a table, converting accelerations to m/s² with `gravity`
pub fn read<R: BufRead>(mut reader: R, gravity: f64) -> DynaResult<GeneralExcitation> {
    let mut consumed = 0;

    let unit_text = next_line(&mut reader, &mut consumed)?
        .ok_or_else(|| parse_error(1, "empty excitation file"))?;
    let unit = AccelerationUnit::from_header(&unit_text, consumed)?;
    let scale = unit.scale(gravity);

    let rows_text = next_line(&mut reader, &mut consumed)?
        .ok_or_else(|| parse_error(consumed + 1, "missing row count"))?;
    let rows_line = consumed;
    let rows = rows_text
        .parse::<usize>()
        .map_err(|_| parse_error(rows_line, "row count must be an integer"))?;

    let mut table = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut time = Vec::with_capacity(rows);
    let mut acceleration = Vec::with_capacity(rows);
    for record in table.records().take(rows) {
        let record = record.map_err(|e| {
            let line = e.position().map_or(rows_line, |p| rows_line + p.line() as usize);
            parse_error(line, e.to_string())
        })?;
        let line_no = record
            .position()
            .map_or(rows_line, |p| rows_line + p.line() as usize);
        let (t, a): (f64, f64) = record
            .deserialize(None)
            .map_err(|_| parse_error(line_no, "rows must be 'time, acceleration'"))?;
        time.push(t);
        acceleration.push(a * scale);
    }
    if time.len() != rows {
        return Err(parse_error(rows_line, format!("expected {} rows", rows)));
    }

    let excitation = GeneralExcitation::new(time, acceleration);
    excitation.validate()?;
    Ok(excitation)
}

/// Write a table, converting accelerations from m/s² to `unit`
pub fn write<W: Write>(
    mut writer: W,
    excitation: &GeneralExcitation,
    unit: AccelerationUnit,
    gravity: f64,
) -> DynaResult<()> {
    let scale = unit.scale(gravity);
    writeln!(writer, "{}", unit.header())?;
    writeln!(writer, "{}", excitation.time.len())?;

    let mut table = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(&mut writer);
    for (t, a) in excitation.time.iter().zip(&excitation.acceleration) {
        table.serialize((t, a / scale))?;
    }
    table.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reads_g_table() {
        let text = "unit: g\n3\n0.0, 0.0\n0.5, 0.1\n1.0, -0.2\n";
        let excitation = read(text.as_bytes(), 9.807).unwrap();
        assert_eq!(excitation.time, vec![0.0, 0.5, 1.0]);
        assert_relative_eq!(excitation.acceleration[1], 0.9807, epsilon = 1e-12);
        assert_relative_eq!(excitation.analysis_duration, 1.0);
    }

    #[test]
    fn test_reads_si_table() {
        let text = "unit: m/s2\n2\n0, 1.5\n0.1, 2.5\n";
        let excitation = read(text.as_bytes(), 9.807).unwrap();
        assert_eq!(excitation.acceleration, vec![1.5, 2.5]);
    }

    #[test]
    fn test_short_table_is_an_error() {
        let text = "unit: g\n3\n0.0, 0.0\n0.5, 0.1\n";
        assert!(matches!(
            read(text.as_bytes(), 9.807),
            Err(DynaError::Parse { .. })
        ));
    }

    #[test]
    fn test_bad_row_reports_its_line() {
        let text = "unit: g\n2\n0.0, 0.0\n0.5, fast\n";
        assert!(matches!(
            read(text.as_bytes(), 9.807),
            Err(DynaError::Parse { line: 4, .. })
        ));

        let text = "unit: g\n2\n0.0, 0.0\n0.5\n";
        assert!(matches!(
            read(text.as_bytes(), 9.807),
            Err(DynaError::Parse { line: 4, .. })
        ));
    }

    #[test]
    fn test_unknown_unit() {
        let text = "unit: ft/s2\n1\n0.0, 0.0\n";
        assert!(matches!(
            read(text.as_bytes(), 9.807),
            Err(DynaError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_write_then_read() {
        let excitation = GeneralExcitation::new(vec![0.0, 0.25, 0.5], vec![0.0, 4.9035, -9.807]);
        let mut buffer = Vec::new();
        write(&mut buffer, &excitation, AccelerationUnit::G, 9.807).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("unit: g\n3\n"));

        let back = read(text.as_bytes(), 9.807).unwrap();
        assert_eq!(back.time, excitation.time);
        for (a, b) in back.acceleration.iter().zip(&excitation.acceleration) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }
}
