//! Plain-text EOS tables, stellar profiles and mass–radius summaries.
//!
//! EOS tables are whitespace-delimited with at least three columns; the second
//! column is the pressure and the third the energy density. Profiles and
//! summaries are written tab-separated, one row per line.

use crate::curve::MassRadiusCurve;
use crate::eos::EosTable;
use crate::error::EosError;
use crate::structure::TracePoint;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

const PRESSURE_COLUMN: usize = 1;
const DENSITY_COLUMN: usize = 2;

/// Parses an EOS table. Blank lines and lines starting with `#` are skipped.
pub fn read_eos_table<R: BufRead>(reader: R) -> Result<EosTable, EosError> {
    let mut density = Vec::new();
    let mut pressure = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let columns: Vec<&str> = trimmed.split_whitespace().collect();
        if columns.len() <= DENSITY_COLUMN {
            return Err(EosError::Parse {
                line: idx + 1,
                message: format!("expected at least 3 columns, found {}", columns.len()),
            });
        }
        pressure.push(parse_value(columns[PRESSURE_COLUMN], "pressure", idx + 1)?);
        density.push(parse_value(columns[DENSITY_COLUMN], "density", idx + 1)?);
    }

    EosTable::new(density, pressure)
}

fn parse_value(token: &str, column: &str, line: usize) -> Result<f64, EosError> {
    token.parse::<f64>().map_err(|_| EosError::Parse {
        line,
        message: format!("invalid {column} `{token}`"),
    })
}

pub fn load_eos_table<P: AsRef<Path>>(path: P) -> Result<EosTable, EosError> {
    let file = File::open(path.as_ref())?;
    read_eos_table(BufReader::new(file))
}

/// Writes mass, pressure, density, potential and radius per row.
pub fn write_profile<W: Write>(mut writer: W, trace: &[TracePoint]) -> io::Result<()> {
    for row in trace {
        writeln!(
            writer,
            "{:e}\t{:e}\t{:e}\t{:e}\t{:e}",
            row.mass, row.pressure, row.density, row.potential, row.radius
        )?;
    }
    writer.flush()
}

/// Writes radius (km), mass (M☉) and central density (g/cm³) per requested
/// density. Failed stars keep their row with NaN radius and mass.
pub fn write_summary<W: Write>(mut writer: W, curve: &MassRadiusCurve) -> io::Result<()> {
    for entry in &curve.entries {
        match &entry.outcome {
            Ok(point) => writeln!(
                writer,
                "{:e}\t{:e}\t{:e}",
                point.radius, point.mass, point.central_density
            )?,
            Err(_) => writeln!(
                writer,
                "{:e}\t{:e}\t{:e}",
                f64::NAN,
                f64::NAN,
                entry.central_density
            )?,
        }
    }
    writer.flush()
}
