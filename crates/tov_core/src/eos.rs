//! Equations of state.
//!
//! A tabulated EOS is interpolated linearly in log10–log10 space, which keeps
//! the interpolation well conditioned across the many decades spanned by
//! neutron-star matter. The table itself is physical (g/cm³ for both columns,
//! the pressure being a mass-density equivalent); the interpolant works in the
//! dimensionless units of [`UnitSystem`].

use crate::error::EosError;
use crate::units::UnitSystem;
use std::f64::consts::PI;

/// Queries this many ulps (relative to the table's log magnitude) past either
/// end are clamped onto the table instead of rejected.
const LOG_SLACK: f64 = 8.0 * f64::EPSILON;

/// The relation the structure equations need: energy density as a function
/// of pressure, both dimensionless.
pub trait EquationOfState {
    fn density_of(&self, pressure: f64) -> Result<f64, EosError>;
}

/// Paired density/pressure columns, sorted by density.
#[derive(Debug, Clone)]
pub struct EosTable {
    density: Vec<f64>,
    pressure: Vec<f64>,
}

impl EosTable {
    /// Builds a table from columns paired by index. Rows are sorted by
    /// density; both columns must then be strictly increasing.
    pub fn new(density: Vec<f64>, pressure: Vec<f64>) -> Result<Self, EosError> {
        if density.len() != pressure.len() {
            return Err(EosError::LengthMismatch {
                density: density.len(),
                pressure: pressure.len(),
            });
        }
        if density.len() < 2 {
            return Err(EosError::TooFewRows(density.len()));
        }
        check_positive("density", &density)?;
        check_positive("pressure", &pressure)?;

        let mut rows: Vec<(f64, f64)> = density.into_iter().zip(pressure).collect();
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (density, pressure): (Vec<f64>, Vec<f64>) = rows.into_iter().unzip();

        check_increasing("density", &density)?;
        check_increasing("pressure", &pressure)?;

        Ok(Self { density, pressure })
    }

    /// Samples P = K ρ^Γ (both in g/cm³) at `rows` log-spaced densities
    /// between 10^`log_min` and 10^`log_max`.
    pub fn polytrope(
        coefficient: f64,
        gamma: f64,
        log_min: f64,
        log_max: f64,
        rows: usize,
    ) -> Result<Self, EosError> {
        if rows < 2 {
            return Err(EosError::TooFewRows(rows));
        }
        let density: Vec<f64> = (0..rows)
            .map(|i| 10f64.powf(log_min + (log_max - log_min) * i as f64 / (rows - 1) as f64))
            .collect();
        let pressure = density.iter().map(|rho| coefficient * rho.powf(gamma)).collect();
        Self::new(density, pressure)
    }

    pub fn len(&self) -> usize {
        self.density.len()
    }

    pub fn is_empty(&self) -> bool {
        self.density.is_empty()
    }

    pub fn density(&self) -> &[f64] {
        &self.density
    }

    pub fn pressure(&self) -> &[f64] {
        &self.pressure
    }

    pub fn min_density(&self) -> f64 {
        self.density[0]
    }

    pub fn max_density(&self) -> f64 {
        self.density[self.density.len() - 1]
    }
}

fn check_positive(column: &'static str, values: &[f64]) -> Result<(), EosError> {
    for (row, &value) in values.iter().enumerate() {
        if !(value > 0.0 && value.is_finite()) {
            return Err(EosError::NonPositive { column, row, value });
        }
    }
    Ok(())
}

fn check_increasing(column: &'static str, values: &[f64]) -> Result<(), EosError> {
    for row in 1..values.len() {
        if values[row] <= values[row - 1] {
            return Err(EosError::NotMonotonic { column, row });
        }
    }
    Ok(())
}

/// Log–log interpolant in both directions, P(ρ) and ρ(P), in dimensionless
/// units.
#[derive(Debug, Clone)]
pub struct EosInterpolant {
    log_density: Vec<f64>,
    log_pressure: Vec<f64>,
}

impl EosInterpolant {
    pub fn new(table: &EosTable, units: &UnitSystem) -> Result<Self, EosError> {
        if table.len() < 2 {
            return Err(EosError::TooFewRows(table.len()));
        }
        let log_density: Vec<f64> = table
            .density()
            .iter()
            .map(|&rho| units.density_to_dimensionless(rho).log10())
            .collect();
        let log_pressure: Vec<f64> = table
            .pressure()
            .iter()
            .map(|&p| units.tabulated_pressure_to_dimensionless(p).log10())
            .collect();

        // Distinct neighbours can still round onto the same logarithm.
        check_increasing("density", &log_density)?;
        check_increasing("pressure", &log_pressure)?;

        Ok(Self {
            log_density,
            log_pressure,
        })
    }

    /// Dimensionless pressure for a dimensionless density.
    pub fn pressure_of(&self, density: f64) -> Result<f64, EosError> {
        interpolate(&self.log_density, &self.log_pressure, density, "density")
    }

    /// Dimensionless density for a dimensionless pressure.
    pub fn density_of(&self, pressure: f64) -> Result<f64, EosError> {
        interpolate(&self.log_pressure, &self.log_density, pressure, "pressure")
    }

    /// Tabulated (min, max) dimensionless density.
    pub fn density_range(&self) -> (f64, f64) {
        range(&self.log_density)
    }

    /// Tabulated (min, max) dimensionless pressure.
    pub fn pressure_range(&self) -> (f64, f64) {
        range(&self.log_pressure)
    }
}

impl EquationOfState for EosInterpolant {
    fn density_of(&self, pressure: f64) -> Result<f64, EosError> {
        EosInterpolant::density_of(self, pressure)
    }
}

fn range(logs: &[f64]) -> (f64, f64) {
    (10f64.powf(logs[0]), 10f64.powf(logs[logs.len() - 1]))
}

fn interpolate(
    xs: &[f64],
    ys: &[f64],
    value: f64,
    quantity: &'static str,
) -> Result<f64, EosError> {
    let n = xs.len();
    let lo = xs[0];
    let hi = xs[n - 1];
    let out_of_domain = || {
        let (min, max) = range(xs);
        EosError::OutOfDomain {
            quantity,
            value,
            min,
            max,
        }
    };

    if !(value > 0.0 && value.is_finite()) {
        return Err(out_of_domain());
    }
    let x = value.log10();
    let slack = LOG_SLACK * lo.abs().max(hi.abs()).max(1.0);
    if x < lo - slack || x > hi + slack {
        return Err(out_of_domain());
    }
    let x = x.clamp(lo, hi);

    let upper = xs.partition_point(|&v| v <= x).clamp(1, n - 1);
    let i = upper - 1;
    let t = (x - xs[i]) / (xs[i + 1] - xs[i]);
    Ok(10f64.powf(ys[i] + t * (ys[i + 1] - ys[i])))
}

/// Constant-density ("incompressible") matter. Its TOV solution is known in
/// closed form, which makes it the reference for validating the solver.
#[derive(Debug, Clone, Copy)]
pub struct IncompressibleEos {
    /// Dimensionless density.
    pub density: f64,
}

impl IncompressibleEos {
    pub fn new(density: f64) -> Self {
        Self { density }
    }

    /// Schwarzschild interior solution: (radius, mass) of the star with the
    /// given central pressure, dimensionless.
    pub fn analytic_surface(&self, central_pressure: f64) -> Option<(f64, f64)> {
        if !(central_pressure > 0.0 && central_pressure.is_finite()) || self.density <= 0.0 {
            return None;
        }
        let rho = self.density;
        // x = √(1 − 2M/R)
        let x = (rho + central_pressure) / (3.0 * central_pressure + rho);
        let radius = (3.0 * (1.0 - x * x) / (8.0 * PI * rho)).sqrt();
        let mass = 4.0 * PI / 3.0 * rho * radius.powi(3);
        Some((radius, mass))
    }
}

impl EquationOfState for IncompressibleEos {
    fn density_of(&self, pressure: f64) -> Result<f64, EosError> {
        if pressure >= 0.0 && pressure.is_finite() {
            Ok(self.density)
        } else {
            Err(EosError::OutOfDomain {
                quantity: "pressure",
                value: pressure,
                min: 0.0,
                max: f64::INFINITY,
            })
        }
    }
}
