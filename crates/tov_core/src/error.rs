use thiserror::Error;

/// Errors raised while building or querying an equation of state.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EosError {
    /// The table has fewer than two usable rows.
    #[error("EOS table needs at least two rows, got {0}")]
    TooFewRows(usize),
    /// Density and pressure columns differ in length.
    #[error("EOS columns differ in length ({density} densities, {pressure} pressures)")]
    LengthMismatch { density: usize, pressure: usize },
    /// A tabulated value is zero, negative, NaN or infinite.
    #[error("EOS {column} at row {row} must be positive and finite, got {value}")]
    NonPositive {
        column: &'static str,
        row: usize,
        value: f64,
    },
    /// A column is not strictly increasing once rows are sorted by density.
    #[error("EOS {column} column is not strictly increasing at row {row}")]
    NotMonotonic { column: &'static str, row: usize },
    /// An interpolation query fell outside the tabulated range.
    #[error("{quantity} {value:e} lies outside the tabulated range [{min:e}, {max:e}]")]
    OutOfDomain {
        quantity: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// A table line could not be parsed.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Could not read EOS table")]
    Io(#[from] std::io::Error),
}

/// Errors that abort the integration of a single star.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StructureError {
    #[error("invalid integration settings: {0}")]
    InvalidSettings(&'static str),
    /// The EOS was queried outside its table during the integration.
    #[error("EOS domain violation at r = {radius:e}")]
    Domain {
        radius: f64,
        #[source]
        source: EosError,
    },
    /// The step size collapsed while the pressure was still significant.
    #[error(
        "step size collapsed to {step:e} at r = {radius:e} before reaching the surface (p/p_c = {pressure_ratio:e})"
    )]
    NonConvergence {
        step: f64,
        radius: f64,
        pressure_ratio: f64,
    },
    /// The integrator produced NaN or infinity.
    #[error("non-finite state at r = {radius:e} after {steps} steps")]
    NonFinite { radius: f64, steps: usize },
    #[error("step limit of {0} reached before the surface")]
    StepLimit(usize),
}

impl StructureError {
    pub(crate) fn domain(radius: f64, source: EosError) -> Self {
        StructureError::Domain { radius, source }
    }

    /// True for failures caused by querying the EOS outside its table.
    pub fn is_domain_violation(&self) -> bool {
        matches!(self, StructureError::Domain { .. })
    }
}
