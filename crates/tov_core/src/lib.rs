//! The `tov_core` crate computes the structure of non-rotating neutron stars by
//! integrating the Tolman–Oppenheimer–Volkoff equations over a tabulated
//! equation of state.
//!
//! Key components:
//! - **Traits**: `Scalar` (numeric type abstraction), `DynamicalSystem` (ODE right-hand sides),
//!   `Steppable` (integrators), `StepControl` (adaptive step sizes).
//! - **Solvers**: RK4 and the relative-rate step control.
//! - **Units / EOS**: the dimensionless unit system and the log–log EOS interpolant.
//! - **Structure / Curve**: single-star integration and mass–radius curves.
//! - **IO / Batch**: table parsing, profile and summary files, and the directory driver.

pub mod batch;
pub mod curve;
pub mod eos;
pub mod error;
pub mod io;
pub mod solvers;
pub mod structure;
pub mod traits;
pub mod units;

pub use curve::{build_curve, build_curve_with, MassRadiusCurve, MassRadiusPoint};
pub use eos::{EosInterpolant, EosTable, EquationOfState, IncompressibleEos};
pub use error::{EosError, StructureError};
pub use structure::{solve_from_pressure, solve_star, IntegrationSettings, StarModel, Termination};
pub use units::UnitSystem;
