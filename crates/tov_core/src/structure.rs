//! Hydrostatic structure of a static, spherically symmetric star.
//!
//! The TOV equations are integrated outward from the center with RK4 and an
//! adaptive step until the pressure vanishes, the density drops to the
//! surface cutoff, or the step size collapses.

use crate::eos::{EosInterpolant, EquationOfState};
use crate::error::{EosError, StructureError};
use crate::solvers::{RelativeRateControl, RK4};
use crate::traits::{DynamicalSystem, StepControl, Steppable};
use crate::units::UnitSystem;
use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// (enclosed mass, pressure, metric potential), dimensionless.
pub type StellarState = [f64; 3];

pub const MASS: usize = 0;
pub const PRESSURE: usize = 1;
pub const POTENTIAL: usize = 2;

/// Steps at or below this size end the integration.
pub const STEP_FLOOR: f64 = 10.0 * f64::EPSILON;

/// Settings controlling the integration of a single star.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationSettings {
    /// Fixed size of the first step, taken from the center.
    pub initial_step: f64,
    pub initial_radius: f64,
    pub initial_mass: f64,
    /// Seed for ν; only differences of ν are meaningful.
    pub initial_potential: f64,
    /// δ in dr = δ / (m'/m − p'/p). Smaller is finer.
    pub step_control: f64,
    /// Relative density deviation below which the regular-center form of
    /// dp/dr is used.
    pub center_tolerance: f64,
    /// Surface density cutoff, g/cm³.
    pub surface_density: f64,
    /// A step collapse counts as reaching the surface only once p/p_c is at
    /// or below this ratio.
    pub surface_pressure_ratio: f64,
    pub max_steps: usize,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            initial_step: 1e-8,
            initial_radius: 0.0,
            initial_mass: 0.0,
            initial_potential: 0.0,
            step_control: 0.1,
            center_tolerance: 10.0 * f64::EPSILON,
            surface_density: 0.0,
            surface_pressure_ratio: 1e-10,
            max_steps: 1_000_000,
        }
    }
}

impl IntegrationSettings {
    pub fn validate(&self) -> Result<(), StructureError> {
        if !(self.initial_step > 0.0 && self.initial_step.is_finite()) {
            return Err(StructureError::InvalidSettings(
                "initial_step must be positive and finite",
            ));
        }
        if !(self.initial_radius >= 0.0 && self.initial_radius.is_finite()) {
            return Err(StructureError::InvalidSettings(
                "initial_radius must be non-negative and finite",
            ));
        }
        if !(self.initial_mass >= 0.0 && self.initial_mass.is_finite()) {
            return Err(StructureError::InvalidSettings(
                "initial_mass must be non-negative and finite",
            ));
        }
        if !self.initial_potential.is_finite() {
            return Err(StructureError::InvalidSettings(
                "initial_potential must be finite",
            ));
        }
        if !(self.step_control > 0.0 && self.step_control.is_finite()) {
            return Err(StructureError::InvalidSettings(
                "step_control must be positive and finite",
            ));
        }
        if !(self.center_tolerance >= 0.0 && self.center_tolerance.is_finite()) {
            return Err(StructureError::InvalidSettings(
                "center_tolerance must be non-negative and finite",
            ));
        }
        if !(self.surface_density >= 0.0 && self.surface_density.is_finite()) {
            return Err(StructureError::InvalidSettings(
                "surface_density must be non-negative and finite",
            ));
        }
        if !(self.surface_pressure_ratio >= 0.0) {
            return Err(StructureError::InvalidSettings(
                "surface_pressure_ratio must be non-negative",
            ));
        }
        if self.max_steps == 0 {
            return Err(StructureError::InvalidSettings(
                "max_steps must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Right-hand side of the TOV equations for one integration.
///
/// Holds the EOS and the density at the initial central pressure, which the
/// regular-center form of dp/dr is expanded around.
pub struct TovSystem<'a, E: EquationOfState + ?Sized> {
    eos: &'a E,
    central_density: f64,
    center_tolerance: f64,
}

impl<'a, E: EquationOfState + ?Sized> TovSystem<'a, E> {
    pub fn new(eos: &'a E, central_pressure: f64, center_tolerance: f64) -> Result<Self, EosError> {
        let central_density = eos.density_of(central_pressure)?;
        Ok(Self {
            eos,
            central_density,
            center_tolerance,
        })
    }

    pub fn central_density(&self) -> f64 {
        self.central_density
    }

    /// Whether dp/dr at this density uses the regular-center form.
    pub fn is_central(&self, density: f64) -> bool {
        1.0 - density / self.central_density < self.center_tolerance
    }
}

impl<E: EquationOfState + ?Sized> DynamicalSystem<f64> for TovSystem<'_, E> {
    type Error = EosError;

    fn dimension(&self) -> usize {
        3
    }

    fn apply(&self, r: f64, x: &[f64], out: &mut [f64]) -> Result<(), EosError> {
        let m = x[MASS];
        let p = x[PRESSURE];
        let rho = self.eos.density_of(p)?;

        out[MASS] = 4.0 * PI * r * r * rho;

        let dp = if self.is_central(rho) {
            // Taylor expansion about r = 0; finite where the general form is 0/0.
            let rho_c = self.central_density;
            -4.0 * PI * ((p + rho_c) * (rho_c / 3.0 + p) / (1.0 - (8.0 * PI / 3.0) * r * r * rho_c))
                * r
        } else {
            -((4.0 * PI * r.powi(3) * p + m) * (p + rho)) / (r * (r - 2.0 * m))
        };
        out[PRESSURE] = dp;
        out[POTENTIAL] = -dp / (p + rho);
        Ok(())
    }
}

/// Why the integration stopped at the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    PressureVanished,
    DensityCutoff,
    StepCollapse,
}

/// One row of the integration trace, dimensionless.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracePoint {
    pub mass: f64,
    pub pressure: f64,
    pub density: f64,
    pub potential: f64,
    pub radius: f64,
}

impl TracePoint {
    fn new(radius: f64, state: &StellarState, density: f64) -> Self {
        Self {
            mass: state[MASS],
            pressure: state[PRESSURE],
            density,
            potential: state[POTENTIAL],
            radius,
        }
    }
}

/// A solved stellar model.
#[derive(Debug, Clone)]
pub struct StarModel {
    pub central_density: f64,
    pub central_pressure: f64,
    pub mass: f64,
    pub radius: f64,
    pub termination: Termination,
    pub steps: usize,
    /// Center to surface; the first row is the initial state.
    pub trace: Vec<TracePoint>,
}

impl StarModel {
    pub fn mass_solar(&self, units: &UnitSystem) -> f64 {
        units.mass_to_solar(self.mass)
    }

    pub fn radius_km(&self, units: &UnitSystem) -> f64 {
        units.radius_to_km(self.radius)
    }

    /// ν along the trace, shifted so that at the surface it equals the
    /// exterior Schwarzschild value ½ ln(1 − 2M/R).
    pub fn normalized_potential(&self) -> Vec<f64> {
        let Some(surface) = self.trace.last() else {
            return Vec::new();
        };
        let exterior = if self.radius > 0.0 {
            0.5 * (1.0 - 2.0 * self.mass / self.radius).ln()
        } else {
            0.0
        };
        let offset = exterior - surface.potential;
        self.trace.iter().map(|row| row.potential + offset).collect()
    }

    /// The trace with `potential` replaced by [`Self::normalized_potential`].
    pub fn normalized_trace(&self) -> Vec<TracePoint> {
        self.trace
            .iter()
            .zip(self.normalized_potential())
            .map(|(row, potential)| TracePoint { potential, ..*row })
            .collect()
    }
}

/// Solves the star with the given dimensionless central density.
pub fn solve_star(
    eos: &EosInterpolant,
    central_density: f64,
    settings: &IntegrationSettings,
    units: &UnitSystem,
) -> Result<StarModel, StructureError> {
    let central_pressure = eos
        .pressure_of(central_density)
        .map_err(|err| StructureError::domain(settings.initial_radius, err))?;
    solve_from_pressure(eos, central_pressure, settings, units)
}

/// Solves the star with the given dimensionless central pressure.
pub fn solve_from_pressure<E: EquationOfState + ?Sized>(
    eos: &E,
    central_pressure: f64,
    settings: &IntegrationSettings,
    units: &UnitSystem,
) -> Result<StarModel, StructureError> {
    settings.validate()?;

    let system = TovSystem::new(eos, central_pressure, settings.center_tolerance)
        .map_err(|err| StructureError::domain(settings.initial_radius, err))?;
    let central_density = system.central_density();
    let at_cutoff = |density: f64| units.density_to_physical(density) <= settings.surface_density;

    let mut r = settings.initial_radius;
    let mut state: StellarState = [
        settings.initial_mass,
        central_pressure,
        settings.initial_potential,
    ];
    let mut trace = vec![TracePoint::new(r, &state, central_density)];

    let finish = |state: &StellarState,
                  r: f64,
                  termination: Termination,
                  steps: usize,
                  trace: Vec<TracePoint>| {
        debug!(
            "star rho_c = {:e}: M = {:e}, R = {:e} after {} steps ({:?})",
            central_density, state[MASS], r, steps, termination
        );
        StarModel {
            central_density,
            central_pressure,
            mass: state[MASS],
            radius: r,
            termination,
            steps,
            trace,
        }
    };

    if central_pressure <= 0.0 {
        return Ok(finish(&state, r, Termination::PressureVanished, 0, trace));
    }
    if at_cutoff(central_density) {
        return Ok(finish(&state, r, Termination::DensityCutoff, 0, trace));
    }

    let mut stepper = RK4::new(system.dimension());
    let control = RelativeRateControl::new(settings.step_control);
    let mut derivative = [0.0; 3];
    let mut dr = settings.initial_step;
    let mut steps = 0usize;

    let termination = loop {
        stepper
            .step(&system, &mut r, &mut state, dr)
            .map_err(|err| StructureError::domain(r, err))?;
        steps += 1;
        if !r.is_finite() || state.iter().any(|v| !v.is_finite()) {
            return Err(StructureError::NonFinite { radius: r, steps });
        }

        let pressure = state[PRESSURE];
        if pressure <= 0.0 {
            trace.push(TracePoint::new(r, &state, 0.0));
            break Termination::PressureVanished;
        }
        let density = eos
            .density_of(pressure)
            .map_err(|err| StructureError::domain(r, err))?;
        trace.push(TracePoint::new(r, &state, density));
        if at_cutoff(density) {
            break Termination::DensityCutoff;
        }
        if steps >= settings.max_steps {
            return Err(StructureError::StepLimit(settings.max_steps));
        }

        system
            .apply(r, &state, &mut derivative)
            .map_err(|err| StructureError::domain(r, err))?;
        dr = control.next_step(&state, &derivative);
        if !dr.is_finite() {
            return Err(StructureError::NonFinite { radius: r, steps });
        }
        if dr <= STEP_FLOOR {
            let pressure_ratio = pressure / central_pressure;
            if pressure_ratio <= settings.surface_pressure_ratio {
                break Termination::StepCollapse;
            }
            return Err(StructureError::NonConvergence {
                step: dr,
                radius: r,
                pressure_ratio,
            });
        }
    };

    Ok(finish(&state, r, termination, steps, trace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eos::{EosTable, IncompressibleEos};
    use approx::assert_relative_eq;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T, StructureError>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    fn polytrope(units: &UnitSystem) -> (EosTable, EosInterpolant) {
        let table = EosTable::polytrope(5e-24, 2.5, 8.0, 16.0, 161).unwrap();
        let eos = EosInterpolant::new(&table, units).unwrap();
        (table, eos)
    }

    #[test]
    fn settings_validation_rejects_bad_values() {
        let base = IntegrationSettings::default();
        assert!(base.validate().is_ok());

        let cases = [
            (
                IntegrationSettings {
                    initial_step: 0.0,
                    ..base
                },
                "initial_step",
            ),
            (
                IntegrationSettings {
                    step_control: -0.1,
                    ..base
                },
                "step_control",
            ),
            (
                IntegrationSettings {
                    surface_density: f64::NAN,
                    ..base
                },
                "surface_density",
            ),
            (
                IntegrationSettings {
                    max_steps: 0,
                    ..base
                },
                "max_steps",
            ),
        ];
        for (settings, needle) in cases {
            let err = settings.validate().expect_err("expected invalid settings");
            assert!(format!("{err}").contains(needle));
        }
    }

    #[test]
    fn center_branch_vanishes_at_origin() {
        let eos = IncompressibleEos::new(1.0);
        let system = TovSystem::new(&eos, 0.1, 10.0 * f64::EPSILON).unwrap();
        let mut out = [1.0; 3];
        system.apply(0.0, &[0.0, 0.1, 0.0], &mut out).unwrap();
        assert_eq!(out, [0.0, -0.0, 0.0]);
    }

    #[test]
    fn center_branch_agrees_with_general_form_for_constant_density() {
        let rho = 0.8;
        let p = 0.05;
        let r: f64 = 0.1;
        let m = 4.0 * PI / 3.0 * rho * r.powi(3);
        let eos = IncompressibleEos::new(rho);

        let central = TovSystem::new(&eos, p, 10.0 * f64::EPSILON).unwrap();
        let mut center_out = [0.0; 3];
        central.apply(r, &[m, p, 0.0], &mut center_out).unwrap();

        // A negative tolerance forces the general branch.
        let general = TovSystem::new(&eos, p, -1.0).unwrap();
        let mut general_out = [0.0; 3];
        general.apply(r, &[m, p, 0.0], &mut general_out).unwrap();

        for i in 0..3 {
            assert_relative_eq!(center_out[i], general_out[i], max_relative = 1e-12);
        }
    }

    #[test]
    fn potential_gradient_balances_pressure_gradient() {
        let eos = IncompressibleEos::new(1.0);
        let system = TovSystem::new(&eos, 0.2, 10.0 * f64::EPSILON).unwrap();
        let mut out = [0.0; 3];
        system.apply(0.05, &[1e-4, 0.15, 0.0], &mut out).unwrap();
        assert!(out[PRESSURE] < 0.0);
        assert_relative_eq!(out[POTENTIAL], -out[PRESSURE] / 1.15, max_relative = 1e-14);
    }

    #[test]
    fn incompressible_star_matches_schwarzschild_interior() {
        let units = UnitSystem::cgs();
        let settings = IntegrationSettings::default();
        for (rho, pc) in [(1.0, 0.1), (0.5, 0.02)] {
            let eos = IncompressibleEos::new(rho);
            let model = solve_from_pressure(&eos, pc, &settings, &units).unwrap();
            let (radius, mass) = eos.analytic_surface(pc).unwrap();
            assert_eq!(model.termination, Termination::StepCollapse);
            assert_relative_eq!(model.radius, radius, max_relative = 1e-4);
            assert_relative_eq!(model.mass, mass, max_relative = 1e-4);
        }
    }

    #[test]
    fn step_collapse_above_surface_ratio_is_non_convergence() {
        let units = UnitSystem::cgs();
        let settings = IntegrationSettings {
            surface_pressure_ratio: 0.0,
            ..IntegrationSettings::default()
        };
        let eos = IncompressibleEos::new(1.0);
        assert_err_contains(
            solve_from_pressure(&eos, 0.1, &settings, &units),
            "step size collapsed",
        );
    }

    #[test]
    fn step_limit_aborts_integration() {
        let units = UnitSystem::cgs();
        let settings = IntegrationSettings {
            max_steps: 10,
            ..IntegrationSettings::default()
        };
        let eos = IncompressibleEos::new(1.0);
        assert_err_contains(
            solve_from_pressure(&eos, 0.1, &settings, &units),
            "step limit of 10",
        );
    }

    #[test]
    fn leaving_the_table_is_a_domain_violation() {
        let units = UnitSystem::cgs();
        let (_, eos) = polytrope(&units);
        // Without a cutoff the pressure decays past the bottom of the table.
        let settings = IntegrationSettings::default();
        let rho_c = units.density_to_dimensionless(1e15);
        let err = solve_star(&eos, rho_c, &settings, &units).expect_err("expected domain error");
        assert!(err.is_domain_violation(), "unexpected error: {err}");
    }

    #[test]
    fn central_density_at_cutoff_yields_empty_star() {
        let units = UnitSystem::cgs();
        let (table, eos) = polytrope(&units);
        let settings = IntegrationSettings {
            surface_density: 2.0 * table.min_density(),
            ..IntegrationSettings::default()
        };
        let rho_c = units.density_to_dimensionless(table.min_density() * (1.0 + 1e-9));
        let model = solve_star(&eos, rho_c, &settings, &units).unwrap();
        assert_eq!(model.termination, Termination::DensityCutoff);
        assert_eq!(model.steps, 0);
        assert_eq!(model.trace.len(), 1);
        assert_eq!(model.mass, 0.0);
        assert_eq!(model.radius, 0.0);
    }

    #[test]
    fn trace_runs_from_center_to_surface() {
        let units = UnitSystem::cgs();
        let (table, eos) = polytrope(&units);
        let settings = IntegrationSettings {
            surface_density: 2.0 * table.min_density(),
            ..IntegrationSettings::default()
        };
        let rho_c = units.density_to_dimensionless(1e15);
        let model = solve_star(&eos, rho_c, &settings, &units).unwrap();

        assert_eq!(model.termination, Termination::DensityCutoff);
        assert_eq!(model.trace.len(), model.steps + 1);
        let first = model.trace[0];
        assert_eq!(first.radius, 0.0);
        assert_eq!(first.mass, 0.0);
        assert_relative_eq!(first.density, rho_c, max_relative = 1e-12);

        for pair in model.trace.windows(2) {
            assert!(pair[1].radius > pair[0].radius);
            assert!(pair[1].mass >= pair[0].mass);
            assert!(pair[1].pressure <= pair[0].pressure);
        }
        let last = model.trace.last().unwrap();
        assert_eq!(last.mass, model.mass);
        assert_eq!(last.radius, model.radius);
        assert!(units.density_to_physical(last.density) <= settings.surface_density);
    }

    #[test]
    fn normalized_potential_matches_exterior_metric() {
        let units = UnitSystem::cgs();
        let eos = IncompressibleEos::new(1.0);
        let model = solve_from_pressure(&eos, 0.1, &IntegrationSettings::default(), &units).unwrap();
        let nu = model.normalized_potential();
        assert_eq!(nu.len(), model.trace.len());
        let exterior = 0.5 * (1.0 - 2.0 * model.mass / model.radius).ln();
        assert_relative_eq!(*nu.last().unwrap(), exterior, max_relative = 1e-12);
        // The potential deepens toward the center.
        assert!(nu[0] < *nu.last().unwrap());

        let trace = model.normalized_trace();
        assert_eq!(trace.len(), model.trace.len());
        for ((row, raw), potential) in trace.iter().zip(&model.trace).zip(&nu) {
            assert_eq!(row.potential, *potential);
            assert_eq!(row.radius, raw.radius);
            assert_eq!(row.pressure, raw.pressure);
        }
    }
}
