//! Mass–radius curves: one stellar model per central density.

use crate::eos::EosInterpolant;
use crate::error::StructureError;
use crate::structure::{solve_star, IntegrationSettings, StarModel};
use crate::units::UnitSystem;
use log::warn;

/// Summary of one solved star in physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassRadiusPoint {
    /// km
    pub radius: f64,
    /// Solar masses
    pub mass: f64,
    /// g/cm³
    pub central_density: f64,
}

/// Outcome for one requested central density.
#[derive(Debug)]
pub struct CurveEntry {
    /// g/cm³
    pub central_density: f64,
    pub outcome: Result<MassRadiusPoint, StructureError>,
}

/// Entries in the order the central densities were requested.
#[derive(Debug, Default)]
pub struct MassRadiusCurve {
    pub entries: Vec<CurveEntry>,
}

impl MassRadiusCurve {
    pub fn points(&self) -> impl Iterator<Item = &MassRadiusPoint> + '_ {
        self.entries.iter().filter_map(|entry| entry.outcome.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (f64, &StructureError)> + '_ {
        self.entries
            .iter()
            .filter_map(|entry| entry.outcome.as_ref().err().map(|err| (entry.central_density, err)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// The most massive solved configuration.
    pub fn maximum_mass(&self) -> Option<MassRadiusPoint> {
        self.points()
            .copied()
            .max_by(|a, b| a.mass.total_cmp(&b.mass))
    }
}

/// Solves every central density (g/cm³) and collects the results in order.
pub fn build_curve(
    eos: &EosInterpolant,
    central_densities: &[f64],
    settings: &IntegrationSettings,
    units: &UnitSystem,
) -> MassRadiusCurve {
    build_curve_with(eos, central_densities, settings, units, |_| {})
}

/// Like [`build_curve`], handing each solved model to `sink` before it is
/// reduced to its mass–radius point.
///
/// A failed star is recorded and logged; the remaining densities are still
/// solved.
pub fn build_curve_with<F>(
    eos: &EosInterpolant,
    central_densities: &[f64],
    settings: &IntegrationSettings,
    units: &UnitSystem,
    mut sink: F,
) -> MassRadiusCurve
where
    F: FnMut(&StarModel),
{
    let mut entries = Vec::with_capacity(central_densities.len());
    for &central_density in central_densities {
        let rho_c = units.density_to_dimensionless(central_density);
        let outcome = solve_star(eos, rho_c, settings, units).map(|model| {
            sink(&model);
            MassRadiusPoint {
                radius: model.radius_km(units),
                mass: model.mass_solar(units),
                central_density: units.density_to_physical(rho_c),
            }
        });
        if let Err(err) = &outcome {
            warn!("star at rho_c = {central_density:e} g/cm^3 failed: {err}");
        }
        entries.push(CurveEntry {
            central_density,
            outcome,
        });
    }
    MassRadiusCurve { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eos::EosTable;

    fn setup() -> (UnitSystem, EosTable, EosInterpolant, IntegrationSettings) {
        let units = UnitSystem::cgs();
        let table = EosTable::polytrope(5e-24, 2.5, 8.0, 16.0, 161).unwrap();
        let eos = EosInterpolant::new(&table, &units).unwrap();
        let settings = IntegrationSettings {
            surface_density: 2.0 * table.min_density(),
            ..IntegrationSettings::default()
        };
        (units, table, eos, settings)
    }

    #[test]
    fn curve_preserves_input_order() {
        let (units, _, eos, settings) = setup();
        let densities = [1e15, 3e14, 6e14];
        let curve = build_curve(&eos, &densities, &settings, &units);
        assert_eq!(curve.len(), 3);
        assert_eq!(curve.failure_count(), 0);
        for (entry, &rho) in curve.entries.iter().zip(&densities) {
            assert_eq!(entry.central_density, rho);
            let point = entry.outcome.as_ref().unwrap();
            assert!((point.central_density - rho).abs() / rho < 1e-12);
        }
    }

    #[test]
    fn failed_density_does_not_stop_the_curve() {
        let (units, table, eos, settings) = setup();
        let densities = [3e14, 0.5 * table.min_density(), 1e15];
        let curve = build_curve(&eos, &densities, &settings, &units);
        assert_eq!(curve.len(), 3);
        assert_eq!(curve.points().count(), 2);

        let failures: Vec<_> = curve.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, densities[1]);
        assert!(failures[0].1.is_domain_violation());
        assert!(curve.entries[2].outcome.is_ok());
    }

    #[test]
    fn sink_sees_every_solved_model() {
        let (units, _, eos, settings) = setup();
        let densities = [2e14, 4e14];
        let mut seen = Vec::new();
        let curve = build_curve_with(&eos, &densities, &settings, &units, |model| {
            seen.push((model.central_density, model.trace.len()));
        });
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|&(_, rows)| rows > 2));
        assert_eq!(curve.points().count(), 2);
    }

    #[test]
    fn maximum_mass_picks_heaviest_point() {
        let (units, _, eos, settings) = setup();
        let curve = build_curve(&eos, &[2e14, 1e15, 5e14], &settings, &units);
        let heaviest = curve.maximum_mass().unwrap();
        assert_eq!(heaviest.central_density, curve.entries[1].outcome.as_ref().unwrap().central_density);
        assert!(MassRadiusCurve::default().maximum_mass().is_none());
    }
}
