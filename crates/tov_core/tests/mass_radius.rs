use approx::assert_relative_eq;
use tov_core::{
    build_curve, solve_from_pressure, solve_star, EosInterpolant, EosTable, IncompressibleEos,
    IntegrationSettings, Termination, UnitSystem,
};

/// Γ = 5/2 polytrope, P = 5e-24 ρ^2.5 (g/cm³), tabulated over 1e8–1e16 g/cm³.
fn reference_eos(units: &UnitSystem) -> (EosTable, EosInterpolant) {
    let table = EosTable::polytrope(5e-24, 2.5, 8.0, 16.0, 161).unwrap();
    let eos = EosInterpolant::new(&table, units).unwrap();
    (table, eos)
}

fn reference_settings(table: &EosTable) -> IntegrationSettings {
    IntegrationSettings {
        surface_density: 2.0 * table.min_density(),
        ..IntegrationSettings::default()
    }
}

#[test]
fn incompressible_stars_match_closed_form() {
    let units = UnitSystem::cgs();
    let settings = IntegrationSettings::default();
    for (density, central_pressure) in [(1.0, 0.1), (0.5, 0.02), (2.0, 0.5)] {
        let eos = IncompressibleEos::new(density);
        let model = solve_from_pressure(&eos, central_pressure, &settings, &units).unwrap();
        let (radius, mass) = eos.analytic_surface(central_pressure).unwrap();
        assert_relative_eq!(model.radius, radius, max_relative = 1e-4);
        assert_relative_eq!(model.mass, mass, max_relative = 1e-4);
    }
}

#[test]
fn reference_star_regression() {
    let units = UnitSystem::cgs();
    let (table, eos) = reference_eos(&units);
    let settings = reference_settings(&table);
    let model = solve_star(
        &eos,
        units.density_to_dimensionless(1e15),
        &settings,
        &units,
    )
    .unwrap();

    assert_eq!(model.termination, Termination::DensityCutoff);
    let mass = model.mass_solar(&units);
    let radius = model.radius_km(&units);
    assert!((1.4..1.5).contains(&mass), "mass {mass}");
    assert!((10.0..13.0).contains(&radius), "radius {radius}");
    assert_relative_eq!(mass, 1.47464, max_relative = 1e-3);
    assert_relative_eq!(radius, 11.6520, max_relative = 1e-3);
}

#[test]
fn mass_grows_with_central_density_on_dilute_branch() {
    let units = UnitSystem::cgs();
    let (table, eos) = reference_eos(&units);
    let settings = reference_settings(&table);
    let densities: Vec<f64> = (0..5).map(|i| 10f64.powf(14.2 + 0.2 * i as f64)).collect();

    let curve = build_curve(&eos, &densities, &settings, &units);
    assert_eq!(curve.failure_count(), 0);
    let masses: Vec<f64> = curve.points().map(|p| p.mass).collect();
    for pair in masses.windows(2) {
        assert!(pair[1] > pair[0], "masses not increasing: {masses:?}");
    }
}

#[test]
fn central_density_at_table_minimum_succeeds() {
    let units = UnitSystem::cgs();
    let (table, eos) = reference_eos(&units);
    let settings = reference_settings(&table);
    let rho_c = units.density_to_dimensionless(table.min_density() * (1.0 + 1e-9));
    assert!(solve_star(&eos, rho_c, &settings, &units).is_ok());
}

#[test]
fn central_density_below_table_minimum_is_domain_error() {
    let units = UnitSystem::cgs();
    let (table, eos) = reference_eos(&units);
    let settings = reference_settings(&table);
    let rho_c = units.density_to_dimensionless(0.9 * table.min_density());
    let err = solve_star(&eos, rho_c, &settings, &units).expect_err("expected domain error");
    assert!(err.is_domain_violation());
}

#[test]
fn interpolant_round_trips_across_the_table() {
    let units = UnitSystem::cgs();
    let (table, eos) = reference_eos(&units);
    for window in table.density().windows(2) {
        let midpoint = (window[0] * window[1]).sqrt();
        let rho = units.density_to_dimensionless(midpoint);
        let back = eos.density_of(eos.pressure_of(rho).unwrap()).unwrap();
        assert_relative_eq!(back, rho, max_relative = 1e-12);
    }
}

#[test]
fn repeated_solves_are_identical() {
    let units = UnitSystem::cgs();
    let (table, eos) = reference_eos(&units);
    let settings = reference_settings(&table);
    let rho_c = units.density_to_dimensionless(7e14);
    let first = solve_star(&eos, rho_c, &settings, &units).unwrap();
    let second = solve_star(&eos, rho_c, &settings, &units).unwrap();
    assert_eq!(first.trace, second.trace);
    assert_eq!(first.steps, second.steps);
}
