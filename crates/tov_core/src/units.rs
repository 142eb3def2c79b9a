//! Physical constants (cgs) and the scales used to make the TOV equations
//! dimensionless.
//!
//! With these scales the structure equations read as in geometric units
//! (G = c = 1). Tabulated pressures are given in mass-density-equivalent
//! units (g/cm³) and are multiplied by c² before scaling.

use std::f64::consts::PI;

pub const SPEED_OF_LIGHT: f64 = 2.99792458e10; // cm/s
pub const GRAVITATIONAL_CONSTANT: f64 = 6.67e-8; // cm³/(g·s²)
pub const SOLAR_MASS: f64 = 1.9892e33; // g
pub const ELECTRON_MASS: f64 = 9.11e-28; // g
pub const NEUTRON_MASS: f64 = 1.674e-24; // g
pub const PLANCK_CONSTANT: f64 = 6.63e-27; // erg·s
pub const STEFAN_BOLTZMANN: f64 = 5.6704e-5; // erg/(cm²·s·K⁴)

const CM_PER_KM: f64 = 1.0e5;

/// Fundamental constants plus the derived density, radius, mass and pressure
/// scales. Built once and passed by reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitSystem {
    pub speed_of_light: f64,
    pub gravitational_constant: f64,
    pub solar_mass: f64,
    pub electron_mass: f64,
    pub neutron_mass: f64,
    pub planck_constant: f64,
    pub stefan_boltzmann: f64,
    /// ρ_dim = m_n⁴ c³ / (8π² ħ³), g/cm³
    pub density_scale: f64,
    /// r_dim = c / √(G ρ_dim), cm
    pub radius_scale: f64,
    /// m_dim = r_dim c² / G, g
    pub mass_scale: f64,
    /// P_dim = ρ_dim c², erg/cm³
    pub pressure_scale: f64,
}

impl UnitSystem {
    /// Derives the scales from the given constants.
    #[allow(clippy::too_many_arguments)]
    pub fn from_constants(
        speed_of_light: f64,
        gravitational_constant: f64,
        solar_mass: f64,
        electron_mass: f64,
        neutron_mass: f64,
        planck_constant: f64,
        stefan_boltzmann: f64,
    ) -> Self {
        let hbar = planck_constant / (2.0 * PI);
        let density_scale =
            neutron_mass.powi(4) * speed_of_light.powi(3) / (8.0 * PI * PI * hbar.powi(3));
        let radius_scale = speed_of_light / (density_scale * gravitational_constant).sqrt();
        let mass_scale = radius_scale * speed_of_light * speed_of_light / gravitational_constant;
        let pressure_scale = density_scale * speed_of_light * speed_of_light;
        Self {
            speed_of_light,
            gravitational_constant,
            solar_mass,
            electron_mass,
            neutron_mass,
            planck_constant,
            stefan_boltzmann,
            density_scale,
            radius_scale,
            mass_scale,
            pressure_scale,
        }
    }

    /// The cgs constant set used throughout the batch driver.
    pub fn cgs() -> Self {
        Self::from_constants(
            SPEED_OF_LIGHT,
            GRAVITATIONAL_CONSTANT,
            SOLAR_MASS,
            ELECTRON_MASS,
            NEUTRON_MASS,
            PLANCK_CONSTANT,
            STEFAN_BOLTZMANN,
        )
    }

    pub fn density_to_dimensionless(&self, density: f64) -> f64 {
        density / self.density_scale
    }

    pub fn density_to_physical(&self, density: f64) -> f64 {
        density * self.density_scale
    }

    /// Converts a tabulated pressure (g/cm³ equivalent) to the dimensionless scale.
    pub fn tabulated_pressure_to_dimensionless(&self, pressure: f64) -> f64 {
        pressure * self.speed_of_light * self.speed_of_light / self.pressure_scale
    }

    pub fn radius_to_km(&self, radius: f64) -> f64 {
        radius * self.radius_scale / CM_PER_KM
    }

    pub fn mass_to_solar(&self, mass: f64) -> f64 {
        mass * self.mass_scale / self.solar_mass
    }
}

impl Default for UnitSystem {
    fn default() -> Self {
        Self::cgs()
    }
}
