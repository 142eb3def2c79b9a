//! Batch driver: every EOS table in a directory, a scan of central densities
//! per table, profiles and a mass–radius summary per EOS.
//!
//! Layout of the results directory:
//!
//! ```text
//! results/
//!   <eos name>/
//!     <log10 rho_c>.dat   one profile per solved star
//!     MRrhoc.dat          radius [km], mass [M_sun], rho_c [g/cm^3]
//! ```
//!
//! A table that cannot be loaded is reported and skipped; the other tables
//! are still processed.

use crate::curve::{build_curve_with, MassRadiusPoint};
use crate::eos::{EosInterpolant, EosTable};
use crate::io::{load_eos_table, write_profile, write_summary};
use crate::structure::{IntegrationSettings, StarModel};
use crate::units::UnitSystem;
use anyhow::{anyhow, bail, Context, Result};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

const EOS_EXTENSION: &str = "dat";
const SUMMARY_FILE: &str = "MRrhoc.dat";
/// Default lower end of the scan, log10(g/cm³).
const DEFAULT_LOG_START: f64 = 14.0;
/// Fewest decimals in a profile file name.
const MIN_PROFILE_DECIMALS: usize = 3;

/// Log-spaced central densities: 10^start, 10^(start + step), ... below 10^stop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityScan {
    /// Defaults to log10 of the table minimum, but no lower than 14.
    pub log_start: Option<f64>,
    /// Defaults to log10 of the table maximum.
    pub log_stop: Option<f64>,
    pub log_step: f64,
}

impl Default for DensityScan {
    fn default() -> Self {
        Self {
            log_start: None,
            log_stop: None,
            log_step: 0.01,
        }
    }
}

impl DensityScan {
    pub fn densities(&self, table: &EosTable) -> Result<Vec<f64>> {
        if !(self.log_step > 0.0 && self.log_step.is_finite()) {
            bail!("log_step must be positive and finite.");
        }
        let start = self
            .log_start
            .unwrap_or_else(|| table.min_density().log10().max(DEFAULT_LOG_START));
        let stop = self.log_stop.unwrap_or_else(|| table.max_density().log10());
        if !start.is_finite() || !stop.is_finite() {
            bail!("Density scan bounds must be finite.");
        }
        if stop <= start {
            return Ok(Vec::new());
        }
        let count = ((stop - start) / self.log_step).ceil() as usize;
        Ok((0..count)
            .map(|i| 10f64.powf(start + i as f64 * self.log_step))
            .collect())
    }
}

/// Everything a batch run needs. Deserializable so it can live in a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub eos_dir: PathBuf,
    pub results_dir: PathBuf,
    pub scan: DensityScan,
    /// `surface_density` is overridden per table from `cutoff_margin`.
    pub integration: IntegrationSettings,
    /// Surface cutoff = (1 + margin) × the table's minimum density.
    pub cutoff_margin: f64,
    /// Write profiles with ν shifted to match the exterior metric at the surface.
    pub normalize_potential: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            eos_dir: PathBuf::from("EOS"),
            results_dir: PathBuf::from("results"),
            scan: DensityScan::default(),
            integration: IntegrationSettings::default(),
            cutoff_margin: 1.0,
            normalize_potential: false,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.cutoff_margin >= 0.0 && self.cutoff_margin.is_finite()) {
            bail!("cutoff_margin must be non-negative and finite.");
        }
        if !(self.scan.log_step > 0.0 && self.scan.log_step.is_finite()) {
            bail!("log_step must be positive and finite.");
        }
        self.integration
            .validate()
            .context("Invalid integration settings.")?;
        Ok(())
    }

    /// Integration settings for one table, with its surface cutoff applied.
    pub fn settings_for(&self, table: &EosTable) -> IntegrationSettings {
        IntegrationSettings {
            surface_density: (1.0 + self.cutoff_margin) * table.min_density(),
            ..self.integration
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EosSummary {
    pub solved: usize,
    pub failed: usize,
    pub maximum_mass: Option<MassRadiusPoint>,
}

#[derive(Debug)]
pub struct EosReport {
    pub name: String,
    pub path: PathBuf,
    pub outcome: Result<EosSummary>,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<EosReport>,
}

impl BatchSummary {
    pub fn failed_eos(&self) -> impl Iterator<Item = &EosReport> + '_ {
        self.reports.iter().filter(|report| report.outcome.is_err())
    }
}

/// Regular files with the `.dat` extension, sorted by path.
pub fn discover_eos_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read EOS directory `{}`.", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == EOS_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn eos_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn run_batch(config: &BatchConfig, units: &UnitSystem) -> Result<BatchSummary> {
    config.validate()?;
    fs::create_dir_all(&config.results_dir).with_context(|| {
        format!(
            "Failed to create results directory `{}`.",
            config.results_dir.display()
        )
    })?;

    let files = discover_eos_files(&config.eos_dir)?;
    if files.is_empty() {
        warn!("no .{EOS_EXTENSION} files in {}", config.eos_dir.display());
    }

    let mut summary = BatchSummary::default();
    for path in files {
        let name = eos_name(&path);
        let outcome = process_eos(&path, &config.results_dir.join(&name), config, units);
        match &outcome {
            Ok(eos) => info!(
                "{name}: {} stars solved, {} failed{}",
                eos.solved,
                eos.failed,
                eos.maximum_mass
                    .map(|p| format!(", M_max = {:.4} M_sun at R = {:.3} km", p.mass, p.radius))
                    .unwrap_or_default()
            ),
            Err(err) => error!("{name}: {err:#}"),
        }
        summary.reports.push(EosReport {
            name,
            path,
            outcome,
        });
    }
    Ok(summary)
}

/// Solves the density scan of one EOS file and writes its results into
/// `out_dir`.
pub fn process_eos(
    path: &Path,
    out_dir: &Path,
    config: &BatchConfig,
    units: &UnitSystem,
) -> Result<EosSummary> {
    let table = load_eos_table(path)
        .with_context(|| format!("Failed to load EOS table `{}`.", path.display()))?;
    let eos = EosInterpolant::new(&table, units)
        .with_context(|| format!("Failed to interpolate EOS table `{}`.", path.display()))?;
    let densities = config.scan.densities(&table)?;
    let settings = config.settings_for(&table);

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create `{}`.", out_dir.display()))?;

    let decimals = profile_decimals(config.scan.log_step);
    let mut written = HashSet::new();
    let mut write_error = None;
    let curve = build_curve_with(&eos, &densities, &settings, units, |model| {
        if write_error.is_some() {
            return;
        }
        let path = profile_path(out_dir, model, units, decimals);
        if !written.insert(path.clone()) {
            write_error = Some(anyhow!(
                "Profile `{}` would be overwritten by another star.",
                path.display()
            ));
            return;
        }
        write_error = write_star_profile(&path, model, config.normalize_potential).err();
    });
    if let Some(err) = write_error {
        return Err(err);
    }

    let summary_path = out_dir.join(SUMMARY_FILE);
    let file = File::create(&summary_path)
        .with_context(|| format!("Failed to create `{}`.", summary_path.display()))?;
    write_summary(BufWriter::new(file), &curve)
        .with_context(|| format!("Failed to write `{}`.", summary_path.display()))?;

    let failed = curve.failure_count();
    Ok(EosSummary {
        solved: curve.len() - failed,
        failed,
        maximum_mass: curve.maximum_mass(),
    })
}

/// Enough decimals that neighbouring scan points never share a file name.
fn profile_decimals(log_step: f64) -> usize {
    let needed = (-(log_step / 10.0).log10() - 1e-9).ceil();
    if needed.is_finite() && needed > MIN_PROFILE_DECIMALS as f64 {
        needed as usize
    } else {
        MIN_PROFILE_DECIMALS
    }
}

/// `<out_dir>/<log10 rho_c>.dat`
fn profile_path(
    out_dir: &Path,
    model: &StarModel,
    units: &UnitSystem,
    decimals: usize,
) -> PathBuf {
    let log_density = units.density_to_physical(model.central_density).log10();
    out_dir.join(format!("{log_density:.decimals$}.{EOS_EXTENSION}"))
}

/// Writes the trace of one star, optionally with the normalized potential.
pub fn write_star_profile(
    path: &Path,
    model: &StarModel,
    normalize_potential: bool,
) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create `{}`.", path.display()))?;
    let written = if normalize_potential {
        write_profile(BufWriter::new(file), &model.normalized_trace())
    } else {
        write_profile(BufWriter::new(file), &model.trace)
    };
    written.with_context(|| format!("Failed to write `{}`.", path.display()))
}
