use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tov_core::batch::{run_batch, write_star_profile, BatchConfig};
use tov_core::io::load_eos_table;
use tov_core::{solve_star, EosInterpolant, UnitSystem};

#[derive(Parser, Debug)]
#[command(name = "tov", about = "Neutron star mass-radius curves from tabulated equations of state")]
struct Args {
    /// YAML batch configuration; command-line flags override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve the density scan of every .dat table in a directory.
    Batch {
        #[arg(long)]
        eos_dir: Option<PathBuf>,
        #[arg(long)]
        results_dir: Option<PathBuf>,
        /// Scan step in log10(rho_c).
        #[arg(long)]
        log_step: Option<f64>,
    },
    /// Solve a single star.
    Star {
        #[arg(long)]
        eos: PathBuf,
        /// Central density in g/cm^3.
        #[arg(long)]
        density: f64,
        /// Write the integration trace here.
        #[arg(long)]
        profile: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<BatchConfig> {
    let Some(path) = path else {
        return Ok(BatchConfig::default());
    };
    let file = File::open(path)
        .with_context(|| format!("Failed to open config `{}`.", path.display()))?;
    let config: BatchConfig = serde_yaml::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse config `{}`.", path.display()))?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    let units = UnitSystem::cgs();

    match args.command {
        Command::Batch {
            eos_dir,
            results_dir,
            log_step,
        } => {
            if let Some(dir) = eos_dir {
                config.eos_dir = dir;
            }
            if let Some(dir) = results_dir {
                config.results_dir = dir;
            }
            if let Some(step) = log_step {
                config.scan.log_step = step;
            }
            let summary = run_batch(&config, &units)?;
            let failed = summary.failed_eos().count();
            info!(
                "processed {} EOS tables ({} failed); results in {}",
                summary.reports.len(),
                failed,
                config.results_dir.display()
            );
        }
        Command::Star {
            eos,
            density,
            profile,
        } => {
            let table = load_eos_table(&eos)
                .with_context(|| format!("Failed to load EOS table `{}`.", eos.display()))?;
            let interpolant = EosInterpolant::new(&table, &units)?;
            let settings = config.settings_for(&table);
            let model = solve_star(
                &interpolant,
                units.density_to_dimensionless(density),
                &settings,
                &units,
            )
            .with_context(|| format!("Failed to solve star at rho_c = {density:e} g/cm^3."))?;

            println!(
                "M = {:.6} M_sun, R = {:.6} km, {} steps ({:?})",
                model.mass_solar(&units),
                model.radius_km(&units),
                model.steps,
                model.termination
            );
            if let Some(path) = profile {
                write_star_profile(&path, &model, config.normalize_potential)?;
            }
        }
    }

    Ok(())
}
