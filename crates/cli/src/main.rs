//! landslip CLI - shallow landslide susceptibility from soil moisture rasters

mod credentials;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use landslip_algorithms::landslide::{
    safety_factor, slope_to_radians, subsurface_flow_depth, MaterialParams, SlopeUnits,
    SoilProfile, StabilitySummary, SubsurfaceFlowParams,
};
use landslip_algorithms::regrid::{regrid, RegridMethod, TargetGrid};
use landslip_core::io::{read_geotiff, read_geotiff_layers, write_geotiff, GeoTiffOptions};
use landslip_core::Raster;

use credentials::{default_home_dir, write_credential_files, ApiCredentials};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "landslip")]
#[command(author, version, about = "Shallow landslide susceptibility from soil moisture", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Subsurface flow depth from layered soil moisture
    FlowDepth {
        #[command(flatten)]
        soil: SoilArgs,
        /// Output file
        output: PathBuf,
    },
    /// Infinite-slope factor of safety
    SafetyFactor {
        /// Slope raster
        #[arg(long)]
        slope: PathBuf,
        /// Subsurface flow depth raster
        #[arg(long)]
        flow_depth: PathBuf,
        /// Soil depth raster
        #[arg(long)]
        soil_depth: PathBuf,
        #[command(flatten)]
        stability: StabilityArgs,
        /// Output file
        output: PathBuf,
    },
    /// Flow depth and factor of safety in one run
    Susceptibility {
        #[command(flatten)]
        soil: SoilArgs,
        /// Slope raster
        #[arg(long)]
        slope: PathBuf,
        #[command(flatten)]
        stability: StabilityArgs,
        /// Also write the intermediate flow depth raster
        #[arg(long)]
        flow_depth_output: Option<PathBuf>,
        /// Output factor of safety file
        output: PathBuf,
    },
    /// Resample a raster onto the grid of another raster
    Regrid {
        /// Input raster file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Raster whose grid the output takes
        #[arg(long)]
        like: PathBuf,
        /// Method: nearest, bilinear, conservative
        #[arg(short, long, default_value = "nearest")]
        method: RegridMethod,
    },
    /// Write OpenTopography and Climate Data Store credential files
    Credentials {
        /// OpenTopography API key
        #[arg(long, env = "OPENTOPOGRAPHY_API_KEY", hide_env_values = true)]
        opentopography_key: String,
        /// Climate Data Store API key
        #[arg(long, env = "CDS_API_KEY", hide_env_values = true)]
        cds_key: String,
        /// Climate Data Store API url
        #[arg(long, env = "CDS_API_URL")]
        cds_url: Option<String>,
        /// Directory for .opentopography.txt (default: current directory)
        #[arg(long)]
        work_dir: Option<PathBuf>,
        /// Directory for .cdsapirc (default: home directory)
        #[arg(long)]
        home_dir: Option<PathBuf>,
    },
}

/// Inputs of the flow depth aggregation
#[derive(Args)]
struct SoilArgs {
    /// Soil depth raster
    #[arg(long)]
    soil_depth: PathBuf,
    /// Moisture raster, repeated once per layer, or a single multi-page file
    #[arg(long, required = true)]
    moisture: Vec<PathBuf>,
    /// Layer depth boundaries, comma separated
    #[arg(short, long, default_value = "0,0.07,0.28,1,2")]
    thresholds: SoilProfile,
    /// Soil porosity
    #[arg(short, long, default_value = "0.5")]
    porosity: f64,
    /// Regrid moisture layers onto the soil depth grid first (nearest,
    /// bilinear, conservative)
    #[arg(long)]
    regrid_moisture: Option<RegridMethod>,
}

/// Slope units and material constants of the stability model
#[derive(Args)]
struct StabilityArgs {
    /// Slope units: degrees, radians
    #[arg(long, default_value = "degrees")]
    slope_units: String,
    /// JSON file with material constants; flags below override it
    #[arg(long)]
    params: Option<PathBuf>,
    /// Root cohesion (Pa)
    #[arg(long)]
    root_cohesion: Option<f64>,
    /// Soil cohesion (Pa)
    #[arg(long)]
    soil_cohesion: Option<f64>,
    /// Soil bulk density (kg/m³)
    #[arg(long)]
    bulk_density: Option<f64>,
    /// Water density (kg/m³)
    #[arg(long)]
    water_density: Option<f64>,
    /// Gravitational acceleration (m/s²)
    #[arg(long)]
    gravity: Option<f64>,
    /// Internal friction angle (degrees)
    #[arg(long)]
    friction_angle: Option<f64>,
}

impl StabilityArgs {
    fn units(&self) -> Result<SlopeUnits> {
        match self.slope_units.to_lowercase().as_str() {
            "degrees" | "deg" | "d" => Ok(SlopeUnits::Degrees),
            "radians" | "rad" | "r" => Ok(SlopeUnits::Radians),
            other => bail!("Unknown slope units: {}. Use degrees or radians.", other),
        }
    }

    fn material(&self) -> Result<MaterialParams> {
        let mut params = match &self.params {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Invalid material parameters in {}", path.display()))?
            }
            None => MaterialParams::default(),
        };

        let overrides = [
            (self.root_cohesion, &mut params.root_cohesion),
            (self.soil_cohesion, &mut params.soil_cohesion),
            (self.bulk_density, &mut params.soil_bulk_density),
            (self.water_density, &mut params.water_density),
            (self.gravity, &mut params.gravity),
            (self.friction_angle, &mut params.friction_angle_deg),
        ];
        for (flag, field) in overrides {
            if let Some(v) = flag {
                *field = v;
            }
        }

        params.validate().context("Invalid material parameters")?;
        debug!("Material parameters: {:?}", params);
        Ok(params)
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path, None)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("{}: {} x {}", path.display(), raster.cols(), raster.rows());
    Ok(raster)
}

/// Every page of a file, in file order
fn read_layers(path: &Path) -> Result<Vec<Raster<f64>>> {
    let pb = spinner("Reading layers...");
    let layers: Vec<Raster<f64>> = read_geotiff_layers(path)
        .with_context(|| format!("Failed to read layers of {}", path.display()))?;
    pb.finish_and_clear();
    info!("{}: {} layer(s)", path.display(), layers.len());
    Ok(layers)
}

/// One file per layer, or every page of a single file
fn read_moisture(paths: &[PathBuf]) -> Result<Vec<Raster<f64>>> {
    if let [path] = paths {
        return read_layers(path);
    }
    paths.iter().map(|p| read_raster(p)).collect()
}

fn write_result(raster: &Raster<f64>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path, Some(GeoTiffOptions::default()))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

/// Read the soil inputs and aggregate the flow depth. Returns the soil depth
/// too; the stability model needs it.
fn compute_flow_depth(soil: &SoilArgs) -> Result<(Raster<f64>, Raster<f64>)> {
    let soil_depth = read_raster(&soil.soil_depth)?;
    let mut moisture = read_moisture(&soil.moisture)?;

    if let Some(method) = soil.regrid_moisture {
        let target = TargetGrid::like(&soil_depth);
        let pb = spinner("Regridding moisture...");
        moisture = moisture
            .iter()
            .map(|layer| regrid(layer, &target, method))
            .collect::<landslip_core::Result<_>>()
            .context("Failed to regrid moisture layers")?;
        pb.finish_and_clear();
        debug!("Regridded {} layer(s) with {}", moisture.len(), method);
    }

    info!("Soil profile: {}", soil.thresholds);
    let params = SubsurfaceFlowParams::new(soil.thresholds.clone(), soil.porosity);
    let flow = subsurface_flow_depth(&soil_depth, &moisture, &params)
        .context("Failed to calculate subsurface flow depth")?;
    Ok((soil_depth, flow))
}

fn compute_safety_factor(
    slope: &Raster<f64>,
    flow_depth: &Raster<f64>,
    soil_depth: &Raster<f64>,
    stability: &StabilityArgs,
) -> Result<Raster<f64>> {
    let material = stability.material()?;
    let slope = slope_to_radians(slope, stability.units()?).context("Failed to convert slope")?;
    safety_factor(&slope, flow_depth, soil_depth, &material).context("Failed to calculate factor of safety")
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => {
            let layers = read_layers(&input)?;
            let raster = layers.first().context("File has no layers")?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Layers: {}", layers.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics (layer 1):");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }

        Commands::FlowDepth { soil, output } => {
            let start = Instant::now();
            let (_, flow) = compute_flow_depth(&soil)?;
            let elapsed = start.elapsed();
            write_result(&flow, &output)?;
            done("Subsurface flow depth", &output, elapsed);
        }

        Commands::SafetyFactor {
            slope,
            flow_depth,
            soil_depth,
            stability,
            output,
        } => {
            let slope = read_raster(&slope)?;
            let flow_depth = read_raster(&flow_depth)?;
            let soil_depth = read_raster(&soil_depth)?;
            let start = Instant::now();
            let fs = compute_safety_factor(&slope, &flow_depth, &soil_depth, &stability)?;
            let elapsed = start.elapsed();
            write_result(&fs, &output)?;
            done("Factor of safety", &output, elapsed);
            println!("  {}", StabilitySummary::from_raster(&fs));
        }

        Commands::Susceptibility {
            soil,
            slope,
            stability,
            flow_depth_output,
            output,
        } => {
            let slope = read_raster(&slope)?;
            let start = Instant::now();
            let (soil_depth, flow) = compute_flow_depth(&soil)?;
            let fs = compute_safety_factor(&slope, &flow, &soil_depth, &stability)?;
            let elapsed = start.elapsed();

            if let Some(path) = flow_depth_output {
                write_result(&flow, &path)?;
                println!("Subsurface flow depth saved to: {}", path.display());
            }
            write_result(&fs, &output)?;
            done("Factor of safety", &output, elapsed);
            println!("  {}", StabilitySummary::from_raster(&fs));
        }

        Commands::Regrid {
            input,
            output,
            like,
            method,
        } => {
            let source = read_raster(&input)?;
            let reference = read_raster(&like)?;
            let start = Instant::now();
            let result = regrid(&source, &TargetGrid::like(&reference), method).context("Failed to regrid")?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("Regridded raster", &output, elapsed);
        }

        Commands::Credentials {
            opentopography_key,
            cds_key,
            cds_url,
            work_dir,
            home_dir,
        } => {
            let creds = ApiCredentials::new(&opentopography_key, &cds_key, cds_url.as_deref())?;
            let work_dir = match work_dir {
                Some(dir) => dir,
                None => std::env::current_dir().context("Could not determine the working directory")?,
            };
            let home_dir = match home_dir {
                Some(dir) => dir,
                None => default_home_dir()?,
            };

            let paths = write_credential_files(&creds, &work_dir, &home_dir)?;
            println!("OpenTopography key saved to: {}", paths.opentopography.display());
            println!("CDS key saved to: {}", paths.cdsapirc.display());
        }
    }

    Ok(())
}
