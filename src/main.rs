pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod join;
pub mod locate;
pub mod selection;
pub mod server;
pub mod style;
pub mod types;
pub mod workbook;

use clap::{Parser, Subcommand};
use dashboard::Dashboard;
use selection::Selection;
use std::fs;
use std::path::PathBuf;
use style::ColorScheme;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use types::{LngLat, RegionId};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Join one indicator year onto the boundaries and write GeoJSON
    Join {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Indicator code; the first listed indicator when omitted
        #[arg(short, long)]
        indicator: Option<String>,
        /// Year column; the sheet's first year when omitted
        #[arg(short, long)]
        year: Option<String>,
        /// Colour scheme; the configured default when omitted
        #[arg(long, value_enum)]
        scheme: Option<ColorScheme>,
        #[arg(long)]
        reverse: bool,
        /// Write to FILE instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Resolve a coordinate to the region containing it
    Locate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
    },
    /// Print a region's trend against the national average
    Trend {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long)]
        indicator: Option<String>,
        #[arg(short, long)]
        region: Option<RegionId>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            info!("Serving dashboard with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;
            let dashboard = Dashboard::load(&app_config)?;

            server::start_server(app_config, dashboard).await?;
        }
        Commands::Join {
            config,
            indicator,
            year,
            scheme,
            reverse,
            output,
        } => {
            let app_config = config::AppConfig::load_from_file(&config)?;
            let dashboard = Dashboard::load(&app_config)?;

            let selection = Selection {
                indicator,
                year,
                scheme,
                reverse,
                region: None,
            };
            let view = dashboard.map_view(&selection)?;
            for warning in &view.warnings {
                warn!("{}", warning);
            }

            let input = &app_config.input;
            let collection = view.to_geojson(&input.id_property, &input.name_property);
            let text = serde_json::to_string_pretty(&collection)?;
            match output {
                Some(path) => {
                    fs::write(&path, text)?;
                    info!("Wrote {} regions to {:?}", view.regions.len(), path);
                }
                None => println!("{}", text),
            }
        }
        Commands::Locate { config, lng, lat } => {
            let app_config = config::AppConfig::load_from_file(&config)?;
            let dashboard = Dashboard::load(&app_config)?;

            match dashboard.locate(LngLat { lng, lat }) {
                Some(region) => println!("{}\t{}", region.id, dashboard.region_name(&region.id)),
                None => warn!("{}", selection::UNRESOLVED_CLICK),
            }
        }
        Commands::Trend {
            config,
            indicator,
            region,
        } => {
            let app_config = config::AppConfig::load_from_file(&config)?;
            let dashboard = Dashboard::load(&app_config)?;

            let selection = Selection {
                indicator,
                region,
                ..Selection::default()
            };
            let chart = dashboard.trend(&selection)?;
            for warning in &chart.warnings {
                warn!("{}", warning);
            }
            println!("{}", serde_json::to_string_pretty(&chart)?);
        }
    }

    Ok(())
}
