//! Nearby command handler

use crate::cli::{formatter, init_logging};
use crate::config::Config;
use crate::coord::Coordinates;
use crate::directory::FileDirectory;
use crate::error::Result;
use crate::format::available_formats;
use crate::session::Locator;
use clap::Args;

/// Nearby command arguments
#[derive(Args)]
pub struct NearbyArgs {
    /// Latitude
    #[arg(long, required_unless_present = "list_formats", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude
    #[arg(long, required_unless_present = "list_formats", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Search radius in km
    #[arg(long, short = 'r')]
    pub radius: Option<f64>,

    /// Output format
    #[arg(long, short = 'f')]
    pub format: Option<String>,

    /// List available formats
    #[arg(short = 'F', long = "list-formats")]
    pub list_formats: bool,
}

/// Run the nearby command
pub async fn run(args: NearbyArgs) -> Result<()> {
    if args.list_formats {
        list_formats();
        return Ok(());
    }

    init_logging("warn");

    let config = Config::load()?;
    let format = args.format.unwrap_or_else(|| config.output.format.clone());
    let formatter = formatter(&format)?;

    let center = match (args.lat, args.lng) {
        (Some(lat), Some(lng)) => Coordinates::new(lat, lng),
        _ => {
            eprintln!("Error: Both --lat and --lng are required");
            std::process::exit(1);
        }
    };

    let directory = FileDirectory::new(config.directory_path()?);
    let locator = Locator::from_config(&config, directory)?;

    let result = locator.nearby(center, args.radius).await?;
    println!("{}", formatter.format_nearby(&result)?);
    Ok(())
}

/// Print available output formats
fn list_formats() {
    println!("Available output formats:");
    for format in available_formats() {
        println!("  {:<6} - {}", format.name, format.description);
    }
}
