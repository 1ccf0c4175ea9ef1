//! Locate command handler
//!
//! Runs the full detection pipeline once: IP lookup, optional GPS fix,
//! address normalization and the nearby branch search.

use crate::cli::{formatter, init_logging};
use crate::config::Config;
use crate::directory::FileDirectory;
use crate::error::Result;
use crate::geo::gps::{GpsError, ReportedPosition};
use crate::session::{Locator, SessionContext};
use clap::Args;

/// Locate command arguments
#[derive(Args)]
pub struct LocateArgs {
    /// Latitude of a GPS fix
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of a GPS fix
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Behave as if the user refused location permission
    #[arg(long, conflicts_with_all = ["lat", "lng"])]
    pub deny_gps: bool,

    /// Output format
    #[arg(long, short = 'f')]
    pub format: Option<String>,
}

/// Run the locate command
pub async fn run(args: LocateArgs) -> Result<()> {
    init_logging("warn");

    let config = Config::load()?;
    let format = args.format.unwrap_or_else(|| config.output.format.clone());
    let formatter = formatter(&format)?;

    let source = if args.deny_gps {
        ReportedPosition::Failed(GpsError::PermissionDenied)
    } else {
        ReportedPosition::from_parts(args.lat, args.lng, None)
    };

    let directory = FileDirectory::new(config.directory_path()?);
    let locator = Locator::from_config(&config, directory)?;
    let session = SessionContext::new();

    let report = locator.locate(&session, &source, None).await?;
    if let Some(message) = &report.gps_message {
        eprintln!("{}", message);
    }

    println!("{}", formatter.format_report(&report)?);
    Ok(())
}
