//! Address command handler

use crate::address::normalize;
use crate::cli::init_logging;
use crate::config::Config;
use crate::coord::Coordinates;
use crate::error::Result;
use crate::geo::nominatim::NominatimBackend;
use clap::Args;

/// Address command arguments
#[derive(Args)]
pub struct AddressArgs {
    /// Latitude
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the address command
///
/// Prints the "address not found" sentinel rather than failing when the
/// geocoder has nothing usable.
pub async fn run(args: AddressArgs) -> Result<()> {
    init_logging("warn");

    let coords = Coordinates::new(args.lat, args.lng);
    coords.validate()?;

    let config = Config::load()?;
    let geocoder = NominatimBackend::from_config(&config)?;
    let address = normalize(&geocoder, coords).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&address)?);
    } else {
        println!("{}", address);
    }
    Ok(())
}
