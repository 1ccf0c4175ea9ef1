//! Config command handler
//!
//! View and modify configuration settings.

use crate::config::Config;
use crate::error::Result;
use clap::Args;

/// Config command arguments
#[derive(Args)]
pub struct ConfigArgs {
    /// Configuration key (e.g., "search.radius_km")
    pub key: Option<String>,

    /// Value to set (if not provided, shows current value)
    pub value: Option<String>,

    /// Show config file path
    #[arg(long)]
    pub path: bool,

    /// Reset config to defaults
    #[arg(long)]
    pub reset: bool,
}

/// Run the config command
pub fn run(args: ConfigArgs) -> Result<()> {
    // Show path
    if args.path {
        let path = Config::config_path()?;
        println!("{}", path.display());
        return Ok(());
    }

    // Reset config
    if args.reset {
        let config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
        return Ok(());
    }

    let mut config = Config::load()?;

    match (&args.key, &args.value) {
        // No arguments: show all config
        (None, None) => {
            show_all_config(&config);
        }

        // Key only: show that value
        (Some(key), None) => {
            if let Some(value) = config.get(key) {
                println!("{}", value);
            } else {
                eprintln!("Unknown config key: {}", key);
                eprintln!("\nAvailable keys:");
                for k in Config::available_keys() {
                    eprintln!("  {}", k);
                }
                std::process::exit(1);
            }
        }

        // Key and value: set the value
        (Some(key), Some(value)) => {
            config.set(key, value)?;
            config.save()?;
            println!("{} = {}", key, value);
        }

        // Value without key: not valid
        (None, Some(_)) => {
            eprintln!("Error: Must specify a key to set a value");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Display all configuration values
fn show_all_config(config: &Config) {
    println!("[search]");
    println!("radius_km = {}", config.search.radius_km);
    println!();

    println!("[location]");
    println!("default_city = \"{}\"", config.location.default_city);
    println!("default_region = \"{}\"", config.location.default_region);
    println!("default_district = \"{}\"", config.location.default_district);
    println!("gps_timeout_secs = {}", config.location.gps_timeout_secs);
    println!("gps_maximum_age_secs = {}", config.location.gps_maximum_age_secs);
    println!("gps_high_accuracy = {}", config.location.gps_high_accuracy);
    println!();

    println!("[services]");
    println!("ip_lookup_url = \"{}\"", config.services.ip_lookup_url);
    println!("reverse_geocode_url = \"{}\"", config.services.reverse_geocode_url);
    println!("language = \"{}\"", config.services.language);
    println!("request_timeout_secs = {}", config.services.request_timeout_secs);
    println!();

    println!("[directory]");
    if config.directory.path.is_empty() {
        match config.directory_path() {
            Ok(path) => println!("path = \"\" # {}", path.display()),
            Err(_) => println!("path = \"\""),
        }
    } else {
        println!("path = \"{}\"", config.directory.path);
    }
    println!();

    println!("[server]");
    println!("host = \"{}\"", config.server.host);
    println!("port = {}", config.server.port);
    println!("session_ttl_secs = {}", config.server.session_ttl_secs);
    println!("max_sessions = {}", config.server.max_sessions);
    println!();

    println!("[output]");
    println!("format = \"{}\"", config.output.format);
}
