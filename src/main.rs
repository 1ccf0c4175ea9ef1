//! branch-locator CLI entry point
//!
//! Guest location detection and nearby branch lookup - CLI + web app

use branch_locator::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
