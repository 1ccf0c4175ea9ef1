//! branch-locator: Guest location detection and nearby branch lookup
//!
//! Works out roughly where a visitor is connecting from, turns coordinates
//! into a short Korean address label, and finds the service branches within
//! a search radius together with a summary of their inventory.
//!
//! ## Features
//!
//! - IP-based and GPS-based location detection, run concurrently
//! - Tiered reverse-geocode normalization with an "address not found" sentinel
//! - Haversine radius matching and inventory summaries
//! - Per-session state that discards superseded results
//! - HTTP API + CLI interface
//!
//! ## Quick Start
//!
//! ```rust
//! use branch_locator::branch::{find_nearby, Branch, Classification};
//! use branch_locator::coord::Coordinates;
//!
//! let gangnam = Coordinates::new(37.4979, 127.0276);
//! let branches = vec![Branch {
//!     code: "BH001".to_string(),
//!     name: "역삼 블루핸즈".to_string(),
//!     coords: Coordinates::new(37.5006, 127.0364),
//!     classification: Classification::Specialty,
//!     phone_number: "02-555-0101".to_string(),
//!     address: String::new(),
//! }];
//!
//! let nearby = find_nearby(gangnam, &branches, 3.0);
//! println!("{} branches within 3 km", nearby.len());
//! ```

pub mod address;
pub mod branch;
pub mod cli;
pub mod config;
pub mod constants;
pub mod coord;
pub mod directory;
pub mod error;
pub mod format;
pub mod geo;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use address::NormalizedAddress;
pub use branch::{Branch, BranchMatch, Classification, InventoryRow, InventorySummary, RegionFilter};
pub use config::Config;
pub use coord::Coordinates;
pub use error::{Error, Result};
pub use geo::{LocationGuess, LocationSource};
pub use session::{LocationReport, Locator, SessionContext};
