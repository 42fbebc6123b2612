pub mod args;
pub mod browser;
pub mod config;
pub mod controller;
pub mod cookies;
pub mod domain;
pub mod fetch;
pub mod model;
pub mod opener;
pub mod patterns;
pub mod scanner;
pub mod sqlite;
pub mod stats;
pub mod store;
pub mod utils;

pub use args::Args;
pub use config::ScanConfig;
pub use controller::{Controller, StartOutcome};
pub use model::{ControlMessage, ScanMessage, ScanResultEntry, SiteConfig};
pub use scanner::Scanner;
pub use stats::ScanSummary;
pub use store::Store;
