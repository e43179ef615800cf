pub mod config;
pub mod error;
pub mod loader;
pub mod markdown;
pub mod site;
pub mod types;

pub use config::parse_site_toml;
pub use error::{Error, Result};
pub use loader::{LoadReport, PageError, load_site};
pub use site::SiteIndex;
pub use types::*;
