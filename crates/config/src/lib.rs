// Configuration loading

pub mod error;
pub mod mapping;
pub mod regions;
pub mod settings;

pub use error::ConfigError;
pub use mapping::{CountryColumns, CountryMapping};
pub use regions::{Region, RegionTable};
pub use settings::{NanxiRules, Settings};
