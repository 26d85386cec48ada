// Amazon settlement column mapping (country.json)

use std::collections::HashMap;
use std::path::Path;

use shopmerge_io::{decode_with_fallback, DEFAULT_ORDER};

use crate::error::ConfigError;

/// Columns of one country: `(canonical name, name used in that country's export)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryColumns {
    pub country: String,
    pub columns: Vec<(String, String)>,
}

/// Per-country column mapping, in file order.
///
/// The file is a JSON object `{ country: { canonical: source, ... }, ... }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryMapping {
    countries: Vec<CountryColumns>,
}

/// Country whose keys give the canonical column order.
const REFERENCE_COUNTRY: &str = "US";

impl CountryMapping {
    /// Load a mapping file, detecting its encoding.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let (text, encoding) = decode_with_fallback(&bytes, &DEFAULT_ORDER).map_err(|_| {
            ConfigError::Encoding {
                path: path.to_path_buf(),
            }
        })?;
        log::debug!("{} decoded as {}", path.display(), encoding);

        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let mapping = Self::from_value(value)?;
        log::info!(
            "loaded column mapping for {} countries from {}",
            mapping.countries.len(),
            path.display()
        );
        Ok(mapping)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let serde_json::Value::Object(top) = value else {
            return Err(ConfigError::Mapping("top level must be an object".into()));
        };

        let mut countries = Vec::with_capacity(top.len());
        for (country, columns) in top {
            let serde_json::Value::Object(columns) = columns else {
                return Err(ConfigError::Mapping(format!(
                    "entry '{}' must be an object of column names",
                    country
                )));
            };
            let columns = columns
                .into_iter()
                .map(|(canonical, source)| match source {
                    serde_json::Value::String(s) => Ok((canonical, s)),
                    _ => Err(ConfigError::Mapping(format!(
                        "column '{}' of '{}' must map to a string",
                        canonical, country
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            countries.push(CountryColumns { country, columns });
        }

        Ok(Self { countries })
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.countries.iter().map(|c| c.country.as_str())
    }

    /// First country key contained in the store name.
    pub fn country_for_store(&self, store: &str) -> Option<&str> {
        self.countries()
            .find(|country| store.contains(country))
    }

    pub fn columns(&self, country: &str) -> Option<&[(String, String)]> {
        self.countries
            .iter()
            .find(|c| c.country == country)
            .map(|c| c.columns.as_slice())
    }

    /// Source column name → canonical name for one country.
    pub fn reverse(&self, country: &str) -> HashMap<String, String> {
        self.columns(country)
            .unwrap_or_default()
            .iter()
            .map(|(canonical, source)| (source.clone(), canonical.clone()))
            .collect()
    }

    /// Canonical column order: the US entry's keys, or the first entry's.
    pub fn canonical_order(&self) -> Vec<&str> {
        let reference = self
            .countries
            .iter()
            .find(|c| c.country == REFERENCE_COUNTRY)
            .or_else(|| self.countries.first());
        reference
            .map(|c| c.columns.iter().map(|(canonical, _)| canonical.as_str()).collect())
            .unwrap_or_default()
    }
}
