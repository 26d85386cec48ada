// Region code / native name table

use serde::{Deserialize, Serialize};

/// One marketplace region: a latin code and the name written in outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
}

impl Region {
    fn new(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
        }
    }
}

/// Ordered region table. Earlier entries win when several match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionTable(Vec<Region>);

impl Default for RegionTable {
    fn default() -> Self {
        Self(vec![
            Region::new("US", "美国"),
            Region::new("JP", "日本"),
            Region::new("EU", "欧区"),
            Region::new("EU2", "欧洲"),
            Region::new("GLOBAL", "全球"),
            Region::new("UK", "英国"),
            Region::new("GB", "英国"),
            Region::new("DE", "德国"),
            Region::new("FR", "法国"),
            Region::new("IT", "意大利"),
            Region::new("ES", "西班牙"),
            Region::new("CA", "加拿大"),
            Region::new("MX", "墨西哥"),
            Region::new("AU", "澳大利亚"),
            Region::new("AE", "阿联酋"),
        ])
    }
}

impl RegionTable {
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.0.iter()
    }

    /// Map a token to its native name: codes match case-insensitively,
    /// native names only exactly.
    pub fn resolve(&self, token: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|r| r.name == token || r.code.eq_ignore_ascii_case(token))
            .map(|r| r.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_codes_and_names() {
        let table = RegionTable::default();
        assert_eq!(table.resolve("us"), Some("美国"));
        assert_eq!(table.resolve("GB"), Some("英国"));
        assert_eq!(table.resolve("欧洲"), Some("欧洲"));
        assert_eq!(table.resolve("Mars"), None);
    }

    #[test]
    fn deserializes_from_list() {
        let table: RegionTable =
            serde_json::from_str(r#"[{"code": "BR", "name": "巴西"}]"#).unwrap();
        assert_eq!(table.resolve("br"), Some("巴西"));
        assert_eq!(table.resolve("US"), None);
    }
}
