//! File discovery: which files belong to a category, and whose they are.
//!
//! Store and country come from ordered, first-match-wins heuristics. Each
//! matcher is a plain function so it can be tested on its own.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use regex::{Regex, RegexBuilder};
use shopmerge_config::RegionTable;
use shopmerge_io::FileKind;

use crate::catalog::{CategoryDescriptor, KeywordPass, Layout};
use crate::context::MergeContext;
use crate::error::MergeError;
use crate::model::FileRecord;

/// List every file of `descriptor`'s category, stores and files in name order.
pub fn locate(
    ctx: &MergeContext,
    descriptor: &CategoryDescriptor,
) -> Result<Vec<FileRecord>, MergeError> {
    let records = match descriptor.layout {
        Layout::PerStore => locate_per_store(ctx, descriptor)?,
        Layout::Warehouse => locate_warehouse(ctx, descriptor)?,
        Layout::AmazonStores => locate_amazon(ctx, descriptor)?,
    };

    if records.is_empty() {
        log::warn!(
            "no {} files found under {}",
            descriptor.id,
            ctx.source_dir.display()
        );
    } else {
        log::info!("found {} {} files", records.len(), descriptor.id);
    }
    Ok(records)
}

/// Files under the store directories whose name contains `keyword`.
/// Used by flows that match on a configured keyword.
pub fn locate_keyword(ctx: &MergeContext, keyword: &str) -> Result<Vec<(String, PathBuf)>, MergeError> {
    let mut found = Vec::new();
    for store_dir in store_dirs(ctx)? {
        for path in candidate_files(&store_dir)? {
            if file_name(&path).contains(keyword) {
                found.push((extract_store(&ctx.source_dir, &path, &ctx.settings.unknown_store), path));
            }
        }
    }
    Ok(found)
}

fn locate_per_store(
    ctx: &MergeContext,
    descriptor: &CategoryDescriptor,
) -> Result<Vec<FileRecord>, MergeError> {
    let matchers = descriptor
        .passes
        .iter()
        .map(|pass| Ok((pass, prefix_pattern(pass.keyword, &ctx.settings.regions)?)))
        .collect::<Result<Vec<_>, MergeError>>()?;

    let mut records = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    // one pass per keyword so composite categories keep their tag order
    for (pass, pattern) in &matchers {
        for store_dir in store_dirs(ctx)? {
            for path in candidate_files(&store_dir)? {
                if !file_name(&path).contains(pass.keyword) || seen.contains(&path) {
                    continue;
                }
                records.push(record(ctx, descriptor, pass, pattern, path.clone()));
                seen.insert(path);
            }
        }
    }
    Ok(records)
}

fn record(
    ctx: &MergeContext,
    descriptor: &CategoryDescriptor,
    pass: &KeywordPass,
    pattern: &Regex,
    path: PathBuf,
) -> FileRecord {
    let settings = &ctx.settings;
    let store = extract_store(&ctx.source_dir, &path, &settings.unknown_store);
    let country = country_from_prefix(file_name(&path), pattern, &settings.regions)
        .or_else(|| country_from_path(&path, &settings.regions))
        .unwrap_or_else(|| {
            log::info!(
                "no country in {}, using '{}'",
                path.display(),
                settings.unknown_country
            );
            settings.unknown_country.clone()
        });

    FileRecord {
        store,
        country,
        path,
        category: descriptor.id,
        warehouse: pass.warehouse,
    }
}

fn locate_warehouse(
    ctx: &MergeContext,
    descriptor: &CategoryDescriptor,
) -> Result<Vec<FileRecord>, MergeError> {
    let dir = ctx.warehouse_dir();
    if !dir.is_dir() {
        log::warn!("warehouse directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for path in candidate_files(&dir)? {
        if let Some(pass) = descriptor
            .passes
            .iter()
            .find(|p| file_name(&path).contains(p.keyword))
        {
            records.push(FileRecord {
                store: String::new(),
                country: String::new(),
                path,
                category: descriptor.id,
                warehouse: pass.warehouse,
            });
        }
    }
    Ok(records)
}

/// `amazon_dir/<store>/*.csv`; the country is resolved later from the mapping.
fn locate_amazon(
    ctx: &MergeContext,
    descriptor: &CategoryDescriptor,
) -> Result<Vec<FileRecord>, MergeError> {
    let dir = ctx.amazon_dir();
    if !dir.is_dir() {
        log::warn!("amazon directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for store_dir in sorted_entries(&dir)?.into_iter().filter(|p| p.is_dir()) {
        let store = file_name(&store_dir).to_string();
        if store.starts_with('.') {
            continue;
        }
        for path in candidate_files(&store_dir)? {
            if FileKind::from_path(&path) == Some(FileKind::Csv) {
                records.push(FileRecord {
                    store: store.clone(),
                    country: String::new(),
                    path,
                    category: descriptor.id,
                    warehouse: None,
                });
            }
        }
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Directory walking
// ---------------------------------------------------------------------------

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, MergeError> {
    let scan_err = |source: std::io::Error| MergeError::Scan {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = std::fs::read_dir(dir)
        .map_err(scan_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(scan_err)?;
    entries.sort();
    Ok(entries)
}

/// Store directories directly under the source root, reserved ones excluded.
fn store_dirs(ctx: &MergeContext) -> Result<Vec<PathBuf>, MergeError> {
    Ok(sorted_entries(&ctx.source_dir)?
        .into_iter()
        .filter(|p| p.is_dir() && !ctx.is_reserved_dir(p))
        .collect())
}

/// Spreadsheet/CSV files directly inside `dir`, lock and hidden files excluded.
fn candidate_files(dir: &Path) -> Result<Vec<PathBuf>, MergeError> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|p| p.is_file() && is_candidate(p))
        .collect())
}

pub fn is_candidate(path: &Path) -> bool {
    let name = file_name(path);
    if name.starts_with('~') || name.starts_with('.') {
        return false;
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    matches!(ext.as_deref(), Some("xlsx" | "xls" | "csv"))
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Store of a file: the directory right under `root`, else the file name
/// up to the first `-`, else `sentinel`.
pub fn extract_store(root: &Path, path: &Path, sentinel: &str) -> String {
    if let Some(store) = store_from_layout(root, path) {
        return store;
    }
    if let Some(store) = store_from_file_name(path) {
        log::info!("{} is not under a store directory, store '{}' taken from its name", path.display(), store);
        return store;
    }
    log::info!("no store for {}, using '{}'", path.display(), sentinel);
    sentinel.to_string()
}

fn store_from_layout(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut components = relative.components();
    let first = components.next()?;
    // a bare file name under root has no store segment
    components.next()?;
    match first {
        Component::Normal(name) => name.to_str().map(str::to_string),
        _ => None,
    }
}

fn store_from_file_name(path: &Path) -> Option<String> {
    let name = path.file_stem()?.to_str()?;
    let (prefix, _) = name.split_once('-')?;
    let prefix = prefix.trim();
    (!prefix.is_empty()).then(|| prefix.to_string())
}

// ---------------------------------------------------------------------------
// Country
// ---------------------------------------------------------------------------

/// `^{keyword}[-_ ]*(?P<region>…)` over the file name. Native names match
/// exactly, codes case-insensitively.
pub fn prefix_pattern(keyword: &str, regions: &RegionTable) -> Result<Regex, MergeError> {
    let mut names: Vec<&str> = regions.iter().map(|r| r.name.as_str()).collect();
    let mut codes: Vec<&str> = regions.iter().map(|r| r.code.as_str()).collect();
    // longest first so that EU2 is not read as EU
    names.sort_by_key(|n| std::cmp::Reverse(n.chars().count()));
    codes.sort_by_key(|c| std::cmp::Reverse(c.len()));

    let alternatives: Vec<String> = names
        .iter()
        .map(|n| regex::escape(n))
        .chain(codes.iter().map(|c| format!("(?i:{})", regex::escape(c))))
        .collect();

    let pattern = if alternatives.is_empty() {
        // matches nothing
        r"[^\s\S]".to_string()
    } else {
        format!(
            r"^{}[-_ ]*(?P<region>{})(?:$|[^A-Za-z0-9])",
            regex::escape(keyword),
            alternatives.join("|")
        )
    };

    RegexBuilder::new(&pattern)
        .build()
        .map_err(|source| MergeError::Pattern { pattern, source })
}

pub fn country_from_prefix(file_name: &str, pattern: &Regex, regions: &RegionTable) -> Option<String> {
    let token = pattern.captures(file_name)?.name("region")?.as_str();
    regions.resolve(token).map(str::to_string)
}

/// Any native name, then any code delimited by `_ - space .`, in the full path.
pub fn country_from_path(path: &Path, regions: &RegionTable) -> Option<String> {
    let text = path.to_string_lossy();

    if let Some(region) = regions.iter().find(|r| text.contains(r.name.as_str())) {
        return Some(region.name.clone());
    }

    regions
        .iter()
        .find(|r| {
            RegexBuilder::new(&format!(r"[_\-\s]({})[_\-\s.]", regex::escape(&r.code)))
                .case_insensitive(true)
                .build()
                .is_ok_and(|re| re.is_match(&text))
        })
        .map(|r| r.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::descriptor;
    use crate::model::{CategoryId, TaskId, WarehouseKind};
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn store_from_directory_then_file_name() {
        let root = Path::new("/data/数据源");
        assert_eq!(
            extract_store(root, &root.join("StoreA/订单导出-美国.csv"), "unknown store"),
            "StoreA"
        );
        assert_eq!(
            extract_store(root, Path::new("/elsewhere/ShopB-订单导出.csv"), "unknown store"),
            "ShopB"
        );
        assert_eq!(
            extract_store(root, Path::new("/elsewhere/订单导出.csv"), "unknown store"),
            "unknown store"
        );
    }

    #[test]
    fn prefix_rule_maps_tokens() {
        let regions = RegionTable::default();
        let pattern = prefix_pattern("订单导出", &regions).unwrap();
        assert_eq!(country_from_prefix("订单导出-美国.csv", &pattern, &regions).as_deref(), Some("美国"));
        assert_eq!(country_from_prefix("订单导出_us_0101.xlsx", &pattern, &regions).as_deref(), Some("美国"));
        assert_eq!(country_from_prefix("订单导出-EU2.xlsx", &pattern, &regions).as_deref(), Some("欧洲"));
        assert_eq!(country_from_prefix("订单导出-USA.xlsx", &pattern, &regions), None);
        assert_eq!(country_from_prefix("店铺-订单导出-美国.xlsx", &pattern, &regions), None);
    }

    #[test]
    fn path_rule_prefers_native_names_then_codes() {
        let regions = RegionTable::default();
        assert_eq!(
            country_from_path(Path::new("/src/日本店/结算数据.xlsx"), &regions).as_deref(),
            Some("日本")
        );
        assert_eq!(
            country_from_path(Path::new("/src/Shop/结算数据_de_2024.xlsx"), &regions).as_deref(),
            Some("德国")
        );
        assert_eq!(country_from_path(Path::new("/src/Shop/结算数据.xlsx"), &regions), None);
    }

    #[test]
    fn candidates_exclude_lock_files_and_other_types() {
        assert!(is_candidate(Path::new("a/订单导出.XLSX")));
        assert!(!is_candidate(Path::new("a/~$订单导出.xlsx")));
        assert!(!is_candidate(Path::new("a/.订单导出.csv")));
        assert!(!is_candidate(Path::new("a/订单导出.pdf")));
    }

    #[test]
    fn classifies_order_file() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("数据源");
        touch(&root.join("StoreA/订单导出-美国.csv"));

        let ctx = MergeContext::new(&root, dir.path().join("out"), TaskId::new("T"));
        let records = locate(&ctx, descriptor(CategoryId::Order)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].store, "StoreA");
        assert_eq!(records[0].country, "美国");
        assert_eq!(records[0].category, CategoryId::Order);
    }

    #[test]
    fn unknown_country_uses_sentinel() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("StoreA/订单导出.xlsx"));

        let ctx = MergeContext::new(dir.path(), dir.path().join("out"), TaskId::new("T"));
        let records = locate(&ctx, descriptor(CategoryId::Order)).unwrap();
        assert_eq!(records[0].country, "unknown");
    }

    #[test]
    fn return_fee_passes_tag_each_file_once() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("S1/退至TEMU仓-退货面单费-美国.xlsx"));
        touch(&dir.path().join("S1/退至商家仓-退货面单费.xlsx"));
        touch(&dir.path().join("S2/退货面单费.csv"));

        let ctx = MergeContext::new(dir.path(), dir.path().join("out"), TaskId::new("T"));
        let records = locate(&ctx, descriptor(CategoryId::ReturnFee)).unwrap();
        let tags: Vec<_> = records.iter().map(|r| r.warehouse).collect();
        assert_eq!(
            tags,
            vec![
                Some(WarehouseKind::TemuWarehouse),
                Some(WarehouseKind::MerchantWarehouse),
                Some(WarehouseKind::Unclassified),
            ]
        );
    }

    #[test]
    fn warehouse_layout_and_reserved_dirs() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("海外仓/轶仓-202401.xlsx"));
        touch(&dir.path().join("海外仓/长鲸-202401.xlsx"));

        let ctx = MergeContext::new(dir.path(), dir.path().join("out"), TaskId::new("T"));
        let yicang = locate(&ctx, descriptor(CategoryId::YicangWarehouse)).unwrap();
        assert_eq!(yicang.len(), 1);
        assert_eq!(yicang[0].store, "");
        assert_eq!(yicang[0].country, "");

        // the warehouse directory is not a store
        assert!(locate(&ctx, descriptor(CategoryId::ChangjingWarehouse)).unwrap().is_empty());
    }

    #[test]
    fn missing_warehouse_dir_is_empty() {
        let dir = tempdir().unwrap();
        let ctx = MergeContext::new(dir.path(), dir.path().join("out"), TaskId::new("T"));
        assert!(locate(&ctx, descriptor(CategoryId::YicangWarehouse)).unwrap().is_empty());
    }
}
