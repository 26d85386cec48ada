use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::error::SkipReason;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// A kind of seller export merged into its own workbook(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CategoryId {
    #[serde(rename = "order")]
    Order,
    #[serde(rename = "bill")]
    Bill,
    #[serde(rename = "shipping-fee")]
    ShippingFee,
    #[serde(rename = "return-fee")]
    ReturnFee,
    #[serde(rename = "settlement")]
    Settlement,
    #[serde(rename = "finance-detail")]
    FinanceDetail,
    #[serde(rename = "yicang")]
    YicangWarehouse,
    #[serde(rename = "changjing")]
    ChangjingWarehouse,
    #[serde(rename = "koda")]
    KodaWarehouse,
    #[serde(rename = "nanxi")]
    NanxiReconcile,
    #[serde(rename = "amazon-settlement")]
    AmazonSettlement,
}

impl CategoryId {
    /// Every category, in the order a run processes them.
    pub const ALL: [CategoryId; 11] = [
        CategoryId::Order,
        CategoryId::Bill,
        CategoryId::ShippingFee,
        CategoryId::ReturnFee,
        CategoryId::Settlement,
        CategoryId::FinanceDetail,
        CategoryId::YicangWarehouse,
        CategoryId::ChangjingWarehouse,
        CategoryId::KodaWarehouse,
        CategoryId::NanxiReconcile,
        CategoryId::AmazonSettlement,
    ];

    pub fn id(self) -> &'static str {
        match self {
            CategoryId::Order => "order",
            CategoryId::Bill => "bill",
            CategoryId::ShippingFee => "shipping-fee",
            CategoryId::ReturnFee => "return-fee",
            CategoryId::Settlement => "settlement",
            CategoryId::FinanceDetail => "finance-detail",
            CategoryId::YicangWarehouse => "yicang",
            CategoryId::ChangjingWarehouse => "changjing",
            CategoryId::KodaWarehouse => "koda",
            CategoryId::NanxiReconcile => "nanxi",
            CategoryId::AmazonSettlement => "amazon-settlement",
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CategoryId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryId::ALL
            .into_iter()
            .find(|c| c.id() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = CategoryId::ALL.iter().map(|c| c.id()).collect();
                format!("unknown category '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// Where a returned parcel was sent, from the return-fee file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WarehouseKind {
    TemuWarehouse,
    MerchantWarehouse,
    Unclassified,
}

impl WarehouseKind {
    /// Value written into the warehouse-type column.
    pub fn tag(self) -> &'static str {
        match self {
            WarehouseKind::TemuWarehouse => "TEMU仓",
            WarehouseKind::MerchantWarehouse => "商家仓",
            WarehouseKind::Unclassified => "未分类",
        }
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// One discovered input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Empty for the warehouse-consolidated layout
    pub store: String,
    pub country: String,
    pub path: PathBuf,
    pub category: CategoryId,
    pub warehouse: Option<WarehouseKind>,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreRows {
    pub store: String,
    pub country: String,
    pub rows: usize,
}

/// Outcome of merging one category.
#[derive(Debug, Serialize)]
pub struct CategoryReport {
    pub category: CategoryId,
    pub files_matched: usize,
    pub files_read: usize,
    pub rows_merged: usize,
    /// In order of first appearance
    pub rows_by_store: Vec<StoreRows>,
    pub outputs: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
    pub elapsed_ms: u128,
    /// Set when the category stopped early
    pub error: Option<String>,
}

impl CategoryReport {
    pub fn new(category: CategoryId) -> Self {
        Self {
            category,
            files_matched: 0,
            files_read: 0,
            rows_merged: 0,
            rows_by_store: Vec::new(),
            outputs: Vec::new(),
            skipped: Vec::new(),
            elapsed_ms: 0,
            error: None,
        }
    }

    pub fn add_rows(&mut self, store: &str, country: &str, rows: usize) {
        match self
            .rows_by_store
            .iter_mut()
            .find(|s| s.store == store && s.country == country)
        {
            Some(entry) => entry.rows += rows,
            None => self.rows_by_store.push(StoreRows {
                store: store.to_string(),
                country: country.to_string(),
                rows,
            }),
        }
    }

    pub fn skip(&mut self, path: PathBuf, reason: SkipReason) {
        log::warn!("skipping {}: {}", path.display(), reason);
        self.skipped.push(SkippedFile { path, reason });
    }
}

/// Outcome of one invocation across all selected categories.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub task_id: String,
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub categories: Vec<CategoryReport>,
    pub elapsed_ms: u128,
}

impl RunReport {
    pub fn outputs(&self) -> impl Iterator<Item = &PathBuf> {
        self.categories.iter().flat_map(|c| c.outputs.iter())
    }

    pub fn failed(&self) -> impl Iterator<Item = &CategoryReport> {
        self.categories.iter().filter(|c| c.error.is_some())
    }
}

// ---------------------------------------------------------------------------
// Task id
// ---------------------------------------------------------------------------

/// Identifier embedded in every output file name of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Local timestamp, `%Y%m%d_%H%M%S`.
    pub fn generate() -> Self {
        Self(chrono::Local::now().format("%Y%m%d_%H%M%S").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
