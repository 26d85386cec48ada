//! Static per-category behavior.
//!
//! Each category is one [`CategoryDescriptor`]; the generic executor in
//! [`crate::engine`] interprets it. Column names here are the exact headers
//! found in the platform exports.

use crate::model::{CategoryId, WarehouseKind};

/// Where a category's files live under the source root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `source/<store>/<file>`
    PerStore,
    /// `source/<warehouse dir>/<file>`, no store subdivision
    Warehouse,
    /// `source/<amazon dir>/<store>/*.csv`
    AmazonStores,
}

/// How the sheets of one workbook become merge groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetStrategy {
    /// Only the first sheet, one group
    First,
    /// One group (and one output) per sheet name
    Split,
    /// Every sheet stacked into one group
    Stack,
}

/// Index of the header among the non-blank rows of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRow {
    Fixed(usize),
    /// `row` when the store name contains `marker`, else `default`
    StoreMarker {
        default: usize,
        marker: &'static str,
        row: usize,
    },
}

impl HeaderRow {
    pub fn for_store(self, store: &str) -> usize {
        match self {
            HeaderRow::Fixed(row) => row,
            HeaderRow::StoreMarker {
                default,
                marker,
                row,
            } => {
                if store.contains(marker) {
                    row
                } else {
                    default
                }
            }
        }
    }
}

/// Collapse rows sharing `keys`, keeping the first row whose `prefer_filled`
/// cell is non-empty (else the first row).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupRule {
    pub keys: &'static [&'static str],
    pub prefer_filled: &'static str,
}

/// One keyword scan. Composite categories run several, first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordPass {
    pub keyword: &'static str,
    pub warehouse: Option<WarehouseKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Locate → read → normalize → merge → write
    Standard,
    Nanxi,
    Amazon,
}

#[derive(Debug, Clone, Copy)]
pub struct CategoryDescriptor {
    pub id: CategoryId,
    pub flow: Flow,
    pub passes: &'static [KeywordPass],
    pub layout: Layout,
    pub platform_prefix: &'static str,
    /// Output file label; also the worksheet name for unsplit outputs
    pub label: &'static str,
    pub sheet_strategy: SheetStrategy,
    pub header_row: HeaderRow,
    /// Source header → canonical header
    pub rename: &'static [(&'static str, &'static str)],
    pub canonical_order: &'static [&'static str],
    pub numeric_columns: &'static [&'static str],
    pub dedup: Option<DedupRule>,
    /// Column carrying the [`WarehouseKind`] tag
    pub warehouse_column: Option<&'static str>,
}

impl CategoryDescriptor {
    /// Primary keyword, used for log messages and the country prefix rule.
    pub fn keyword(&self) -> &'static str {
        self.passes.first().map(|p| p.keyword).unwrap_or_default()
    }

    /// `{prefix}{label}` or `{prefix}{label}-{sheet}`, without task id or extension.
    pub fn output_stem(&self, sheet: Option<&str>) -> String {
        match sheet {
            Some(sheet) => format!("{}{}-{}", self.platform_prefix, self.label, sheet),
            None => format!("{}{}", self.platform_prefix, self.label),
        }
    }
}

const fn single(keyword: &'static str) -> KeywordPass {
    KeywordPass {
        keyword,
        warehouse: None,
    }
}

const NO_RENAME: &[(&str, &str)] = &[];
const NO_COLUMNS: &[&str] = &[];

const NO_PASSES: &[KeywordPass] = &[];
const ORDER_PASSES: &[KeywordPass] = &[single("订单导出")];
const BILL_PASSES: &[KeywordPass] = &[single("对账中心")];
const SHIPPING_PASSES: &[KeywordPass] = &[single("发货面单费")];
const SETTLEMENT_PASSES: &[KeywordPass] = &[single("结算数据")];
const FINANCE_PASSES: &[KeywordPass] = &[single("账务中心-明细")];
const YICANG_PASSES: &[KeywordPass] = &[single("轶仓")];
const CHANGJING_PASSES: &[KeywordPass] = &[single("长鲸")];
const KODA_PASSES: &[KeywordPass] = &[single("KODA")];

pub const RETURN_WAREHOUSE_COLUMN: &str = "退货仓库类型";

const SHIPPING_RENAME: &[(&str, &str)] = &[
    ("Package Number", "包裹号"),
    ("Waybill Number", "运单号"),
    ("Service Provider Code", "服务商code"),
    ("Bill Type", "账单类型"),
    ("Shipping Fee (Unit: Yuan)", "运费"),
    ("Currency", "币种"),
    ("Reconciliation Bill Status", "对账单状态"),
    ("Expense/Refund Time (Time Zone: GMT+8)", "支出/退款时间(时区：GMT+8)"),
];

const SHIPPING_ORDER: &[&str] = &[
    "包裹号",
    "运单号",
    "服务商code",
    "账单类型",
    "运费",
    "币种",
    "对账单状态",
    "支出/退款时间(时区：GMT+8)",
];

const RETURN_RENAME: &[(&str, &str)] = &[
    ("reconciliationId", "对账ID"),
    ("waybill sn", "运单号"),
    ("parent orderSn", "父订单号"),
    ("deduct type desc", "扣款类型描述"),
    ("seller currency", "卖家币种"),
    ("freight charge", "运费"),
    ("deduct time", "扣款时间"),
];

const RETURN_ORDER: &[&str] = &[
    "对账ID",
    "运单号",
    "父订单号",
    "扣款类型描述",
    "卖家币种",
    "运费",
    "扣款时间",
];

const RETURN_PASSES: &[KeywordPass] = &[
    KeywordPass {
        keyword: "退至TEMU仓-退货面单费",
        warehouse: Some(WarehouseKind::TemuWarehouse),
    },
    KeywordPass {
        keyword: "退至商家仓-退货面单费",
        warehouse: Some(WarehouseKind::MerchantWarehouse),
    },
    KeywordPass {
        keyword: "退货面单费",
        warehouse: Some(WarehouseKind::Unclassified),
    },
];

pub const KODA_DEDUP: DedupRule = DedupRule {
    keys: &[
        "费用单据号 (No.）",
        "OMS单据号（OMS No.）",
        "物流跟踪号（Tacking No.）",
    ],
    prefer_filled: "出库费用小计（Subtotal）",
};

pub const AMAZON_NUMERIC_COLUMNS: &[&str] = &[
    "product sales",
    "product sales tax",
    "shipping credits",
    "shipping credits tax",
    "gift wrap credits",
    "giftwrap credits tax",
    "Regulatory Fee",
    "Tax On Regulatory Fee",
    "promotional rebates",
    "promotional rebates tax",
    "marketplace withheld tax",
    "selling fees",
    "fba fees",
    "other transaction fees",
    "other",
    "total",
];

const fn standard(
    id: CategoryId,
    passes: &'static [KeywordPass],
    platform_prefix: &'static str,
    label: &'static str,
    sheet_strategy: SheetStrategy,
) -> CategoryDescriptor {
    CategoryDescriptor {
        id,
        flow: Flow::Standard,
        passes,
        layout: Layout::PerStore,
        platform_prefix,
        label,
        sheet_strategy,
        header_row: HeaderRow::Fixed(0),
        rename: NO_RENAME,
        canonical_order: NO_COLUMNS,
        numeric_columns: NO_COLUMNS,
        dedup: None,
        warehouse_column: None,
    }
}

static DESCRIPTORS: [CategoryDescriptor; 11] = [
    standard(
        CategoryId::Order,
        ORDER_PASSES,
        "TEMU",
        "订单数据",
        SheetStrategy::First,
    ),
    standard(
        CategoryId::Bill,
        BILL_PASSES,
        "TEMU",
        "对账中心",
        SheetStrategy::Split,
    ),
    CategoryDescriptor {
        rename: SHIPPING_RENAME,
        canonical_order: SHIPPING_ORDER,
        ..standard(
            CategoryId::ShippingFee,
            SHIPPING_PASSES,
            "TEMU",
            "发货面单费",
            SheetStrategy::First,
        )
    },
    CategoryDescriptor {
        rename: RETURN_RENAME,
        canonical_order: RETURN_ORDER,
        warehouse_column: Some(RETURN_WAREHOUSE_COLUMN),
        ..standard(
            CategoryId::ReturnFee,
            RETURN_PASSES,
            "TEMU",
            "退货面单费",
            SheetStrategy::First,
        )
    },
    standard(
        CategoryId::Settlement,
        SETTLEMENT_PASSES,
        "TEMU",
        "结算数据",
        SheetStrategy::Split,
    ),
    standard(
        CategoryId::FinanceDetail,
        FINANCE_PASSES,
        "TEMU",
        "账务中心-明细",
        SheetStrategy::Stack,
    ),
    CategoryDescriptor {
        layout: Layout::Warehouse,
        header_row: HeaderRow::Fixed(3),
        ..standard(
            CategoryId::YicangWarehouse,
            YICANG_PASSES,
            "",
            "轶仓海外仓账单",
            SheetStrategy::Stack,
        )
    },
    standard(
        CategoryId::ChangjingWarehouse,
        CHANGJING_PASSES,
        "",
        "长鲸海外仓账单",
        SheetStrategy::Stack,
    ),
    CategoryDescriptor {
        dedup: Some(KODA_DEDUP),
        ..standard(
            CategoryId::KodaWarehouse,
            KODA_PASSES,
            "",
            "KODA海外仓账单",
            SheetStrategy::Split,
        )
    },
    // keywords come from the Nanxi settings
    CategoryDescriptor {
        flow: Flow::Nanxi,
        ..standard(CategoryId::NanxiReconcile, NO_PASSES, "", "南溪", SheetStrategy::First)
    },
    CategoryDescriptor {
        flow: Flow::Amazon,
        layout: Layout::AmazonStores,
        header_row: HeaderRow::StoreMarker {
            default: 7,
            marker: "AE",
            row: 6,
        },
        numeric_columns: AMAZON_NUMERIC_COLUMNS,
        ..standard(
            CategoryId::AmazonSettlement,
            NO_PASSES,
            "",
            "亚马逊结算数据汇总",
            SheetStrategy::First,
        )
    },
];

pub fn descriptor(id: CategoryId) -> &'static CategoryDescriptor {
    // laid out in declaration order of CategoryId
    &DESCRIPTORS[id as usize]
}

pub fn descriptors() -> &'static [CategoryDescriptor] {
    &DESCRIPTORS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_category_order() {
        for (category, descriptor) in CategoryId::ALL.iter().zip(descriptors()) {
            assert_eq!(*category, descriptor.id);
            assert_eq!(super::descriptor(*category).id, *category);
        }
    }

    #[test]
    fn output_stems() {
        assert_eq!(descriptor(CategoryId::Order).output_stem(None), "TEMU订单数据");
        assert_eq!(
            descriptor(CategoryId::Bill).output_stem(Some("Sheet1")),
            "TEMU对账中心-Sheet1"
        );
        assert_eq!(
            descriptor(CategoryId::YicangWarehouse).output_stem(None),
            "轶仓海外仓账单"
        );
    }

    #[test]
    fn amazon_header_row_depends_on_store() {
        let header = descriptor(CategoryId::AmazonSettlement).header_row;
        assert_eq!(header.for_store("Shop-US"), 7);
        assert_eq!(header.for_store("Shop-AE"), 6);
    }

    #[test]
    fn return_fee_specific_passes_come_first() {
        let passes = descriptor(CategoryId::ReturnFee).passes;
        assert_eq!(passes.last().map(|p| p.keyword), Some("退货面单费"));
        assert!(passes[..2].iter().all(|p| p.keyword.ends_with("退货面单费")));
    }
}
