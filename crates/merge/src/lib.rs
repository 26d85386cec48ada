//! `shopmerge-merge`: seller export merge engine.
//!
//! Finds each category's exports under a source directory, reads them,
//! normalizes their columns and writes one consolidated workbook per group.
//! Everything an invocation needs is passed in a [`MergeContext`].

mod amazon;
pub mod catalog;
pub mod context;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod locator;
pub mod model;
pub mod nanxi;
pub mod normalize;
pub mod rename;
pub mod run;

pub use catalog::{descriptor, descriptors, CategoryDescriptor};
pub use context::MergeContext;
pub use engine::merge_category;
pub use error::{MergeError, SkipReason};
pub use model::{CategoryId, CategoryReport, FileRecord, RunReport, TaskId, WarehouseKind};
pub use rename::rename_bill_details;
pub use run::run;
