//! Core types shared by every shopmerge crate.
//!
//! A [`Table`] is the in-memory form of one sheet or CSV file: ordered,
//! uniquely-named columns and rows kept in file order.

pub mod table;
pub mod value;

pub use table::Table;
pub use value::Value;
