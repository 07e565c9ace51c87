//! Self-describing, column-oriented `@UTF` metadata tables.
//!
//! A table is a set of rows ([`MetaPage`]) sharing one schema. Each column
//! stores its values in one of three ways: not at all (every row is null),
//! once for all rows, or once per row. See [`MetaSection::load`].

mod element;
mod header;
mod page;
mod section;

pub use element::{ElementType, ElementValue, MetaElement, StorageKind};
pub use header::{MetaTableHeader, MetaTableInfo, UTF_SIGNATURE};
pub use page::MetaPage;
pub use section::MetaSection;
