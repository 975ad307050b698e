//! `shipvoid-io` - Source loading for the Shipvoid cross-reference.
//!
//! Reads the Shipvoid spreadsheet extract and the Legacy delimited-text
//! extract into header-normalized [`RawRecord`]s, validates required columns,
//! and locates the newest extract files on disk. No reconciliation logic.

pub mod csv;
pub mod discover;
pub mod error;
pub mod loader;
pub mod table;
pub mod xlsx;

pub use error::LoadError;
pub use loader::{load_source, LoadSpec, LoadedSource, MissingHeader, SheetSpec, TableSchema};
pub use table::{excel_serial_to_datetime, normalize_header, RawRecord, RawTable, RawValue, SourceKind};
