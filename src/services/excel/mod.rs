pub mod loader;
pub mod summarizer;
pub mod types;
pub mod utils;

pub use loader::{ExcelLoader, LoadedSheet};
pub use summarizer::{ColumnSummarizer, ColumnSummary};
pub use types::{ColumnKind, Table};
