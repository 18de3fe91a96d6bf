//! Text utilities
//!
//! Pure functions over user replies and completion output: date-range parsing,
//! JSON recovery, Markdown table extraction and fixed-width rendering, outbound
//! chunking, and intent recognition for global commands.

mod chunk;
mod dates;
pub mod intent;
mod json;
mod table;

pub use chunk::{RichFormat, split_for_transport};
pub use dates::{DATE_FORMAT_HELP, DateRange, DayMonth, parse_date_range};
pub use json::extract_json;
pub use table::{ItineraryTable, extract_table, format_table_monospace, strip_table_lines};
