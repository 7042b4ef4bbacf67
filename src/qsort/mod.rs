pub mod config;
pub mod core;
pub mod error;
pub mod lines;
pub mod promise;


pub use self::config::*;
pub use self::core::*;
pub use self::error::*;
pub use self::lines::{LineSortConfig, find_disorder, parse_number, sort_and_output, sort_records, split_records};
