//! Buffer manager: turns raw sweep stdout into parsed samples.

mod manager;
pub mod parser;
pub mod validation;

pub use manager::{BufferManager, BufferStats};
pub use parser::{is_non_data_line, parse_line, InvalidLine, ParsedLine};
pub use validation::{validate, ValidationIssue};
