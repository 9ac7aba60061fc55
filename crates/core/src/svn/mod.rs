//! SVN CLI wrapper and output parsers.

pub mod client;
pub mod parser;
pub mod status;

pub use client::{SvnClient, MAX_OUTPUT_BYTES};
pub use parser::*;
pub use status::{classify_status, parse_status_line, ClassifiedStatus, LineClass, StatusEntry};
