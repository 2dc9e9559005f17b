mod format;
mod input;
mod output;
pub mod script;

pub use format::DocumentFormat;
pub use input::{load_document, parse_document_any, parse_document_str};
pub use output::{OutputDestination, OutputOptions, emit, serialize_value};
pub use script::{InputScript, ReplayReport, replay};
