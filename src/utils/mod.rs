mod format;
mod plurals;

pub use format::{format_bytes, format_commas, format_duration, format_eta, parse_byte_size};
pub use plurals::pluralize;
