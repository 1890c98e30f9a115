mod text;

pub use text::{collapse_whitespace, truncate_chars};
