pub mod types;
pub mod date_format;
