pub mod bad_rows;
pub mod compression;
pub mod source;
