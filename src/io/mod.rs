// src/io/mod.rs

pub mod demand;
pub mod reporting;
pub mod table;

pub use table::{read_csv, read_spreadsheet, read_table};
