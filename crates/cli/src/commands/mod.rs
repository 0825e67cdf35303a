pub mod catalog;
pub mod migrate;
