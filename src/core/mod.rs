pub mod capture_source;
pub mod preset;
pub mod run_data;
