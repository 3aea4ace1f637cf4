pub mod models;
pub mod sweep;
