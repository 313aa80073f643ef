pub mod fixture;
pub mod marks;
pub mod models;
pub mod types;
