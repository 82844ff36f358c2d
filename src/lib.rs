pub mod config;
pub mod dashboard;
pub mod duck;
pub mod error;
pub mod etl;
pub mod load;
pub mod process;
pub mod schema;
