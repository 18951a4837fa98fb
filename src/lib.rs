pub mod parser;
pub mod classify;
pub mod attribution;
pub mod submission;
pub mod report;
pub mod assembler;
pub mod store;
pub mod heatmap;
pub mod trend;
pub mod aggregate;
pub mod export;
pub mod feed;
pub mod config;
pub mod logging;
