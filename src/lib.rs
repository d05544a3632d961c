//! Extract-load-transform pipeline for the e-commerce shipping dataset:
//! data portal → object storage → warehouse table.

pub mod config;
pub mod fetch;
pub mod flow;
pub mod process;
pub mod schema;
pub mod storage;
pub mod warehouse;

#[cfg(test)]
pub(crate) mod testing;

pub use config::PipelineConfig;
