pub mod assembler;
pub mod error;
pub(crate) mod parquet;
pub mod planner;
pub mod writer;
