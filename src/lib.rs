pub mod accumulator;
pub mod analytics;
pub mod error;
pub mod events;
pub mod export;
pub mod infra;
pub mod pipeline;
pub mod recorder;
pub mod report;
pub mod services;
pub mod storage;
