//! Labeled-sample generation: sampling, pricing, resampling and the batch driver.

pub mod config;
pub mod dataset;
pub mod generator;
pub mod io;
pub mod pipeline;
pub mod pricer;
pub mod sampler;
pub mod types;
