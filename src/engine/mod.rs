//! Farm orchestration: registry, per-farm tickers and deferred persistence.

mod cell;
mod registry;
mod ticker;
mod writer;


pub use registry::FarmRegistry;
