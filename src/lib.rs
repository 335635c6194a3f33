pub mod blocks;
pub mod config;
pub mod core;
pub mod engine;
pub mod expr;
pub mod observability;
pub mod registry;
pub mod resilience;
