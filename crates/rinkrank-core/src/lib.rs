// Library root: re-exports all modules so integration tests and the CLI
// binary can reach the engine's public API.

pub mod annotations;
pub mod bio;
pub mod config;
pub mod db;
pub mod engine;
pub mod query;
pub mod rating;
pub mod stats;
