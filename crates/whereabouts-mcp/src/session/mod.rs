//! Session management for the inference engine.

pub mod manager;

pub use manager::WhereaboutsSession;
