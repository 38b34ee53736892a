// File: `crates/osa-core/src/lib.rs`
pub mod buffer;
pub mod change;
pub mod error;
pub mod tracker;
