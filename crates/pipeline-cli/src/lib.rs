//! Library half of the `pipeline-cli` smoke-test harness: CLI-level
//! configuration and the offline fake provider, kept separate from
//! `main.rs` so both can be exercised from integration tests.

pub mod config;
pub mod fake_provider;
