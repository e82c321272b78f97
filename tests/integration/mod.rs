//! Integration test suite for git-autoupdate
//!
//! End-to-end update cycles against real git repositories served over
//! `file://`, with the remote manifest served by a local HTTP stub. Requires a
//! `git` executable on `PATH`.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration --features test-utils
//! ```
//!
//! # Test Organization
//!
//! - **config**: loading update configuration from TOML files
//! - **update_cycle**: full cycles through the production fetcher, source and runner

mod config;
mod update_cycle;
