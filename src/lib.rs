//! # Fixture Harness
//!
//! Simulated algorithm/problem executables and an end-to-end integration
//! harness for a distributed machine-learning orchestration platform.
//!
//! The fixture executables stand in for user-submitted code. Instead of
//! learning anything, they recognize their inputs by content hash and copy
//! a pre-baked output for each one. Unknown inputs are a broken test
//! contract and abort the run.
//!
//! ## Architecture
//!
//! ```text
//!  input dir ──▶ checksum::validate_dir ──▶ copier::FixtureStore ──▶ output dir
//!                      │ (HashTable)               (fixture dir)
//!                      ▼
//!              algo / problem tasks ──▶ ledger (model_trained.json)
//!                                   └─▶ performance.json
//!
//!  integration-harness: metadata ──▶ client (storage, orchestrator) ──▶ poll uplets
//! ```
//!
//! ## Binaries
//!
//! ```bash
//! algo-fixture -T train -V /data/volume
//! algo-fixture -T predict -V /data/volume
//! problem-fixture -T detarget -i /hidden -s /submission
//! problem-fixture -T perf -i /hidden -s /submission
//! integration-harness --config ./config/harness.toml
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`checksum`] | Hash table and directory validation |
//! | [`copier`] | Fixture substitution |
//! | [`ledger`] | Model ledger stub |
//! | [`algo`] | `train` / `predict` tasks |
//! | [`problem`] | `detarget` / `perf` tasks |
//! | [`config`] | Harness TOML configuration |
//! | [`metadata`] | Fixture metadata (YAML) |
//! | [`client`] | Storage and orchestrator HTTP clients |
//! | [`harness`] | Learn/predict scenario and uplet polling |
//! | [`report`] | Step logging |
//! | [`error`] | Error taxonomy |

pub mod algo;
pub mod checksum;
pub mod client;
pub mod config;
pub mod copier;
pub mod error;
pub mod harness;
pub mod ledger;
pub mod metadata;
pub mod problem;
pub mod report;

pub use error::{Error, Result};
