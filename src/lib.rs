
//! dbslate manages the lifecycle of a disposable test database around a
//! test-suite run.
//!
//! Before a suite it can back up the current local database, restore the
//! known-good baseline through the external Db consumer, run migration and
//! seed commands, and finally capture a fixture dump that the consumer
//! restores before every test. After the suite it can take another backup
//! and roll the database back to the pre-run state.
//!
//! The actual database engines are never touched directly. All destructive
//! work happens through the command-line dump/restore tools of the engine
//! (`pg_dump`/`pg_restore` or `mysqldump`/`mysql`), invoked through the
//! [ProcessRunner] boundary so tests can fake them.

#[macro_use]
extern crate log;

pub mod config;
pub mod connection;
pub mod constants;
pub mod consumer;
pub mod engine;
pub mod error;
pub mod hook;
pub mod orchestrator;
pub mod process;
pub mod util;

pub use config::SuiteRunConfig;
pub use connection::{ConnectionProfile, DbKind};
pub use consumer::{ConsumerOverrides, DbConsumer};
pub use engine::EngineAdapter;
pub use error::{Error, Step};
pub use hook::{SuiteEvent, SuiteSettings};
pub use orchestrator::{ArtifactRole, FixtureArtifact, FixtureOrchestrator, Phase};
pub use process::{CommandSpec, ExecRunner, ProcessOutput, ProcessRunner};
