use std::path::{Path, PathBuf};

use anyhow::Context;
use config::{Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants;

/// The orchestrator's own settings block for one suite run.
///
/// Loaded once per suite phase and treated as read-only afterwards. The
/// step logic never reaches into an ambient config object; everything it
/// needs lives here or on the resolved connection profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SuiteRunConfig {
	/// Back up the current local database before the baseline restore.
	/// This backup is the only thing that makes the after-suite
	/// rollback possible.
	#[serde(alias = "backupBefore")]
	pub backup_before: bool,
	/// Back up the database again after the suite finished.
	#[serde(alias = "backupAfter")]
	pub backup_after: bool,
	/// Path prefix for the `_before`/`_after` backup artifacts.
	pub backup_path: String,
	/// Shell command running the schema migrations, if any.
	pub migrations: Option<String>,
	/// Shell command seeding the migrated database, if any.
	pub seed: Option<String>,
	/// Where the per-test fixture dump is written.
	pub fixture_dump: PathBuf,

	// Discrete connection fallbacks, used when the Db consumer
	// carries no DSN.
	pub host: Option<String>,
	pub port: Option<u16>,
	pub login: Option<String>,
	pub database: Option<String>,
	pub database_type: Option<String>,
}

impl Default for SuiteRunConfig {
	fn default() -> SuiteRunConfig {
		SuiteRunConfig {
			backup_before: false,
			backup_after: false,
			backup_path: String::from("tests/_output/backup"),
			migrations: None,
			seed: None,
			fixture_dump: PathBuf::from(constants::DEFAULT_FIXTURE_DUMP),
			host: None,
			port: None,
			login: None,
			database: None,
			database_type: None,
		}
	}
}

impl SuiteRunConfig {
	/// Load the suite configuration from three layers:
	/// - the defaults defined in the Default impl
	/// - the config file passed in this function, if any
	/// - environment variables (prefixed with `DBSLATE_`)
	pub fn load(config_file: Option<&Path>) -> anyhow::Result<SuiteRunConfig> {
		let default = config::Config::try_from(&Self::default())
			.expect("default config failed to deconstruct");

		let mut builder = config::Config::builder()
			.add_source(default);
		if let Some(file) = config_file {
			builder = builder.add_source(File::from(file));
		}
		builder = builder.add_source(Environment::with_prefix("DBSLATE").separator("__"));

		let cfg = builder.build().context("error building config")?;
		Ok(cfg.try_deserialize().context("error parsing config")?)
	}
}
