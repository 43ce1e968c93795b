use std::path::PathBuf;

use crate::config::SuiteRunConfig;
use crate::connection::{self, ConnectionProfile};
use crate::consumer::{ConsumerOverrides, DbConsumer};
use crate::error::{Error, Result, Step};
use crate::hook::SuiteEvent;
use crate::process::{CommandSpec, ProcessRunner};

/// Where the orchestrator is in the suite lifecycle.
///
/// The tests themselves run while the orchestrator sits in [Phase::Ready];
/// it only acts inside the two hook sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Idle,
	BeforeSuiteRunning,
	Ready,
	AfterSuiteRunning,
}

/// What a generated file is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactRole {
	BeforeBackup,
	AfterBackup,
	BaselineRestoreSource,
	FixtureDump,
}

/// A file artifact produced or consumed by the suite sequences.
///
/// Backup artifact names are deterministic, so repeated runs in the same
/// environment overwrite rather than accumulate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureArtifact {
	pub role: ArtifactRole,
	pub path: PathBuf,
}

impl FixtureArtifact {
	/// `<backup_path>_before<env_label>.sql`
	pub fn before_backup(backup_path: &str, env_label: &str) -> FixtureArtifact {
		FixtureArtifact {
			role: ArtifactRole::BeforeBackup,
			path: PathBuf::from(format!("{}_before{}.sql", backup_path, env_label)),
		}
	}

	/// `<backup_path>_after<env_label>.sql`
	pub fn after_backup(backup_path: &str, env_label: &str) -> FixtureArtifact {
		FixtureArtifact {
			role: ArtifactRole::AfterBackup,
			path: PathBuf::from(format!("{}_after{}.sql", backup_path, env_label)),
		}
	}
}

/// Drives the before-suite and after-suite sequences.
///
/// On every hook invocation the connection profile is resolved fresh, the
/// engine adapter is selected once, and the destructive steps run strictly
/// in order. Ordering is the correctness guarantee here: the fixture dump
/// the consumer ends up wired to is always the last artifact written in the
/// before-suite phase.
pub struct FixtureOrchestrator<R, C> {
	config: SuiteRunConfig,
	runner: R,
	consumer: Option<C>,
	phase: Phase,
}

impl<R: ProcessRunner, C: DbConsumer> FixtureOrchestrator<R, C> {
	/// A missing consumer is allowed; both hooks then degrade to logged
	/// no-ops instead of failing the suite.
	pub fn new(config: SuiteRunConfig, runner: R, consumer: Option<C>) -> Self {
		FixtureOrchestrator {
			config,
			runner,
			consumer,
			phase: Phase::Idle,
		}
	}

	pub fn phase(&self) -> Phase {
		self.phase
	}

	pub fn config(&self) -> &SuiteRunConfig {
		&self.config
	}

	/// Replace the suite configuration before the next phase.
	/// The sequences themselves never reload it mid-run.
	pub fn set_config(&mut self, config: SuiteRunConfig) {
		self.config = config;
	}

	/// The before-suite sequence: optional backup, baseline restore,
	/// migrations, seeding, fixture dump, consumer rewire.
	///
	/// Configuration errors abort before anything destructive happened.
	/// Migration and seed failures abort the remaining steps; backup and
	/// dump failures are logged but do not block the suite.
	pub fn before_suite(&mut self, event: &SuiteEvent) -> Result<()> {
		let profile = match self.resolve(event) {
			Ok(profile) => profile,
			Err(Error::CollaboratorUnavailable) => {
				warn!("Db consumer module is not available, skipping fixture setup");
				return Ok(());
			},
			Err(e) => return Err(e),
		};

		self.phase = Phase::BeforeSuiteRunning;
		let res = self.run_before(&profile);
		self.phase = if res.is_ok() { Phase::Ready } else { Phase::Idle };
		res
	}

	/// The after-suite sequence: optional backup, then the rollback to the
	/// `_before` artifact when both the before-backup and the consumer's
	/// cleanup setting allow it.
	pub fn after_suite(&mut self, event: &SuiteEvent) -> Result<()> {
		let profile = match self.resolve(event) {
			Ok(profile) => profile,
			Err(Error::CollaboratorUnavailable) => {
				warn!("Db consumer module is not available, skipping fixture teardown");
				return Ok(());
			},
			Err(e) => return Err(e),
		};

		self.phase = Phase::AfterSuiteRunning;
		let res = self.run_after(&profile);
		self.phase = Phase::Idle;
		res
	}

	fn run_before(&mut self, profile: &ConnectionProfile) -> Result<()> {
		if self.config.backup_before {
			let artifact = FixtureArtifact::before_backup(&self.config.backup_path, &profile.env_label);
			// A failed backup should not block test execution, but it
			// removes the rollback safety net, hence the loud log.
			self.try_dump(Step::BackupBefore, profile, &artifact);
		}

		// Point of no return: the consumer overwrites the database with
		// the baseline from here on.
		info!("restoring local database from baseline {}...", profile.baseline_dump);
		let overrides = ConsumerOverrides::default()
			.populate(true)
			.dump(&profile.baseline_dump);
		self.rewire_consumer(Step::BaselineRestore, &overrides)?;
		info!("done");

		self.run_user_command(Step::Migrate, self.config.migrations.clone())?;
		self.run_user_command(Step::Seed, self.config.seed.clone())?;

		let fixture = FixtureArtifact {
			role: ArtifactRole::FixtureDump,
			path: self.config.fixture_dump.clone(),
		};
		self.try_dump(Step::FixtureDump, profile, &fixture);

		// Even if the dump failed we still rewire the consumer, so it is
		// at least pointed at the conventional fixture path.
		info!("re-configuring Db consumer to restore from {}...", fixture.path.display());
		let overrides = ConsumerOverrides::default()
			.dump(fixture.path.display().to_string());
		self.rewire_consumer(Step::RewireConsumer, &overrides)?;
		info!("done");

		Ok(())
	}

	fn run_after(&mut self, profile: &ConnectionProfile) -> Result<()> {
		if self.config.backup_after {
			let artifact = FixtureArtifact::after_backup(&self.config.backup_path, &profile.env_label);
			self.try_dump(Step::BackupAfter, profile, &artifact);
		}

		let cleanup = self.consumer.as_ref().map_or(false, |c| c.get_bool("cleanup"));
		if self.config.backup_before && cleanup {
			let artifact = FixtureArtifact {
				role: ArtifactRole::BaselineRestoreSource,
				path: FixtureArtifact::before_backup(&self.config.backup_path, &profile.env_label).path,
			};
			info!("restoring local database from backup {}...", artifact.path.display());
			let cmd = profile.kind.adapter().restore_command(profile, &artifact.path);
			match self.run_step(Step::Rollback, &cmd) {
				Ok(()) => info!("done"),
				Err(e) => error!("{}", e),
			}
		}

		Ok(())
	}

	fn resolve(&self, event: &SuiteEvent) -> Result<ConnectionProfile> {
		let consumer = self.consumer.as_ref().ok_or(Error::CollaboratorUnavailable)?;
		connection::resolve(&self.config, consumer, &event.settings)
	}

	/// Dump the database to an artifact, logging instead of failing.
	fn try_dump(&mut self, step: Step, profile: &ConnectionProfile, artifact: &FixtureArtifact) {
		info!("dumping local database to {}...", artifact.path.display());
		let cmd = profile.kind.adapter().dump_command(profile, &artifact.path);
		match self.run_step(step, &cmd) {
			Ok(()) => info!("done"),
			Err(e) => error!("{}", e),
		}
	}

	/// Run a user-supplied shell command. An empty command means the step
	/// is not configured and performs no process invocation at all.
	fn run_user_command(&mut self, step: Step, command: Option<String>) -> Result<()> {
		let command = match command {
			Some(c) if !c.trim().is_empty() => c,
			_ => return Ok(()),
		};

		info!("running {} command...", step);
		// Failing here leaves the schema in an unknown state, so the
		// remaining steps must not run.
		self.run_step(step, &CommandSpec::shell(&command))?;
		info!("done");
		Ok(())
	}

	fn run_step(&mut self, step: Step, cmd: &CommandSpec) -> Result<()> {
		debug!("{}: running `{}`", step, cmd);
		match self.runner.run(cmd) {
			Ok(out) if out.success() => Ok(()),
			Ok(out) => Err(Error::Process {
				step,
				command: cmd.to_string(),
				status: out.status,
				detail: out.stderr.trim().to_string(),
			}),
			Err(e) => Err(Error::Process {
				step,
				command: cmd.to_string(),
				status: None,
				detail: format!("{:#}", e),
			}),
		}
	}

	fn rewire_consumer(&mut self, step: Step, overrides: &ConsumerOverrides) -> Result<()> {
		let consumer = self.consumer.as_mut().ok_or(Error::CollaboratorUnavailable)?;
		consumer.reconfigure(overrides)
			.map_err(|e| Error::Collaborator { step, cause: e })?;
		consumer.initialize()
			.map_err(|e| Error::Collaborator { step, cause: e })?;
		Ok(())
	}
}
