use std::fmt;

/// The orchestration step during which a failure occurred.
///
/// Carried on [Error::Process] and [Error::Collaborator] so that a failure
/// log names the step and not just the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
	BackupBefore,
	BaselineRestore,
	Migrate,
	Seed,
	FixtureDump,
	RewireConsumer,
	BackupAfter,
	Rollback,
}

impl fmt::Display for Step {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let s = match self {
			Step::BackupBefore => "before-suite backup",
			Step::BaselineRestore => "baseline restore",
			Step::Migrate => "migrate",
			Step::Seed => "seed",
			Step::FixtureDump => "fixture dump",
			Step::RewireConsumer => "consumer rewire",
			Step::BackupAfter => "after-suite backup",
			Step::Rollback => "rollback restore",
		};
		f.write_str(s)
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// A required connection setting is missing or invalid.
	/// Surfaced before any destructive action is taken.
	#[error("missing or invalid connection setting: {0}")]
	Configuration(&'static str),

	/// The external Db consumer module is not available.
	/// The hooks treat this as a logged no-op, not a suite failure.
	#[error("the Db consumer module is not available")]
	CollaboratorUnavailable,

	/// An external process exited non-zero or could not be spawned.
	#[error("{step} failed: `{command}` exited with {} ({detail})", status_str(.status))]
	Process {
		step: Step,
		command: String,
		/// Exit code, if the process ran and was not killed by a signal.
		status: Option<i32>,
		/// Captured stderr, or the spawn error.
		detail: String,
	},

	/// The Db consumer rejected a reconfigure or initialize call.
	#[error("{step} failed: Db consumer error: {cause:#}")]
	Collaborator {
		step: Step,
		cause: anyhow::Error,
	},
}

fn status_str(status: &Option<i32>) -> String {
	match status {
		Some(code) => format!("status {}", code),
		None => "no exit status".to_string(),
	}
}

pub type Result<T> = std::result::Result<T, Error>;
