use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context;

/// An external command as pure data.
///
/// Adapters and the orchestrator only ever build these; running them is the
/// [ProcessRunner]'s job, so a test never has to spawn real database tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
	pub program: String,
	pub args: Vec<String>,
	/// File fed to the process on stdin, the `mysql < dump.sql` convention.
	pub stdin: Option<PathBuf>,
	/// File the process output is redirected to, the `mysqldump > dump.sql`
	/// convention.
	pub stdout: Option<PathBuf>,
}

impl CommandSpec {
	pub fn new(program: impl Into<String>) -> CommandSpec {
		CommandSpec {
			program: program.into(),
			args: Vec::new(),
			stdin: None,
			stdout: None,
		}
	}

	/// A user-supplied shell command, run through `sh -c`.
	pub fn shell(command: &str) -> CommandSpec {
		CommandSpec::new("sh").arg("-c").arg(command)
	}

	pub fn arg(mut self, arg: impl Into<String>) -> CommandSpec {
		self.args.push(arg.into());
		self
	}

	pub fn stdin_file(mut self, path: impl Into<PathBuf>) -> CommandSpec {
		self.stdin = Some(path.into());
		self
	}

	pub fn stdout_file(mut self, path: impl Into<PathBuf>) -> CommandSpec {
		self.stdout = Some(path.into());
		self
	}
}

impl fmt::Display for CommandSpec {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.program)?;
		for arg in &self.args {
			if arg.contains(char::is_whitespace) {
				write!(f, " '{}'", arg)?;
			} else {
				write!(f, " {}", arg)?;
			}
		}
		if let Some(stdin) = &self.stdin {
			write!(f, " < {}", stdin.display())?;
		}
		if let Some(stdout) = &self.stdout {
			write!(f, " > {}", stdout.display())?;
		}
		Ok(())
	}
}

/// What an external process left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
	/// Exit code, absent when the process was killed by a signal.
	pub status: Option<i32>,
	pub stdout: String,
	pub stderr: String,
}

impl ProcessOutput {
	pub fn success(&self) -> bool {
		self.status == Some(0)
	}
}

/// Narrow boundary for external process execution.
///
/// The orchestrator only needs "run this synchronously and tell me how it
/// went"; everything else (redirections, capture) is carried on the
/// [CommandSpec].
pub trait ProcessRunner {
	fn run(&mut self, cmd: &CommandSpec) -> anyhow::Result<ProcessOutput>;
}

/// The real runner, blocking on [std::process::Command].
///
/// No timeout is enforced; dump and migration commands are assumed to be
/// short-lived trusted local tools.
#[derive(Debug, Default)]
pub struct ExecRunner;

impl ProcessRunner for ExecRunner {
	fn run(&mut self, c: &CommandSpec) -> anyhow::Result<ProcessOutput> {
		let mut cmd = Command::new(&c.program);
		cmd.args(&c.args);

		match &c.stdin {
			Some(path) => {
				let file = File::open(path)
					.with_context(|| format!("failed to open stdin file {}", path.display()))?;
				cmd.stdin(Stdio::from(file));
			},
			None => {
				cmd.stdin(Stdio::null());
			},
		}
		if let Some(path) = &c.stdout {
			ensure_parent_dir(path)?;
			let file = File::create(path)
				.with_context(|| format!("failed to create output file {}", path.display()))?;
			cmd.stdout(Stdio::from(file));
		}

		trace!("spawning `{}`", c);
		let output = cmd.output()
			.with_context(|| format!("failed to spawn `{}`", c))?;

		Ok(ProcessOutput {
			status: output.status.code(),
			stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
			stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
		})
	}
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() && !parent.exists() {
			fs::create_dir_all(parent)
				.with_context(|| format!("failed to create directory {}", parent.display()))?;
		}
	}
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn display_renders_redirections() {
		let cmd = CommandSpec::new("mysql")
			.arg("-h").arg("localhost")
			.stdin_file("/tmp/in.sql");
		assert_eq!(cmd.to_string(), "mysql -h localhost < /tmp/in.sql");

		let cmd = CommandSpec::new("mysqldump").arg("app").stdout_file("/tmp/out.sql");
		assert_eq!(cmd.to_string(), "mysqldump app > /tmp/out.sql");
	}

	#[test]
	fn shell_commands_go_through_sh() {
		let cmd = CommandSpec::shell("echo ok");
		assert_eq!(cmd.program, "sh");
		assert_eq!(cmd.args, vec!["-c".to_string(), "echo ok".to_string()]);
		assert_eq!(cmd.to_string(), "sh -c 'echo ok'");
	}

	#[test]
	fn exec_runner_captures_exit_status() {
		let ok = ExecRunner.run(&CommandSpec::shell("exit 0")).unwrap();
		assert!(ok.success());
		let fail = ExecRunner.run(&CommandSpec::shell("echo oops >&2; exit 3")).unwrap();
		assert!(!fail.success());
		assert_eq!(fail.status, Some(3));
		assert_eq!(fail.stderr.trim(), "oops");
	}
}
