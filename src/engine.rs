use std::env;
use std::path::{Path, PathBuf};

use crate::connection::ConnectionProfile;
use crate::constants::{self, env::{MYSQL_BINS, PG_BINS}};
use crate::process::CommandSpec;

/// Produces the engine-specific dump/restore command lines.
///
/// Exactly one implementation is selected per run, during connection
/// resolution ([crate::DbKind::adapter]). The commands are pure data and
/// never execute themselves.
pub trait EngineAdapter {
	/// The command dumping the whole database to `destination`.
	fn dump_command(&self, profile: &ConnectionProfile, destination: &Path) -> CommandSpec;

	/// The command restoring the database from `source`.
	fn restore_command(&self, profile: &ConnectionProfile, source: &Path) -> CommandSpec;
}

/// Locate an engine tool.
///
/// An explicit bins directory from the environment wins, then whatever is
/// on the path, then the bare tool name so the spawn error stays readable.
fn tool(bins_env: &str, name: &str) -> String {
	if let Ok(dir) = env::var(bins_env) {
		PathBuf::from(dir).join(name).display().to_string()
	} else if let Ok(path) = which::which(name) {
		path.display().to_string()
	} else {
		name.to_string()
	}
}

pub struct MysqlAdapter;

impl EngineAdapter for MysqlAdapter {
	/// `mysqldump --routines --databases ...` with stdout redirected to the
	/// destination file. Credentials ride on the command line; that is the
	/// mysql tools' own convention when shelling out.
	fn dump_command(&self, profile: &ConnectionProfile, destination: &Path) -> CommandSpec {
		mysql_base(tool(MYSQL_BINS, "mysqldump"), profile, &["--routines", "--databases"])
			.arg(&profile.database)
			.stdout_file(destination)
	}

	/// The plain `mysql` client, fed the dump on stdin.
	fn restore_command(&self, profile: &ConnectionProfile, source: &Path) -> CommandSpec {
		mysql_base(tool(MYSQL_BINS, "mysql"), profile, &[])
			.arg(&profile.database)
			.stdin_file(source)
	}
}

fn mysql_base(program: String, profile: &ConnectionProfile, flags: &[&str]) -> CommandSpec {
	let mut cmd = CommandSpec::new(program);
	for flag in flags {
		cmd = cmd.arg(*flag);
	}
	cmd = cmd
		.arg("-h").arg(&profile.host)
		.arg("-P").arg(profile.port_or_default().to_string());
	if let Some(user) = &profile.user {
		cmd = cmd.arg("-u").arg(user);
	}
	if let Some(password) = &profile.password {
		cmd = cmd.arg(format!("-p{}", password));
	}
	cmd
}

pub struct PostgresAdapter;

impl EngineAdapter for PostgresAdapter {
	/// `pg_dump` in tar archive format, so the restore side can use
	/// `pg_restore --clean`.
	fn dump_command(&self, profile: &ConnectionProfile, destination: &Path) -> CommandSpec {
		let user = profile.user.as_deref().unwrap_or(constants::POSTGRES_SUPERUSER);
		CommandSpec::new(tool(PG_BINS, "pg_dump"))
			.arg("-h").arg(&profile.host)
			.arg("-p").arg(profile.port_or_default().to_string())
			.arg("-U").arg(user)
			.arg("-d").arg(&profile.database)
			.arg("-F").arg("t")
			.arg("--file").arg(destination.display().to_string())
	}

	/// `pg_restore --clean`, always authenticating as the fixed superuser.
	/// Restores need elevated privilege distinct from the application login.
	fn restore_command(&self, profile: &ConnectionProfile, source: &Path) -> CommandSpec {
		CommandSpec::new(tool(PG_BINS, "pg_restore"))
			.arg("-h").arg(&profile.host)
			.arg("-p").arg(profile.port_or_default().to_string())
			.arg("-U").arg(constants::POSTGRES_SUPERUSER)
			.arg("-d").arg(&profile.database)
			.arg("-c")
			.arg(source.display().to_string())
	}
}
