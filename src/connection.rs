use std::collections::BTreeMap;

use crate::config::SuiteRunConfig;
use crate::consumer::DbConsumer;
use crate::engine::{self, EngineAdapter};
use crate::error::{Error, Result};
use crate::hook::SuiteSettings;

/// The database engine a suite run targets.
///
/// Selected exactly once while resolving the connection profile and never
/// re-derived inside step logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
	Mysql,
	Postgres,
}

impl DbKind {
	/// The engine selected by a configured engine label.
	///
	/// Only a case-insensitive `pgsql` selects postgres; every other
	/// non-empty label is treated as mysql-compatible.
	pub fn from_label(label: &str) -> DbKind {
		if label.eq_ignore_ascii_case("pgsql") {
			DbKind::Postgres
		} else {
			DbKind::Mysql
		}
	}

	/// The port the engine's tools default to.
	pub fn default_port(&self) -> u16 {
		match self {
			DbKind::Mysql => 3306,
			DbKind::Postgres => 5432,
		}
	}

	/// The adapter producing dump/restore command lines for this engine.
	pub fn adapter(&self) -> &'static dyn EngineAdapter {
		match self {
			DbKind::Mysql => &engine::MysqlAdapter,
			DbKind::Postgres => &engine::PostgresAdapter,
		}
	}
}

/// Everything needed to address the suite's database.
///
/// Rebuilt at the start of every hook invocation because the active
/// environment may change between suite runs, and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
	pub kind: DbKind,
	pub host: String,
	pub port: Option<u16>,
	/// The login used for dumps. Restores on postgres ignore this and
	/// authenticate as the fixed superuser.
	pub user: Option<String>,
	pub password: Option<String>,
	pub database: String,
	/// The known-good dump the Db consumer repopulates from.
	pub baseline_dump: String,
	/// `_<environment>` when the run is environment-scoped, empty otherwise.
	/// Part of every backup artifact name.
	pub env_label: String,
}

impl ConnectionProfile {
	pub fn port_or_default(&self) -> u16 {
		self.port.unwrap_or_else(|| self.kind.default_port())
	}
}

/// A parsed `<engine>:key1=val1;key2=val2;...` connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
	engine: String,
	params: BTreeMap<String, String>,
}

impl Dsn {
	/// Split a connection string into engine label and key/value pairs.
	///
	/// Pairs without a `=` are skipped; the value keeps any further `=`
	/// characters it contains.
	pub fn parse(dsn: &str) -> Result<Dsn> {
		let (engine, rest) = dsn.split_once(':').ok_or(Error::Configuration("dsn"))?;
		if engine.is_empty() {
			return Err(Error::Configuration("dsn"));
		}

		let mut params = BTreeMap::new();
		for pair in rest.split(';') {
			if let Some((key, value)) = pair.split_once('=') {
				params.insert(key.to_string(), value.to_string());
			}
		}
		Ok(Dsn { engine: engine.to_string(), params })
	}

	pub fn engine(&self) -> &str {
		&self.engine
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.params.get(key).map(|s| s.as_str())
	}

	/// The database name. `dbname` takes precedence over `database`
	/// when both keys appear.
	pub fn database(&self) -> Option<&str> {
		self.get("dbname").or_else(|| self.get("database"))
	}
}

/// Build a fresh [ConnectionProfile] for one hook invocation.
///
/// Connection parameters come from the consumer's DSN when it carries one,
/// and from the discrete suite settings otherwise. The baseline dump path is
/// environment-scoped: a suite running under an environment takes it from
/// that environment's `Db` module block, everything else uses the consumer's
/// own `dump` setting.
pub fn resolve(
	config: &SuiteRunConfig,
	consumer: &dyn DbConsumer,
	settings: &SuiteSettings,
) -> Result<ConnectionProfile> {
	let kind;
	let host;
	let port;
	let user;
	let password;
	let database;

	match consumer.get_str("dsn").filter(|d| !d.is_empty()) {
		Some(raw) => {
			let dsn = Dsn::parse(&raw)?;
			kind = DbKind::from_label(dsn.engine());
			host = dsn.get("host").map(str::to_string);
			port = parse_port(dsn.get("port"))?;
			database = dsn.database().map(str::to_string);
			match kind {
				// The consumer owns mysql credentials; they never
				// appear in the DSN itself.
				DbKind::Mysql => {
					user = consumer.get_str("user");
					password = consumer.get_str("password");
				},
				DbKind::Postgres => {
					user = dsn.get("user").map(str::to_string)
						.or_else(|| config.login.clone());
					password = dsn.get("password").map(str::to_string);
				},
			}
		},
		None => {
			kind = DbKind::from_label(config.database_type.as_deref().unwrap_or(""));
			host = config.host.clone();
			port = config.port;
			database = config.database.clone();
			match kind {
				DbKind::Mysql => {
					user = consumer.get_str("user");
					password = consumer.get_str("password");
				},
				DbKind::Postgres => {
					user = config.login.clone();
					password = consumer.get_str("password");
				},
			}
		},
	}

	let host = host.filter(|h| !h.is_empty()).ok_or(Error::Configuration("host"))?;
	let database = database.filter(|d| !d.is_empty())
		.ok_or(Error::Configuration("database"))?;

	let (env_label, baseline_dump) = match settings.environment() {
		Some(env) => {
			let block = settings.module_config("Db")
				.and_then(|b| b.get("dump"))
				.and_then(|d| d.as_str())
				.ok_or(Error::Configuration("dump"))?;
			(format!("_{}", env), block.to_string())
		},
		None => {
			let dump = consumer.get_str("dump")
				.filter(|d| !d.is_empty())
				.ok_or(Error::Configuration("dump"))?;
			(String::new(), dump)
		},
	};

	Ok(ConnectionProfile {
		kind, host, port, user, password, database, baseline_dump, env_label,
	})
}

fn parse_port(port: Option<&str>) -> Result<Option<u16>> {
	match port {
		None => Ok(None),
		Some(p) => Ok(Some(p.parse().map_err(|_| Error::Configuration("port"))?)),
	}
}
