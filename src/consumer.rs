use serde_json::Value;

/// Configuration overrides pushed into the Db consumer.
///
/// Only the keys this orchestrator actually rewires are modelled; the
/// consumer merges them into its live configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerOverrides {
	/// Make the consumer repopulate the database from its dump on
	/// initialization.
	pub populate: Option<bool>,
	/// The dump file the consumer restores from.
	pub dump: Option<String>,
}

impl ConsumerOverrides {
	pub fn populate(mut self, populate: bool) -> ConsumerOverrides {
		self.populate = Some(populate);
		self
	}

	pub fn dump(mut self, dump: impl Into<String>) -> ConsumerOverrides {
		self.dump = Some(dump.into());
		self
	}
}

/// The external Db module that owns live database connectivity and per-test
/// restoration.
///
/// This orchestrator never opens a database connection itself; it only
/// rewires which dump the consumer restores from and asks it to reapply its
/// configuration.
pub trait DbConsumer {
	/// Read a named setting (`dsn`, `dump`, `user`, `password`, `cleanup`).
	fn get_config(&self, key: &str) -> Option<Value>;

	/// Merge overrides into the live configuration.
	fn reconfigure(&mut self, overrides: &ConsumerOverrides) -> anyhow::Result<()>;

	/// Apply the current configuration, typically re-connecting and
	/// repopulating from the configured dump path.
	fn initialize(&mut self) -> anyhow::Result<()>;

	/// A setting as string, with non-string scalars rendered.
	fn get_str(&self, key: &str) -> Option<String> {
		match self.get_config(key)? {
			Value::String(s) => Some(s),
			Value::Null => None,
			other => Some(other.to_string()),
		}
	}

	/// A setting as bool. Absent or unrecognized values read as false.
	fn get_bool(&self, key: &str) -> bool {
		match self.get_config(key) {
			Some(Value::Bool(b)) => b,
			Some(Value::String(s)) => s == "true" || s == "1",
			Some(Value::Number(n)) => n.as_i64() == Some(1),
			_ => false,
		}
	}
}
