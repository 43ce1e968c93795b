use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// The event the host test framework passes into the suite hooks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuiteEvent {
	#[serde(default)]
	pub settings: SuiteSettings,
}

impl SuiteEvent {
	pub fn new(settings: SuiteSettings) -> SuiteEvent {
		SuiteEvent { settings }
	}
}

/// Suite-level settings carried on the hook event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuiteSettings {
	/// The environment the suite currently runs under, if the host
	/// framework distinguishes environments at all.
	pub current_environment: Option<String>,
	#[serde(default)]
	pub modules: ModuleSettings,
}

/// Per-module configuration blocks for the current environment.
///
/// Each entry is a map from module name to that module's settings block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleSettings {
	#[serde(default)]
	pub config: Vec<BTreeMap<String, Value>>,
}

impl SuiteSettings {
	/// The current environment, if set and non-empty.
	pub fn environment(&self) -> Option<&str> {
		self.current_environment.as_deref().filter(|e| !e.is_empty())
	}

	/// Look up the configuration block of the given module
	/// in the per-environment module settings.
	pub fn module_config(&self, module: &str) -> Option<&Value> {
		self.modules.config.iter().find_map(|block| block.get(module))
	}
}
