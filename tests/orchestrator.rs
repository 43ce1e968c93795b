use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use serde_json::{json, Value};

use dbslate::{
	CommandSpec, ConsumerOverrides, DbConsumer, Error, FixtureOrchestrator, Phase,
	ProcessOutput, ProcessRunner, Step, SuiteEvent, SuiteRunConfig,
};

/// Everything the orchestrator did, in order, across both collaborators.
#[derive(Debug, Clone, PartialEq)]
enum Event {
	Run(CommandSpec),
	Reconfigure(ConsumerOverrides),
	Initialize,
}

type Log = Rc<RefCell<Vec<Event>>>;

struct FakeRunner {
	log: Log,
	/// Commands whose rendering contains this string exit non-zero.
	fail_matching: Option<String>,
}

impl ProcessRunner for FakeRunner {
	fn run(&mut self, cmd: &CommandSpec) -> anyhow::Result<ProcessOutput> {
		self.log.borrow_mut().push(Event::Run(cmd.clone()));
		let rendered = cmd.to_string();
		if self.fail_matching.as_deref().map_or(false, |m| rendered.contains(m)) {
			Ok(ProcessOutput { status: Some(1), stdout: String::new(), stderr: "boom".into() })
		} else {
			Ok(ProcessOutput { status: Some(0), stdout: String::new(), stderr: String::new() })
		}
	}
}

struct FakeConsumer {
	settings: Value,
	log: Log,
}

impl DbConsumer for FakeConsumer {
	fn get_config(&self, key: &str) -> Option<Value> {
		let v = self.settings.get(key)?;
		if v.is_null() { None } else { Some(v.clone()) }
	}

	fn reconfigure(&mut self, overrides: &ConsumerOverrides) -> anyhow::Result<()> {
		self.log.borrow_mut().push(Event::Reconfigure(overrides.clone()));
		Ok(())
	}

	fn initialize(&mut self) -> anyhow::Result<()> {
		self.log.borrow_mut().push(Event::Initialize);
		Ok(())
	}
}

fn mysql_consumer(log: &Log, cleanup: bool) -> FakeConsumer {
	FakeConsumer {
		settings: json!({
			"dsn": "mysql:host=localhost;port=3306;dbname=testdb",
			"user": "root",
			"password": "secret",
			"dump": "tests/_data/base.sql",
			"cleanup": cleanup,
		}),
		log: log.clone(),
	}
}

fn orchestrator(
	config: SuiteRunConfig,
	log: &Log,
	cleanup: bool,
	fail_matching: Option<&str>,
) -> FixtureOrchestrator<FakeRunner, FakeConsumer> {
	let runner = FakeRunner {
		log: log.clone(),
		fail_matching: fail_matching.map(str::to_string),
	};
	FixtureOrchestrator::new(config, runner, Some(mysql_consumer(log, cleanup)))
}

fn runs(log: &Log) -> Vec<CommandSpec> {
	log.borrow().iter()
		.filter_map(|e| match e {
			Event::Run(cmd) => Some(cmd.clone()),
			_ => None,
		})
		.collect()
}

fn is_dump(cmd: &CommandSpec) -> bool {
	cmd.program.ends_with("mysqldump")
}

fn is_restore(cmd: &CommandSpec) -> bool {
	!is_dump(cmd) && cmd.program.ends_with("mysql")
}

fn staging_event() -> SuiteEvent {
	serde_json::from_value(json!({
		"settings": {
			"current_environment": "staging",
			"modules": { "config": [
				{ "Db": { "dump": "tests/_data/staging.sql" } },
			] },
		},
	})).unwrap()
}

#[test]
fn full_cycle_names_backup_artifacts_deterministically() {
	let log: Log = Default::default();
	let cfg = SuiteRunConfig {
		backup_before: true,
		backup_after: true,
		backup_path: "/tmp/run".into(),
		..Default::default()
	};
	let mut orch = orchestrator(cfg, &log, false, None);

	let event = staging_event();
	orch.before_suite(&event).unwrap();
	orch.after_suite(&event).unwrap();

	let dumps: Vec<_> = runs(&log).into_iter().filter(is_dump).collect();
	assert_eq!(dumps.len(), 3); // before backup, fixture, after backup
	assert_eq!(dumps[0].stdout.as_deref(), Some(Path::new("/tmp/run_before_staging.sql")));
	assert_eq!(dumps[2].stdout.as_deref(), Some(Path::new("/tmp/run_after_staging.sql")));
}

#[test]
fn environment_selects_baseline_from_db_module_block() {
	let log: Log = Default::default();
	let mut orch = orchestrator(SuiteRunConfig::default(), &log, false, None);

	orch.before_suite(&staging_event()).unwrap();

	let first_reconfigure = log.borrow().iter()
		.find_map(|e| match e {
			Event::Reconfigure(o) => Some(o.clone()),
			_ => None,
		})
		.unwrap();
	assert_eq!(first_reconfigure.populate, Some(true));
	assert_eq!(first_reconfigure.dump.as_deref(), Some("tests/_data/staging.sql"));
}

#[test]
fn before_suite_runs_steps_in_fixed_order() {
	let log: Log = Default::default();
	let cfg = SuiteRunConfig {
		migrations: Some("bin/migrate".into()),
		seed: Some("bin/seed".into()),
		..Default::default()
	};
	let mut orch = orchestrator(cfg, &log, false, None);

	assert_eq!(orch.phase(), Phase::Idle);
	orch.before_suite(&SuiteEvent::default()).unwrap();
	assert_eq!(orch.phase(), Phase::Ready);

	let events = log.borrow().clone();
	assert_eq!(events, vec![
		Event::Reconfigure(ConsumerOverrides::default()
			.populate(true)
			.dump("tests/_data/base.sql")),
		Event::Initialize,
		Event::Run(CommandSpec::shell("bin/migrate")),
		Event::Run(CommandSpec::shell("bin/seed")),
		Event::Run(runs(&log).into_iter().find(is_dump).unwrap()),
		Event::Reconfigure(ConsumerOverrides::default().dump("tests/_data/dump.sql")),
		Event::Initialize,
	]);

	// The fixture dump the consumer is wired to is the last artifact
	// written; it must never precede migrate/seed.
	let dump_pos = events.iter().position(|e| matches!(e, Event::Run(c) if is_dump(c))).unwrap();
	let seed_pos = events.iter()
		.position(|e| matches!(e, Event::Run(c) if c.to_string().contains("bin/seed")))
		.unwrap();
	assert!(dump_pos > seed_pos);
}

#[test]
fn empty_migrations_invoke_no_process() {
	let log: Log = Default::default();
	let cfg = SuiteRunConfig {
		migrations: Some(String::new()),
		..Default::default()
	};
	let mut orch = orchestrator(cfg, &log, false, None);

	orch.before_suite(&SuiteEvent::default()).unwrap();

	// Only the fixture dump shells out.
	let runs = runs(&log);
	assert_eq!(runs.len(), 1);
	assert!(is_dump(&runs[0]));
}

#[test]
fn migrate_failure_aborts_seed_and_dump() {
	let log: Log = Default::default();
	let cfg = SuiteRunConfig {
		migrations: Some("bin/migrate".into()),
		seed: Some("bin/seed".into()),
		..Default::default()
	};
	let mut orch = orchestrator(cfg, &log, false, Some("bin/migrate"));

	let err = orch.before_suite(&SuiteEvent::default()).unwrap_err();
	match err {
		Error::Process { step, ref command, status, .. } => {
			assert_eq!(step, Step::Migrate);
			assert!(command.contains("bin/migrate"));
			assert_eq!(status, Some(1));
		},
		other => panic!("unexpected error: {}", other),
	}
	assert_eq!(orch.phase(), Phase::Idle);

	let runs = runs(&log);
	assert_eq!(runs.len(), 1); // the failed migrate only
	assert!(!log.borrow().iter().any(|e| {
		matches!(e, Event::Run(c) if c.to_string().contains("bin/seed") || is_dump(c))
	}));
	// The consumer was not rewired to a fixture that never materialized.
	let reconfigures = log.borrow().iter()
		.filter(|e| matches!(e, Event::Reconfigure(_)))
		.count();
	assert_eq!(reconfigures, 1); // the baseline restore only
}

#[test]
fn fixture_dump_failure_still_rewires_consumer() {
	let log: Log = Default::default();
	let mut orch = orchestrator(SuiteRunConfig::default(), &log, false, Some("mysqldump"));

	orch.before_suite(&SuiteEvent::default()).unwrap();

	let last_two: Vec<_> = log.borrow().iter().rev().take(2).cloned().collect();
	assert_eq!(last_two[0], Event::Initialize);
	assert_eq!(last_two[1], Event::Reconfigure(
		ConsumerOverrides::default().dump("tests/_data/dump.sql"),
	));
}

#[test]
fn backup_failure_does_not_block_the_sequence() {
	let log: Log = Default::default();
	let cfg = SuiteRunConfig {
		backup_before: true,
		backup_path: "/tmp/run".into(),
		..Default::default()
	};
	let mut orch = orchestrator(cfg, &log, false, Some("_before"));

	orch.before_suite(&SuiteEvent::default()).unwrap();
	assert_eq!(orch.phase(), Phase::Ready);

	// The baseline restore still happened after the failed backup.
	assert!(log.borrow().iter().any(|e| matches!(e, Event::Initialize)));
}

#[test]
fn repeated_before_suite_builds_identical_fixture_dump_command() {
	let log: Log = Default::default();
	let mut orch = orchestrator(SuiteRunConfig::default(), &log, false, None);

	orch.before_suite(&SuiteEvent::default()).unwrap();
	orch.before_suite(&SuiteEvent::default()).unwrap();

	let dumps: Vec<_> = runs(&log).into_iter().filter(is_dump).collect();
	assert_eq!(dumps.len(), 2);
	assert_eq!(dumps[0], dumps[1]);
}

#[test]
fn rollback_restores_the_before_backup() {
	let log: Log = Default::default();
	let cfg = SuiteRunConfig {
		backup_before: true,
		backup_path: "/tmp/run".into(),
		..Default::default()
	};
	let mut orch = orchestrator(cfg, &log, true, None);

	orch.before_suite(&SuiteEvent::default()).unwrap();
	orch.after_suite(&SuiteEvent::default()).unwrap();
	assert_eq!(orch.phase(), Phase::Idle);

	let restore = runs(&log).into_iter().find(is_restore).unwrap();
	assert_eq!(restore.stdin.as_deref(), Some(Path::new("/tmp/run_before.sql")));
}

#[test]
fn rollback_requires_consumer_cleanup() {
	let log: Log = Default::default();
	let cfg = SuiteRunConfig {
		backup_before: true,
		backup_path: "/tmp/run".into(),
		..Default::default()
	};
	let mut orch = orchestrator(cfg, &log, false, None);

	orch.before_suite(&SuiteEvent::default()).unwrap();
	orch.after_suite(&SuiteEvent::default()).unwrap();

	assert!(runs(&log).into_iter().find(is_restore).is_none());
}

#[test]
fn rollback_requires_before_backup() {
	let log: Log = Default::default();
	let cfg = SuiteRunConfig {
		backup_before: false,
		backup_path: "/tmp/run".into(),
		..Default::default()
	};
	let mut orch = orchestrator(cfg, &log, true, None);

	orch.before_suite(&SuiteEvent::default()).unwrap();
	orch.after_suite(&SuiteEvent::default()).unwrap();

	// Without the before-backup the pre-run state is unrecoverable by
	// design; no restore may be attempted.
	assert!(runs(&log).into_iter().find(is_restore).is_none());
}

#[test]
fn missing_consumer_degrades_hooks_to_noops() {
	let log: Log = Default::default();
	let runner = FakeRunner { log: log.clone(), fail_matching: None };
	let mut orch: FixtureOrchestrator<FakeRunner, FakeConsumer> =
		FixtureOrchestrator::new(SuiteRunConfig::default(), runner, None);

	orch.before_suite(&SuiteEvent::default()).unwrap();
	orch.after_suite(&SuiteEvent::default()).unwrap();

	assert_eq!(orch.phase(), Phase::Idle);
	assert!(log.borrow().is_empty());
}

#[test]
fn configuration_error_prevents_any_destructive_action() {
	let log: Log = Default::default();
	let consumer = FakeConsumer {
		settings: json!({
			// no host key
			"dsn": "mysql:port=3306;dbname=testdb",
			"user": "root",
			"password": "secret",
			"dump": "tests/_data/base.sql",
		}),
		log: log.clone(),
	};
	let runner = FakeRunner { log: log.clone(), fail_matching: None };
	let mut orch = FixtureOrchestrator::new(SuiteRunConfig::default(), runner, Some(consumer));

	let err = orch.before_suite(&SuiteEvent::default()).unwrap_err();
	assert!(matches!(err, Error::Configuration("host")));
	assert_eq!(orch.phase(), Phase::Idle);
	assert!(log.borrow().is_empty());
}
