
/// The fixture dump consumed by the Db consumer between tests,
/// unless overridden in the suite configuration.
pub const DEFAULT_FIXTURE_DUMP: &str = "tests/_data/dump.sql";

/// Restores require elevated privilege distinct from the application login.
pub const POSTGRES_SUPERUSER: &str = "postgres";

pub mod env {
	/// Directory holding the postgres client tools (`pg_dump`, `pg_restore`).
	/// By default the tools are taken from the path.
	pub const PG_BINS: &str = "DBSLATE_PG_BINS";
	/// Directory holding the mysql client tools (`mysqldump`, `mysql`).
	pub const MYSQL_BINS: &str = "DBSLATE_MYSQL_BINS";
}
