use crate::error::{DatabaseError, DatabaseErrorExt};
use fxhash::FxHashMap;
use sha2::{Digest, Sha256};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::types::SurrealValue;

/// Table tracking applied migrations, keyed by version.
pub const MIGRATION_TABLE: &str = "kernel_migration";

const BOOTSTRAP: &str = "
    DEFINE TABLE IF NOT EXISTS kernel_migration SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS version ON kernel_migration TYPE string;
    DEFINE FIELD IF NOT EXISTS checksum ON kernel_migration TYPE string;
    DEFINE FIELD IF NOT EXISTS applied_at ON kernel_migration TYPE string;
";

/// Embedded migration scripts, applied in order.
const BUILTIN: &[(&str, &str)] =
    &[("0001-kernel-registry", include_str!("../migrations/0001-kernel-registry.surql"))];

/// One schema migration script.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: &'static str,
    pub script: &'static str,
    pub checksum: String,
}

impl Migration {
    #[must_use]
    pub fn new(version: &'static str, script: &'static str) -> Self {
        Self { version, script, checksum: checksum(script) }
    }

    fn to_applied(&self) -> AppliedMigration {
        AppliedMigration { version: self.version.to_owned(), checksum: self.checksum.clone() }
    }
}

/// The migrations shipped with this crate, in application order.
#[must_use]
pub fn builtin_migrations() -> Vec<Migration> {
    BUILTIN.iter().map(|&(version, script)| Migration::new(version, script)).collect()
}

/// Hex SHA-256 of a migration script.
#[must_use]
pub fn checksum(script: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(script.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Default)]
pub struct MigrationReport {
    pub applied: Vec<AppliedMigration>,
    pub skipped: Vec<AppliedMigration>,
}

#[derive(Debug, Clone, PartialEq, Eq, SurrealValue)]
pub struct AppliedMigration {
    pub version: String,
    pub checksum: String,
}

#[derive(Debug)]
pub(crate) struct MigrationRunner {
    db: Surreal<Any>,
    migrations: Vec<Migration>,
}

impl MigrationRunner {
    #[must_use]
    pub(crate) const fn new(db: Surreal<Any>, migrations: Vec<Migration>) -> Self {
        Self { db, migrations }
    }

    /// Applies every pending migration; each one runs in its own transaction.
    pub(crate) async fn run(&self) -> Result<MigrationReport, DatabaseError> {
        self.db
            .query(BOOTSTRAP)
            .await
            .context("Bootstrapping migration table")?
            .check()
            .map_err(surrealdb::Error::from)?;

        let mut report = MigrationReport::default();
        let applied = self.applied_migrations().await?;

        for migration in &self.migrations {
            if let Some(existing) = applied.get(migration.version) {
                ensure_checksum_match(migration, &existing.checksum)?;
                report.skipped.push(migration.to_applied());
                continue;
            }

            self.apply(migration).await?;
            report.applied.push(migration.to_applied());
        }

        Ok(report)
    }

    async fn apply(&self, migration: &Migration) -> Result<(), DatabaseError> {
        let query = format!(
            "BEGIN TRANSACTION;
            {}
            UPSERT type::record('{MIGRATION_TABLE}', $version)
                CONTENT {{ version: $version, checksum: $checksum, applied_at: $applied_at }};
            COMMIT TRANSACTION;",
            migration.script,
        );

        self.db
            .query(&query)
            .bind(("version", migration.version))
            .bind(("checksum", migration.checksum.clone()))
            .bind(("applied_at", chrono::Utc::now().to_rfc3339()))
            .await
            .context(format!("SQL execution failed at {}", migration.version))?
            .check()
            .map_err(surrealdb::Error::from)
            .context(format!("Migration {} rejected", migration.version))?;

        Ok(())
    }

    async fn applied_migrations(
        &self,
    ) -> Result<FxHashMap<String, AppliedMigration>, DatabaseError> {
        let entries = self
            .db
            .query(format!("SELECT version, checksum FROM {MIGRATION_TABLE}"))
            .await
            .context("Loading applied migrations")?
            .take::<Vec<AppliedMigration>>(0)
            .context("Parsing applied migrations")?;

        Ok(entries.into_iter().map(|entry| (entry.version.clone(), entry)).collect())
    }
}

fn ensure_checksum_match(migration: &Migration, existing: &str) -> Result<(), DatabaseError> {
    if existing != migration.checksum {
        return Err(DatabaseError::Migration {
            message: format!(
                "Checksum mismatch for {} (recorded {}, shipped {})",
                migration.version, existing, migration.checksum
            )
            .into(),
            context: Some("Migration already applied with different checksum".into()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_scripts_leave_transactions_to_the_runner() {
        for migration in builtin_migrations() {
            let script = migration.script.to_lowercase();
            assert!(!script.contains("begin transaction"), "{}", migration.version);
            assert!(!script.contains("commit transaction"), "{}", migration.version);
        }
    }

    #[test]
    fn versions_are_ordered_and_checksums_stable() {
        let migrations = builtin_migrations();
        assert!(migrations.windows(2).all(|w| w[0].version < w[1].version));
        assert_eq!(migrations[0].checksum, checksum(migrations[0].script));
        assert_eq!(migrations[0].checksum.len(), 64);
    }

    #[test]
    fn checksum_mismatch_is_fatal() {
        let migration = Migration::new("0001-test", "DEFINE TABLE t;");
        let err = ensure_checksum_match(&migration, "deadbeef").unwrap_err();
        assert!(matches!(err, DatabaseError::Migration { .. }));
        assert!(ensure_checksum_match(&migration, &checksum("DEFINE TABLE t;")).is_ok());
    }
}
