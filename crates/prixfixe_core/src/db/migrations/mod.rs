//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations as `(version, description, script)` triples.
//! - Apply pending migrations atomically.
//!
//! # Invariants
//! - Versions start at 1 and increase by exactly 1.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Applied scripts are never edited; schema changes are appended.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// One schema revision.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub script: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create users table",
        script: include_str!("0001_users.sql"),
    },
    Migration {
        version: 2,
        description: "create oauth2_clients table",
        script: include_str!("0002_oauth2_clients.sql"),
    },
    Migration {
        version: 3,
        description: "create webhooks table",
        script: include_str!("0003_webhooks.sql"),
    },
    Migration {
        version: 4,
        description: "create ingredients table",
        script: include_str!("0004_ingredients.sql"),
    },
    Migration {
        version: 5,
        description: "create instruments table",
        script: include_str!("0005_instruments.sql"),
    },
    Migration {
        version: 6,
        description: "create preparations table",
        script: include_str!("0006_preparations.sql"),
    },
    Migration {
        version: 7,
        description: "create required_preparation_instruments table",
        script: include_str!("0007_required_preparation_instruments.sql"),
    },
    Migration {
        version: 8,
        description: "create recipes table",
        script: include_str!("0008_recipes.sql"),
    },
    Migration {
        version: 9,
        description: "create recipe_steps table",
        script: include_str!("0009_recipe_steps.sql"),
    },
    Migration {
        version: 10,
        description: "create recipe_step_instruments table",
        script: include_str!("0010_recipe_step_instruments.sql"),
    },
    Migration {
        version: 11,
        description: "create recipe_step_ingredients table",
        script: include_str!("0011_recipe_step_ingredients.sql"),
    },
    Migration {
        version: 12,
        description: "create recipe_step_products table",
        script: include_str!("0012_recipe_step_products.sql"),
    },
    Migration {
        version: 13,
        description: "create recipe_iterations table",
        script: include_str!("0013_recipe_iterations.sql"),
    },
    Migration {
        version: 14,
        description: "create recipe_step_events table",
        script: include_str!("0014_recipe_step_events.sql"),
    },
    Migration {
        version: 15,
        description: "create iteration_medias table",
        script: include_str!("0015_iteration_medias.sql"),
    },
    Migration {
        version: 16,
        description: "create invitations table",
        script: include_str!("0016_invitations.sql"),
    },
    Migration {
        version: 17,
        description: "create reports table",
        script: include_str!("0017_reports.sql"),
    },
    Migration {
        version: 18,
        description: "index owner columns",
        script: include_str!("0018_owner_indexes.sql"),
    },
];

/// Returns the ordered migration registry.
pub fn registry() -> &'static [Migration] {
    MIGRATIONS
}

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Checks that versions start at 1 and have no gaps.
pub fn validate_registry(migrations: &[Migration]) -> DbResult<()> {
    for (expected, migration) in (1u32..).zip(migrations) {
        if migration.version != expected {
            return Err(DbError::InvalidRegistry {
                expected,
                found: migration.version,
            });
        }
    }
    Ok(())
}

/// Applies all pending migrations on the provided connection.
///
/// Returns the number of migrations applied (zero when already current).
pub fn apply_migrations(conn: &Connection) -> DbResult<usize> {
    apply_from(conn, MIGRATIONS)
}

pub(crate) fn apply_from(conn: &Connection, migrations: &[Migration]) -> DbResult<usize> {
    validate_registry(migrations)?;

    let current_version = current_user_version(conn)?;
    let latest = migrations.last().map_or(0, |migration| migration.version);

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        info!("event=migrate module=migrate status=ok applied=0 version={current_version}");
        return Ok(0);
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let mut applied = 0;
    for migration in migrations {
        if migration.version <= current_version {
            continue;
        }

        let outcome = tx.execute_batch(migration.script).and_then(|()| {
            tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
        });
        if let Err(source) = outcome {
            error!(
                "event=migrate module=migrate status=error version={} error_code=migration_failed error={}",
                migration.version, source
            );
            return Err(DbError::Migration {
                version: migration.version,
                description: migration.description,
                source,
            });
        }
        applied += 1;
    }
    tx.commit()?;

    info!("event=migrate module=migrate status=ok applied={applied} version={latest}");
    Ok(applied)
}

/// Reads the applied schema version.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
