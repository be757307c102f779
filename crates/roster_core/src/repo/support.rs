//! Connection readiness checks and write scopes shared by the SQLite repositories.

use super::{RepoError, RepoResult};
use crate::db::migrations::{current_version, latest_version};
use log::warn;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Verifies schema version, then every `(table, columns)` pair.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    required: &[(&'static str, &[&'static str])],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in required {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Runs `work` atomically.
///
/// Opens an immediate transaction when `conn` is in autocommit mode;
/// otherwise wraps `work` in a savepoint inside the caller's transaction, so
/// a failure undoes only this scope and the caller still decides the outcome.
pub(crate) fn write_scope<T>(
    conn: &Connection,
    work: impl FnOnce(&Connection) -> RepoResult<T>,
) -> RepoResult<T> {
    if !conn.is_autocommit() {
        return savepoint_scope(conn, work);
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let value = work(&tx)?;
    tx.commit()?;
    Ok(value)
}

fn savepoint_scope<T>(
    conn: &Connection,
    work: impl FnOnce(&Connection) -> RepoResult<T>,
) -> RepoResult<T> {
    conn.execute_batch("SAVEPOINT roster_write;")?;
    match work(conn) {
        Ok(value) => {
            conn.execute_batch("RELEASE roster_write;")?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) =
                conn.execute_batch("ROLLBACK TO roster_write; RELEASE roster_write;")
            {
                warn!(
                    "event=write_scope module=repo status=error op=rollback_to_savepoint error={rollback_err}"
                );
            }
            Err(err)
        }
    }
}
