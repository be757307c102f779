//! Explicit transactional scope.
//!
//! Repositories borrow a plain `&Connection`; a `Transaction` derefs to one,
//! so any repository built inside the closure participates in the scope.

use log::debug;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// How a successful scope ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Persist all writes made inside the scope.
    Commit,
    /// Discard all writes even when the closure succeeds.
    Rollback,
}

/// Runs `work` inside one immediate transaction.
///
/// Errors returned by `work` always roll back. On success the transaction is
/// committed or rolled back according to `completion`.
///
/// The connection must not already be inside a transaction.
pub fn in_transaction<T, E>(
    conn: &Connection,
    completion: Completion,
    work: impl FnOnce(&Connection) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<rusqlite::Error>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let value = match work(&tx) {
        Ok(value) => value,
        Err(err) => {
            debug!("event=tx_end module=db status=error outcome=rollback");
            // Dropping `tx` rolls back.
            return Err(err);
        }
    };

    match completion {
        Completion::Commit => {
            tx.commit()?;
            debug!("event=tx_end module=db status=ok outcome=commit");
        }
        Completion::Rollback => {
            tx.rollback()?;
            debug!("event=tx_end module=db status=ok outcome=rollback");
        }
    }

    Ok(value)
}
