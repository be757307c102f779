//! Repository error type and conversions from lower layers.

use crate::db::DbError;
use crate::model::ValidationError;
use crate::query::QueryError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for roster persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    /// Builder query failed; wraps `QueryError` unchanged.
    Query(QueryError),
    NotFound {
        entity: &'static str,
        id: i64,
    },
    /// A single-result lookup matched more than one row.
    NonUniqueResult {
        entity: &'static str,
        key: String,
    },
    /// Operation needs an identifier but the entity was never saved.
    Transient(&'static str),
    /// Member references a team that was never saved.
    TransientReference {
        entity: &'static str,
        reference: &'static str,
    },
    /// Team still has members; deletion is rejected.
    TeamInUse {
        team_id: i64,
        member_count: u64,
    },
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Query(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::NonUniqueResult { entity, key } => {
                write!(f, "expected one {entity} for `{key}` but found several")
            }
            Self::Transient(entity) => write!(f, "{entity} has not been saved yet"),
            Self::TransientReference { entity, reference } => write!(
                f,
                "{entity} references an unsaved {reference}; save the {reference} first"
            ),
            Self::TeamInUse {
                team_id,
                member_count,
            } => write!(
                f,
                "team {team_id} still has {member_count} member(s); reassign or delete them first"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "roster repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "roster repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "roster repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted roster data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Query(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<QueryError> for RepoError {
    fn from(value: QueryError) -> Self {
        match value {
            QueryError::Db(err) => Self::Db(err),
            other => Self::Query(other),
        }
    }
}
