//! Typed query builder over the roster schema.
//!
//! # Responsibility
//! - Compose SELECT statements from typed paths instead of SQL strings.
//! - Map result rows back to entities, scalars or tuples of both.
//!
//! # Invariants
//! - Every literal becomes a bind parameter.
//! - A query renders to exactly one SQL statement; subqueries are inlined.
//!
//! # Example
//! ```
//! use roster_core::db::open_db_in_memory;
//! use roster_core::query::{QMember, QueryFactory};
//!
//! let conn = open_db_in_memory().unwrap();
//! let member = QMember::member();
//! let adults = QueryFactory::new(&conn)
//!     .select_from(&member)
//!     .filter(member.age.goe(18))
//!     .order_by(member.age.desc())
//!     .fetch()
//!     .unwrap();
//! assert!(adults.is_empty());
//! ```

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod expr;
mod path;
mod projection;
mod render;
mod select;

pub use expr::{
    AggregateFn, CompareOp, Direction, Expr, Expression, LogicalOp, NullsOrder, NumberExpr,
    NumberOperand, Numeric, OrderSpecifier, Predicate, StringExpr, StringOperand,
};
pub use path::{EntityPath, QMember, QTeam, TableRef};
pub use projection::Projection;
pub use render::SqlStatement;
pub use select::{sub_query, Query, QueryFactory, SubQuery};

pub type QueryResult<T> = Result<T, QueryError>;

/// Errors from building or executing a query.
#[derive(Debug)]
pub enum QueryError {
    /// Underlying SQLite failure.
    Db(DbError),
    /// `fetch_one` matched more than one row.
    NonUniqueResult,
    /// A query or subquery was executed without any FROM source.
    MissingFrom,
    /// A row could not be mapped to the requested projection.
    InvalidData(String),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NonUniqueResult => write!(f, "query expected at most one row but found more"),
            Self::MissingFrom => write!(f, "query has no FROM source"),
            Self::InvalidData(message) => write!(f, "invalid query row: {message}"),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NonUniqueResult => None,
            Self::MissingFrom => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for QueryError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

#[cfg(test)]
mod tests {
    use super::{sub_query, QMember, QTeam, QueryError, QueryFactory};
    use rusqlite::types::Value;
    use rusqlite::Connection;

    #[test]
    fn entity_projection_inlines_team_name_lookup() {
        let conn = Connection::open_in_memory().unwrap();
        let m = QMember::new("m");

        let statement = QueryFactory::new(&conn)
            .select_from(&m)
            .filter(m.user_name.eq("member1"))
            .to_sql()
            .unwrap();

        assert_eq!(
            statement.sql,
            "SELECT \"m\".id, \"m\".user_name, \"m\".age, \"m\".team_id, \
             (SELECT \"m_team\".name FROM team AS \"m_team\" WHERE \"m_team\".id = \"m\".team_id) \
             FROM member AS \"m\" WHERE \"m\".user_name = ?"
        );
        assert_eq!(statement.binds, vec![Value::Text("member1".to_string())]);
    }

    #[test]
    fn binds_follow_clause_order() {
        let conn = Connection::open_in_memory().unwrap();
        let m = QMember::member();
        let t = QTeam::team();

        let statement = QueryFactory::new(&conn)
            .select((m.user_name.clone(), t.name.clone()))
            .from(&m)
            .left_join(&t, m.belongs_to(&t).and(t.name.eq("teamA")))
            .filter(m.age.between(10, 30))
            .group_by(&m.user_name)
            .having(m.count().goe(1))
            .order_by(m.user_name.desc())
            .offset(3)
            .limit(3)
            .to_sql()
            .unwrap();

        assert_eq!(
            statement.sql,
            "SELECT \"member\".user_name, \"team\".name FROM member AS \"member\" \
             LEFT JOIN team AS \"team\" ON (\"member\".team_id = \"team\".id AND \"team\".name = ?) \
             WHERE \"member\".age BETWEEN ? AND ? \
             GROUP BY \"member\".user_name \
             HAVING COUNT(\"member\".id) >= ? \
             ORDER BY \"member\".user_name DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            statement.binds,
            vec![
                Value::Text("teamA".to_string()),
                Value::Integer(10),
                Value::Integer(30),
                Value::Integer(1),
                Value::Integer(3),
                Value::Integer(3),
            ]
        );
    }

    #[test]
    fn offset_without_limit_uses_unbounded_limit() {
        let conn = Connection::open_in_memory().unwrap();
        let m = QMember::member();

        let statement = QueryFactory::new(&conn)
            .select(m.id.clone())
            .from(&m)
            .offset(5)
            .to_sql()
            .unwrap();

        assert!(statement.sql.ends_with("LIMIT -1 OFFSET ?"));
        assert_eq!(statement.binds, vec![Value::Integer(5)]);
    }

    #[test]
    fn contains_escapes_wildcards() {
        let conn = Connection::open_in_memory().unwrap();
        let m = QMember::member();

        let statement = QueryFactory::new(&conn)
            .select(m.id.clone())
            .from(&m)
            .filter(m.user_name.contains("50%"))
            .to_sql()
            .unwrap();

        assert!(statement.sql.ends_with("LIKE ? ESCAPE '\\'"));
        assert_eq!(statement.binds, vec![Value::Text("%50\\%%".to_string())]);
    }

    #[test]
    fn empty_in_list_renders_constant_predicate() {
        let conn = Connection::open_in_memory().unwrap();
        let m = QMember::member();

        let statement = QueryFactory::new(&conn)
            .select(m.id.clone())
            .from(&m)
            .filter(m.age.in_list(Vec::new()).or(m.age.not_in(Vec::new())))
            .to_sql()
            .unwrap();

        assert!(statement.sql.ends_with("WHERE (1 = 0 OR 1 = 1)"));
        assert!(statement.binds.is_empty());
    }

    #[test]
    fn not_in_subquery_and_nulls_ordering_render() {
        let conn = Connection::open_in_memory().unwrap();
        let m = QMember::member();
        let sub = QMember::new("member_sub");

        let statement = QueryFactory::new(&conn)
            .select(m.id.clone())
            .from(&m)
            .filter(
                m.team_id
                    .not_in_sub_query(sub_query(&sub.team_id).from(&sub).filter(sub.age.lt(18))),
            )
            .order_by(m.team_id.asc().nulls_last())
            .to_sql()
            .unwrap();

        assert_eq!(
            statement.sql,
            "SELECT \"member\".id FROM member AS \"member\" \
             WHERE \"member\".team_id NOT IN (SELECT \"member_sub\".team_id FROM member AS \"member_sub\" \
             WHERE \"member_sub\".age < ?) \
             ORDER BY \"member\".team_id ASC NULLS LAST"
        );
        assert_eq!(statement.binds, vec![Value::Integer(18)]);
    }

    #[test]
    fn subquery_without_from_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let m = QMember::member();
        let sub = QMember::new("member_sub");

        let result = QueryFactory::new(&conn)
            .select_from(&m)
            .filter(m.age.gt(sub_query(sub.age.avg())))
            .to_sql();

        assert!(matches!(result, Err(QueryError::MissingFrom)));
    }
}
