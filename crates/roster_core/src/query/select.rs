//! Query construction and execution.
//!
//! # Invariants
//! - Repeated `filter`/`having` calls combine with AND.
//! - `fetch_one` never picks an arbitrary row: two or more rows is an error.
//! - `fetch_count` ignores ORDER BY, LIMIT and OFFSET.

use super::expr::{Expr, Expression, LogicalOp, OrderSpecifier, Predicate};
use super::path::{EntityPath, TableRef};
use super::projection::Projection;
use super::render::{Join, JoinKind, QueryBody, SqlStatement, SqlWriter};
use super::{QueryError, QueryResult};
use log::debug;
use rusqlite::{params_from_iter, Connection};
use std::time::Instant;

macro_rules! clause_methods {
    () => {
        /// Adds a table to the FROM clause.
        pub fn from(mut self, entity: &impl EntityPath) -> Self {
            self.body.from.push(entity.table_ref());
            self
        }

        /// Adds `INNER JOIN entity ON on`.
        pub fn join(mut self, entity: &impl EntityPath, on: Predicate) -> Self {
            self.body.joins.push(Join {
                kind: JoinKind::Inner,
                target: entity.table_ref(),
                on: on.into_expr(),
            });
            self
        }

        /// Adds `LEFT JOIN entity ON on`; unmatched rows keep NULL columns.
        pub fn left_join(mut self, entity: &impl EntityPath, on: Predicate) -> Self {
            self.body.joins.push(Join {
                kind: JoinKind::Left,
                target: entity.table_ref(),
                on: on.into_expr(),
            });
            self
        }

        pub fn filter(mut self, predicate: Predicate) -> Self {
            self.body.filter = Some(and_with(self.body.filter.take(), predicate));
            self
        }

        /// Adds `predicate` when present; `None` leaves the query unchanged.
        pub fn filter_opt(self, predicate: Option<Predicate>) -> Self {
            match predicate {
                Some(predicate) => self.filter(predicate),
                None => self,
            }
        }

        pub fn group_by(mut self, expr: &impl Expression) -> Self {
            self.body.group_by.push(expr.to_expr());
            self
        }

        pub fn having(mut self, predicate: Predicate) -> Self {
            self.body.having = Some(and_with(self.body.having.take(), predicate));
            self
        }

        pub fn order_by(mut self, order: OrderSpecifier) -> Self {
            self.body.order_by.push(order);
            self
        }

        pub fn offset(mut self, offset: u64) -> Self {
            self.body.offset = Some(offset);
            self
        }

        pub fn limit(mut self, limit: u64) -> Self {
            self.body.limit = Some(limit);
            self
        }
    };
}

/// Entry point for building queries against one connection.
#[derive(Debug, Clone, Copy)]
pub struct QueryFactory<'conn> {
    conn: &'conn Connection,
}

impl<'conn> QueryFactory<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Starts a query selecting `projection`; add sources with `from`.
    pub fn select<P: Projection>(&self, projection: P) -> Query<'conn, P> {
        Query {
            conn: self.conn,
            projection,
            body: QueryBody::default(),
        }
    }

    /// Selects whole entities of `entity` from its own table.
    pub fn select_from<E>(&self, entity: &E) -> Query<'conn, E>
    where
        E: EntityPath + Projection + Clone,
    {
        self.select(entity.clone()).from(entity)
    }
}

/// Executable query with a typed projection.
#[derive(Debug, Clone)]
pub struct Query<'conn, P> {
    conn: &'conn Connection,
    projection: P,
    body: QueryBody,
}

impl<P: Projection> Query<'_, P> {
    clause_methods!();

    /// Renders the statement without executing it.
    pub fn to_sql(&self) -> QueryResult<SqlStatement> {
        render(&self.projection.columns(), &self.body)
    }

    /// Returns all matching rows.
    pub fn fetch(&self) -> QueryResult<Vec<P::Output>> {
        let started_at = Instant::now();
        let statement = self.to_sql()?;
        let mut stmt = self.conn.prepare(&statement.sql)?;
        let mut rows = stmt.query(params_from_iter(statement.binds))?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(self.projection.read(row, 0)?);
        }

        debug!(
            "event=query_fetch module=query status=ok mode=list rows={} duration_ms={}",
            items.len(),
            started_at.elapsed().as_millis()
        );
        Ok(items)
    }

    /// Returns the single matching row, `None` when nothing matches.
    ///
    /// # Errors
    /// - `QueryError::NonUniqueResult` when more than one row matches.
    pub fn fetch_one(&self) -> QueryResult<Option<P::Output>> {
        let statement = self.to_sql()?;
        let mut stmt = self.conn.prepare(&statement.sql)?;
        let mut rows = stmt.query(params_from_iter(statement.binds))?;

        let Some(first) = rows.next()? else {
            return Ok(None);
        };
        let item = self.projection.read(first, 0)?;
        if rows.next()?.is_some() {
            debug!("event=query_fetch module=query status=error mode=one error_code=non_unique");
            return Err(QueryError::NonUniqueResult);
        }
        Ok(Some(item))
    }

    /// Returns the first row in query order, ignoring any others.
    pub fn fetch_first(&self) -> QueryResult<Option<P::Output>> {
        let mut body = self.body.clone();
        body.limit = Some(body.limit.map_or(1, |limit| limit.min(1)));
        let statement = render(&self.projection.columns(), &body)?;
        let mut stmt = self.conn.prepare(&statement.sql)?;
        let mut rows = stmt.query(params_from_iter(statement.binds))?;

        let item = match rows.next()? {
            Some(row) => Some(self.projection.read(row, 0)?),
            None => None,
        };
        Ok(item)
    }

    /// Counts rows the query would return without paging.
    pub fn fetch_count(&self) -> QueryResult<u64> {
        let mut body = self.body.clone();
        body.order_by.clear();
        body.limit = None;
        body.offset = None;

        let inner = render(&self.projection.columns(), &body)?;
        let sql = format!("SELECT COUNT(*) FROM ({})", inner.sql);
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(inner.binds), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| QueryError::InvalidData(format!("negative row count {count}")))
    }
}

/// Scalar or list subquery usable as an operand or with `in_sub_query`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubQuery {
    pub(crate) columns: Vec<Expr>,
    pub(crate) body: QueryBody,
}

/// Starts a subquery selecting `projection`.
///
/// A subquery may reference aliases of the enclosing query, which makes it
/// correlated.
pub fn sub_query<P: Projection>(projection: P) -> SubQuery {
    SubQuery {
        columns: projection.columns(),
        body: QueryBody::default(),
    }
}

impl SubQuery {
    clause_methods!();

    pub(crate) fn from_parts(columns: Vec<Expr>, source: TableRef, filter: Predicate) -> Self {
        Self {
            columns,
            body: QueryBody {
                from: vec![source],
                filter: Some(filter.into_expr()),
                ..QueryBody::default()
            },
        }
    }

    pub fn to_sql(&self) -> QueryResult<SqlStatement> {
        render(&self.columns, &self.body)
    }
}

fn render(columns: &[Expr], body: &QueryBody) -> QueryResult<SqlStatement> {
    let mut writer = SqlWriter::default();
    writer.write_select(columns, body)?;
    Ok(writer.finish())
}

fn and_with(existing: Option<Expr>, predicate: Predicate) -> Expr {
    match existing {
        Some(existing) => Expr::logical(LogicalOp::And, existing, predicate.into_expr()),
        None => predicate.into_expr(),
    }
}
