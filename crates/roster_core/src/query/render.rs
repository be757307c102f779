//! SQL rendering for built queries.
//!
//! Clauses are written in statement order so bind values line up with their
//! `?` placeholders.

use super::expr::{Direction, Expr, NullsOrder, OrderSpecifier};
use super::path::TableRef;
use super::{QueryError, QueryResult};
use rusqlite::types::Value;

/// Rendered statement with positional bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub binds: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Join {
    pub(crate) kind: JoinKind,
    pub(crate) target: TableRef,
    pub(crate) on: Expr,
}

/// Everything after the select list.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct QueryBody {
    pub(crate) from: Vec<TableRef>,
    pub(crate) joins: Vec<Join>,
    pub(crate) filter: Option<Expr>,
    pub(crate) group_by: Vec<Expr>,
    pub(crate) having: Option<Expr>,
    pub(crate) order_by: Vec<OrderSpecifier>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
}

#[derive(Debug, Default)]
pub(crate) struct SqlWriter {
    sql: String,
    binds: Vec<Value>,
}

impl SqlWriter {
    pub(crate) fn finish(self) -> SqlStatement {
        SqlStatement {
            sql: self.sql,
            binds: self.binds,
        }
    }

    pub(crate) fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn bind(&mut self, value: Value) {
        self.sql.push('?');
        self.binds.push(value);
    }

    pub(crate) fn write_select(&mut self, columns: &[Expr], body: &QueryBody) -> QueryResult<()> {
        if body.from.is_empty() {
            return Err(QueryError::MissingFrom);
        }

        self.push("SELECT ");
        self.write_list(columns)?;

        self.push(" FROM ");
        for (index, table) in body.from.iter().enumerate() {
            if index > 0 {
                self.push(", ");
            }
            self.write_table(table);
        }

        for join in &body.joins {
            self.push(match join.kind {
                JoinKind::Inner => " INNER JOIN ",
                JoinKind::Left => " LEFT JOIN ",
            });
            self.write_table(&join.target);
            self.push(" ON ");
            self.write_expr(&join.on)?;
        }

        if let Some(filter) = body.filter.as_ref() {
            self.push(" WHERE ");
            self.write_expr(filter)?;
        }

        if !body.group_by.is_empty() {
            self.push(" GROUP BY ");
            self.write_list(&body.group_by)?;
        }

        if let Some(having) = body.having.as_ref() {
            self.push(" HAVING ");
            self.write_expr(having)?;
        }

        if !body.order_by.is_empty() {
            self.push(" ORDER BY ");
            for (index, order) in body.order_by.iter().enumerate() {
                if index > 0 {
                    self.push(", ");
                }
                self.write_order(order)?;
            }
        }

        match (body.limit, body.offset) {
            (Some(limit), offset) => {
                self.push(" LIMIT ");
                self.bind(Value::Integer(clamp_to_i64(limit)));
                if let Some(offset) = offset.filter(|value| *value > 0) {
                    self.push(" OFFSET ");
                    self.bind(Value::Integer(clamp_to_i64(offset)));
                }
            }
            (None, Some(offset)) if offset > 0 => {
                self.push(" LIMIT -1 OFFSET ");
                self.bind(Value::Integer(clamp_to_i64(offset)));
            }
            (None, _) => {}
        }

        Ok(())
    }

    fn write_list(&mut self, exprs: &[Expr]) -> QueryResult<()> {
        for (index, expr) in exprs.iter().enumerate() {
            if index > 0 {
                self.push(", ");
            }
            self.write_expr(expr)?;
        }
        Ok(())
    }

    fn write_table(&mut self, table: &TableRef) {
        self.push(table.table());
        self.push(" AS ");
        self.write_alias(table.alias());
    }

    fn write_alias(&mut self, alias: &str) {
        self.sql.push('"');
        self.sql.push_str(&alias.replace('"', "\"\""));
        self.sql.push('"');
    }

    fn write_order(&mut self, order: &OrderSpecifier) -> QueryResult<()> {
        self.write_expr(&order.expr)?;
        self.push(match order.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        });
        match order.nulls {
            Some(NullsOrder::First) => self.push(" NULLS FIRST"),
            Some(NullsOrder::Last) => self.push(" NULLS LAST"),
            None => {}
        }
        Ok(())
    }

    fn write_expr(&mut self, expr: &Expr) -> QueryResult<()> {
        match expr {
            Expr::Column { alias, column } => {
                self.write_alias(alias);
                self.push(".");
                self.push(column);
            }
            Expr::Value(value) => self.bind(value.clone()),
            Expr::Aggregate { func, arg } => {
                self.push(func.sql());
                self.push("(");
                self.write_expr(arg)?;
                self.push(")");
            }
            Expr::Compare { op, left, right } => {
                self.write_expr(left)?;
                self.push(" ");
                self.push(op.sql());
                self.push(" ");
                self.write_expr(right)?;
            }
            Expr::Like {
                expr,
                pattern,
                escaped,
            } => {
                self.write_expr(expr)?;
                self.push(" LIKE ");
                self.bind(Value::Text(pattern.clone()));
                if *escaped {
                    self.push(" ESCAPE '\\'");
                }
            }
            Expr::IsNull { expr, negated } => {
                self.write_expr(expr)?;
                self.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Expr::InList {
                expr,
                items,
                negated,
            } => {
                if items.is_empty() {
                    // Empty membership: IN () is never true, NOT IN () always is.
                    self.push(if *negated { "1 = 1" } else { "1 = 0" });
                    return Ok(());
                }
                self.write_expr(expr)?;
                self.push(if *negated { " NOT IN (" } else { " IN (" });
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        self.push(", ");
                    }
                    self.bind(item.clone());
                }
                self.push(")");
            }
            Expr::InSubQuery {
                expr,
                query,
                negated,
            } => {
                self.write_expr(expr)?;
                self.push(if *negated { " NOT IN (" } else { " IN (" });
                self.write_select(&query.columns, &query.body)?;
                self.push(")");
            }
            Expr::Between { expr, low, high } => {
                self.write_expr(expr)?;
                self.push(" BETWEEN ");
                self.write_expr(low)?;
                self.push(" AND ");
                self.write_expr(high)?;
            }
            Expr::Logical { op, left, right } => {
                self.push("(");
                self.write_expr(left)?;
                self.push(" ");
                self.push(op.sql());
                self.push(" ");
                self.write_expr(right)?;
                self.push(")");
            }
            Expr::Not(inner) => {
                self.push("NOT (");
                self.write_expr(inner)?;
                self.push(")");
            }
            Expr::SubQuery(query) => {
                self.push("(");
                self.write_select(&query.columns, &query.body)?;
                self.push(")");
            }
        }
        Ok(())
    }
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
