//! Entity paths: aliased handles on the `member` and `team` tables.
//!
//! Two paths over the same table with different aliases can appear in one
//! statement, which is how correlated subqueries refer back to the outer row.

use super::expr::{AggregateFn, Expr, NumberExpr, Predicate, StringExpr};

/// Table plus the alias it is bound to in a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    table: &'static str,
    alias: String,
}

impl TableRef {
    pub fn new(table: &'static str, alias: impl Into<String>) -> Self {
        Self {
            table,
            alias: alias.into(),
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }
}

/// Something that can appear in FROM/JOIN.
pub trait EntityPath {
    fn table_ref(&self) -> TableRef;
}

/// Path over the `member` table.
#[derive(Debug, Clone, PartialEq)]
pub struct QMember {
    alias: String,
    pub id: NumberExpr<i64>,
    pub user_name: StringExpr,
    pub age: NumberExpr<i32>,
    pub team_id: NumberExpr<i64>,
}

impl QMember {
    pub const TABLE: &'static str = "member";

    pub fn new(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self {
            id: NumberExpr::column(&alias, "id"),
            user_name: StringExpr::column(&alias, "user_name"),
            age: NumberExpr::column(&alias, "age"),
            team_id: NumberExpr::column(&alias, "team_id"),
            alias,
        }
    }

    /// Default path aliased `member`.
    pub fn member() -> Self {
        Self::new("member")
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Number of member rows in the group.
    pub fn count(&self) -> NumberExpr<i64> {
        NumberExpr::from_expr(Expr::Aggregate {
            func: AggregateFn::Count,
            arg: Box::new(Expr::column(&self.alias, "id")),
        })
    }

    /// Join condition along the member → team foreign key.
    pub fn belongs_to(&self, team: &QTeam) -> Predicate {
        self.team_id.eq(&team.id)
    }
}

impl EntityPath for QMember {
    fn table_ref(&self) -> TableRef {
        TableRef::new(Self::TABLE, self.alias.clone())
    }
}

/// Path over the `team` table.
#[derive(Debug, Clone, PartialEq)]
pub struct QTeam {
    alias: String,
    pub id: NumberExpr<i64>,
    pub name: StringExpr,
}

impl QTeam {
    pub const TABLE: &'static str = "team";

    pub fn new(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self {
            id: NumberExpr::column(&alias, "id"),
            name: StringExpr::column(&alias, "name"),
            alias,
        }
    }

    /// Default path aliased `team`.
    pub fn team() -> Self {
        Self::new("team")
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn count(&self) -> NumberExpr<i64> {
        NumberExpr::from_expr(Expr::Aggregate {
            func: AggregateFn::Count,
            arg: Box::new(Expr::column(&self.alias, "id")),
        })
    }
}

impl EntityPath for QTeam {
    fn table_ref(&self) -> TableRef {
        TableRef::new(Self::TABLE, self.alias.clone())
    }
}

impl<P: EntityPath> EntityPath for &P {
    fn table_ref(&self) -> TableRef {
        P::table_ref(*self)
    }
}
