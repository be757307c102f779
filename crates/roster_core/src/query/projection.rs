//! Projections: what a query selects and how each row is read back.
//!
//! Entity paths project whole entities, expressions project single nullable
//! values, and tuples of up to five projections project their parts side by
//! side.

use super::expr::{Expr, Expression, NumberExpr, StringExpr};
use super::path::{EntityPath, QMember, QTeam};
use super::select::SubQuery;
use super::{QueryError, QueryResult};
use crate::model::member::Member;
use crate::model::team::Team;
use rusqlite::types::FromSql;
use rusqlite::Row;

/// Select-list contribution plus the row reader for it.
pub trait Projection {
    type Output;

    /// Number of result columns this projection occupies.
    fn width(&self) -> usize;

    fn columns(&self) -> Vec<Expr>;

    /// Reads this projection from `row` starting at column `start`.
    fn read(&self, row: &Row<'_>, start: usize) -> QueryResult<Self::Output>;
}

impl<P: Projection> Projection for &P {
    type Output = P::Output;

    fn width(&self) -> usize {
        P::width(*self)
    }

    fn columns(&self) -> Vec<Expr> {
        P::columns(*self)
    }

    fn read(&self, row: &Row<'_>, start: usize) -> QueryResult<Self::Output> {
        P::read(*self, row, start)
    }
}

impl<T: FromSql> Projection for NumberExpr<T> {
    type Output = Option<T>;

    fn width(&self) -> usize {
        1
    }

    fn columns(&self) -> Vec<Expr> {
        vec![self.to_expr()]
    }

    fn read(&self, row: &Row<'_>, start: usize) -> QueryResult<Self::Output> {
        Ok(row.get(start)?)
    }
}

impl Projection for StringExpr {
    type Output = Option<String>;

    fn width(&self) -> usize {
        1
    }

    fn columns(&self) -> Vec<Expr> {
        vec![self.to_expr()]
    }

    fn read(&self, row: &Row<'_>, start: usize) -> QueryResult<Self::Output> {
        Ok(row.get(start)?)
    }
}

/// Members always carry their team; the team name is fetched through a
/// correlated scalar subquery so one statement yields the full entity.
impl Projection for QMember {
    type Output = Member;

    fn width(&self) -> usize {
        5
    }

    fn columns(&self) -> Vec<Expr> {
        let owner = QTeam::new(format!("{}_team", self.alias()));
        let team_name = SubQuery::from_parts(
            vec![owner.name.to_expr()],
            owner.table_ref(),
            owner.id.eq(&self.team_id),
        );

        vec![
            self.id.to_expr(),
            self.user_name.to_expr(),
            self.age.to_expr(),
            self.team_id.to_expr(),
            Expr::SubQuery(Box::new(team_name)),
        ]
    }

    fn read(&self, row: &Row<'_>, start: usize) -> QueryResult<Member> {
        let id = row.get::<_, Option<i64>>(start)?.ok_or_else(|| {
            QueryError::InvalidData(format!(
                "`{}`.id is null; members can only be projected from a non-null side",
                self.alias()
            ))
        })?;
        let team_id: Option<i64> = row.get(start + 3)?;
        let team_name: Option<String> = row.get(start + 4)?;
        let team = match (team_id, team_name) {
            (Some(team_id), Some(name)) => Some(Team {
                id: Some(team_id),
                name,
            }),
            (Some(team_id), None) => {
                return Err(QueryError::InvalidData(format!(
                    "member {id} references missing team {team_id}"
                )));
            }
            (None, _) => None,
        };

        let member = Member {
            id: Some(id),
            user_name: row.get(start + 1)?,
            age: row.get(start + 2)?,
            team,
        };
        member
            .validate()
            .map_err(|err| QueryError::InvalidData(format!("member {id}: {err}")))?;
        Ok(member)
    }
}

/// Teams project as `Option` so the null side of a left join reads as `None`.
impl Projection for QTeam {
    type Output = Option<Team>;

    fn width(&self) -> usize {
        2
    }

    fn columns(&self) -> Vec<Expr> {
        vec![self.id.to_expr(), self.name.to_expr()]
    }

    fn read(&self, row: &Row<'_>, start: usize) -> QueryResult<Option<Team>> {
        let Some(id) = row.get::<_, Option<i64>>(start)? else {
            return Ok(None);
        };
        let team = Team {
            id: Some(id),
            name: row.get(start + 1)?,
        };
        team.validate()
            .map_err(|err| QueryError::InvalidData(format!("team {id}: {err}")))?;
        Ok(Some(team))
    }
}

macro_rules! tuple_projection {
    ($($part:ident : $index:tt),+) => {
        impl<$($part: Projection),+> Projection for ($($part,)+) {
            type Output = ($($part::Output,)+);

            fn width(&self) -> usize {
                0 $(+ self.$index.width())+
            }

            fn columns(&self) -> Vec<Expr> {
                let mut columns = Vec::with_capacity(self.width());
                $(columns.extend(self.$index.columns());)+
                columns
            }

            #[allow(unused_assignments)]
            fn read(&self, row: &Row<'_>, start: usize) -> QueryResult<Self::Output> {
                let mut offset = start;
                Ok(($({
                    let value = self.$index.read(row, offset)?;
                    offset += self.$index.width();
                    value
                },)+))
            }
        }
    };
}

tuple_projection!(A: 0, B: 1);
tuple_projection!(A: 0, B: 1, C: 2);
tuple_projection!(A: 0, B: 1, C: 2, D: 3);
tuple_projection!(A: 0, B: 1, C: 2, D: 3, E: 4);
