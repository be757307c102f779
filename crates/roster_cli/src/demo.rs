//! Query builder demonstrations over the demo roster.

use crate::output::{member_line, Report};
use anyhow::Result;
use clap::ValueEnum;
use roster_core::query::{sub_query, QMember, QTeam, QueryFactory};
use rusqlite::Connection;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoKind {
    Sort,
    Paging,
    Aggregate,
    GroupBy,
    Join,
    LeftJoin,
    SubQuery,
    All,
}

impl DemoKind {
    const EACH: [DemoKind; 7] = [
        DemoKind::Sort,
        DemoKind::Paging,
        DemoKind::Aggregate,
        DemoKind::GroupBy,
        DemoKind::Join,
        DemoKind::LeftJoin,
        DemoKind::SubQuery,
    ];
}

#[derive(Debug, Serialize)]
struct Aggregates {
    count: Option<i64>,
    sum: Option<i64>,
    avg: Option<f64>,
    max: Option<i32>,
    min: Option<i32>,
}

#[derive(Debug, Serialize)]
struct TeamAverage {
    team: Option<String>,
    avg_age: Option<f64>,
}

#[derive(Debug, Serialize)]
struct LeftJoinRow {
    user_name: String,
    joined_team: Option<String>,
}

pub fn run(conn: &Connection, kind: DemoKind) -> Result<Report> {
    let query = QueryFactory::new(conn);
    let member = QMember::member();
    let team = QTeam::team();

    match kind {
        DemoKind::All => {
            let parts = DemoKind::EACH
                .iter()
                .map(|kind| run(conn, *kind))
                .collect::<Result<Vec<_>>>()?;
            Ok(Report::combine("demo", parts))
        }
        DemoKind::Sort => {
            let sorted = query
                .select_from(&member)
                .order_by(member.age.desc())
                .order_by(member.user_name.asc())
                .fetch()?;
            Report::members("sort", &sorted)
        }
        DemoKind::Paging => {
            let page = query
                .select_from(&member)
                .order_by(member.user_name.desc())
                .offset(3)
                .limit(3);
            let total = page.fetch_count()?;
            let mut report = Report::members("paging", &page.fetch()?)?;
            report.lines.push(format!("total={total}"));
            Ok(report)
        }
        DemoKind::Aggregate => {
            let row = query
                .select((
                    member.count(),
                    member.age.sum(),
                    member.age.avg(),
                    member.age.max(),
                    member.age.min(),
                ))
                .from(&member)
                .fetch_one()?;
            let aggregates: Vec<Aggregates> = row
                .into_iter()
                .map(|(count, sum, avg, max, min)| Aggregates {
                    count,
                    sum,
                    avg,
                    max,
                    min,
                })
                .collect();
            Report::rows("aggregate", &aggregates, |row| {
                format!(
                    "count={} sum={} avg={} max={} min={}",
                    show(row.count),
                    show(row.sum),
                    show(row.avg),
                    show(row.max),
                    show(row.min)
                )
            })
        }
        DemoKind::GroupBy => {
            let rows: Vec<TeamAverage> = query
                .select((&team.name, member.age.avg()))
                .from(&member)
                .join(&team, member.belongs_to(&team))
                .group_by(&team.name)
                .order_by(team.name.asc())
                .fetch()?
                .into_iter()
                .map(|(team, avg_age)| TeamAverage { team, avg_age })
                .collect();
            Report::rows("group-by", &rows, |row| {
                format!(
                    "{} avg_age={}",
                    row.team.as_deref().unwrap_or("-"),
                    show(row.avg_age)
                )
            })
        }
        DemoKind::Join => {
            let members = query
                .select_from(&member)
                .join(&team, member.belongs_to(&team))
                .filter(team.name.eq("teamA"))
                .order_by(member.id.asc())
                .fetch()?;
            Report::members("join", &members)
        }
        DemoKind::LeftJoin => {
            let rows: Vec<LeftJoinRow> = query
                .select((&member, &team))
                .from(&member)
                .left_join(&team, member.belongs_to(&team).and(team.name.eq("teamA")))
                .order_by(member.id.asc())
                .fetch()?
                .into_iter()
                .map(|(member, team)| LeftJoinRow {
                    user_name: member.user_name,
                    joined_team: team.map(|team| team.name),
                })
                .collect();
            Report::rows("left-join", &rows, |row| {
                format!(
                    "{} joined_team={}",
                    row.user_name,
                    row.joined_team.as_deref().unwrap_or("null")
                )
            })
        }
        DemoKind::SubQuery => {
            let member_sub = QMember::new("member_sub");
            let older = query
                .select_from(&member)
                .filter(member.age.gt(sub_query(member_sub.age.avg()).from(&member_sub)))
                .order_by(member.id.asc())
                .fetch()?;
            Report::rows("sub-query", &older, member_line)
        }
    }
}

fn show<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "null".to_string(), |value| value.to_string())
}
