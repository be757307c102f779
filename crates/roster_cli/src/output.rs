//! Text and JSON rendering of command results.

use anyhow::Result;
use roster_core::{Member, MemberTeamRow, TeamWithMembers};
use serde::Serialize;
use serde_json::{json, Value};

/// One command's result, printable as text lines or one JSON document.
#[derive(Debug, Clone)]
pub struct Report {
    pub heading: String,
    pub json: Value,
    pub lines: Vec<String>,
}

impl Report {
    pub fn rows<T: Serialize>(
        heading: impl Into<String>,
        items: &[T],
        line: impl Fn(&T) -> String,
    ) -> Result<Self> {
        Ok(Self {
            heading: heading.into(),
            json: serde_json::to_value(items)?,
            lines: items.iter().map(line).collect(),
        })
    }

    pub fn members(heading: &str, members: &[Member]) -> Result<Self> {
        Self::rows(heading, members, member_line)
    }

    pub fn teams(teams: &[TeamWithMembers]) -> Result<Self> {
        Self::rows("teams", teams, |loaded| {
            let names: Vec<&str> = loaded
                .members
                .iter()
                .map(|member| member.user_name.as_str())
                .collect();
            format!(
                "{} {} [{}]",
                display_id(loaded.team.id),
                loaded.team.name,
                names.join(", ")
            )
        })
    }

    pub fn search(rows: &[MemberTeamRow]) -> Result<Self> {
        Self::rows("search", rows, |row| {
            format!(
                "{} {} age={} team={}",
                row.member_id,
                row.user_name,
                row.age,
                row.team_name.as_deref().unwrap_or("-")
            )
        })
    }

    pub fn message(heading: &str, message: String) -> Self {
        Self {
            heading: heading.to_string(),
            json: json!({ "message": message }),
            lines: vec![message],
        }
    }

    /// Merges several reports under one heading; JSON is keyed by the parts'
    /// headings.
    pub fn combine(heading: &str, parts: Vec<Report>) -> Self {
        let mut json = serde_json::Map::new();
        let mut lines = Vec::new();
        for part in parts {
            lines.push(format!("== {} ==", part.heading));
            lines.extend(part.lines);
            json.insert(part.heading, part.json);
        }
        Self {
            heading: heading.to_string(),
            json: Value::Object(json),
            lines,
        }
    }

    pub fn print(&self, as_json: bool) -> Result<()> {
        if as_json {
            println!("{}", serde_json::to_string_pretty(&self.json)?);
            return Ok(());
        }
        if self.lines.is_empty() {
            println!("({}: no rows)", self.heading);
        }
        for line in &self.lines {
            println!("{line}");
        }
        Ok(())
    }
}

pub fn member_line(member: &Member) -> String {
    let team = member
        .team
        .as_ref()
        .map_or("-", |team| team.name.as_str());
    format!(
        "{} {} age={} team={team}",
        display_id(member.id),
        member.user_name,
        member.age
    )
}

fn display_id(id: Option<i64>) -> String {
    id.map_or_else(|| "?".to_string(), |id| id.to_string())
}
