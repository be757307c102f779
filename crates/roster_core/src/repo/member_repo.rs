//! Member repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Generic CRUD over the `member` table.
//! - `find_member`: single-result lookup through a named-parameter statement.
//! - `MemberRepositoryCustom`: list lookups composed with the query builder.
//!
//! # Invariants
//! - Every member read carries its team (id + name).
//! - A member can only reference a saved team.
//! - A persisted member that has a team keeps one; moving teams is allowed.

use super::support::{ensure_connection_ready, write_scope};
use super::{CrudRepository, RepoError, RepoResult};
use crate::model::member::{Member, MemberId};
use crate::model::team::{Team, TeamId};
use crate::model::ValidationError;
use crate::query::{Predicate, QMember, QTeam, QueryFactory};
use log::debug;
use rusqlite::{named_params, params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

const MEMBER_SELECT_SQL: &str = "SELECT
    m.id,
    m.user_name,
    m.age,
    m.team_id,
    t.name AS team_name
FROM member m
LEFT JOIN team t ON t.id = m.team_id";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("member", &["id", "user_name", "age", "team_id"]),
    ("team", &["id", "name"]),
];

/// Member lookups beyond generic CRUD.
pub trait MemberRepository: CrudRepository<Member> + MemberRepositoryCustom {
    /// Returns the only member named exactly `user_name`.
    ///
    /// # Errors
    /// - `RepoError::NonUniqueResult` when two or more members share the name.
    fn find_member(&self, user_name: &str) -> RepoResult<Option<Member>>;
}

/// Hand-written lookups built with the query builder.
pub trait MemberRepositoryCustom {
    /// All members named exactly `name`, ordered by id. Never fails on
    /// cardinality.
    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Member>>;

    /// Dynamic search; absent or blank conditions are ignored.
    fn search(&self, condition: &MemberSearch) -> RepoResult<Vec<MemberTeamRow>>;
}

/// Optional conditions for [`MemberRepositoryCustom::search`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberSearch {
    pub user_name: Option<String>,
    pub team_name: Option<String>,
    /// Inclusive lower age bound.
    pub age_goe: Option<i32>,
    /// Inclusive upper age bound.
    pub age_loe: Option<i32>,
    pub offset: u64,
    pub limit: Option<u64>,
}

/// Flat member + team row returned by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberTeamRow {
    pub member_id: MemberId,
    pub user_name: String,
    pub age: i32,
    pub team_id: Option<TeamId>,
    pub team_name: Option<String>,
}

/// SQLite-backed member repository.
pub struct SqliteMemberRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMemberRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_SCHEMA)?;
        Ok(Self { conn })
    }
}

impl CrudRepository<Member> for SqliteMemberRepository<'_> {
    fn save(&self, member: &Member) -> RepoResult<Member> {
        write_scope(self.conn, |conn| save_member(conn, member))
    }

    fn save_all(&self, members: &[Member]) -> RepoResult<Vec<Member>> {
        write_scope(self.conn, |conn| {
            members
                .iter()
                .map(|member| save_member(conn, member))
                .collect()
        })
    }

    fn find_by_id(&self, id: MemberId) -> RepoResult<Option<Member>> {
        load_member(self.conn, id)
    }

    fn exists_by_id(&self, id: MemberId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM member WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn find_all(&self) -> RepoResult<Vec<Member>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEMBER_SELECT_SQL} ORDER BY m.id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(parse_member_row(row)?);
        }
        Ok(members)
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM member;", [], |row| row.get(0))?;
        Ok(count.unsigned_abs())
    }

    fn delete_by_id(&self, id: MemberId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM member WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "member",
                id,
            });
        }
        debug!("event=repo_delete module=repo status=ok entity=member id={id}");
        Ok(())
    }
}

impl MemberRepository for SqliteMemberRepository<'_> {
    fn find_member(&self, user_name: &str) -> RepoResult<Option<Member>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEMBER_SELECT_SQL}
             WHERE m.user_name = :user_name
             ORDER BY m.id ASC
             LIMIT 2;"
        ))?;
        let mut rows = stmt.query(named_params! { ":user_name": user_name })?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let member = parse_member_row(row)?;
        if rows.next()?.is_some() {
            return Err(RepoError::NonUniqueResult {
                entity: "member",
                key: user_name.to_string(),
            });
        }
        Ok(Some(member))
    }
}

impl MemberRepositoryCustom for SqliteMemberRepository<'_> {
    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Member>> {
        let member = QMember::member();
        let members = QueryFactory::new(self.conn)
            .select_from(&member)
            .filter(member.user_name.eq(name))
            .order_by(member.id.asc())
            .fetch()?;
        Ok(members)
    }

    fn search(&self, condition: &MemberSearch) -> RepoResult<Vec<MemberTeamRow>> {
        let member = QMember::member();
        let team = QTeam::team();

        let predicate = Predicate::all(
            [
                non_blank(condition.user_name.as_deref()).map(|name| member.user_name.eq(name)),
                non_blank(condition.team_name.as_deref()).map(|name| team.name.eq(name)),
                condition.age_goe.map(|age| member.age.goe(age)),
                condition.age_loe.map(|age| member.age.loe(age)),
            ]
            .into_iter()
            .flatten(),
        );

        let mut query = QueryFactory::new(self.conn)
            .select((
                member.id.clone(),
                member.user_name.clone(),
                member.age.clone(),
                team.id.clone(),
                team.name.clone(),
            ))
            .from(&member)
            .left_join(&team, member.belongs_to(&team))
            .filter_opt(predicate)
            .order_by(member.id.asc())
            .offset(condition.offset);
        if let Some(limit) = condition.limit {
            query = query.limit(limit);
        }

        query
            .fetch()?
            .into_iter()
            .map(|(member_id, user_name, age, team_id, team_name)| {
                match (member_id, user_name, age) {
                    (Some(member_id), Some(user_name), Some(age)) => Ok(MemberTeamRow {
                        member_id,
                        user_name,
                        age,
                        team_id,
                        team_name,
                    }),
                    _ => Err(RepoError::InvalidData(
                        "search row is missing member columns".to_string(),
                    )),
                }
            })
            .collect()
    }
}

fn save_member(conn: &Connection, member: &Member) -> RepoResult<Member> {
    member.validate()?;
    if member.team.is_some() && member.team_id().is_none() {
        return Err(RepoError::TransientReference {
            entity: "member",
            reference: "team",
        });
    }
    let team_id = member.team_id();

    let id = match member.id {
        None => {
            conn.execute(
                "INSERT INTO member (user_name, age, team_id) VALUES (?1, ?2, ?3);",
                params![member.user_name.as_str(), member.age, team_id],
            )?;
            let id = conn.last_insert_rowid();
            debug!("event=repo_save module=repo status=ok entity=member op=insert id={id}");
            id
        }
        Some(id) => {
            let current_team: Option<Option<TeamId>> = conn
                .query_row("SELECT team_id FROM member WHERE id = ?1;", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            match current_team {
                None => {
                    return Err(RepoError::NotFound {
                        entity: "member",
                        id,
                    });
                }
                Some(Some(_)) if team_id.is_none() => {
                    return Err(ValidationError::TeamUnassigned(id).into());
                }
                Some(_) => {}
            }

            conn.execute(
                "UPDATE member SET user_name = ?1, age = ?2, team_id = ?3 WHERE id = ?4;",
                params![member.user_name.as_str(), member.age, team_id, id],
            )?;
            debug!("event=repo_save module=repo status=ok entity=member op=update id={id}");
            id
        }
    };

    // Reload so the returned team carries the stored name, not the caller's copy.
    load_member(conn, id)?.ok_or(RepoError::NotFound {
        entity: "member",
        id,
    })
}

fn load_member(conn: &Connection, id: MemberId) -> RepoResult<Option<Member>> {
    let mut stmt = conn.prepare(&format!("{MEMBER_SELECT_SQL} WHERE m.id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_member_row(row)?));
    }
    Ok(None)
}

fn parse_member_row(row: &Row<'_>) -> RepoResult<Member> {
    let id: MemberId = row.get("id")?;
    let team_id: Option<TeamId> = row.get("team_id")?;
    let team_name: Option<String> = row.get("team_name")?;
    let team = match (team_id, team_name) {
        (Some(team_id), Some(name)) => Some(Team {
            id: Some(team_id),
            name,
        }),
        (Some(team_id), None) => {
            return Err(RepoError::InvalidData(format!(
                "member {id} references missing team {team_id}"
            )));
        }
        (None, _) => None,
    };

    let member = Member {
        id: Some(id),
        user_name: row.get("user_name")?,
        age: row.get("age")?,
        team,
    };
    member
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("member {id}: {err}")))?;
    Ok(member)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}
