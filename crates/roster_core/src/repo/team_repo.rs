//! Team repository contracts and SQLite implementation.
//!
//! # Invariants
//! - A team that still has members is never deleted (`RepoError::TeamInUse`).
//! - The members back-reference is read-only; it is loaded, never written.

use super::support::{ensure_connection_ready, write_scope};
use super::{CrudRepository, RepoError, RepoResult};
use crate::model::member::Member;
use crate::model::team::{Team, TeamId, TeamWithMembers};
use crate::query::{QMember, QTeam, QueryFactory};
use log::debug;
use rusqlite::{params, Connection, Row};

const TEAM_SELECT_SQL: &str = "SELECT id, name FROM team";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("team", &["id", "name"]),
    ("member", &["id", "team_id"]),
];

/// Team-specific queries on top of generic CRUD.
pub trait TeamRepository: CrudRepository<Team> {
    /// Teams whose name equals `name` exactly, ordered by id.
    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Team>>;

    /// Loads a team together with its members.
    fn find_with_members(&self, id: TeamId) -> RepoResult<Option<TeamWithMembers>>;

    /// Members of team `id`, ordered by id.
    fn find_members(&self, id: TeamId) -> RepoResult<Vec<Member>>;
}

/// SQLite-backed team repository.
pub struct SqliteTeamRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTeamRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_SCHEMA)?;
        Ok(Self { conn })
    }
}

impl CrudRepository<Team> for SqliteTeamRepository<'_> {
    fn save(&self, team: &Team) -> RepoResult<Team> {
        save_team(self.conn, team)
    }

    fn save_all(&self, teams: &[Team]) -> RepoResult<Vec<Team>> {
        write_scope(self.conn, |conn| {
            teams.iter().map(|team| save_team(conn, team)).collect()
        })
    }

    fn find_by_id(&self, id: TeamId) -> RepoResult<Option<Team>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TEAM_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_team_row(row)?));
        }
        Ok(None)
    }

    fn exists_by_id(&self, id: TeamId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM team WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn find_all(&self) -> RepoResult<Vec<Team>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TEAM_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut teams = Vec::new();
        while let Some(row) = rows.next()? {
            teams.push(parse_team_row(row)?);
        }
        Ok(teams)
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM team;", [], |row| row.get(0))?;
        Ok(count.unsigned_abs())
    }

    fn delete_by_id(&self, id: TeamId) -> RepoResult<()> {
        write_scope(self.conn, |conn| {
            let member_count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM member WHERE team_id = ?1;",
                [id],
                |row| row.get(0),
            )?;
            if member_count > 0 {
                debug!(
                    "event=repo_delete module=repo status=rejected entity=team id={id} member_count={member_count}"
                );
                return Err(RepoError::TeamInUse {
                    team_id: id,
                    member_count: member_count.unsigned_abs(),
                });
            }

            let changed = conn.execute("DELETE FROM team WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    entity: "team",
                    id,
                });
            }

            debug!("event=repo_delete module=repo status=ok entity=team id={id}");
            Ok(())
        })
    }
}

impl TeamRepository for SqliteTeamRepository<'_> {
    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Team>> {
        let team = QTeam::team();
        let teams = QueryFactory::new(self.conn)
            .select_from(&team)
            .filter(team.name.eq(name))
            .order_by(team.id.asc())
            .fetch()?;
        Ok(teams.into_iter().flatten().collect())
    }

    fn find_with_members(&self, id: TeamId) -> RepoResult<Option<TeamWithMembers>> {
        let Some(team) = self.find_by_id(id)? else {
            return Ok(None);
        };
        let members = self.find_members(id)?;
        Ok(Some(TeamWithMembers { team, members }))
    }

    fn find_members(&self, id: TeamId) -> RepoResult<Vec<Member>> {
        let member = QMember::member();
        let members = QueryFactory::new(self.conn)
            .select_from(&member)
            .filter(member.team_id.eq(id))
            .order_by(member.id.asc())
            .fetch()?;
        Ok(members)
    }
}

fn save_team(conn: &Connection, team: &Team) -> RepoResult<Team> {
    team.validate()?;

    match team.id {
        None => {
            conn.execute("INSERT INTO team (name) VALUES (?1);", [team.name.as_str()])?;
            let id = conn.last_insert_rowid();
            debug!("event=repo_save module=repo status=ok entity=team op=insert id={id}");
            Ok(Team {
                id: Some(id),
                name: team.name.clone(),
            })
        }
        Some(id) => {
            let changed = conn.execute(
                "UPDATE team SET name = ?1 WHERE id = ?2;",
                params![team.name.as_str(), id],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    entity: "team",
                    id,
                });
            }
            debug!("event=repo_save module=repo status=ok entity=team op=update id={id}");
            Ok(team.clone())
        }
    }
}

fn parse_team_row(row: &Row<'_>) -> RepoResult<Team> {
    let team = Team {
        id: Some(row.get("id")?),
        name: row.get("name")?,
    };
    team.validate()
        .map_err(|err| RepoError::InvalidData(format!("team row: {err}")))?;
    Ok(team)
}
