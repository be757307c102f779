//! Demo roster used by the CLI and the query tests.
//!
//! Seeds two teams and twelve members `member1..member12`. Ages cycle
//! 10/20/30/40 and team assignment cycles teamA, teamA, teamB, teamB.

use crate::model::member::Member;
use crate::model::team::Team;
use crate::repo::member_repo::SqliteMemberRepository;
use crate::repo::support::write_scope;
use crate::repo::team_repo::SqliteTeamRepository;
use crate::repo::{CrudRepository, RepoResult};
use log::info;
use rusqlite::Connection;

pub const DEMO_MEMBER_COUNT: usize = 12;

/// Everything `seed_demo_roster` inserted, with generated ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoRoster {
    pub team_a: Team,
    pub team_b: Team,
    pub members: Vec<Member>,
}

/// Inserts the demo teams and members.
///
/// Runs inside one immediate transaction unless the caller already holds one.
pub fn seed_demo_roster(conn: &Connection) -> RepoResult<DemoRoster> {
    let teams = SqliteTeamRepository::try_new(conn)?;
    let members = SqliteMemberRepository::try_new(conn)?;

    write_scope(conn, |_| {
        let team_a = teams.save(&Team::new("teamA"))?;
        let team_b = teams.save(&Team::new("teamB"))?;

        let roster: Vec<Member> = (1..=DEMO_MEMBER_COUNT)
            .map(|index| {
                let slot = (index - 1) % 4;
                let team = if slot < 2 { &team_a } else { &team_b };
                Member::with_team(format!("member{index}"), demo_age(slot), team)
            })
            .collect();
        let members = members.save_all(&roster)?;

        info!(
            "event=fixture_seed module=fixture status=ok teams=2 members={}",
            members.len()
        );
        Ok(DemoRoster {
            team_a,
            team_b,
            members,
        })
    })
}

fn demo_age(slot: usize) -> i32 {
    match slot {
        0 => 10,
        1 => 20,
        2 => 30,
        _ => 40,
    }
}
