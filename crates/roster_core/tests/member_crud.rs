use roster_core::db::{in_transaction, open_db_in_memory, Completion};
use roster_core::{
    CrudRepository, Member, RepoError, SqliteMemberRepository, SqliteTeamRepository, Team,
    TeamRepository, ValidationError,
};
use rusqlite::Connection;

fn saved_team(conn: &Connection, name: &str) -> Team {
    SqliteTeamRepository::try_new(conn)
        .unwrap()
        .save(&Team::new(name))
        .unwrap()
}

#[test]
fn save_and_find_by_id_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let team_a = saved_team(&conn, "teamA");
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let saved = repo
        .save(&Member::with_team("memberA", 10, &team_a))
        .unwrap();
    let id = saved.id.unwrap();

    let loaded = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.id, Some(id));
    assert_eq!(loaded.user_name, "memberA");
    assert_eq!(loaded.age, 10);
    assert_eq!(loaded.team, Some(team_a));
    assert_eq!(loaded, saved);
}

#[test]
fn save_returns_stored_team_name() {
    let conn = open_db_in_memory().unwrap();
    let team_a = saved_team(&conn, "teamA");
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let stale = Team {
        id: team_a.id,
        name: "renamed".to_string(),
    };
    let saved = repo.save(&Member::with_team("memberA", 10, &stale)).unwrap();
    assert_eq!(saved.team, Some(team_a));

    let loaded = repo.find_by_id(saved.id.unwrap()).unwrap().unwrap();
    assert_eq!(loaded, saved);
}

#[test]
fn find_by_id_returns_none_for_missing_row() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    assert!(repo.find_by_id(404).unwrap().is_none());
    assert!(!repo.exists_by_id(404).unwrap());
}

#[test]
fn find_all_returns_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let first = repo.save(&Member::new("zeta", 30)).unwrap();
    let second = repo.save(&Member::new("alpha", 20)).unwrap();

    let all = repo.find_all().unwrap();
    assert_eq!(all, vec![first, second]);
    assert_eq!(repo.count().unwrap(), 2);
}

#[test]
fn save_existing_member_updates_fields_and_team() {
    let conn = open_db_in_memory().unwrap();
    let team_a = saved_team(&conn, "teamA");
    let team_b = saved_team(&conn, "teamB");
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let mut member = repo
        .save(&Member::with_team("member1", 10, &team_a))
        .unwrap();
    member.user_name = "member1-renamed".to_string();
    member.age = 11;
    member.change_team(&team_b);
    repo.save(&member).unwrap();

    let loaded = repo.find_by_id(member.id.unwrap()).unwrap().unwrap();
    assert_eq!(loaded.user_name, "member1-renamed");
    assert_eq!(loaded.age, 11);
    assert_eq!(loaded.team, Some(team_b));
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn save_with_unknown_id_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let mut ghost = Member::new("ghost", 1);
    ghost.id = Some(999);

    let err = repo.save(&ghost).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: "member",
            id: 999
        }
    ));
}

#[test]
fn assigned_team_cannot_be_cleared() {
    let conn = open_db_in_memory().unwrap();
    let team_a = saved_team(&conn, "teamA");
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let mut member = repo
        .save(&Member::with_team("member1", 10, &team_a))
        .unwrap();
    member.team = None;

    let err = repo.save(&member).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::TeamUnassigned(_))
    ));
    let loaded = repo.find_by_id(member.id.unwrap()).unwrap().unwrap();
    assert_eq!(loaded.team, Some(team_a));
}

#[test]
fn member_without_team_can_join_one_later() {
    let conn = open_db_in_memory().unwrap();
    let team_a = saved_team(&conn, "teamA");
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let mut member = repo.save(&Member::new("loner", 25)).unwrap();
    assert!(member.team.is_none());

    member.change_team(&team_a);
    repo.save(&member).unwrap();

    let loaded = repo.find_by_id(member.id.unwrap()).unwrap().unwrap();
    assert_eq!(loaded.team, Some(team_a));
}

#[test]
fn transient_team_reference_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let err = repo
        .save(&Member::with_team("member1", 10, &Team::new("unsaved")))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::TransientReference {
            entity: "member",
            reference: "team"
        }
    ));
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn invalid_members_are_rejected_before_write() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let blank = repo.save(&Member::new("   ", 10)).unwrap_err();
    assert!(matches!(
        blank,
        RepoError::Validation(ValidationError::BlankUserName)
    ));

    let negative = repo.save(&Member::new("member1", -5)).unwrap_err();
    assert!(matches!(
        negative,
        RepoError::Validation(ValidationError::NegativeAge(-5))
    ));
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn delete_removes_member_and_rejects_transient() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let member = repo.save(&Member::new("member1", 10)).unwrap();
    repo.delete(&member).unwrap();
    assert!(repo.find_by_id(member.id.unwrap()).unwrap().is_none());

    let missing = repo.delete_by_id(member.id.unwrap()).unwrap_err();
    assert!(matches!(missing, RepoError::NotFound { .. }));

    let transient = repo.delete(&Member::new("never-saved", 1)).unwrap_err();
    assert!(matches!(transient, RepoError::Transient("member")));
}

#[test]
fn save_all_is_all_or_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();

    let err = repo
        .save_all(&[
            Member::new("member1", 10),
            Member::new("member2", 20),
            Member::new("", 30),
        ])
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(repo.count().unwrap(), 0);

    let saved = repo
        .save_all(&[Member::new("member1", 10), Member::new("member2", 20)])
        .unwrap();
    assert_eq!(saved.len(), 2);
    assert!(saved.iter().all(|member| member.id.is_some()));
    assert_eq!(repo.count().unwrap(), 2);
}

#[test]
fn team_with_members_cannot_be_deleted() {
    let conn = open_db_in_memory().unwrap();
    let team_a = saved_team(&conn, "teamA");
    let teams = SqliteTeamRepository::try_new(&conn).unwrap();
    let members = SqliteMemberRepository::try_new(&conn).unwrap();
    members
        .save(&Member::with_team("member1", 10, &team_a))
        .unwrap();

    let err = teams.delete(&team_a).unwrap_err();
    assert!(matches!(
        err,
        RepoError::TeamInUse {
            member_count: 1,
            ..
        }
    ));
    assert!(teams.exists_by_id(team_a.id.unwrap()).unwrap());
}

#[test]
fn empty_team_can_be_deleted() {
    let conn = open_db_in_memory().unwrap();
    let team = saved_team(&conn, "empty");
    let teams = SqliteTeamRepository::try_new(&conn).unwrap();

    teams.delete_by_id(team.id.unwrap()).unwrap();
    assert!(teams.find_by_id(team.id.unwrap()).unwrap().is_none());
}

#[test]
fn team_loads_its_members() {
    let conn = open_db_in_memory().unwrap();
    let team_a = saved_team(&conn, "teamA");
    let team_b = saved_team(&conn, "teamB");
    let members = SqliteMemberRepository::try_new(&conn).unwrap();
    members
        .save_all(&[
            Member::with_team("member1", 10, &team_a),
            Member::with_team("member2", 20, &team_b),
            Member::with_team("member3", 30, &team_a),
        ])
        .unwrap();

    let teams = SqliteTeamRepository::try_new(&conn).unwrap();
    let loaded = teams
        .find_with_members(team_a.id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(loaded.team, team_a);
    let names: Vec<&str> = loaded
        .members
        .iter()
        .map(|member| member.user_name.as_str())
        .collect();
    assert_eq!(names, vec!["member1", "member3"]);

    assert!(teams.find_with_members(404).unwrap().is_none());
    assert_eq!(teams.find_by_name("teamB").unwrap(), vec![team_b]);
}

#[test]
fn rollback_completion_discards_writes() {
    let conn = open_db_in_memory().unwrap();

    let saved = in_transaction(&conn, Completion::Rollback, |tx| -> Result<Member, RepoError> {
        let team = SqliteTeamRepository::try_new(tx)?.save(&Team::new("teamA"))?;
        SqliteMemberRepository::try_new(tx)?.save(&Member::with_team("member1", 10, &team))
    })
    .unwrap();
    assert!(saved.id.is_some());

    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    assert_eq!(repo.count().unwrap(), 0);
    assert_eq!(
        SqliteTeamRepository::try_new(&conn).unwrap().count().unwrap(),
        0
    );
}

#[test]
fn commit_completion_keeps_writes() {
    let conn = open_db_in_memory().unwrap();

    in_transaction(&conn, Completion::Commit, |tx| -> Result<(), RepoError> {
        SqliteMemberRepository::try_new(tx)?.save(&Member::new("member1", 10))?;
        Ok(())
    })
    .unwrap();

    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn failed_save_all_inside_committed_transaction_keeps_nothing() {
    let conn = open_db_in_memory().unwrap();

    in_transaction(&conn, Completion::Commit, |tx| -> Result<(), RepoError> {
        let repo = SqliteMemberRepository::try_new(tx)?;
        repo.save(&Member::new("kept", 30))?;
        let err = repo
            .save_all(&[Member::new("member1", 10), Member::new("", 20)])
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
        Ok(())
    })
    .unwrap();

    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    assert_eq!(repo.count().unwrap(), 1);
    let all = repo.find_all().unwrap();
    assert_eq!(all[0].user_name, "kept");
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqliteMemberRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn members_serialize_with_nested_team() {
    let conn = open_db_in_memory().unwrap();
    let team_a = saved_team(&conn, "teamA");
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    let saved = repo
        .save(&Member::with_team("member1", 10, &team_a))
        .unwrap();

    let json = serde_json::to_value(&saved).unwrap();
    assert_eq!(json["user_name"], "member1");
    assert_eq!(json["team"]["name"], "teamA");
}
