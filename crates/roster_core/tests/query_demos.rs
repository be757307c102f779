use roster_core::db::open_db_in_memory;
use roster_core::query::{sub_query, Predicate, QMember, QTeam, QueryError, QueryFactory};
use roster_core::{seed_demo_roster, CrudRepository, Member, SqliteMemberRepository};
use rusqlite::Connection;

fn seeded() -> Connection {
    let conn = open_db_in_memory().unwrap();
    seed_demo_roster(&conn).unwrap();
    conn
}

fn names(members: &[Member]) -> Vec<&str> {
    members
        .iter()
        .map(|member| member.user_name.as_str())
        .collect()
}

#[test]
fn fixture_has_expected_shape() {
    let conn = open_db_in_memory().unwrap();
    let roster = seed_demo_roster(&conn).unwrap();

    assert_eq!(roster.members.len(), 12);
    assert_eq!(roster.team_a.name, "teamA");
    assert_eq!(roster.team_b.name, "teamB");
    let member4 = &roster.members[3];
    assert_eq!(member4.user_name, "member4");
    assert_eq!(member4.age, 40);
    assert_eq!(member4.team.as_ref(), Some(&roster.team_b));
}

#[test]
fn filter_combines_predicates_with_and() {
    let conn = seeded();
    let member = QMember::member();

    let chained = QueryFactory::new(&conn)
        .select_from(&member)
        .filter(member.user_name.eq("member1"))
        .filter(member.age.eq(10))
        .fetch_one()
        .unwrap()
        .unwrap();
    let combined = QueryFactory::new(&conn)
        .select_from(&member)
        .filter(member.user_name.eq("member1").and(member.age.between(10, 30)))
        .fetch_one()
        .unwrap()
        .unwrap();

    assert_eq!(chained, combined);
    assert_eq!(chained.user_name, "member1");
}

#[test]
fn membership_and_pattern_predicates() {
    let conn = seeded();
    let member = QMember::member();
    let query = QueryFactory::new(&conn);

    let young = query
        .select_from(&member)
        .filter(member.age.in_list([10, 20]))
        .fetch_count()
        .unwrap();
    assert_eq!(young, 6);

    let not_young = query
        .select_from(&member)
        .filter(member.age.not_in([10, 20]))
        .fetch_count()
        .unwrap();
    assert_eq!(not_young, 6);

    let teens = query
        .select_from(&member)
        .filter(member.user_name.starts_with("member1"))
        .order_by(member.id.asc())
        .fetch()
        .unwrap();
    assert_eq!(names(&teens), vec!["member1", "member10", "member11", "member12"]);

    let ends = query
        .select_from(&member)
        .filter(member.user_name.ends_with("2"))
        .fetch_count()
        .unwrap();
    assert_eq!(ends, 2);

    let either = query
        .select_from(&member)
        .filter_opt(Predicate::any([
            member.user_name.eq("member3"),
            member.user_name.like("member1_"),
        ]))
        .fetch_count()
        .unwrap();
    assert_eq!(either, 4);

    let negated = query
        .select_from(&member)
        .filter(member.age.goe(20).not())
        .fetch_count()
        .unwrap();
    assert_eq!(negated, 3);
}

#[test]
fn contains_treats_wildcards_literally() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    repo.save_all(&[Member::new("100%", 1), Member::new("1000", 2)])
        .unwrap();
    let member = QMember::member();

    let found = QueryFactory::new(&conn)
        .select_from(&member)
        .filter(member.user_name.contains("0%"))
        .fetch()
        .unwrap();
    assert_eq!(names(&found), vec!["100%"]);
}

#[test]
fn sort_by_age_desc_then_name_asc() {
    let conn = seeded();
    let member = QMember::member();

    let sorted = QueryFactory::new(&conn)
        .select_from(&member)
        .filter(member.age.goe(30))
        .order_by(member.age.desc())
        .order_by(member.user_name.asc())
        .fetch()
        .unwrap();

    assert_eq!(
        names(&sorted),
        vec!["member12", "member4", "member8", "member11", "member3", "member7"]
    );
}

#[test]
fn paging_returns_requested_window() {
    let conn = seeded();
    let member = QMember::member();

    let query = QueryFactory::new(&conn)
        .select_from(&member)
        .order_by(member.user_name.desc())
        .offset(3)
        .limit(3);

    let page = query.fetch().unwrap();
    assert_eq!(names(&page), vec!["member6", "member5", "member4"]);
    assert_eq!(query.fetch_count().unwrap(), 12);
}

#[test]
fn paging_past_the_end_is_empty() {
    let conn = seeded();
    let member = QMember::member();

    let page = QueryFactory::new(&conn)
        .select_from(&member)
        .order_by(member.id.asc())
        .offset(12)
        .fetch()
        .unwrap();
    assert!(page.is_empty());
}

#[test]
fn aggregation_over_all_members() {
    let conn = seeded();
    let member = QMember::member();

    let (count, sum, avg, max, min) = QueryFactory::new(&conn)
        .select((
            member.count(),
            member.age.sum(),
            member.age.avg(),
            member.age.max(),
            member.age.min(),
        ))
        .from(&member)
        .fetch_one()
        .unwrap()
        .unwrap();

    assert_eq!(count, Some(12));
    assert_eq!(sum, Some(300));
    assert_eq!(avg, Some(25.0));
    assert_eq!(max, Some(40));
    assert_eq!(min, Some(10));
}

#[test]
fn aggregation_over_empty_table_yields_nulls() {
    let conn = open_db_in_memory().unwrap();
    let member = QMember::member();

    let (count, max) = QueryFactory::new(&conn)
        .select((member.count(), member.age.max()))
        .from(&member)
        .fetch_one()
        .unwrap()
        .unwrap();

    assert_eq!(count, Some(0));
    assert_eq!(max, None);
}

#[test]
fn group_by_team_averages_age() {
    let conn = seeded();
    let member = QMember::member();
    let team = QTeam::team();

    let rows = QueryFactory::new(&conn)
        .select((&team.name, member.age.avg()))
        .from(&member)
        .join(&team, member.belongs_to(&team))
        .group_by(&team.name)
        .order_by(team.name.asc())
        .fetch()
        .unwrap();

    assert_eq!(
        rows,
        vec![
            (Some("teamA".to_string()), Some(15.0)),
            (Some("teamB".to_string()), Some(35.0)),
        ]
    );
}

#[test]
fn group_by_with_having_filters_groups() {
    let conn = seeded();
    let member = QMember::member();

    let rows = QueryFactory::new(&conn)
        .select((&member.age, member.count()))
        .from(&member)
        .group_by(&member.age)
        .having(member.count().goe(2))
        .order_by(member.age.asc())
        .fetch()
        .unwrap();

    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|(_, count)| *count == Some(3)));
    assert_eq!(rows[0].0, Some(10));

    let none = QueryFactory::new(&conn)
        .select(&member.age)
        .from(&member)
        .group_by(&member.age)
        .having(member.count().gt(3))
        .fetch()
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn inner_join_keeps_only_matching_team() {
    let conn = seeded();
    let member = QMember::member();
    let team = QTeam::team();

    let members = QueryFactory::new(&conn)
        .select_from(&member)
        .join(&team, member.belongs_to(&team))
        .filter(team.name.eq("teamA"))
        .order_by(member.id.asc())
        .fetch()
        .unwrap();

    assert_eq!(
        names(&members),
        vec!["member1", "member2", "member5", "member6", "member9", "member10"]
    );
    assert!(members
        .iter()
        .all(|member| member.team.as_ref().unwrap().name == "teamA"));
}

#[test]
fn left_join_keeps_every_member_with_null_team() {
    let conn = seeded();
    let member = QMember::member();
    let team = QTeam::team();

    let rows = QueryFactory::new(&conn)
        .select((&member, &team))
        .from(&member)
        .left_join(&team, member.belongs_to(&team).and(team.name.eq("teamA")))
        .order_by(member.id.asc())
        .fetch()
        .unwrap();

    assert_eq!(rows.len(), 12);
    let unmatched = rows.iter().filter(|(_, team)| team.is_none()).count();
    assert_eq!(unmatched, 6);
    for (member, joined) in &rows {
        let own_team = member.team.as_ref().unwrap();
        match joined {
            Some(joined) => assert_eq!(joined, own_team),
            None => assert_eq!(own_team.name, "teamB"),
        }
    }
}

#[test]
fn theta_join_matches_unrelated_columns() {
    let conn = seeded();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    repo.save_all(&[Member::new("teamA", 1), Member::new("teamB", 2), Member::new("teamC", 3)])
        .unwrap();
    let member = QMember::member();
    let team = QTeam::team();

    let matched = QueryFactory::new(&conn)
        .select(&member)
        .from(&member)
        .from(&team)
        .filter(member.user_name.eq(&team.name))
        .order_by(member.id.asc())
        .fetch()
        .unwrap();

    assert_eq!(names(&matched), vec!["teamA", "teamB"]);
}

#[test]
fn sub_query_compares_against_average_age() {
    let conn = seeded();
    let member = QMember::member();
    let member_sub = QMember::new("member_sub");

    let older = QueryFactory::new(&conn)
        .select_from(&member)
        .filter(member.age.gt(sub_query(member_sub.age.avg()).from(&member_sub)))
        .fetch()
        .unwrap();
    assert_eq!(older.len(), 6);
    assert!(older.iter().all(|member| member.age >= 30));

    let oldest = QueryFactory::new(&conn)
        .select_from(&member)
        .filter(member.age.eq(sub_query(member_sub.age.max()).from(&member_sub)))
        .fetch()
        .unwrap();
    assert_eq!(names(&oldest), vec!["member4", "member8", "member12"]);
}

#[test]
fn correlated_sub_query_references_outer_row() {
    let conn = seeded();
    let member = QMember::member();
    let member_sub = QMember::new("member_sub");

    // Members older than the average of their own team.
    let above_team_average = QueryFactory::new(&conn)
        .select_from(&member)
        .filter(
            member.age.gt(sub_query(member_sub.age.avg())
                .from(&member_sub)
                .filter(member_sub.team_id.eq(&member.team_id))),
        )
        .order_by(member.id.asc())
        .fetch()
        .unwrap();

    assert_eq!(
        names(&above_team_average),
        vec!["member2", "member4", "member6", "member8", "member10", "member12"]
    );
}

#[test]
fn in_sub_query_filters_by_list() {
    let conn = seeded();
    let member = QMember::member();
    let member_sub = QMember::new("member_sub");

    let count = QueryFactory::new(&conn)
        .select_from(&member)
        .filter(
            member.age.in_sub_query(
                sub_query(&member_sub.age)
                    .from(&member_sub)
                    .filter(member_sub.age.gt(10)),
            ),
        )
        .fetch_count()
        .unwrap();
    assert_eq!(count, 9);
}

#[test]
fn fetch_one_rejects_multiple_rows_and_fetch_first_does_not() {
    let conn = seeded();
    let member = QMember::member();
    let query = QueryFactory::new(&conn)
        .select_from(&member)
        .filter(member.age.eq(40))
        .order_by(member.id.asc());

    assert!(matches!(
        query.fetch_one(),
        Err(QueryError::NonUniqueResult)
    ));
    let first = query.fetch_first().unwrap().unwrap();
    assert_eq!(first.user_name, "member4");

    let none = QueryFactory::new(&conn)
        .select_from(&member)
        .filter(member.age.gt(100))
        .fetch_first()
        .unwrap();
    assert!(none.is_none());
}

#[test]
fn fetch_first_respects_zero_limit() {
    let conn = seeded();
    let member = QMember::member();

    let first = QueryFactory::new(&conn)
        .select_from(&member)
        .limit(0)
        .fetch_first()
        .unwrap();
    assert!(first.is_none());
}

#[test]
fn nullable_columns_support_null_checks() {
    let conn = seeded();
    let repo = SqliteMemberRepository::try_new(&conn).unwrap();
    repo.save(&Member::new("loner", 99)).unwrap();
    let member = QMember::member();

    let without_team = QueryFactory::new(&conn)
        .select_from(&member)
        .filter(member.team_id.is_null())
        .fetch()
        .unwrap();
    assert_eq!(names(&without_team), vec!["loner"]);

    let with_team = QueryFactory::new(&conn)
        .select_from(&member)
        .filter(member.team_id.is_not_null())
        .fetch_count()
        .unwrap();
    assert_eq!(with_team, 12);
}
