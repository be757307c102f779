//! Core data access for the member/team roster.
//! Repositories, the typed query builder and schema management live here;
//! binaries only wire configuration and output.

pub mod config;
pub mod db;
pub mod fixture;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;

pub use config::{ConfigError, DatabaseTarget, RosterConfig};
pub use db::{in_transaction, open_db, open_db_in_memory, Completion, DbError, DbResult};
pub use fixture::{seed_demo_roster, DemoRoster};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::member::{Member, MemberId};
pub use model::team::{Team, TeamId, TeamWithMembers};
pub use model::{Entity, ValidationError};
pub use query::{QMember, QTeam, QueryError, QueryFactory, QueryResult};
pub use repo::member_repo::{
    MemberRepository, MemberRepositoryCustom, MemberSearch, MemberTeamRow, SqliteMemberRepository,
};
pub use repo::team_repo::{SqliteTeamRepository, TeamRepository};
pub use repo::{CrudRepository, RepoError, RepoResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
