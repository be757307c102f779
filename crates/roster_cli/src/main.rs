//! `roster` command line entry point.
//!
//! # Responsibility
//! - Resolve configuration from flags and `ROSTER_*` environment variables.
//! - Run repository lookups and query demonstrations, printing text or JSON.
//!
//! An in-memory database starts empty for every process, so it is seeded with
//! the demo roster before any command runs.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use roster_core::config::DatabaseTarget;
use roster_core::{
    init_from_config, seed_demo_roster, CrudRepository, MemberRepository,
    MemberRepositoryCustom, MemberSearch, RosterConfig, SqliteMemberRepository,
    SqliteTeamRepository, TeamId, TeamRepository,
};
use rusqlite::Connection;
use std::path::PathBuf;
use std::process;

mod demo;
mod output;

use demo::DemoKind;
use output::Report;

/// Member/team roster over SQLite
#[derive(Debug, Parser)]
#[command(name = "roster")]
#[command(version)]
#[command(about = "Member/team roster over SQLite", long_about = None)]
struct Args {
    /// Database file, or `:memory:` (can also be set via ROSTER_DB)
    #[arg(long, global = true)]
    db: Option<String>,

    /// trace|debug|info|warn|error (can also be set via ROSTER_LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rotating log files; stderr when unset
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Insert the demo teams and twelve members
    Seed,
    /// List every member with its team
    Members,
    /// List every team with its members
    Teams,
    /// Named lookup; fails when the name is not unique
    Find { user_name: String },
    /// Builder lookup; lists every member with this exact name
    FindByName { name: String },
    /// Dynamic search over members and their team
    Search {
        #[arg(long)]
        user_name: Option<String>,
        #[arg(long)]
        team_name: Option<String>,
        /// Minimum age, inclusive
        #[arg(long)]
        age_goe: Option<i32>,
        /// Maximum age, inclusive
        #[arg(long)]
        age_loe: Option<i32>,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Run one query demonstration, or all of them
    Demo {
        #[arg(value_enum, default_value_t = DemoKind::All)]
        kind: DemoKind,
    },
    /// Delete a team; rejected while it still has members
    DeleteTeam { id: TeamId },
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = resolve_config(&args)?;
    if let Err(err) = init_from_config(&config) {
        eprintln!("warning: logging disabled: {err}");
    }
    info!(
        "event=cli_start module=cli status=ok database={} core_version={}",
        match config.database {
            DatabaseTarget::Memory => "memory",
            DatabaseTarget::File(_) => "file",
        },
        roster_core::core_version()
    );

    let conn = config
        .open_database()
        .with_context(|| format!("failed to open database `{}`", config.database))?;
    if config.database == DatabaseTarget::Memory && !matches!(args.command, Command::Seed) {
        seed_demo_roster(&conn).context("failed to seed in-memory database")?;
    }

    let report = execute(&conn, &args.command)?;
    report.print(args.json)
}

/// Flags win over environment values.
fn resolve_config(args: &Args) -> Result<RosterConfig> {
    let mut config = RosterConfig::from_env().context("invalid ROSTER_* environment")?;
    if let Some(db) = args.db.as_deref() {
        config = config.with_database(db)?;
    }
    if let Some(level) = args.log_level.as_deref() {
        config = config.with_log_level(level)?;
    }
    if let Some(dir) = args.log_dir.as_deref() {
        config = config.with_log_dir(dir)?;
    }
    Ok(config)
}

fn execute(conn: &Connection, command: &Command) -> Result<Report> {
    let members = SqliteMemberRepository::try_new(conn)?;
    let teams = SqliteTeamRepository::try_new(conn)?;

    let report = match command {
        Command::Seed => {
            let roster = seed_demo_roster(conn)?;
            Report::members("seeded", &roster.members)?
        }
        Command::Members => Report::members("members", &members.find_all()?)?,
        Command::Teams => {
            let mut loaded = Vec::new();
            for team in teams.find_all()? {
                if let Some(id) = team.id {
                    loaded.extend(teams.find_with_members(id)?);
                }
            }
            Report::teams(&loaded)?
        }
        Command::Find { user_name } => {
            let found = members.find_member(user_name)?;
            Report::members("find", found.as_slice())?
        }
        Command::FindByName { name } => {
            Report::members("find-by-name", &members.find_by_name(name)?)?
        }
        Command::Search {
            user_name,
            team_name,
            age_goe,
            age_loe,
            offset,
            limit,
        } => {
            let rows = members.search(&MemberSearch {
                user_name: user_name.clone(),
                team_name: team_name.clone(),
                age_goe: *age_goe,
                age_loe: *age_loe,
                offset: *offset,
                limit: *limit,
            })?;
            Report::search(&rows)?
        }
        Command::Demo { kind } => demo::run(conn, *kind)?,
        Command::DeleteTeam { id } => {
            teams.delete_by_id(*id)?;
            Report::message("delete-team", format!("deleted team {id}"))
        }
    };
    Ok(report)
}
