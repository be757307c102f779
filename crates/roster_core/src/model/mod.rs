//! Roster domain model.
//!
//! # Responsibility
//! - Define the `Member` and `Team` entities persisted by the repositories.
//! - Own field-level validation shared by write and read paths.
//!
//! # Invariants
//! - An entity with `id == None` is transient and has no row yet.
//! - Ownership of the member/team relationship lives on `Member`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod member;
pub mod team;

/// Persisted record type with a store-generated identifier.
pub trait Entity {
    /// Identifier type assigned on first save.
    type Id: Copy + Display;

    /// Entity name used in error messages and log events.
    const NAME: &'static str;

    /// Returns the identifier, or `None` while the entity is transient.
    fn id(&self) -> Option<Self::Id>;
}

/// Field-level validation failures for roster entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Member user name is blank after trimming.
    BlankUserName,
    /// Member age is negative.
    NegativeAge(i32),
    /// Team name is blank after trimming.
    BlankTeamName,
    /// A persisted member with a team cannot be left without one.
    TeamUnassigned(member::MemberId),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankUserName => write!(f, "member user name must not be blank"),
            Self::NegativeAge(age) => write!(f, "member age must be >= 0, got {age}"),
            Self::BlankTeamName => write!(f, "team name must not be blank"),
            Self::TeamUnassigned(id) => {
                write!(f, "member {id} already belongs to a team and cannot be unassigned")
            }
        }
    }
}

impl Error for ValidationError {}
