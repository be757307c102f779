//! Team entity: the "one" side of the member/team relation.

use super::member::Member;
use super::{Entity, ValidationError};
use serde::{Deserialize, Serialize};

/// Store-generated team identifier.
pub type TeamId = i64;

/// A named group of members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: Option<TeamId>,
    pub name: String,
}

impl Team {
    /// Creates a transient team.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    /// Checks field-level invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankTeamName);
        }
        Ok(())
    }
}

impl Entity for Team {
    type Id = TeamId;
    const NAME: &'static str = "team";

    fn id(&self) -> Option<TeamId> {
        self.id
    }
}

/// Read model for the team → members back-reference.
///
/// Never written; membership is changed through `Member::team`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamWithMembers {
    pub team: Team,
    /// Members ordered by id.
    pub members: Vec<Member>,
}
