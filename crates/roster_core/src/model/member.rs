//! Member entity.
//!
//! # Invariants
//! - `user_name` is not blank and `age >= 0`.
//! - `team`, when set, refers to a saved team (`team.id.is_some()`) before
//!   the member is persisted.

use super::team::{Team, TeamId};
use super::{Entity, ValidationError};
use serde::{Deserialize, Serialize};

/// Store-generated member identifier.
pub type MemberId = i64;

/// A roster member, optionally assigned to one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Option<MemberId>,
    pub user_name: String,
    pub age: i32,
    /// Many-to-one reference; loaded eagerly on every read.
    pub team: Option<Team>,
}

impl Member {
    /// Creates a transient member without a team.
    pub fn new(user_name: impl Into<String>, age: i32) -> Self {
        Self {
            id: None,
            user_name: user_name.into(),
            age,
            team: None,
        }
    }

    /// Creates a transient member assigned to `team`.
    pub fn with_team(user_name: impl Into<String>, age: i32, team: &Team) -> Self {
        Self {
            team: Some(team.clone()),
            ..Self::new(user_name, age)
        }
    }

    /// Moves this member to another team.
    pub fn change_team(&mut self, team: &Team) {
        self.team = Some(team.clone());
    }

    /// Returns the referenced team id, if any.
    pub fn team_id(&self) -> Option<TeamId> {
        self.team.as_ref().and_then(|team| team.id)
    }

    /// Checks field-level invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_name.trim().is_empty() {
            return Err(ValidationError::BlankUserName);
        }
        if self.age < 0 {
            return Err(ValidationError::NegativeAge(self.age));
        }
        if let Some(team) = self.team.as_ref() {
            team.validate()?;
        }
        Ok(())
    }
}

impl Entity for Member {
    type Id = MemberId;
    const NAME: &'static str = "member";

    fn id(&self) -> Option<MemberId> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::Member;
    use crate::model::team::Team;
    use crate::model::ValidationError;

    #[test]
    fn validate_rejects_blank_user_name_and_negative_age() {
        assert_eq!(
            Member::new("  ", 10).validate(),
            Err(ValidationError::BlankUserName)
        );
        assert_eq!(
            Member::new("member1", -1).validate(),
            Err(ValidationError::NegativeAge(-1))
        );
    }

    #[test]
    fn change_team_replaces_reference() {
        let team_a = Team {
            id: Some(1),
            name: "teamA".to_string(),
        };
        let team_b = Team {
            id: Some(2),
            name: "teamB".to_string(),
        };
        let mut member = Member::with_team("member1", 10, &team_a);
        assert_eq!(member.team_id(), Some(1));

        member.change_team(&team_b);
        assert_eq!(member.team_id(), Some(2));
        assert!(member.validate().is_ok());
    }

    #[test]
    fn serializes_team_reference_inline() {
        let team = Team {
            id: Some(7),
            name: "teamA".to_string(),
        };
        let member = Member::with_team("member1", 10, &team);
        let json = serde_json::to_value(&member).unwrap();
        assert_eq!(json["team"]["name"], "teamA");
        assert_eq!(json["id"], serde_json::Value::Null);
    }
}
