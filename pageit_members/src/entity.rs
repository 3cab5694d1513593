//! Member and Team records.
//!
//! A member optionally belongs to one team through `team_id`; the team side
//! keeps no list of its members. Associations are loaded only by the explicit
//! join finders in [`crate::repository`].

use pageit::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
pub struct Member {
    #[fetch(id)]
    pub id: Option<i64>,
    pub username: String,
    pub age: i32,
    pub team_id: Option<i64>,
}

impl Member {
    /// An unsaved member without a team.
    pub fn new(username: impl Into<String>, age: i32) -> Self {
        Self {
            id: None,
            username: username.into(),
            age,
            team_id: None,
        }
    }

    /// An unsaved member of `team`. The team must already be saved.
    pub fn with_team(username: impl Into<String>, age: i32, team: &Team) -> Self {
        Self {
            team_id: team.id,
            ..Self::new(username, age)
        }
    }

    /// Moves the member to `team`; persisted on the next save.
    pub fn change_team(&mut self, team: &Team) {
        self.team_id = team.id;
    }
}

#[derive(Entity, Clone, Debug, PartialEq)]
pub struct Team {
    #[fetch(id)]
    pub id: Option<i64>,
    pub name: String,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// A member loaded together with its team in one query.
#[derive(Clone, Debug, PartialEq)]
pub struct MemberWithTeam {
    pub member: Member,
    pub team: Option<Team>,
}
