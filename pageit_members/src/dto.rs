//! Serializable views handed to HTTP callers. Entities themselves never are.

use pageit::{Page, Projection};
use serde::Serialize;

use crate::entity::{Member, MemberWithTeam};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberDto {
    pub id: Option<i64>,
    pub username: String,
    pub team_name: Option<String>,
}

impl MemberDto {
    pub fn new(id: Option<i64>, username: impl Into<String>, team_name: Option<String>) -> Self {
        Self {
            id,
            username: username.into(),
            team_name,
        }
    }
}

impl Projection<Member> for MemberDto {
    fn project(member: &Member) -> Self {
        Self::new(member.id, member.username.clone(), None)
    }
}

impl Projection<MemberWithTeam> for MemberDto {
    fn project(loaded: &MemberWithTeam) -> Self {
        Self::new(
            loaded.member.id,
            loaded.member.username.clone(),
            loaded.team.as_ref().map(|t| t.name.clone()),
        )
    }
}

/// JSON shape of a [`Page`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageBody<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u64,
    pub number: u64,
    pub size: u64,
    pub first: bool,
    pub last: bool,
    pub has_next: bool,
}

impl<T> From<Page<T>> for PageBody<T> {
    fn from(page: Page<T>) -> Self {
        let total_elements = page.total_elements();
        let total_pages = page.total_pages();
        let number = page.number();
        let size = page.limit();
        let first = page.is_first();
        let last = page.is_last();
        let has_next = page.has_next();
        Self {
            content: page.into_items(),
            total_elements,
            total_pages,
            number,
            size,
            first,
            last,
            has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Team;
    use pageit::{PageSpec, Sort};

    #[test]
    fn projection_hides_age_and_team_id() {
        let m = Member {
            id: Some(1),
            username: "member1".into(),
            age: 10,
            team_id: Some(3),
        };
        let dto = MemberDto::project(&m);
        assert_eq!(dto, MemberDto::new(Some(1), "member1", None));
        let json = serde_json::to_value(&dto).unwrap();
        assert!(json.get("age").is_none());
        assert!(json.get("team_id").is_none());
    }

    #[test]
    fn joined_projection_carries_team_name() {
        let loaded = MemberWithTeam {
            member: Member::new("member2", 20),
            team: Some(Team {
                id: Some(1),
                name: "teamA".into(),
            }),
        };
        assert_eq!(
            MemberDto::project(&loaded).team_name.as_deref(),
            Some("teamA")
        );
    }

    #[test]
    fn page_body_copies_metadata() {
        let spec = PageSpec::of_page(1, 2, Some(Sort::asc("username"))).unwrap();
        let page = Page::new(vec!["c", "d"], 5, spec);
        let body = PageBody::from(page);
        assert_eq!(body.content, vec!["c", "d"]);
        assert_eq!(body.total_elements, 5);
        assert_eq!(body.total_pages, 3);
        assert_eq!(body.number, 1);
        assert_eq!(body.size, 2);
        assert!(!body.first);
        assert!(!body.last);
        assert!(body.has_next);
    }
}
