use pageit_core::{Fetchable, Updatable};
use pageit_macros::Entity;

#[derive(Entity, Clone, Debug, Default)]
struct Team {
    #[fetch(id)]
    id: Option<i64>,
    #[fetch(skip)]
    members: Vec<String>,
    name: String,
    active: bool,
}

fn main() {
    assert_eq!(Team::TABLE, "teams");
    assert_eq!(Team::SELECT_COLUMNS, &["id", "name", "active"]);
    assert_eq!(Team::UPDATE_COLUMNS, &["name", "active"]);
    assert!(Team::has_column("active"));
    assert!(!Team::has_column("members"));
    let t = Team::default();
    assert_eq!(t.select_values().len(), 3);
    assert!(t.members.is_empty());
}
