use pageit_macros::Entity;

#[derive(Entity)]
#[entity(table = "members; DROP TABLE members")]
struct Member {
    #[fetch(id)]
    id: i64,
}

fn main() {}
