use pageit_macros::Entity;

#[derive(Entity)]
struct Tagged {
    #[fetch(id)]
    id: i64,
    tags: Vec<String>,
}

fn main() {}
