// Run with:
//   cargo run -p pageit --features libsql-backend,backend-adapters --example paging_libsql
// Seeds a temp libSQL database and walks it page by page.

use pageit::backends::{apply_schema, open_database, LibsqlRepository};
use pageit::{Entity, PageSpec, PagedQueryService, Predicate, Projection, RepoResult, Repository, Sort};

#[derive(Entity, Clone, Debug, PartialEq)]
pub struct Member {
    #[fetch(id)]
    pub id: Option<i64>,
    pub username: String,
    pub age: i32,
}

#[derive(Debug)]
pub struct Summary {
    pub username: String,
}

impl Projection<Member> for Summary {
    fn project(m: &Member) -> Self {
        Summary {
            username: m.username.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> RepoResult<()> {
    let path = std::env::temp_dir().join("pageit_paging_example.sqlite3");
    let _ = std::fs::remove_file(&path);
    let db = open_database(&path.display().to_string())?;
    apply_schema(
        &db,
        "CREATE TABLE members (id INTEGER PRIMARY KEY AUTOINCREMENT, username TEXT NOT NULL, age INTEGER NOT NULL);",
    )
    .await?;

    let repo: LibsqlRepository<Member, MemberRowAdapter> = LibsqlRepository::new(db, MemberRowAdapter);
    for i in 1..=12 {
        repo.insert(&Member {
            id: None,
            username: format!("member{i}"),
            age: i % 4 * 10,
        })
        .await?;
    }

    let service = PagedQueryService::new(repo);
    let filter = Predicate::all().ge("age", 10);
    let mut spec = PageSpec::new(0, 4, Some(Sort::desc("username"))).expect("non-zero limit");
    loop {
        let page = service.find_page_projected::<Summary>(&filter, &spec).await?;
        println!(
            "page {}/{} ({} of {}): {:?}",
            page.number() + 1,
            page.total_pages(),
            page.len(),
            page.total_elements(),
            page.items()
        );
        if !page.has_next() {
            break;
        }
        spec = spec.next();
    }

    let bumped = service.bulk_update_numeric_attribute("age", 20, 1).await?;
    println!("bumped {bumped} members older than 20");
    Ok(())
}
