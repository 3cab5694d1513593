// Enable with: cargo run -p pageit_libsql --features libsql-backend --example basic_libsql

#[cfg(feature = "libsql-backend")]
#[tokio::main]
async fn main() -> Result<(), pageit_core::RepoError> {
    use pageit_core::{Predicate, RepoError, Repository, RowAdapter, Sort};
    use pageit_libsql::LibsqlRepository;

    #[derive(pageit_macros::Entity, Clone, Debug)]
    #[entity(table = "users")]
    struct User {
        #[fetch(id)]
        id: Option<i64>,
        email: String,
        score: i32,
    }

    struct UserAdapter;
    impl RowAdapter<User> for UserAdapter {
        type Row = libsql::Row;
        fn from_row(&self, row: &Self::Row) -> pageit_core::RepoResult<User> {
            // Column order follows metadata: id, email, score
            Ok(User {
                id: Some(row.get(0).map_err(RepoError::mapping)?),
                email: row.get(1).map_err(RepoError::mapping)?,
                score: row.get(2).map_err(RepoError::mapping)?,
            })
        }
    }

    let dir = std::env::temp_dir().join("pageit_basic_libsql.sqlite3");
    let _ = std::fs::remove_file(&dir);
    let db = pageit_libsql::open_database(&dir.display().to_string())?;
    pageit_libsql::apply_schema(
        &db,
        "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, email TEXT NOT NULL, score INTEGER NOT NULL);",
    )
    .await?;

    let repo: LibsqlRepository<User, UserAdapter> = LibsqlRepository::new(db, UserAdapter);
    for (i, score) in [7, 3, 9, 1].into_iter().enumerate() {
        repo.insert(&User {
            id: None,
            email: format!("user{i}@example.com"),
            score,
        })
        .await?;
    }

    let top = repo
        .find_page(&Predicate::all().gt("score", 2), 0, 2, Some(&Sort::desc("score")))
        .await?;
    println!("top scores: {:?}", top);
    println!("matching: {}", repo.count_where(&Predicate::all().gt("score", 2)).await?);
    Ok(())
}

#[cfg(not(feature = "libsql-backend"))]
fn main() {
    eprintln!("Enable feature libsql-backend to run this example");
}
