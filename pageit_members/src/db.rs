//! Database bootstrap: open, apply the schema, optionally seed.

use std::sync::Arc;

use libsql::Database;
use pageit::transactions::{TransactionDefinition, TransactionManager};
use pageit::{RepoError, RepoResult, Repository};
use pageit_libsql::{apply_schema, open_database};
use tracing::info;

use crate::entity::Member;
use crate::repository::MemberRepository;

pub const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Number of members [`seed_members`] inserts.
pub const SEED_MEMBERS: i32 = 100;

/// Opens the database file at `path` and creates the tables if missing.
///
/// In-memory databases are refused: repositories and transactions each open
/// their own connection, and every `:memory:` connection is a separate,
/// empty database.
pub async fn connect(path: &str) -> RepoResult<Arc<Database>> {
    if is_in_memory(path) {
        return Err(RepoError::backend(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("in-memory database `{}` is not supported, use a file path", path),
        )));
    }
    let db = open_database(path)?;
    apply_schema(&db, SCHEMA_SQL).await?;
    info!(path, "database ready");
    Ok(db)
}

fn is_in_memory(path: &str) -> bool {
    let path = path.trim();
    path.is_empty() || path.contains(":memory:") || path.contains("mode=memory")
}

/// Inserts `member1..member100` aged 1..100 in one transaction, but only
/// into an empty table. Returns how many rows were inserted.
pub async fn seed_members(members: &MemberRepository) -> RepoResult<u64> {
    if members.count().await? > 0 {
        info!("members already present, skipping seed");
        return Ok(0);
    }
    let store = members.store();
    let inserted = members
        .transactions()
        .execute(&TransactionDefinition::default(), move |_ctx| async move {
            for i in 1..=SEED_MEMBERS {
                store.insert(&Member::new(format!("member{}", i), i)).await?;
            }
            Ok::<_, RepoError>(SEED_MEMBERS as u64)
        })
        .await?;
    info!(inserted, "seeded members");
    Ok(inserted)
}
