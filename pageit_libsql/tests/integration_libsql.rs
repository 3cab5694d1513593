#![allow(unexpected_cfgs)]
#![cfg(feature = "libsql-backend")]

use std::sync::atomic::{AtomicUsize, Ordering};

use pageit_core::{RepoResult, Repository};
use pageit_libsql::{apply_schema, open_database, LibsqlRepository};
use tests_common::{migrations, Member, MemberRowAdapter, RepoFactory, Team, TeamRowAdapter};

/// Hands out a fresh database file per repository, all under one temp dir.
struct LibsqlFactory {
    dir: tempfile::TempDir,
    seq: AtomicUsize,
}

impl LibsqlFactory {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
            seq: AtomicUsize::new(0),
        }
    }

    async fn fresh_db(&self) -> RepoResult<std::sync::Arc<libsql::Database>> {
        let n = self.seq.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.path().join(format!("members_{}.sqlite3", n));
        let db = open_database(&path.display().to_string())?;
        apply_schema(&db, migrations::LIBSQL_MEMBERS_SQL).await?;
        Ok(db)
    }
}

#[async_trait::async_trait]
impl RepoFactory for LibsqlFactory {
    async fn new_member_repo(&self) -> RepoResult<Box<dyn Repository<Member> + Send + Sync>> {
        let db = self.fresh_db().await?;
        Ok(Box::new(LibsqlRepository::new(db, MemberRowAdapter)))
    }
}

#[tokio::test]
async fn generic_helpers_pass_against_libsql() -> RepoResult<()> {
    tests_common::run_all(&LibsqlFactory::new()).await
}

#[tokio::test]
async fn generated_adapter_maps_nullable_reference() -> RepoResult<()> {
    let factory = LibsqlFactory::new();
    let db = factory.fresh_db().await?;
    let teams: LibsqlRepository<Team, TeamRowAdapter> =
        LibsqlRepository::new(db.clone(), TeamRowAdapter);
    let members: LibsqlRepository<Member, MemberRowAdapter> =
        LibsqlRepository::new(db, MemberRowAdapter);

    let team = teams
        .insert(&Team {
            id: None,
            name: "teamA".into(),
        })
        .await?;
    let with_team = members
        .insert(&Member {
            team_id: team.id,
            ..tests_common::member("member1", 10)
        })
        .await?;
    let without = members.insert(&tests_common::member("member2", 20)).await?;

    assert_eq!(with_team.team_id, team.id);
    assert_eq!(without.team_id, None);
    let on_team = members
        .find_where(
            &pageit_core::Predicate::all().is_not_null("team_id"),
            None,
        )
        .await?;
    assert_eq!(on_team, vec![with_team]);
    Ok(())
}
