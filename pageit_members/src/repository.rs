//! Member queries.
//!
//! Each finder states its filter as a [`Predicate`]; joins are written out as
//! SQL and mapped with the generated row adapters. Paging goes through
//! [`PagedQueryService`] so every page carries its total count.

use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Database, Row};
use pageit::transactions::{TransactionDefinition, TransactionManager};
use pageit::{
    Fetchable, Mutation, Page, PageSpec, PagedQueryService, Predicate, RepoError, RepoResult,
    Repository, RowAdapter,
};
use pageit_libsql::{LibsqlRepository, LibsqlTransactionManager};
use tracing::debug;

use crate::dto::MemberDto;
use crate::entity::{Member, MemberRowAdapter, MemberWithTeam, Team, TeamRowAdapter};

pub type MemberStore = LibsqlRepository<Member, MemberRowAdapter>;
pub type TeamRepository = LibsqlRepository<Team, TeamRowAdapter>;

/// `a.col1, a.col2, ...` for every selected column of `E`.
fn qualified<E: Fetchable>(alias: &str) -> String {
    E::SELECT_COLUMNS
        .iter()
        .map(|c| format!("{}.{}", alias, c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn member_with_team(row: &Row) -> RepoResult<MemberWithTeam> {
    let member = MemberRowAdapter.from_row(row)?;
    let base = Member::SELECT_COLUMNS.len() as i32;
    let team_id: Option<i64> = row.get(base).map_err(RepoError::mapping)?;
    let name: Option<String> = row.get(base + 1).map_err(RepoError::mapping)?;
    let team = match (team_id, name) {
        (Some(id), Some(name)) => Some(Team { id: Some(id), name }),
        _ => None,
    };
    Ok(MemberWithTeam { member, team })
}

fn member_dto(row: &Row) -> RepoResult<MemberDto> {
    let id: i64 = row.get(0).map_err(RepoError::mapping)?;
    let username: String = row.get(1).map_err(RepoError::mapping)?;
    let team_name: String = row.get(2).map_err(RepoError::mapping)?;
    Ok(MemberDto::new(Some(id), username, Some(team_name)))
}

pub struct MemberRepository {
    service: PagedQueryService<Member, MemberStore>,
    tx: LibsqlTransactionManager,
}

impl MemberRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            service: PagedQueryService::new(LibsqlRepository::new(db.clone(), MemberRowAdapter)),
            tx: LibsqlTransactionManager::new(db),
        }
    }

    /// The underlying single-table repository.
    pub fn store(&self) -> &MemberStore {
        self.service.repository()
    }

    pub fn transactions(&self) -> &LibsqlTransactionManager {
        &self.tx
    }

    /// A team repository on the same database.
    pub fn teams(&self) -> TeamRepository {
        LibsqlRepository::new(self.tx.database().clone(), TeamRowAdapter)
    }

    pub async fn save(&self, member: &Member) -> RepoResult<Member> {
        self.store().save(member).await
    }

    pub async fn find_by_id(&self, id: i64) -> RepoResult<Option<Member>> {
        self.store().find_by_id(&id).await
    }

    pub async fn find_all(&self) -> RepoResult<Vec<Member>> {
        self.store().find_all().await
    }

    pub async fn count(&self) -> RepoResult<u64> {
        self.store().count().await
    }

    pub async fn delete(&self, member: &Member) -> RepoResult<bool> {
        self.store().delete(member).await
    }

    pub async fn find_by_username_and_age_greater_than(
        &self,
        username: &str,
        age: i32,
    ) -> RepoResult<Vec<Member>> {
        let filter = Predicate::all().eq("username", username).gt("age", age);
        self.store().find_where(&filter, None).await
    }

    /// Members with exactly this name and age.
    pub async fn find_user(&self, username: &str, age: i32) -> RepoResult<Vec<Member>> {
        let filter = Predicate::all().eq("username", username).eq("age", age);
        self.store().find_where(&filter, None).await
    }

    pub async fn find_by_names(&self, names: &[&str]) -> RepoResult<Vec<Member>> {
        let filter = Predicate::all().is_in("username", names.iter().copied());
        self.store().find_where(&filter, None).await
    }

    pub async fn find_by_age(&self, age: i32, spec: &PageSpec) -> RepoResult<Page<Member>> {
        self.service
            .find_page(&Predicate::all().eq("age", age), spec)
            .await
    }

    pub async fn page_all(&self, spec: &PageSpec) -> RepoResult<Page<Member>> {
        self.service.find_page(&Predicate::all(), spec).await
    }

    /// A page of every member, projected for external callers.
    pub async fn page_dtos(&self, spec: &PageSpec) -> RepoResult<Page<MemberDto>> {
        self.service
            .find_page_projected(&Predicate::all(), spec)
            .await
    }

    /// Members named `username` with their team, in one `LEFT JOIN`.
    /// Members without a team come back with `team: None`.
    pub async fn find_with_team_by_username(
        &self,
        username: &str,
    ) -> RepoResult<Vec<MemberWithTeam>> {
        let sql = format!(
            "SELECT {}, {} FROM {} m LEFT JOIN {} t ON t.id = m.team_id WHERE m.username = ? ORDER BY m.id",
            qualified::<Member>("m"),
            qualified::<Team>("t"),
            Member::TABLE,
            Team::TABLE,
        );
        self.store()
            .query_map(&sql, vec![username.into()], member_with_team)
            .await
    }

    /// Every member that has a team, as a DTO carrying the team name.
    pub async fn find_member_dtos(&self) -> RepoResult<Vec<MemberDto>> {
        let sql = format!(
            "SELECT m.id, m.username, t.name FROM {} m JOIN {} t ON t.id = m.team_id ORDER BY m.id",
            Member::TABLE,
            Team::TABLE,
        );
        self.store().query_map(&sql, Vec::new(), member_dto).await
    }

    /// Adds one to the age of every member aged `age` or older.
    pub async fn bulk_age_plus(&self, age: i32) -> RepoResult<u64> {
        let affected = self
            .store()
            .update_where(
                &Predicate::all().ge("age", age),
                &Mutation::new().increment("age", 1),
            )
            .await?;
        debug!(age, affected, "bulk age increment");
        Ok(affected)
    }

    /// First member named `username`, read in a query-only transaction.
    pub async fn find_read_only_by_username(&self, username: &str) -> RepoResult<Option<Member>> {
        self.first_by_username_in(&TransactionDefinition::read_only(), username)
            .await
    }

    /// First member named `username`, read while holding the database's
    /// exclusive write lock.
    pub async fn find_locked_by_username(&self, username: &str) -> RepoResult<Option<Member>> {
        self.first_by_username_in(&TransactionDefinition::exclusive(), username)
            .await
    }

    async fn first_by_username_in(
        &self,
        def: &TransactionDefinition,
        username: &str,
    ) -> RepoResult<Option<Member>> {
        let store = self.store();
        let filter = Predicate::all().eq("username", username);
        self.tx
            .execute(def, move |_ctx| async move {
                let found = store.find_where(&filter, None).await?;
                Ok::<_, RepoError>(found.into_iter().next())
            })
            .await
    }
}

/// Queries written by hand rather than built from a [`Predicate`].
#[async_trait]
pub trait MemberRepositoryCustom {
    /// Every member, in id order.
    async fn find_member_custom(&self) -> RepoResult<Vec<Member>>;
}

#[async_trait]
impl MemberRepositoryCustom for MemberRepository {
    async fn find_member_custom(&self) -> RepoResult<Vec<Member>> {
        let sql = format!(
            "SELECT {} FROM {} m ORDER BY m.id",
            qualified::<Member>("m"),
            Member::TABLE,
        );
        self.store()
            .query_map(&sql, Vec::new(), |row| MemberRowAdapter.from_row(row))
            .await
    }
}
