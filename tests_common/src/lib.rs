#![allow(unexpected_cfgs)]
//! Common integration testing utilities and generic tests reusable across backends.

use async_trait::async_trait;
use pageit::{Entity, PageSpec, PagedQueryService, Predicate, Sort};
use pageit_core::{ParamValue, RepoError, RepoResult, Repository, RowAdapter};

pub mod memory;

pub use memory::InMemoryRepository;

#[derive(Entity, Clone, Debug, PartialEq)]
pub struct Member {
    #[fetch(id)]
    pub id: Option<i64>,
    pub username: String,
    pub age: i32,
    pub team_id: Option<i64>,
}

#[derive(Entity, Clone, Debug, PartialEq)]
pub struct Team {
    #[fetch(id)]
    pub id: Option<i64>,
    pub name: String,
}

/// An unsaved member without a team.
pub fn member(username: &str, age: i32) -> Member {
    Member {
        id: None,
        username: username.to_string(),
        age,
        team_id: None,
    }
}

/// Expose schema SQL via constants for harnesses.
pub mod migrations {
    pub const LIBSQL_MEMBERS_SQL: &str = include_str!("../migrations/libsql/001_members.sql");
}

/// Maps `SELECT_COLUMNS`-ordered value rows, the row shape of [`InMemoryRepository`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberValuesAdapter;

impl RowAdapter<Member> for MemberValuesAdapter {
    type Row = Vec<ParamValue>;

    fn from_row(&self, row: &Self::Row) -> RepoResult<Member> {
        match row.as_slice() {
            [id, ParamValue::String(username), ParamValue::I32(age), team_id] => Ok(Member {
                id: int_or_null(id)?,
                username: username.clone(),
                age: *age,
                team_id: int_or_null(team_id)?,
            }),
            other => Err(shape_error(format!("unexpected member row {:?}", other))),
        }
    }
}

fn int_or_null(v: &ParamValue) -> RepoResult<Option<i64>> {
    match v {
        ParamValue::I64(i) => Ok(Some(*i)),
        ParamValue::Null => Ok(None),
        other => Err(shape_error(format!("expected integer or null, got {:?}", other))),
    }
}

fn shape_error(msg: String) -> RepoError {
    RepoError::mapping(std::io::Error::new(std::io::ErrorKind::InvalidData, msg))
}

/// An empty member store that remembers nothing.
pub fn in_memory_members() -> InMemoryRepository<Member, MemberValuesAdapter> {
    InMemoryRepository::new(MemberValuesAdapter)
}

#[async_trait]
pub trait RepoFactory {
    /// Construct a clean repository connected to a store with the required schema.
    async fn new_member_repo(&self) -> RepoResult<Box<dyn Repository<Member> + Send + Sync>>;
}

/// Generic CRUD roundtrip test.
pub async fn test_crud_roundtrip<F: RepoFactory + Sync>(f: &F) -> RepoResult<()> {
    let repo = f.new_member_repo().await?;

    let created = repo.insert(&member("a", 10)).await?;
    assert!(created.id.is_some());

    let fetched = repo.find_by_id(&created.id.unwrap()).await?;
    assert_eq!(fetched.as_ref().map(|m| m.username.as_str()), Some("a"));

    let mut updated = fetched.unwrap();
    updated.age = 11;
    let updated2 = repo.update(&updated).await?;
    assert_eq!(updated2.age, 11);
    assert_eq!(repo.find_by_id(&created.id.unwrap()).await?.unwrap().age, 11);

    let ok = repo.delete_by_id(&updated2.id.unwrap()).await?;
    assert!(ok);
    assert!(repo.find_by_id(&created.id.unwrap()).await?.is_none());
    Ok(())
}

/// Generic find_by_field test.
pub async fn test_find_by_field<F: RepoFactory + Sync>(f: &F) -> RepoResult<()> {
    let repo = f.new_member_repo().await?;
    repo.insert(&member("b", 20)).await?;
    repo.insert(&member("c", 20)).await?;

    let found = repo.find_by_field("username", "b".into()).await?;
    assert_eq!(found.len(), 1);
    assert_eq!(repo.find_by_field("age", 20.into()).await?.len(), 2);
    assert!(repo.find_by_field("username", "zz".into()).await?.is_empty());
    Ok(())
}

/// save() inserts then updates; delete() restores the count.
pub async fn test_save_then_delete_restores_count<F: RepoFactory + Sync>(
    f: &F,
) -> RepoResult<()> {
    let repo = f.new_member_repo().await?;
    repo.save(&member("keep", 1)).await?;
    let before = repo.count().await?;

    let saved = repo.save(&member("temp", 2)).await?;
    let id = saved.id.expect("save assigns an id");
    assert_eq!(repo.count().await?, before + 1);

    let resaved = repo
        .save(&Member {
            age: 3,
            ..saved.clone()
        })
        .await?;
    assert_eq!(resaved.id, Some(id));
    assert_eq!(repo.count().await?, before + 1);

    assert!(repo.delete(&resaved).await?);
    assert_eq!(repo.count().await?, before);
    assert!(repo.find_by_id(&id).await?.is_none());
    assert!(!repo.delete(&member("never-saved", 4)).await?);
    Ok(())
}

/// Five members aged 10 plus one outlier, paged three at a time by username desc.
pub async fn test_paging_scenario<F: RepoFactory + Sync>(f: &F) -> RepoResult<()> {
    let repo = f.new_member_repo().await?;
    for i in 1..=5 {
        repo.insert(&member(&format!("member{}", i), 10)).await?;
    }
    repo.insert(&member("outlier", 20)).await?;

    let service = PagedQueryService::new(repo);
    let by_age = Predicate::all().eq("age", 10);
    let sort = Some(Sort::desc("username"));

    let first = PageSpec::new(0, 3, sort.clone()).expect("valid spec");
    let page = service.find_page(&by_age, &first).await?;
    let names: Vec<_> = page.items().iter().map(|m| m.username.as_str()).collect();
    assert_eq!(names, vec!["member5", "member4", "member3"]);
    assert_eq!(page.total_elements(), 5);
    assert_eq!(page.total_pages(), 2);
    assert_eq!(page.number(), 0);
    assert!(page.is_first());
    assert!(page.has_next());

    let second = service.find_page(&by_age, &first.next()).await?;
    assert_eq!(second.len(), 2);
    assert!(second.is_last());
    assert!(!second.has_next());
    assert_eq!(second.number(), 1);

    let beyond = PageSpec::new(6, 3, sort).expect("valid spec");
    let empty = service.find_page(&by_age, &beyond).await?;
    assert!(empty.is_empty());
    assert_eq!(empty.total_elements(), 5);
    assert_eq!(empty.total_pages(), 2);
    assert!(!empty.has_next());
    Ok(())
}

/// Two fetches of the same page against an unchanged store agree.
pub async fn test_paging_is_idempotent<F: RepoFactory + Sync>(f: &F) -> RepoResult<()> {
    let repo = f.new_member_repo().await?;
    for (i, age) in [30, 10, 20, 10, 40, 10, 50].into_iter().enumerate() {
        repo.insert(&member(&format!("m{}", i), age)).await?;
    }
    let service = PagedQueryService::new(repo);
    let spec = PageSpec::new(1, 4, Some(Sort::asc("age"))).expect("valid spec");
    let a = service.find_page(&Predicate::all(), &spec).await?;
    let b = service.find_page(&Predicate::all(), &spec).await?;
    assert_eq!(a, b);
    let ages: Vec<i32> = a.items().iter().map(|m| m.age).collect();
    assert_eq!(ages, vec![10, 10, 20, 30]);
    Ok(())
}

/// Ages {10, 20, 30, 40, 50}: only 40 and 50 are strictly above 30.
pub async fn test_bulk_update_scenario<F: RepoFactory + Sync>(f: &F) -> RepoResult<()> {
    let repo = f.new_member_repo().await?;
    let mut stale = Vec::new();
    for age in [10, 20, 30, 40, 50] {
        stale.push(repo.insert(&member(&format!("age{}", age), age)).await?);
    }

    let service = PagedQueryService::new(repo);
    let affected = service.bulk_update_numeric_attribute("age", 30, 5).await?;
    assert_eq!(affected, 2);

    // Copies loaded before the update keep their old values.
    assert_eq!(stale[4].age, 50);

    let mut ages = Vec::new();
    for m in &stale {
        let fresh = service
            .repository()
            .find_by_id(&m.id.unwrap())
            .await?
            .expect("still present");
        ages.push(fresh.age);
    }
    assert_eq!(ages, vec![10, 20, 30, 45, 55]);
    Ok(())
}

/// Names outside the entity's columns are refused.
pub async fn test_unknown_column_rejected<F: RepoFactory + Sync>(f: &F) -> RepoResult<()> {
    let repo = f.new_member_repo().await?;
    let err = repo
        .find_page(&Predicate::all(), 0, 5, Some(&Sort::asc("password")))
        .await
        .expect_err("unknown sort column");
    assert!(matches!(err, RepoError::UnknownColumn { ref column } if column == "password"));

    let err = repo
        .count_where(&Predicate::all().eq("nickname", "x"))
        .await
        .expect_err("unknown filter column");
    assert!(matches!(err, RepoError::UnknownColumn { .. }));
    Ok(())
}

/// Runs every generic helper against `f`.
pub async fn run_all<F: RepoFactory + Sync>(f: &F) -> RepoResult<()> {
    test_crud_roundtrip(f).await?;
    test_find_by_field(f).await?;
    test_save_then_delete_restores_count(f).await?;
    test_paging_scenario(f).await?;
    test_paging_is_idempotent(f).await?;
    test_bulk_update_scenario(f).await?;
    test_unknown_column_rejected(f).await?;
    Ok(())
}
