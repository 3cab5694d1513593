#![forbid(unsafe_code)]
//! Facade crate for the `pageit` repository library.
//!
//! Re-exports the core traits, query and paging types and the `Entity` derive,
//! and adds [`PagedQueryService`]: offset/limit paging with sorting and a total
//! count, bulk numeric updates and DTO projection over any [`Repository`].
//!
//! # Example: Deriving `Entity`
//!
//! ```ignore
//! // Non-runnable: the generated row adapter needs a backend in scope.
//! use pageit::{Entity, Fetchable};
//!
//! #[derive(Entity, Clone, Debug)]
//! pub struct Member {
//!     #[fetch(id)]
//!     pub id: Option<i64>,
//!     pub username: String,
//!     pub age: i32,
//! }
//!
//! assert_eq!(Member::TABLE, "members");
//! assert_eq!(Member::SELECT_COLUMNS, &["id", "username", "age"]);
//! let _adapter = MemberRowAdapter;
//! ```
//!
//! # Example: Paging
//!
//! ```ignore
//! use pageit::{PageSpec, PagedQueryService, Predicate, Sort};
//!
//! let service = PagedQueryService::new(repo);
//! let spec = PageSpec::new(0, 3, Some(Sort::desc("username")))?;
//! let page = service.find_page(&Predicate::all().eq("age", 10), &spec).await?;
//! assert!(page.is_first());
//! ```

#![allow(unexpected_cfgs)]

// Re-export all core traits.
pub use pageit_core::{
    ensure_columns, Fetchable, Identifiable, Insertable, ParamValue, RepoError, RepoResult,
    Repository, RowAdapter, Updatable,
};

// Query and paging vocabulary.
pub use pageit_core::{
    Assignment, CompareOp, Condition, Direction, Mutation, Page, PageSpec, PageSpecError,
    Predicate, Sort,
};

pub use pageit_macros::Entity;

// Optional re-export of the SQL builder helpers.
#[cfg(feature = "sql-builder")]
pub use pageit_sql_builder as sql_builder;

// Re-export backend-agnostic transactions API so end-users can import from `pageit`.
pub use pageit_core::transactions;

pub mod service;
pub use service::{PagedQueryService, Projection};

pub mod backends {
    #[cfg(feature = "libsql-backend")]
    pub use pageit_libsql::{
        apply_schema, open_database, LibsqlRepository, LibsqlTransactionManager,
    };
}
