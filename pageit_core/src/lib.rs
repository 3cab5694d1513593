#![forbid(unsafe_code)]
//! Core traits for the pageit repository library.
//! This crate is database-agnostic and should not contain any backend-specific logic.

use std::cmp::Ordering;
use std::sync::Arc;

// Re-export for downstream expansions and backend impls.
pub use async_trait::async_trait;

pub mod paging;
pub mod query;
pub mod transactions;

pub use paging::{Page, PageSpec, PageSpecError};
pub use query::{Assignment, CompareOp, Condition, Direction, Mutation, Predicate, Sort};

/// Compile-time table metadata, implemented via `#[derive(Entity)]`.
pub trait Fetchable {
    const TABLE: &'static str;
    /// Columns in the order rows are read back.
    const SELECT_COLUMNS: &'static [&'static str];

    /// (column_name, rust_type) pairs for scalar columns usable in predicates.
    const FINDABLE_COLUMNS: &'static [(&'static str, &'static str)];

    /// Field values in `SELECT_COLUMNS` order, for stores that evaluate
    /// predicates in memory.
    fn select_values(&self) -> Vec<ParamValue>;

    /// True when `column` is one of the entity's selected columns.
    fn has_column(column: &str) -> bool {
        Self::SELECT_COLUMNS.contains(&column)
    }
}

/// Fails with [`RepoError::UnknownColumn`] on the first name that is not a column of `E`.
///
/// Column names end up interpolated into SQL text, so every name coming from a
/// predicate, sort or mutation goes through here first.
pub fn ensure_columns<'a, E, I>(columns: I) -> RepoResult<()>
where
    E: Fetchable,
    I: IntoIterator<Item = &'a str>,
{
    for column in columns {
        if !E::has_column(column) {
            return Err(RepoError::UnknownColumn {
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// A backend-agnostic representation of a database parameter value.
/// Entity field values travel to backend adapters in this shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    I32(i32),
    I64(i64),
    F64(f64),
    Bool(bool),
    Null,
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::I32(i) => Some(i64::from(*i)),
            ParamValue::I64(i) => Some(*i),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::F64(f) => Some(*f),
            other => other.as_i64().map(|i| i as f64),
        }
    }

    /// Orders two values the way SQL compares them. Integer widths compare
    /// with each other and with floats; `Null` and mismatched kinds are unordered.
    pub fn compare(&self, other: &ParamValue) -> Option<Ordering> {
        match (self, other) {
            (ParamValue::Null, _) | (_, ParamValue::Null) => None,
            (ParamValue::String(a), ParamValue::String(b)) => Some(a.cmp(b)),
            (ParamValue::Bool(a), ParamValue::Bool(b)) => Some(a.cmp(b)),
            (ParamValue::F64(_), _) | (_, ParamValue::F64(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            _ => Some(self.as_i64()?.cmp(&other.as_i64()?)),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::I32(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::I64(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::F64(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl<V: Into<ParamValue>> From<Option<V>> for ParamValue {
    fn from(v: Option<V>) -> Self {
        v.map_or(ParamValue::Null, Into::into)
    }
}

/// Trait for entities that have an identifiable key.
pub trait Identifiable {
    /// The type of the primary key (e.g., `i64`).
    type Key: Clone + Send + Sync;

    /// The name of the primary key column in the database.
    const ID_COLUMN: &'static str;

    /// Returns a copy of the entity's ID, if it has been assigned one.
    fn id(&self) -> Option<Self::Key>;
}

/// Field extraction for INSERT statements. Implemented by `#[derive(Entity)]`.
pub trait Insertable {
    /// Columns written on insert, excluding the generated key.
    const INSERT_COLUMNS: &'static [&'static str];

    /// Values in `INSERT_COLUMNS` order.
    fn insert_values(&self) -> Vec<ParamValue>;
}

/// Field extraction for UPDATE statements. Implemented by `#[derive(Entity)]`.
pub trait Updatable {
    /// Columns in the SET clause.
    const UPDATE_COLUMNS: &'static [&'static str];

    /// Values in `UPDATE_COLUMNS` order followed by the key.
    fn update_values(&self) -> Vec<ParamValue>;
}

/// Backend-agnostic error type for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The entity was not found.
    #[error("entity not found")]
    NotFound,
    /// A predicate, sort or mutation named a column the entity does not have.
    #[error("unknown column `{column}`")]
    UnknownColumn { column: String },
    /// Error while mapping a backend row into an entity.
    #[error("mapping error")]
    Mapping {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Opaque backend error from the underlying driver or adapter.
    #[error("backend error")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RepoError {
    /// Wrap a backend/driver error.
    pub fn backend<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepoError::Backend {
            source: Box::new(e),
        }
    }
    /// Wrap a row-mapping error.
    pub fn mapping<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepoError::Mapping {
            source: Box::new(e),
        }
    }
}

/// Convenience alias for results returned by repository methods.
pub type RepoResult<T> = Result<T, RepoError>;

/// The storage collaborator: an asynchronous repository for entity `T`.
///
/// Backends implement the filter/count/update primitives; the whole-table
/// variants and `save`/`delete` are provided on top of them.
#[async_trait]
pub trait Repository<T>
where
    T: Identifiable + Send + Sync,
{
    /// Fetch an entity by its primary key. Returns `Ok(None)` if not found.
    async fn find_by_id(&self, id: &T::Key) -> RepoResult<Option<T>>;

    /// All matches of `predicate`, ordered by `sort` when given.
    async fn find_where(&self, predicate: &Predicate, sort: Option<&Sort>) -> RepoResult<Vec<T>>;

    /// At most `limit` matches of `predicate` after skipping `offset`, ordered by `sort`.
    async fn find_page(
        &self,
        predicate: &Predicate,
        offset: u64,
        limit: u64,
        sort: Option<&Sort>,
    ) -> RepoResult<Vec<T>>;

    /// Number of rows matching `predicate`, unbounded by any paging.
    async fn count_where(&self, predicate: &Predicate) -> RepoResult<u64>;

    /// Insert a new entity and return it with its generated key.
    async fn insert(&self, entity: &T) -> RepoResult<T>;

    /// Update an existing entity by key.
    async fn update(&self, entity: &T) -> RepoResult<T>;

    /// Delete an entity by key. Returns true if a row was affected.
    async fn delete_by_id(&self, id: &T::Key) -> RepoResult<bool>;

    /// Apply `mutation` to every row matching `predicate` as one atomic
    /// statement and return the affected row count. Entities loaded before the
    /// call are stale afterwards.
    async fn update_where(&self, predicate: &Predicate, mutation: &Mutation) -> RepoResult<u64>;

    async fn find_all(&self) -> RepoResult<Vec<T>> {
        self.find_where(&Predicate::all(), None).await
    }

    /// Equality finder on a single column.
    async fn find_by_field(&self, field_name: &str, value: ParamValue) -> RepoResult<Vec<T>> {
        let predicate = Predicate::all().eq(field_name, value);
        self.find_where(&predicate, None).await
    }

    async fn count(&self) -> RepoResult<u64> {
        self.count_where(&Predicate::all()).await
    }

    /// Insert when the entity has no key yet, otherwise update it.
    async fn save(&self, entity: &T) -> RepoResult<T> {
        if entity.id().is_some() {
            self.update(entity).await
        } else {
            self.insert(entity).await
        }
    }

    /// Delete by the entity's key. An entity without a key was never stored.
    async fn delete(&self, entity: &T) -> RepoResult<bool> {
        match entity.id() {
            Some(id) => self.delete_by_id(&id).await,
            None => Ok(false),
        }
    }
}

macro_rules! forward_repository {
    ($($ptr:ident),*) => {$(
        #[async_trait]
        impl<T, R> Repository<T> for $ptr<R>
        where
            T: Identifiable + Send + Sync + 'static,
            T::Key: 'static,
            R: Repository<T> + Send + Sync + ?Sized,
        {
            async fn find_by_id(&self, id: &T::Key) -> RepoResult<Option<T>> {
                (**self).find_by_id(id).await
            }
            async fn find_where(&self, predicate: &Predicate, sort: Option<&Sort>) -> RepoResult<Vec<T>> {
                (**self).find_where(predicate, sort).await
            }
            async fn find_page(
                &self,
                predicate: &Predicate,
                offset: u64,
                limit: u64,
                sort: Option<&Sort>,
            ) -> RepoResult<Vec<T>> {
                (**self).find_page(predicate, offset, limit, sort).await
            }
            async fn count_where(&self, predicate: &Predicate) -> RepoResult<u64> {
                (**self).count_where(predicate).await
            }
            async fn insert(&self, entity: &T) -> RepoResult<T> {
                (**self).insert(entity).await
            }
            async fn update(&self, entity: &T) -> RepoResult<T> {
                (**self).update(entity).await
            }
            async fn delete_by_id(&self, id: &T::Key) -> RepoResult<bool> {
                (**self).delete_by_id(id).await
            }
            async fn update_where(&self, predicate: &Predicate, mutation: &Mutation) -> RepoResult<u64> {
                (**self).update_where(predicate, mutation).await
            }
        }
    )*};
}

// Boxed and shared repositories (`Box<dyn Repository<T>>`, `Arc<...>`) are repositories too.
forward_repository!(Box, Arc);

/// Maps a backend-specific row type into an entity `T`.
#[allow(clippy::wrong_self_convention)]
pub trait RowAdapter<T> {
    type Row;
    fn from_row(&self, row: &Self::Row) -> RepoResult<T>;
}
