//! A repository over a `Vec` of value rows, for tests that should not need a database.

use std::marker::PhantomData;
use std::sync::Mutex;

use async_trait::async_trait;
use pageit_core::{
    ensure_columns, Fetchable, Identifiable, Mutation, ParamValue, Predicate, RepoError,
    RepoResult, Repository, RowAdapter, Sort,
};

struct State {
    rows: Vec<Vec<ParamValue>>,
    next_id: i64,
}

/// Evaluates predicates, sorts and mutations in memory with the same
/// semantics the SQL backend gets from the database, including the id
/// tie-breaker on sorted reads and column validation.
pub struct InMemoryRepository<T, A> {
    state: Mutex<State>,
    adapter: A,
    _entity: PhantomData<fn() -> T>,
}

impl<T, A> InMemoryRepository<T, A>
where
    T: Fetchable + Identifiable,
    A: RowAdapter<T, Row = Vec<ParamValue>>,
{
    pub fn new(adapter: A) -> Self {
        Self {
            state: Mutex::new(State {
                rows: Vec::new(),
                next_id: 1,
            }),
            adapter,
            _entity: PhantomData,
        }
    }

    fn id_index() -> RepoResult<usize> {
        T::SELECT_COLUMNS
            .iter()
            .position(|c| *c == T::ID_COLUMN)
            .ok_or_else(|| RepoError::UnknownColumn {
                column: T::ID_COLUMN.to_string(),
            })
    }

    fn lock(&self) -> RepoResult<std::sync::MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| {
            RepoError::backend(std::io::Error::new(
                std::io::ErrorKind::Other,
                "in-memory store poisoned",
            ))
        })
    }

    fn select(&self, predicate: &Predicate, sort: Option<&Sort>) -> RepoResult<Vec<Vec<ParamValue>>> {
        ensure_columns::<T, _>(predicate.columns().chain(sort.map(Sort::column)))?;
        let id = Self::id_index()?;
        let mut rows: Vec<Vec<ParamValue>> = self
            .lock()?
            .rows
            .iter()
            .filter(|r| predicate.matches(T::SELECT_COLUMNS, r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            let by_id = a[id].compare(&b[id]).unwrap_or(std::cmp::Ordering::Equal);
            match sort {
                Some(s) => s.compare_rows(T::SELECT_COLUMNS, a, b).then(by_id),
                None => by_id,
            }
        });
        Ok(rows)
    }

    fn to_entities(&self, rows: Vec<Vec<ParamValue>>) -> RepoResult<Vec<T>> {
        rows.iter().map(|r| self.adapter.from_row(r)).collect()
    }
}

#[async_trait]
impl<T, A> Repository<T> for InMemoryRepository<T, A>
where
    T: Fetchable + Identifiable + Send + Sync + 'static,
    T::Key: Into<ParamValue> + 'static,
    A: RowAdapter<T, Row = Vec<ParamValue>> + Send + Sync,
{
    async fn find_by_id(&self, id: &T::Key) -> RepoResult<Option<T>> {
        let idx = Self::id_index()?;
        let key: ParamValue = id.clone().into();
        let row = self.lock()?.rows.iter().find(|r| r[idx] == key).cloned();
        row.map(|r| self.adapter.from_row(&r)).transpose()
    }

    async fn find_where(&self, predicate: &Predicate, sort: Option<&Sort>) -> RepoResult<Vec<T>> {
        let rows = self.select(predicate, sort)?;
        self.to_entities(rows)
    }

    async fn find_page(
        &self,
        predicate: &Predicate,
        offset: u64,
        limit: u64,
        sort: Option<&Sort>,
    ) -> RepoResult<Vec<T>> {
        let rows = self
            .select(predicate, sort)?
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();
        self.to_entities(rows)
    }

    async fn count_where(&self, predicate: &Predicate) -> RepoResult<u64> {
        Ok(self.select(predicate, None)?.len() as u64)
    }

    async fn insert(&self, entity: &T) -> RepoResult<T> {
        let idx = Self::id_index()?;
        let mut row = entity.select_values();
        let mut state = self.lock()?;
        row[idx] = ParamValue::I64(state.next_id);
        state.next_id += 1;
        state.rows.push(row.clone());
        drop(state);
        self.adapter.from_row(&row)
    }

    async fn update(&self, entity: &T) -> RepoResult<T> {
        let idx = Self::id_index()?;
        let row = entity.select_values();
        let mut state = self.lock()?;
        let slot = state
            .rows
            .iter_mut()
            .find(|r| r[idx] == row[idx] && !row[idx].is_null())
            .ok_or(RepoError::NotFound)?;
        *slot = row.clone();
        drop(state);
        self.adapter.from_row(&row)
    }

    async fn delete_by_id(&self, id: &T::Key) -> RepoResult<bool> {
        let idx = Self::id_index()?;
        let key: ParamValue = id.clone().into();
        let mut state = self.lock()?;
        let before = state.rows.len();
        state.rows.retain(|r| r[idx] != key);
        Ok(state.rows.len() != before)
    }

    async fn update_where(&self, predicate: &Predicate, mutation: &Mutation) -> RepoResult<u64> {
        ensure_columns::<T, _>(predicate.columns().chain(mutation.columns()))?;
        if mutation.is_empty() {
            return Ok(0);
        }
        let mut state = self.lock()?;
        let mut affected = 0;
        for row in state
            .rows
            .iter_mut()
            .filter(|r| predicate.matches(T::SELECT_COLUMNS, r))
        {
            mutation.apply(T::SELECT_COLUMNS, row);
            affected += 1;
        }
        Ok(affected)
    }
}
