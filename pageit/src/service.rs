//! Paginated queries over a [`Repository`].
//!
//! The service owns no state besides its repository handle. Every call issues
//! the store queries it needs and returns; store errors are passed through
//! unchanged.

use std::marker::PhantomData;

use pageit_core::{
    Identifiable, Mutation, Page, PageSpec, ParamValue, Predicate, RepoResult, Repository,
};
use tracing::debug;

/// A read-only view built from an entity, safe to hand to external callers.
pub trait Projection<E>: Sized {
    fn project(entity: &E) -> Self;
}

/// Filter-and-page queries, bulk updates and projections for entity `T`.
pub struct PagedQueryService<T, R> {
    repo: R,
    _entity: PhantomData<fn() -> T>,
}

impl<T, R: Clone> Clone for PagedQueryService<T, R> {
    fn clone(&self) -> Self {
        Self::new(self.repo.clone())
    }
}

impl<T, R> PagedQueryService<T, R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            _entity: PhantomData,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Builds `P` from `entity` without touching the store.
    pub fn to_projection<P: Projection<T>>(entity: &T) -> P {
        P::project(entity)
    }
}

impl<T, R> PagedQueryService<T, R>
where
    T: Identifiable + Send + Sync,
    R: Repository<T> + Sync,
{
    /// Fetches the slice of matches described by `spec` and counts all matches.
    ///
    /// The slice and the count are two queries; run them inside a transaction
    /// when they must observe the same snapshot. An offset past the last match
    /// yields an empty page that still reports the true total.
    pub async fn find_page(&self, filter: &Predicate, spec: &PageSpec) -> RepoResult<Page<T>> {
        let items = self
            .repo
            .find_page(filter, spec.offset(), spec.limit(), spec.sort())
            .await?;
        let total = self.repo.count_where(filter).await?;
        debug!(
            offset = spec.offset(),
            limit = spec.limit(),
            rows = items.len(),
            total,
            "page fetched"
        );
        Ok(Page::new(items, total, spec.clone()))
    }

    /// [`find_page`](Self::find_page) with every item projected into `P`.
    pub async fn find_page_projected<P: Projection<T>>(
        &self,
        filter: &Predicate,
        spec: &PageSpec,
    ) -> RepoResult<Page<P>> {
        Ok(self.find_page(filter, spec).await?.map(|e| P::project(&e)))
    }

    /// Adds `delta` to `column` on every record whose `column` is strictly
    /// greater than `threshold`, as one statement. Returns the affected count.
    ///
    /// Entities loaded before the call keep their old values.
    pub async fn bulk_update_numeric_attribute(
        &self,
        column: &str,
        threshold: impl Into<ParamValue>,
        delta: impl Into<ParamValue>,
    ) -> RepoResult<u64> {
        let filter = Predicate::all().gt(column, threshold);
        let mutation = Mutation::new().increment(column, delta);
        let affected = self.repo.update_where(&filter, &mutation).await?;
        debug!(column, affected, "bulk update applied");
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pageit_core::{Assignment, CompareOp, Condition, RepoError, Sort};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: Option<i64>,
        n: i32,
    }

    impl Identifiable for Item {
        type Key = i64;
        const ID_COLUMN: &'static str = "id";
        fn id(&self) -> Option<i64> {
            self.id
        }
    }

    /// Serves `rows` in order, ignoring predicates, and records what it was asked.
    #[derive(Default)]
    struct Scripted {
        rows: Vec<Item>,
        fail_count: bool,
        page_calls: Mutex<Vec<(u64, u64, Option<Sort>)>>,
        updates: Mutex<Vec<(Predicate, Mutation)>>,
    }

    #[async_trait::async_trait]
    impl Repository<Item> for Scripted {
        async fn find_by_id(&self, _id: &i64) -> RepoResult<Option<Item>> {
            Ok(None)
        }
        async fn find_where(&self, _p: &Predicate, _s: Option<&Sort>) -> RepoResult<Vec<Item>> {
            Ok(self.rows.clone())
        }
        async fn find_page(
            &self,
            _p: &Predicate,
            offset: u64,
            limit: u64,
            sort: Option<&Sort>,
        ) -> RepoResult<Vec<Item>> {
            self.page_calls
                .lock()
                .unwrap()
                .push((offset, limit, sort.cloned()));
            Ok(self
                .rows
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }
        async fn count_where(&self, _p: &Predicate) -> RepoResult<u64> {
            if self.fail_count {
                return Err(RepoError::backend(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "count failed",
                )));
            }
            Ok(self.rows.len() as u64)
        }
        async fn insert(&self, e: &Item) -> RepoResult<Item> {
            Ok(e.clone())
        }
        async fn update(&self, e: &Item) -> RepoResult<Item> {
            Ok(e.clone())
        }
        async fn delete_by_id(&self, _id: &i64) -> RepoResult<bool> {
            Ok(false)
        }
        async fn update_where(&self, p: &Predicate, m: &Mutation) -> RepoResult<u64> {
            self.updates.lock().unwrap().push((p.clone(), m.clone()));
            Ok(2)
        }
    }

    fn items(n: i32) -> Vec<Item> {
        (1..=n)
            .map(|i| Item {
                id: Some(i64::from(i)),
                n: i,
            })
            .collect()
    }

    #[derive(Debug, PartialEq)]
    struct Label(String);

    impl Projection<Item> for Label {
        fn project(entity: &Item) -> Self {
            Label(format!("#{}", entity.n))
        }
    }

    #[tokio::test]
    async fn forwards_spec_and_builds_page_metadata() {
        let service = PagedQueryService::new(Scripted {
            rows: items(5),
            ..Scripted::default()
        });
        let spec = PageSpec::new(3, 3, Some(Sort::desc("n"))).unwrap();
        let page = service.find_page(&Predicate::all(), &spec).await.unwrap();

        assert_eq!(page.len(), 2);
        assert_eq!(page.total_elements(), 5);
        assert_eq!(page.total_pages(), 2);
        assert!(page.is_last());
        assert_eq!(page.number(), 1);
        let calls = service.repository().page_calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(3, 3, Some(Sort::desc("n")))]);
    }

    #[tokio::test]
    async fn projected_page_keeps_metadata() {
        let service = PagedQueryService::new(Scripted {
            rows: items(4),
            ..Scripted::default()
        });
        let spec = PageSpec::first(3).unwrap();
        let page: Page<Label> = service
            .find_page_projected(&Predicate::all(), &spec)
            .await
            .unwrap();
        assert_eq!(
            page.items(),
            &[Label("#1".into()), Label("#2".into()), Label("#3".into())]
        );
        assert!(page.has_next());
        assert_eq!(page.total_elements(), 4);
    }

    #[tokio::test]
    async fn count_failure_propagates() {
        let service = PagedQueryService::new(Scripted {
            rows: items(2),
            fail_count: true,
            ..Scripted::default()
        });
        let err = service
            .find_page(&Predicate::all(), &PageSpec::first(1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Backend { .. }));
    }

    #[tokio::test]
    async fn bulk_update_uses_strict_threshold_and_increment() {
        let service = PagedQueryService::new(Scripted::default());
        let n = service
            .bulk_update_numeric_attribute("n", 30, 1)
            .await
            .unwrap();
        assert_eq!(n, 2);

        let updates = service.repository().updates.lock().unwrap().clone();
        let (pred, mutation) = &updates[0];
        assert_eq!(
            pred.conditions(),
            &[Condition::Compare {
                column: "n".into(),
                op: CompareOp::Gt,
                value: ParamValue::I32(30),
            }]
        );
        assert_eq!(
            mutation.assignments(),
            &[Assignment::Increment {
                column: "n".into(),
                delta: ParamValue::I32(1),
            }]
        );
    }

    #[test]
    fn to_projection_is_pure() {
        let item = Item { id: None, n: 7 };
        let label: Label = PagedQueryService::<Item, Scripted>::to_projection(&item);
        assert_eq!(label, Label("#7".into()));
    }
}
