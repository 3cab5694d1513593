//! Caller-owned, scoped transactions.
//!
//! A unit of work is a closure handed to [`TransactionManager::execute`]: the
//! manager opens the scope before calling it and commits when it returns `Ok`,
//! rolling back otherwise. Backends provide the managers; this module only
//! defines the vocabulary.

use std::time::Duration;

/// How a scope relates to one that is already active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Join the active transaction or start one.
    Required,
    /// Run isolated from the active transaction (a savepoint where the store
    /// cannot suspend it).
    RequiresNew,
    /// Join if active, otherwise run without a transaction.
    Supports,
    /// Run without starting a transaction.
    NotSupported,
    /// Fail if a transaction is active.
    Never,
    /// Savepoint inside the active transaction.
    Nested,
}

/// Isolation level, best-effort across backends. Backends with only
/// database-level locking map the stricter levels to stronger lock modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    Default,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Desired semantics of one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDefinition {
    pub propagation: Propagation,
    pub isolation: Isolation,
    /// Writes inside the scope are rejected by the store.
    pub read_only: bool,
    /// How long to wait for locks before failing.
    pub timeout: Option<Duration>,
}

impl Default for TransactionDefinition {
    fn default() -> Self {
        Self {
            propagation: Propagation::Required,
            isolation: Isolation::Default,
            read_only: false,
            timeout: None,
        }
    }
}

impl TransactionDefinition {
    /// A query-only scope; any write fails.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    /// A scope that takes the strongest lock the store offers up front, the
    /// pessimistic-write equivalent for row reads done inside it.
    pub fn exclusive() -> Self {
        Self {
            isolation: Isolation::Serializable,
            ..Self::default()
        }
    }

    pub fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Token handed to execute callbacks. Managers may use it to vend resources
/// bound to the running scope.
#[derive(Debug, Clone, Copy)]
pub struct TransactionContext<'a> {
    _priv: std::marker::PhantomData<&'a ()>,
}

impl<'a> TransactionContext<'a> {
    pub fn new() -> Self {
        Self {
            _priv: std::marker::PhantomData,
        }
    }
}

impl<'a> Default for TransactionContext<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// Backend-implemented transaction manager.
#[async_trait::async_trait]
pub trait TransactionManager: Send + Sync {
    /// Run `f` inside a scope described by `def`; commit on `Ok`, roll back on `Err`.
    async fn execute<'a, R, F, Fut>(
        &'a self,
        def: &TransactionDefinition,
        f: F,
    ) -> crate::RepoResult<R>
    where
        F: FnOnce(TransactionContext<'a>) -> Fut + Send + 'a,
        Fut: core::future::Future<Output = crate::RepoResult<R>> + Send + 'a,
        R: Send + 'a;
}

/// A manager bundled with a default definition.
#[derive(Debug)]
pub struct TransactionTemplate<M: TransactionManager> {
    manager: M,
    defaults: TransactionDefinition,
}

impl<M: TransactionManager> TransactionTemplate<M> {
    pub fn new(manager: M) -> Self {
        Self {
            manager,
            defaults: TransactionDefinition::default(),
        }
    }

    pub fn with_defaults(mut self, def: TransactionDefinition) -> Self {
        self.defaults = def;
        self
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    pub async fn execute<R, F, Fut>(&self, f: F) -> crate::RepoResult<R>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> Fut + Send,
        Fut: core::future::Future<Output = crate::RepoResult<R>> + Send,
        R: Send + 'static,
    {
        self.manager.execute(&self.defaults, f).await
    }

    pub async fn execute_with<R, F, Fut>(
        &self,
        def: &TransactionDefinition,
        f: F,
    ) -> crate::RepoResult<R>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> Fut + Send,
        Fut: core::future::Future<Output = crate::RepoResult<R>> + Send,
        R: Send + 'static,
    {
        self.manager.execute(def, f).await
    }
}

/// Runs the closure as-is, without a database transaction. For stores that
/// have none, and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransactionManager;

#[async_trait::async_trait]
impl TransactionManager for DefaultTransactionManager {
    async fn execute<'a, R, F, Fut>(
        &'a self,
        _def: &TransactionDefinition,
        f: F,
    ) -> crate::RepoResult<R>
    where
        F: FnOnce(TransactionContext<'a>) -> Fut + Send + 'a,
        Fut: core::future::Future<Output = crate::RepoResult<R>> + Send + 'a,
        R: Send + 'a,
    {
        f(TransactionContext::new()).await
    }
}

pub fn default_transaction_template() -> TransactionTemplate<DefaultTransactionManager> {
    TransactionTemplate::new(DefaultTransactionManager)
}
