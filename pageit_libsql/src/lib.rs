#![forbid(unsafe_code)]
#![cfg_attr(
    not(feature = "libsql-backend"),
    doc = "Enable feature `libsql-backend` to use this adapter."
)]
//! libSQL / SQLite backend for pageit.
//!
//! [`LibsqlRepository`] implements `pageit_core::Repository` by rendering SQL
//! with `pageit_sql_builder`. [`LibsqlTransactionManager`] binds a
//! transaction's connection to the running task, and every repository
//! operation issued on that task runs on it.

#[cfg(feature = "libsql-backend")]
mod backend {
    use std::cell::RefCell;
    use std::marker::PhantomData;
    use std::sync::Arc;
    use std::time::Instant;

    use async_trait::async_trait;
    use libsql::{params, Connection, Database, Row, Value};
    use pageit_core::transactions::{
        Isolation, Propagation, TransactionContext, TransactionDefinition, TransactionManager,
    };
    use pageit_core::{
        ensure_columns, Fetchable, Identifiable, Insertable, Mutation, ParamValue, Predicate,
        RepoError, RepoResult, Repository, RowAdapter, Sort, Updatable,
    };

    #[cfg(feature = "tracing")]
    use tracing::info;

    #[inline]
    #[allow(unused_variables)]
    fn obs_record(op: &str, table: &str, start: Instant, rows: usize, success: bool) {
        let elapsed = start.elapsed().as_millis() as u64;
        #[cfg(feature = "tracing")]
        {
            info!(
                sql_kind = "sql",
                table = table,
                op = op,
                rows = rows,
                elapsed_ms = elapsed,
                success = success,
                "repo op"
            );
        }
        #[cfg(feature = "metrics")]
        {
            metrics::counter!("repo_ops_total", 1, "op" => op.to_string(), "table" => table.to_string(), "success" => success.to_string());
            metrics::histogram!("repo_op_duration_ms", elapsed as f64, "op" => op.to_string(), "table" => table.to_string());
            if !success {
                metrics::counter!("repo_op_errors_total", 1, "op" => op.to_string(), "table" => table.to_string());
            }
        }
    }

    /// Records the outcome of `result` and passes it through.
    fn observed<R>(
        op: &str,
        table: &str,
        start: Instant,
        result: RepoResult<R>,
        rows: impl FnOnce(&R) -> usize,
    ) -> RepoResult<R> {
        match &result {
            Ok(r) => obs_record(op, table, start, rows(r), true),
            Err(_) => obs_record(op, table, start, 0, false),
        }
        result
    }

    fn io_error(msg: &str) -> RepoError {
        RepoError::backend(std::io::Error::new(std::io::ErrorKind::Other, msg.to_string()))
    }

    // Task-local state for the current transaction connection and savepoint depth.
    tokio::task_local! {
        static TX_STACK: RefCell<Vec<Connection>>;
        static SP_DEPTH: RefCell<usize>;
    }

    /// Connection of the innermost transaction running on this task, if any.
    fn current_tx_conn() -> Option<Connection> {
        TX_STACK
            .try_with(|cell| cell.borrow().last().cloned())
            .ok()
            .flatten()
    }

    fn begin_sql(isolation: Isolation) -> &'static str {
        match isolation {
            Isolation::Default | Isolation::ReadCommitted => "BEGIN DEFERRED",
            Isolation::RepeatableRead => "BEGIN IMMEDIATE",
            // Takes the database write lock up front: the pessimistic lock.
            Isolation::Serializable => "BEGIN EXCLUSIVE",
        }
    }

    /// Converts a core parameter into a libSQL value.
    pub fn to_libsql_value(p: ParamValue) -> Value {
        match p {
            ParamValue::String(s) => s.into(),
            ParamValue::I32(i) => (i as i64).into(), // libsql uses i64 for integers
            ParamValue::I64(i) => i.into(),
            ParamValue::F64(f) => f.into(),
            ParamValue::Bool(b) => (b as i64).into(), // SQLite bools are 0/1
            ParamValue::Null => Value::Null,
        }
    }

    fn to_libsql_values(params: Vec<ParamValue>) -> Vec<Value> {
        params.into_iter().map(to_libsql_value).collect()
    }

    /// Opens a local database file. A `:memory:` database is private to each
    /// connection, so only a repository built with `from_conn` can use one.
    pub fn open_database(path: &str) -> RepoResult<Arc<Database>> {
        // Database::open is deprecated upstream; keep a narrow allow here until Builder migration
        #[allow(deprecated)]
        let db = Database::open(path).map_err(RepoError::backend)?;
        Ok(Arc::new(db))
    }

    /// Runs a batch of `;`-separated statements, e.g. a schema file.
    pub async fn apply_schema(db: &Database, sql: &str) -> RepoResult<()> {
        let conn = db.connect().map_err(RepoError::backend)?;
        conn.execute_batch(sql).await.map_err(RepoError::backend)?;
        Ok(())
    }

    /// A concrete TransactionManager for libsql/SQLite.
    #[derive(Clone)]
    pub struct LibsqlTransactionManager {
        db: Arc<Database>,
    }

    impl LibsqlTransactionManager {
        pub fn new(db: Arc<Database>) -> Self {
            Self { db }
        }

        pub fn database(&self) -> &Arc<Database> {
            &self.db
        }

        /// Vend a repository bound to the current transaction connection if available,
        /// otherwise a regular repository against the manager's database.
        pub async fn repository<T, A>(
            &self,
            _ctx: TransactionContext<'_>,
            adapter: A,
        ) -> RepoResult<LibsqlRepository<T, A>>
        where
            T: Fetchable + Identifiable + Insertable + Updatable + 'static,
            A: RowAdapter<T, Row = Row> + Send + Sync + 'static,
        {
            Ok(match current_tx_conn() {
                Some(conn) => LibsqlRepository::from_conn(self.db.clone(), conn, adapter),
                None => LibsqlRepository::new(self.db.clone(), adapter),
            })
        }
    }

    #[async_trait]
    impl TransactionManager for LibsqlTransactionManager {
        async fn execute<'a, R, F, Fut>(
            &'a self,
            def: &TransactionDefinition,
            f: F,
        ) -> RepoResult<R>
        where
            F: FnOnce(TransactionContext<'a>) -> Fut + Send + 'a,
            Fut: core::future::Future<Output = RepoResult<R>> + Send + 'a,
            R: Send + 'a,
        {
            let fut = async {
                let active = current_tx_conn();

                match (def.propagation, &active) {
                    (
                        Propagation::NotSupported | Propagation::Supports | Propagation::Never,
                        None,
                    ) => {
                        return f(TransactionContext::new()).await;
                    }
                    (Propagation::Never, Some(_)) => {
                        return Err(io_error(
                            "transaction exists but Propagation::Never requested",
                        ));
                    }
                    _ => {}
                }

                let Some(conn) = active else {
                    return self.run_outermost(def, f).await;
                };

                if !matches!(def.propagation, Propagation::RequiresNew | Propagation::Nested) {
                    return f(TransactionContext::new()).await;
                }

                let name = SP_DEPTH.with(|d| {
                    let mut depth = d.borrow_mut();
                    *depth += 1;
                    format!("sp{}", *depth)
                });
                let opened = conn
                    .execute(&format!("SAVEPOINT {}", name), ())
                    .await
                    .map_err(RepoError::backend);
                let result = match opened {
                    Ok(_) => f(TransactionContext::new()).await,
                    Err(e) => Err(e),
                };
                let close = if result.is_ok() {
                    format!("RELEASE SAVEPOINT {}", name)
                } else {
                    format!("ROLLBACK TO SAVEPOINT {}", name)
                };
                conn.execute(&close, ()).await.ok();
                SP_DEPTH.with(|d| {
                    let mut depth = d.borrow_mut();
                    *depth = depth.saturating_sub(1);
                });
                result
            };

            // If the task-local TX_STACK isn't initialized for this task, set up scopes and run.
            if TX_STACK.try_with(|_| ()).is_err() {
                TX_STACK
                    .scope(RefCell::new(Vec::new()), async move {
                        SP_DEPTH.scope(RefCell::new(0usize), fut).await
                    })
                    .await
            } else {
                fut.await
            }
        }
    }

    impl LibsqlTransactionManager {
        /// Opens a new transaction on a fresh connection, runs `f` with the
        /// connection published on the task, then commits or rolls back.
        async fn run_outermost<'a, R, F, Fut>(
            &'a self,
            def: &TransactionDefinition,
            f: F,
        ) -> RepoResult<R>
        where
            F: FnOnce(TransactionContext<'a>) -> Fut + Send + 'a,
            Fut: core::future::Future<Output = RepoResult<R>> + Send + 'a,
            R: Send + 'a,
        {
            let conn = self.db.connect().map_err(RepoError::backend)?;
            if def.read_only {
                conn.execute("PRAGMA query_only = ON", ())
                    .await
                    .map_err(RepoError::backend)?;
            }
            let busy_ms = def.timeout.map(|d| d.as_millis() as i64).unwrap_or(1000);
            conn.execute(&format!("PRAGMA busy_timeout = {}", busy_ms), ())
                .await
                .ok();
            conn.execute(begin_sql(def.isolation), ())
                .await
                .map_err(RepoError::backend)?;
            TX_STACK.with(|cell| cell.borrow_mut().push(conn.clone()));
            SP_DEPTH.with(|d| *d.borrow_mut() = 0);

            let result = f(TransactionContext::new()).await;

            TX_STACK.with(|cell| {
                let _ = cell.borrow_mut().pop();
            });
            let end = if result.is_ok() { "COMMIT" } else { "ROLLBACK" };
            let ended = conn.execute(end, ()).await.map_err(RepoError::backend);
            if def.read_only {
                conn.execute("PRAGMA query_only = OFF", ()).await.ok();
            }
            ended?;
            result
        }
    }

    /// Statements that depend only on the entity type.
    struct RepoSql<T> {
        select_by_id: String,
        delete_by_id: String,
        insert: String,
        update_by_id: String,
        _marker: PhantomData<fn() -> T>,
    }

    impl<T> RepoSql<T>
    where
        T: Fetchable + Identifiable + Insertable + Updatable,
    {
        fn new() -> Self {
            Self {
                select_by_id: pageit_sql_builder::select_by_id::<T>(T::ID_COLUMN),
                delete_by_id: pageit_sql_builder::delete_by_id::<T>(T::ID_COLUMN),
                insert: pageit_sql_builder::insert::<T>(T::ID_COLUMN),
                update_by_id: pageit_sql_builder::update_by_id::<T>(T::ID_COLUMN),
                _marker: PhantomData,
            }
        }
    }

    /// A fully asynchronous, `libsql`-backed repository.
    pub struct LibsqlRepository<T, A>
    where
        T: Identifiable + 'static,
        A: RowAdapter<T> + Send + Sync + 'static,
    {
        db: Arc<Database>,
        /// Connection bound at construction; used when no transaction is active on the task.
        conn: Option<Connection>,
        adapter: A,
        sql: RepoSql<T>,
    }

    impl<T, A> LibsqlRepository<T, A>
    where
        T: Fetchable + Identifiable + Insertable + Updatable + 'static,
        A: RowAdapter<T, Row = Row> + Send + Sync + 'static,
    {
        /// Creates a new repository from an existing `libsql::Database` object.
        pub fn new(db: Arc<Database>, adapter: A) -> Self {
            Self {
                db,
                conn: None,
                adapter,
                sql: RepoSql::new(),
            }
        }

        /// Creates a repository that runs every operation on `conn`.
        pub fn from_conn(db: Arc<Database>, conn: Connection, adapter: A) -> Self {
            Self {
                db,
                conn: Some(conn),
                adapter,
                sql: RepoSql::new(),
            }
        }

        /// Creates a new repository by opening a database path or URL.
        pub fn from_url(database_url: &str, adapter: A) -> RepoResult<Self> {
            Ok(Self::new(open_database(database_url)?, adapter))
        }

        pub fn database(&self) -> &Arc<Database> {
            &self.db
        }

        pub fn adapter(&self) -> &A {
            &self.adapter
        }

        /// The connection operations run on: the task's active transaction
        /// first, then the bound connection, else a fresh one.
        pub fn connection(&self) -> RepoResult<Connection> {
            if let Some(tx_conn) = current_tx_conn() {
                return Ok(tx_conn);
            }
            match &self.conn {
                Some(c) => Ok(c.clone()),
                None => self.db.connect().map_err(RepoError::backend),
            }
        }

        /// Runs `sql` and maps every returned row with `map`. For queries the
        /// entity metadata cannot express, such as joins.
        pub async fn query_map<R, F>(
            &self,
            sql: &str,
            params: Vec<ParamValue>,
            map: F,
        ) -> RepoResult<Vec<R>>
        where
            F: Fn(&Row) -> RepoResult<R> + Send,
        {
            let conn = self.connection()?;
            let mut rows = conn
                .query(sql, to_libsql_values(params))
                .await
                .map_err(RepoError::backend)?;
            let mut out = Vec::new();
            while let Some(row) = rows.next().await.map_err(RepoError::backend)? {
                out.push(map(&row)?);
            }
            Ok(out)
        }

        async fn query_entities(&self, sql: &str, params: Vec<ParamValue>) -> RepoResult<Vec<T>> {
            self.query_map(sql, params, |row| self.adapter.from_row(row))
                .await
        }

        fn check_query(predicate: &Predicate, sort: Option<&Sort>) -> RepoResult<()> {
            ensure_columns::<T, _>(predicate.columns().chain(sort.map(Sort::column)))
        }
    }

    #[async_trait]
    impl<T, A> Repository<T> for LibsqlRepository<T, A>
    where
        T: Fetchable + Identifiable + Insertable + Updatable + Send + Sync + Clone + 'static,
        A: RowAdapter<T, Row = Row> + Send + Sync + 'static,
        T::Key: Clone + Send + Sync + 'static + Into<Value> + serde::de::DeserializeOwned,
    {
        async fn find_by_id(&self, id: &T::Key) -> RepoResult<Option<T>> {
            let start = Instant::now();
            let res: RepoResult<Option<T>> = async {
                let conn = self.connection()?;
                let mut rows = conn
                    .query(&self.sql.select_by_id, params!(id.clone()))
                    .await
                    .map_err(RepoError::backend)?;
                match rows.next().await.map_err(RepoError::backend)? {
                    Some(row) => Ok(Some(self.adapter.from_row(&row)?)),
                    None => Ok(None),
                }
            }
            .await;
            observed("find_by_id", T::TABLE, start, res, |r| r.iter().count())
        }

        async fn find_where(&self, predicate: &Predicate, sort: Option<&Sort>) -> RepoResult<Vec<T>> {
            let start = Instant::now();
            let res = async {
                Self::check_query(predicate, sort)?;
                let (sql, params) =
                    pageit_sql_builder::select_where::<T>(predicate, sort, T::ID_COLUMN);
                self.query_entities(&sql, params).await
            }
            .await;
            observed("find_where", T::TABLE, start, res, Vec::len)
        }

        async fn find_page(
            &self,
            predicate: &Predicate,
            offset: u64,
            limit: u64,
            sort: Option<&Sort>,
        ) -> RepoResult<Vec<T>> {
            let start = Instant::now();
            let res = async {
                Self::check_query(predicate, sort)?;
                let (sql, params) = pageit_sql_builder::select_page::<T>(
                    predicate,
                    sort,
                    T::ID_COLUMN,
                    limit,
                    offset,
                );
                self.query_entities(&sql, params).await
            }
            .await;
            observed("find_page", T::TABLE, start, res, Vec::len)
        }

        async fn count_where(&self, predicate: &Predicate) -> RepoResult<u64> {
            let start = Instant::now();
            let res = async {
                Self::check_query(predicate, None)?;
                let (sql, params) = pageit_sql_builder::count_where::<T>(predicate);
                let counts = self
                    .query_map(&sql, params, |row| {
                        row.get::<i64>(0).map_err(RepoError::mapping)
                    })
                    .await?;
                let n = counts
                    .first()
                    .copied()
                    .ok_or_else(|| io_error("COUNT(*) returned no row"))?;
                u64::try_from(n).map_err(RepoError::mapping)
            }
            .await;
            observed("count_where", T::TABLE, start, res, |_| 1)
        }

        async fn insert(&self, entity: &T) -> RepoResult<T> {
            let start = Instant::now();
            let res = async {
                let values = to_libsql_values(entity.insert_values());
                let conn = self.connection()?;

                #[cfg(feature = "libsql_returning")]
                let new_id: i64 = {
                    let mut rows = conn
                        .query(&self.sql.insert, values)
                        .await
                        .map_err(RepoError::backend)?;
                    let row = rows
                        .next()
                        .await
                        .map_err(RepoError::backend)?
                        .ok_or_else(|| io_error("no row returned from INSERT ... RETURNING"))?;
                    row.get(0).map_err(RepoError::backend)?
                };

                #[cfg(not(feature = "libsql_returning"))]
                let new_id: i64 = {
                    conn.execute(&self.sql.insert, values)
                        .await
                        .map_err(RepoError::backend)?;
                    conn.last_insert_rowid()
                };

                let new_key: T::Key = serde_json::from_value(serde_json::Value::from(new_id))
                    .map_err(RepoError::backend)?;

                // Read back on the same connection so uncommitted rows are visible.
                let mut rows = conn
                    .query(&self.sql.select_by_id, params!(new_key.into()))
                    .await
                    .map_err(RepoError::backend)?;
                match rows.next().await.map_err(RepoError::backend)? {
                    Some(row) => self.adapter.from_row(&row),
                    None => Err(io_error("failed to fetch entity after insert")),
                }
            }
            .await;
            observed("insert", T::TABLE, start, res, |_| 1)
        }

        async fn update(&self, entity: &T) -> RepoResult<T> {
            let start = Instant::now();
            let res = async {
                let values = to_libsql_values(entity.update_values());
                let conn = self.connection()?;
                let n = conn
                    .execute(&self.sql.update_by_id, values)
                    .await
                    .map_err(RepoError::backend)?;
                if n == 0 {
                    return Err(RepoError::NotFound);
                }
                Ok(entity.clone())
            }
            .await;
            observed("update", T::TABLE, start, res, |_| 1)
        }

        async fn delete_by_id(&self, id: &T::Key) -> RepoResult<bool> {
            let start = Instant::now();
            let res = async {
                let conn = self.connection()?;
                let n = conn
                    .execute(&self.sql.delete_by_id, params!(id.clone()))
                    .await
                    .map_err(RepoError::backend)?;
                Ok(n > 0)
            }
            .await;
            observed("delete_by_id", T::TABLE, start, res, |deleted| *deleted as usize)
        }

        async fn update_where(&self, predicate: &Predicate, mutation: &Mutation) -> RepoResult<u64> {
            let start = Instant::now();
            let res = async {
                ensure_columns::<T, _>(predicate.columns().chain(mutation.columns()))?;
                if mutation.is_empty() {
                    return Ok(0);
                }
                let (sql, params) = pageit_sql_builder::update_where::<T>(predicate, mutation);
                let conn = self.connection()?;
                conn.execute(&sql, to_libsql_values(params))
                    .await
                    .map_err(RepoError::backend)
            }
            .await;
            observed("update_where", T::TABLE, start, res, |n| *n as usize)
        }
    }
}

#[cfg(feature = "libsql-backend")]
pub use backend::{
    apply_schema, open_database, to_libsql_value, LibsqlRepository, LibsqlTransactionManager,
};
