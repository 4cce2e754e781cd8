//! Database binding of the work queue.
//!
//! Persisted objects describe themselves as SQL statement batches through
//! [`DbRecord`]. [`DbQueue`] turns those batches into [`Queries`] items and
//! feeds them to a [`WorkQueue`] whose backend is any [`DbConnection`].
//! Producers (message handlers) never wait on the database.

use std::sync::Arc;

use async_trait::async_trait;
use farm_core::TaskProgress;
use thiserror::Error;
use tracing::{debug, info};

use crate::queue::{
    BackendError, QueueBackend, QueueConfig, QueueError, QueueObserver, QueueWorker,
    ShutdownPolicy, WorkQueue,
};

/// Error reported by a [`DbConnection`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DbError {
    /// The connection is gone; the batch should be retried after reconnecting.
    #[error("database connection lost: {0}")]
    ConnectionLost(String),
    /// The database refused a statement.
    #[error("statement failed: {0}")]
    Statement(String),
}

impl From<DbError> for BackendError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::ConnectionLost(reason) => BackendError::Disconnected(reason),
            DbError::Statement(reason) => BackendError::Rejected(reason),
        }
    }
}

/// An ordered batch of SQL statements applied as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Queries(Vec<String>);

impl Queries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: impl Into<String>) {
        self.0.push(statement.into());
    }

    pub fn statements(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for Queries {
    fn from(statements: Vec<String>) -> Self {
        Self(statements)
    }
}

impl<S: Into<String>> FromIterator<S> for Queries {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// An object persisted in the farm database.
pub trait DbRecord {
    /// Statements that insert the object.
    fn add_statements(&self) -> Queries;

    /// Statements that delete the object.
    fn delete_statements(&self) -> Queries;

    /// Statements that update one attribute, or every attribute for `None`.
    /// An attribute the record does not persist yields no statements.
    fn update_statements(&self, attr: Option<&str>) -> Queries;
}

/// A connection able to apply statement batches.
#[async_trait]
pub trait DbConnection: Send {
    async fn connect(&mut self) -> Result<(), DbError>;

    fn is_connected(&self) -> bool;

    /// Applies the whole batch or nothing.
    async fn execute(&mut self, statements: &[String]) -> Result<(), DbError>;
}

/// Adapts a [`DbConnection`] to the queue's backend interface.
pub struct DbBackend<C> {
    name: String,
    conn: C,
}

impl<C> DbBackend<C> {
    pub fn new(name: impl Into<String>, conn: C) -> Self {
        Self {
            name: name.into(),
            conn,
        }
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }
}

#[async_trait]
impl<C: DbConnection> QueueBackend<Queries> for DbBackend<C> {
    async fn connect(&mut self) -> Result<(), BackendError> {
        Ok(self.conn.connect().await?)
    }

    fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    async fn process(&mut self, item: &Queries) -> Result<(), BackendError> {
        Ok(self.conn.execute(item.statements()).await?)
    }

    async fn connection_established(&mut self) {
        info!(queue = %self.name, "database connection opened");
    }
}

/// FIFO queue of database actions.
#[derive(Clone)]
pub struct DbQueue {
    queue: WorkQueue<Queries>,
}

impl DbQueue {
    /// Creates the queue and its worker. Spawn `worker.run()` to start it.
    pub fn new<C>(
        config: QueueConfig,
        conn: C,
        observer: Arc<dyn QueueObserver>,
    ) -> (Self, QueueWorker<Queries, DbBackend<C>>)
    where
        C: DbConnection + 'static,
    {
        let backend = DbBackend::new(config.name.clone(), conn);
        let (queue, worker) = WorkQueue::new(config, backend, observer);
        (Self { queue }, worker)
    }

    /// Queues the insert statements of `record`.
    ///
    /// # Errors
    ///
    /// [`QueueError::Closed`] once the queue has shut down.
    pub fn add_item(&self, record: &dyn DbRecord) -> Result<(), QueueError> {
        self.enqueue(record.add_statements())
    }

    /// Queues the delete statements of `record`.
    ///
    /// # Errors
    ///
    /// [`QueueError::Closed`] once the queue has shut down.
    pub fn del_item(&self, record: &dyn DbRecord) -> Result<(), QueueError> {
        self.enqueue(record.delete_statements())
    }

    /// Queues the update statements of `record` for `attr` (`None`: all).
    ///
    /// # Errors
    ///
    /// [`QueueError::Closed`] once the queue has shut down.
    pub fn update_item(&self, record: &dyn DbRecord, attr: Option<&str>) -> Result<(), QueueError> {
        self.enqueue(record.update_statements(attr))
    }

    pub fn is_working(&self) -> bool {
        self.queue.is_working()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn shutdown(&self, policy: ShutdownPolicy) {
        self.queue.shutdown(policy);
    }

    fn enqueue(&self, queries: Queries) -> Result<(), QueueError> {
        if queries.is_empty() {
            debug!(queue = %self.queue.name(), "record produced no statements");
            return Ok(());
        }
        self.queue.push(queries)
    }
}

// ── Task progress ─────────────────────────────────────────────────────────────

/// Quotes `text` as an SQL string literal.
fn sql_string(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn task_filter(progress: &TaskProgress<'_>) -> String {
    format!(
        "job_id = {} AND block_num = {} AND task_num = {}",
        progress.key.job, progress.key.block, progress.key.task
    )
}

impl DbRecord for TaskProgress<'_> {
    fn add_statements(&self) -> Queries {
        let k = &self.key;
        let s = &self.state;
        Queries::from_iter([format!(
            "INSERT INTO tasks (job_id, block_num, task_num, client_id, run_number, status, \
             percent, frame, percent_frame, activity) VALUES ({}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
            k.job,
            k.block,
            k.task,
            k.client_id,
            k.number,
            s.status,
            s.percent,
            s.frame,
            s.percent_frame,
            sql_string(&self.activity)
        )])
    }

    fn delete_statements(&self) -> Queries {
        Queries::from_iter([format!("DELETE FROM tasks WHERE {}", task_filter(self))])
    }

    fn update_statements(&self, attr: Option<&str>) -> Queries {
        let s = &self.state;
        let assignments = match attr {
            None => format!(
                "status = {}, percent = {}, frame = {}, percent_frame = {}, activity = {}",
                s.status,
                s.percent,
                s.frame,
                s.percent_frame,
                sql_string(&self.activity)
            ),
            Some("status") => format!("status = {}", s.status),
            Some("percent") => format!("percent = {}, percent_frame = {}", s.percent, s.percent_frame),
            Some("frame") => format!("frame = {}", s.frame),
            Some("activity") => format!("activity = {}", sql_string(&self.activity)),
            Some(other) => {
                debug!(attr = other, "task progress does not persist this attribute");
                return Queries::new();
            }
        };
        Queries::from_iter([format!(
            "UPDATE tasks SET {assignments} WHERE {}",
            task_filter(self)
        )])
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
