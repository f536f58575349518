//! Persistence for the Payroll Engine.
//!
//! [`Database`] is an explicit, cloneable handle over a SQLite connection.
//! The host opens it at startup, hands clones to services, and drains it
//! with [`Database::shutdown`]; any operation after shutdown fails with
//! [`EngineError::Persistence`].
//!
//! Every access awaits the connection lock. Writes go through
//! [`Database::transaction`], which commits only if the closure succeeds, so
//! a multi-row write is all-or-nothing.

mod schema;
mod tables;

pub use schema::initialize_schema;
pub use tables::Tables;

use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::error::{EngineError, EngineResult};
use crate::models::{Employee, EmployeeLeaveBalance, LeaveType};

#[derive(Debug)]
struct Store {
    conn: Option<Connection>,
}

/// Handle to the engine's store.
///
/// Cloning the handle is cheap; all clones share the same connection.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<Mutex<Store>>,
}

impl Database {
    /// Opens a private in-memory store.
    pub fn open_in_memory() -> EngineResult<Self> {
        tracing::debug!("opening in-memory store");
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Opens (or creates) a store backed by the SQLite file at `path`.
    pub fn open(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "opening store");
        Self::from_connection(Connection::open(path)?)
    }

    fn from_connection(conn: Connection) -> EngineResult<Self> {
        initialize_schema(&conn)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Store { conn: Some(conn) })),
        })
    }

    /// Runs a read-only closure against the tables.
    pub async fn read<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&Tables<'_>) -> EngineResult<T>,
    {
        let store = self.inner.lock().await;
        let conn = store.conn.as_ref().ok_or_else(closed)?;
        f(&Tables::new(conn))
    }

    /// Runs a closure that may modify the tables inside one transaction.
    ///
    /// If the closure returns an error the transaction is rolled back.
    pub async fn transaction<T, F>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&mut Tables<'_>) -> EngineResult<T>,
    {
        let mut store = self.inner.lock().await;
        let conn = store.conn.as_mut().ok_or_else(closed)?;
        let tx = conn.transaction()?;

        let result = f(&mut Tables::new(&tx));
        match result {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                tracing::debug!(error = %e, "transaction rolled back");
                Err(e)
            }
        }
    }

    /// Waits for in-flight operations and closes the store.
    pub async fn shutdown(&self) {
        let mut store = self.inner.lock().await;
        if let Some(conn) = store.conn.take()
            && let Err((_, e)) = conn.close()
        {
            tracing::warn!(error = %e, "store closed with error");
        }
        tracing::info!("store shut down");
    }

    /// Returns true once [`Database::shutdown`] has completed.
    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.conn.is_none()
    }

    /// Inserts or replaces an employee record.
    pub async fn upsert_employee(&self, employee: Employee) -> EngineResult<()> {
        self.transaction(|t| t.upsert_employee(employee)).await
    }

    /// Looks up an employee.
    pub async fn employee(&self, id: &str) -> EngineResult<Employee> {
        self.read(|t| t.employee(id)).await
    }

    /// Employees currently on payroll, ordered by id.
    pub async fn active_employees(&self) -> EngineResult<Vec<Employee>> {
        self.read(|t| t.active_employees()).await
    }

    /// Inserts or replaces a leave type.
    pub async fn upsert_leave_type(&self, leave_type: LeaveType) -> EngineResult<()> {
        self.transaction(|t| t.upsert_leave_type(leave_type)).await
    }

    /// Inserts or replaces a leave balance.
    pub async fn upsert_leave_balance(&self, balance: EmployeeLeaveBalance) -> EngineResult<()> {
        self.transaction(|t| t.upsert_leave_balance(balance)).await
    }

    /// One employee's leave balances for a year.
    pub async fn leave_balances(
        &self,
        employee_id: &str,
        year: i32,
    ) -> EngineResult<Vec<EmployeeLeaveBalance>> {
        self.read(|t| t.leave_balances(employee_id, year)).await
    }
}

fn closed() -> EngineError {
    EngineError::Persistence {
        message: "store has been shut down".to_string(),
    }
}
