use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use diesel::{
    Connection, PgConnection, RunQueryDsl,
    dsl::sql,
    select,
    sql_types::{Bool, Integer},
};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tokio::{runtime::Handle, task};
use tracing::warn;

use super::postgres_connection::PgPoolSquad;

// Upper bound on holding a connection back while a cancel request is still being sent.
const CANCEL_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
#[error("postgres query cancelled by caller")]
pub struct QueryCancelled;

#[derive(Debug, Default)]
struct QueryState {
    backend_pid: Option<i32>,
    cancelled: bool,
    cancel_in_flight: bool,
}

#[derive(Debug, Default)]
struct SharedQueryState {
    state: Mutex<QueryState>,
    cancel_done: Condvar,
}

impl SharedQueryState {
    fn finish_cancel(&self) {
        let mut state = self.state.lock();
        state.cancel_in_flight = false;
        self.cancel_done.notify_all();
    }
}

/// Sends `pg_cancel_backend` for the registered backend if the awaiting future
/// is dropped before the blocking query finishes.
struct CancelOnDrop {
    db_pool: Arc<PgPoolSquad>,
    shared: Arc<SharedQueryState>,
    armed: bool,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let handle = Handle::try_current().ok();
        let backend_pid = {
            let mut state = self.shared.state.lock();
            state.cancelled = true;
            match (state.backend_pid, &handle) {
                (Some(pid), Some(_)) => {
                    state.cancel_in_flight = true;
                    Some(pid)
                }
                _ => None,
            }
        };

        let (Some(backend_pid), Some(handle)) = (backend_pid, handle) else {
            return;
        };

        let db_pool = Arc::clone(&self.db_pool);
        let shared = Arc::clone(&self.shared);
        handle.spawn_blocking(move || {
            if let Err(err) = cancel_backend(&db_pool, backend_pid) {
                warn!(backend_pid, error = ?err, "postgres: failed to cancel backend query");
            }
            shared.finish_cancel();
        });
    }
}

/// Runs `query` on a pooled connection inside a transaction on the blocking
/// threadpool. Dropping the returned future cancels the statement server-side
/// and rolls the transaction back, so an abandoned write never commits.
pub async fn run_cancellable<T, F>(db_pool: Arc<PgPoolSquad>, query: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
{
    let shared = Arc::new(SharedQueryState::default());
    let mut guard = CancelOnDrop {
        db_pool: Arc::clone(&db_pool),
        shared: Arc::clone(&shared),
        armed: true,
    };

    let joined = task::spawn_blocking(move || run_registered(&db_pool, &shared, query)).await;
    guard.armed = false;

    joined?
}

fn run_registered<T, F>(db_pool: &PgPoolSquad, shared: &SharedQueryState, query: F) -> Result<T>
where
    F: FnOnce(&mut PgConnection) -> Result<T>,
{
    let mut conn = db_pool.get()?;
    let pg: &mut PgConnection = &mut conn;

    let backend_pid = select(sql::<Integer>("pg_backend_pid()"))
        .get_result::<i32>(pg)
        .context("read postgres backend pid")?;

    {
        let mut state = shared.state.lock();
        if state.cancelled {
            return Err(QueryCancelled.into());
        }
        state.backend_pid = Some(backend_pid);
    }

    let result = pg.transaction::<T, anyhow::Error, _>(|conn| {
        let value = query(conn)?;
        // A cancel that landed between statements still has to roll back.
        if shared.state.lock().cancelled {
            return Err(QueryCancelled.into());
        }
        Ok(value)
    });

    {
        let mut state = shared.state.lock();
        state.backend_pid = None;
        if state.cancelled {
            warn!(backend_pid, "postgres: query abandoned by caller, transaction rolled back");
        }
        // The connection goes back to the pool only once no cancel can hit it.
        while state.cancel_in_flight {
            if shared.cancel_done.wait_for(&mut state, CANCEL_WAIT).timed_out() {
                break;
            }
        }
    }

    drop(conn);
    result
}

fn cancel_backend(db_pool: &PgPoolSquad, backend_pid: i32) -> Result<bool> {
    let mut conn = db_pool.get()?;

    let signalled = select(sql::<Bool>(&format!("pg_cancel_backend({backend_pid})")))
        .get_result::<bool>(&mut conn)
        .with_context(|| format!("pg_cancel_backend({backend_pid})"))?;

    Ok(signalled)
}
