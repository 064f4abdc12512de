use crate::error::AppError;
use crate::services::excel::{LoadedSheet, Table};
use chrono::{DateTime, Utc};
use moka::ops::compute::{CompResult, Op};
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// One user's loaded workbook. Replaced wholesale on every new upload.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub file_name: Option<String>,
    pub sheet_names: Vec<String>,
    pub sheet_name: String,
    pub loaded_at: DateTime<Utc>,
    pub table: Arc<Table>,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<String, Arc<Session>>,
}

impl SessionStore {
    pub fn new(max_sessions: u64, idle_timeout: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(max_sessions)
            .time_to_idle(idle_timeout)
            .eviction_listener(|id: Arc<String>, _, cause| {
                tracing::info!("Session {} discarded ({:?})", id, cause);
            })
            .build();
        Self { sessions }
    }

    pub fn create(&self, file_name: Option<String>, loaded: LoadedSheet) -> Arc<Session> {
        let session = build_session(Uuid::new_v4().to_string(), file_name, loaded);
        self.sessions.insert(session.id.clone(), session.clone());
        session
    }

    /// Swaps the table of an existing session for a freshly uploaded one.
    ///
    /// The lookup and the write happen as one step, so a session that expires
    /// or is removed meanwhile is never brought back.
    pub fn replace(&self, id: &str, file_name: Option<String>, loaded: LoadedSheet) -> Result<Arc<Session>, AppError> {
        let session = build_session(id.to_string(), file_name, loaded);
        let result = self
            .sessions
            .entry(id.to_string())
            .and_compute_with(|existing| match existing {
                Some(_) => Op::Put(session.clone()),
                None => Op::Nop,
            });

        match result {
            CompResult::ReplacedWith(_) => Ok(session),
            _ => Err(AppError::SessionNotFound(id.to_string())),
        }
    }

    pub fn get(&self, id: &str) -> Result<Arc<Session>, AppError> {
        self.sessions
            .get(id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
    }

    pub fn remove(&self, id: &str) -> Result<(), AppError> {
        self.sessions
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
    }
}

fn build_session(id: String, file_name: Option<String>, loaded: LoadedSheet) -> Arc<Session> {
    Arc::new(Session {
        id,
        file_name,
        sheet_names: loaded.sheet_names,
        sheet_name: loaded.sheet_name,
        loaded_at: Utc::now(),
        table: Arc::new(loaded.table),
    })
}
