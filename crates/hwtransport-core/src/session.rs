//! Session bookkeeping for backends that own device exclusivity
//!
//! A backend that hands out its own session tokens keeps them in a
//! `SessionRegistry`, which guarantees at most one live session per device path
//! even when `acquire` is called concurrently.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::errors::{AcquireError, ReleaseError};
use crate::types::Session;

// ----------------------------------------------------------------------------
// Session Registry
// ----------------------------------------------------------------------------

/// Maps device paths to the session currently holding them
#[derive(Debug, Default)]
pub struct SessionRegistry {
    by_path: DashMap<String, Session>,
    by_session: DashMap<Session, String>,
    /// Last issued token number; tokens are never reused
    counter: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `path`, failing with `Busy` if another session holds it
    pub fn acquire(&self, path: &str) -> Result<Session, AcquireError> {
        match self.by_path.entry(path.to_string()) {
            Entry::Occupied(_) => Err(AcquireError::Busy {
                path: path.to_string(),
            }),
            Entry::Vacant(slot) => {
                let token = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                let session = Session::new(token.to_string());
                self.by_session.insert(session.clone(), path.to_string());
                slot.insert(session.clone());
                Ok(session)
            }
        }
    }

    /// Drop `session`, returning the path it held
    pub fn release(&self, session: &Session) -> Result<String, ReleaseError> {
        let (_, path) = self
            .by_session
            .remove(session)
            .ok_or_else(|| ReleaseError::Unknown {
                session: session.clone(),
            })?;
        self.by_path.remove_if(&path, |_, held| held == session);
        Ok(path)
    }

    /// Invalidate whatever session holds `path` (device vanished)
    pub fn forget_path(&self, path: &str) -> Option<Session> {
        let (_, session) = self.by_path.remove(path)?;
        self.by_session.remove(&session);
        Some(session)
    }

    pub fn path_of(&self, session: &Session) -> Option<String> {
        self.by_session.get(session).map(|entry| entry.value().clone())
    }

    pub fn session_of(&self, path: &str) -> Option<Session> {
        self.by_path.get(path).map(|entry| entry.value().clone())
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
