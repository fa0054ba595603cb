use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use super::ServerSession;
#[cfg(test)]
use crate::bson::Document;

/// Server sessions waiting to be reused. Guarded by a blocking mutex so sessions can be checked
/// in from `Drop`; the lock is never held across an await.
#[derive(Debug, Default)]
pub(crate) struct ServerSessionPool {
    pool: Mutex<VecDeque<ServerSession>>,
}

impl ServerSessionPool {
    pub(crate) fn new() -> Self {
        Default::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ServerSession>> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Checks out a server session from the pool, skipping sessions that are about to expire. If
    /// none is left, a new session is created.
    pub(crate) fn check_out(&self, logical_session_timeout: Option<Duration>) -> ServerSession {
        let mut pool = self.lock();
        while let Some(session) = pool.pop_front() {
            if session.is_about_to_expire(logical_session_timeout) {
                continue;
            }
            return session;
        }
        ServerSession::new()
    }

    /// Checks in a server session. Dirty sessions and sessions about to expire are discarded, as
    /// are expired sessions at the back of the pool.
    pub(crate) fn check_in(&self, session: ServerSession, logical_session_timeout: Option<Duration>) {
        let mut pool = self.lock();
        while let Some(pooled_session) = pool.pop_back() {
            if pooled_session.is_about_to_expire(logical_session_timeout) {
                continue;
            }
            pool.push_back(pooled_session);
            break;
        }

        if !session.dirty && !session.is_about_to_expire(logical_session_timeout) {
            pool.push_front(session);
        }
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: &Document) -> bool {
        self.lock().iter().any(|s| &s.id == id)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}
