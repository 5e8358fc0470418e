use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tracing::info;

use crate::{
    error::SessionError,
    store::SegmentStore,
    types::{Segment, SessionKey},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Collecting,
    Rendering,
}

/// One user's reel in one chat.
pub struct Session {
    state: SessionState,
    store: SegmentStore,
}

impl Session {
    pub fn new(max_clips: usize) -> Self {
        Self {
            state: SessionState::Idle,
            store: SegmentStore::new(max_clips),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_collecting(&self) -> bool {
        self.state == SessionState::Collecting
    }

    /// Idle with nothing staged: indistinguishable from a new session.
    pub fn is_vacant(&self) -> bool {
        self.state == SessionState::Idle && self.store.is_empty()
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SegmentStore {
        &mut self.store
    }

    /// `Idle -> Collecting`. A second call leaves the collected clips untouched.
    pub fn begin(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle => {
                self.state = SessionState::Collecting;
                Ok(())
            }
            SessionState::Collecting | SessionState::Rendering => {
                Err(SessionError::AlreadyCollecting)
            }
        }
    }

    /// `Collecting -> Rendering`, handing out the clips in output order.
    pub fn start_render(&mut self) -> Result<Vec<Segment>, SessionError> {
        if self.state != SessionState::Collecting {
            return Err(SessionError::NotCollecting);
        }
        self.state = SessionState::Rendering;
        Ok(self.store.segments())
    }

    /// Deletes staged clips and returns to a fresh `Idle` session.
    pub async fn finish(&mut self) {
        self.store.cleanup().await;
        self.state = SessionState::Idle;
    }
}

/// Sessions by `(chat, user)`.
///
/// Each session sits behind its own async mutex. Handlers hold it for the
/// whole event, so events of one user are processed one at a time while
/// other users proceed in parallel.
pub struct SessionRegistry {
    max_clips: usize,
    sessions: Mutex<HashMap<SessionKey, Arc<tokio::sync::Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new(max_clips: usize) -> Self {
        Self {
            max_clips,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn session(&self, key: SessionKey) -> Arc<tokio::sync::Mutex<Session>> {
        let mut sessions = self.sessions.lock().expect("SessionRegistry poisoned");
        Arc::clone(
            sessions
                .entry(key)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(Session::new(self.max_clips)))),
        )
    }

    /// The session for `key`, if one is in progress.
    pub fn get(&self, key: SessionKey) -> Option<Arc<tokio::sync::Mutex<Session>>> {
        self.sessions
            .lock()
            .expect("SessionRegistry poisoned")
            .get(&key)
            .map(Arc::clone)
    }

    /// Forgets `session` if it is still the one registered for `key` and no
    /// other handler holds it. Call with the session locked, once it is idle
    /// and empty.
    pub fn release(&self, key: SessionKey, session: &Arc<tokio::sync::Mutex<Session>>) {
        let mut sessions = self.sessions.lock().expect("SessionRegistry poisoned");
        // One reference in the map, one held by the caller.
        if sessions
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current, session))
            && Arc::strong_count(session) == 2
        {
            sessions.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().expect("SessionRegistry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finishes every session, deleting all staged clips.
    pub async fn shutdown(&self) {
        let sessions: Vec<_> = self
            .sessions
            .lock()
            .expect("SessionRegistry poisoned")
            .drain()
            .collect();

        for (key, session) in sessions {
            let mut session = session.lock().await;
            if !session.store().is_empty() {
                info!(session = %key, clips = session.store().len(), "discarding unfinished reel");
            }
            session.finish().await;
        }
    }
}
