use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::info;

use crate::capture::CapturePlatform;
use crate::notify::Notifier;
use crate::session::{MediaSession, SessionConfig};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("screen {0} already has an open media session")]
    AlreadyOpen(String),
    #[error("no media session for screen {0}")]
    NotFound(String),
}

/// Open media sessions keyed by interview screen. At most one per screen.
pub struct InterviewRegistry<P> {
    platform: P,
    notifier: Arc<dyn Notifier>,
    config: SessionConfig,
    sessions: DashMap<String, Arc<MediaSession<P>>>,
}

impl<P: CapturePlatform + Clone> InterviewRegistry<P> {
    pub fn new(platform: P, notifier: Arc<dyn Notifier>, config: SessionConfig) -> Self {
        Self {
            platform,
            notifier,
            config,
            sessions: DashMap::new(),
        }
    }

    fn create(&self) -> Arc<MediaSession<P>> {
        Arc::new(MediaSession::new(
            self.platform.clone(),
            self.notifier.clone(),
            self.config.clone(),
        ))
    }

    /// Mount a new session for `screen`.
    pub fn open(&self, screen: &str) -> Result<Arc<MediaSession<P>>, RegistryError> {
        match self.sessions.entry(screen.to_string()) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyOpen(screen.to_string())),
            Entry::Vacant(slot) => {
                let session = self.create();
                info!(screen, session = %session.id(), "media session opened");
                slot.insert(session.clone());
                Ok(session)
            }
        }
    }

    pub fn get_or_open(&self, screen: &str) -> Arc<MediaSession<P>> {
        self.sessions
            .entry(screen.to_string())
            .or_insert_with(|| {
                let session = self.create();
                info!(screen, session = %session.id(), "media session opened");
                session
            })
            .clone()
    }

    pub fn get(&self, screen: &str) -> Option<Arc<MediaSession<P>>> {
        self.sessions.get(screen).map(|s| s.clone())
    }

    /// End the screen's session and forget it.
    pub fn close(&self, screen: &str) -> Result<(), RegistryError> {
        let (_, session) = self
            .sessions
            .remove(screen)
            .ok_or_else(|| RegistryError::NotFound(screen.to_string()))?;
        session.end_session();
        info!(screen, session = %session.id(), "media session closed");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn screen_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}
