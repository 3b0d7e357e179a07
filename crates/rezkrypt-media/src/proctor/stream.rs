use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::monitor::{ProctorEvent, ProctorMonitor};
use super::sample::FrameSample;
use super::ProctorConfig;

#[derive(Debug, Error)]
pub enum ProctorError {
    #[error("no proctoring session for connection {0}")]
    NotFound(String),
}

/// A proctoring event stamped with the frame that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedEvent {
    pub session_id: String,
    pub ts: f64,
    #[serde(flatten)]
    pub event: ProctorEvent,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One connection's frame queue and the worker that drains it.
pub struct ProctorSession {
    id: String,
    frames: Mutex<Option<mpsc::Sender<FrameSample>>>,
    events: Mutex<mpsc::UnboundedReceiver<TimedEvent>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    max_events_per_frame: usize,
    dropped: AtomicU64,
}

impl ProctorSession {
    /// Spawn the worker. Must be called inside a tokio runtime.
    pub fn start(config: ProctorConfig) -> Self {
        let id = Uuid::new_v4().to_string();
        let (frame_tx, frame_rx) = mpsc::channel(config.frame_queue.max(1));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let max_events_per_frame = config.max_events_per_frame;
        let worker = tokio::spawn(run_worker(
            id.clone(),
            ProctorMonitor::new(config),
            frame_rx,
            event_tx,
        ));
        Self {
            id,
            frames: Mutex::new(Some(frame_tx)),
            events: Mutex::new(event_rx),
            worker: Mutex::new(Some(worker)),
            max_events_per_frame,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue a frame for the worker. Returns false when the frame was dropped
    /// because the queue is full or the session has stopped.
    pub fn submit(&self, sample: FrameSample) -> bool {
        let frames = lock(&self.frames);
        let Some(tx) = frames.as_ref() else {
            return false;
        };
        match tx.try_send(sample) {
            Ok(()) => true,
            Err(TrySendError::Full(sample)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(session = %self.id, ts = sample.ts, "frame queue full, dropping frame");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Up to `max_events_per_frame` events that are ready now.
    pub fn drain(&self) -> Vec<TimedEvent> {
        let mut events = lock(&self.events);
        let mut out = Vec::new();
        while out.len() < self.max_events_per_frame {
            match events.try_recv() {
                Ok(event) => out.push(event),
                Err(_) => break,
            }
        }
        out
    }

    /// Submit a frame and collect what the worker has produced so far.
    pub fn on_frame(&self, sample: FrameSample) -> Vec<TimedEvent> {
        self.submit(sample);
        self.drain()
    }

    /// Close the queue and wait for the worker to finish the frames already
    /// queued. Their events stay available to [`drain`](Self::drain).
    pub async fn stop(&self) {
        lock(&self.frames).take();
        let worker = lock(&self.worker).take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!(session = %self.id, "proctor worker failed: {}", e);
            }
        }
    }
}

async fn run_worker(
    session_id: String,
    mut monitor: ProctorMonitor,
    mut frames: mpsc::Receiver<FrameSample>,
    events: mpsc::UnboundedSender<TimedEvent>,
) {
    while let Some(sample) = frames.recv().await {
        for event in monitor.process(&sample) {
            let timed = TimedEvent {
                session_id: session_id.clone(),
                ts: sample.ts,
                event,
            };
            if events.send(timed).is_err() {
                return;
            }
        }
    }
    debug!(session = %session_id, "proctor worker stopped");
}

/// Proctoring sessions keyed by connection.
pub struct ProctorHub {
    config: ProctorConfig,
    sessions: DashMap<String, Arc<ProctorSession>>,
}

impl ProctorHub {
    pub fn new(config: ProctorConfig) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
        }
    }

    pub fn get_or_start(&self, connection: &str) -> Arc<ProctorSession> {
        self.sessions
            .entry(connection.to_string())
            .or_insert_with(|| {
                let session = ProctorSession::start(self.config.clone());
                info!(connection, session = %session.id(), "proctoring started");
                Arc::new(session)
            })
            .clone()
    }

    pub fn get(&self, connection: &str) -> Option<Arc<ProctorSession>> {
        self.sessions.get(connection).map(|s| s.clone())
    }

    /// Stop the connection's session and hand it back so leftover events can
    /// still be drained.
    pub async fn end(&self, connection: &str) -> Result<Arc<ProctorSession>, ProctorError> {
        let (_, session) = self
            .sessions
            .remove(connection)
            .ok_or_else(|| ProctorError::NotFound(connection.to_string()))?;
        session.stop().await;
        info!(
            connection,
            session = %session.id(),
            dropped_frames = session.dropped_frames(),
            "proctoring ended"
        );
        Ok(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
