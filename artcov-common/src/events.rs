//! Event types for the artcov event system
//!
//! Editing surfaces subscribe to the [`EventBus`] to learn when scores or
//! the aggregate changed and refresh their presentation.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::ids::ArticleId;

/// Change notifications published after a successful edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ModelEvent {
    /// C_nu moved
    AggregateChanged {
        /// New aggregate (`None` when no articles remain)
        c_nu: Option<f64>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Cached scores changed for these articles
    ComputedDataChanged {
        article_ids: Vec<ArticleId>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Subject sequence changed (added, renamed, replaced)
    ///
    /// Column layout may have changed; refresh headers.
    SubjectsChanged {
        subject_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Article sequence changed (added, removed, renamed, reordered)
    ArticlesChanged {
        article_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ModelEvent {
    pub fn aggregate_changed(c_nu: Option<f64>) -> Self {
        Self::AggregateChanged {
            c_nu,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn computed_data_changed(article_ids: Vec<ArticleId>) -> Self {
        Self::ComputedDataChanged {
            article_ids,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn subjects_changed(subject_count: usize) -> Self {
        Self::SubjectsChanged {
            subject_count,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn articles_changed(article_count: usize) -> Self {
        Self::ArticlesChanged {
            article_count,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Short event name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            ModelEvent::AggregateChanged { .. } => "AggregateChanged",
            ModelEvent::ComputedDataChanged { .. } => "ComputedDataChanged",
            ModelEvent::SubjectsChanged { .. } => "SubjectsChanged",
            ModelEvent::ArticlesChanged { .. } => "ArticlesChanged",
        }
    }
}

/// Distribution bus for model change notifications
///
/// Wraps a `tokio::sync::broadcast` channel. Sending never blocks and works
/// without a runtime; receivers poll with `try_recv` or await `recv`.
///
/// # Examples
///
/// ```
/// use artcov_common::events::{EventBus, ModelEvent};
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
///
/// bus.emit(ModelEvent::aggregate_changed(Some(0.5))).ok();
///
/// assert!(matches!(rx.try_recv(), Ok(ModelEvent::AggregateChanged { .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ModelEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per
    /// subscriber before the oldest are dropped
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ModelEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ModelEvent,
    ) -> Result<usize, broadcast::error::SendError<ModelEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ModelEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
