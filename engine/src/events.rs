//! Asynchronous outcomes surfaced to the presentation layer.
//!
//! The controller's async work (identity fetches, the publish call) completes
//! inside [`poll`](crate::PublishController::poll); outcomes the embedding
//! application should react to are queued here and drained once per tick.

use slipway_types::PublishedRepository;

/// User-facing error object for a failed publish.
///
/// `message` is the host's own explanation, verbatim (e.g. "name already
/// exists on this account"). A presentation layer shows it as a dismissible
/// error; the workflow stays usable for a retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishUserError {
    pub message: String,
}

/// An asynchronous outcome the presentation layer should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// The identity list for the current destination arrived.
    IdentitiesLoaded,
    /// The identity fetch for the current destination failed. The list stays
    /// empty; the user may retry by re-selecting a destination.
    IdentityFetchFailed { message: String },
    /// Publish completed; the repository now exists on the remote.
    PublishSucceeded(PublishedRepository),
    /// Publish failed recoverably.
    PublishFailed(PublishUserError),
}

/// Queue of pending controller events.
///
/// Events accumulate during `poll` and are drained by the presentation
/// layer with `take`, in the order they occurred.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Vec<ControllerEvent>,
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ControllerEvent) {
        self.pending.push(event);
    }

    /// Take all pending events, clearing the queue.
    pub fn take(&mut self) -> Vec<ControllerEvent> {
        std::mem::take(&mut self.pending)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
