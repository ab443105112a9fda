//! The publish-workflow controller.

use std::sync::Arc;

use futures_util::FutureExt;
use slipway_hosts::{HostError, RepositoryHost};
use slipway_types::{HostId, Identity, IdentityId, PublishedRepository, RepositoryDraft};
use tokio::task::JoinHandle;

use crate::events::{ControllerEvent, EventQueue, PublishUserError};
use crate::validation::{self, NameVerdict, NormalizationFn};

const DEFAULT_TITLE: &str = "Publish repository";

/// An in-flight identity fetch, tagged with the destination it was issued
/// for. A completion is applied only if the tag still matches the current
/// selection (last-request-wins).
struct IdentityFetch {
    host: HostId,
    handle: JoinHandle<Result<Vec<Identity>, HostError>>,
}

/// The reactive form model for publishing a repository.
///
/// Owns the draft, the destination and owner selection, and every derived
/// value a presentation layer renders. Root mutations run a synchronous
/// derived pass before returning, so reads never observe a half-updated
/// form. Asynchronous work runs in spawned tasks; drive [`poll`] from the
/// application's event loop and drain [`take_events`] afterwards.
///
/// Must be constructed and driven on a task inside a Tokio runtime.
///
/// [`poll`]: PublishController::poll
/// [`take_events`]: PublishController::take_events
pub struct PublishController {
    hosts: Vec<Arc<dyn RepositoryHost>>,
    normalize: NormalizationFn,

    // Root state.
    draft: RepositoryDraft,
    selected_host: Option<usize>,
    identities: Vec<Identity>,
    selected_identity: Option<IdentityId>,

    // Derived state, rewritten by `refresh_derived`.
    title: String,
    name_verdict: NameVerdict,
    safe_name_warning: Option<String>,

    // Async slots.
    fetch: Option<IdentityFetch>,
    publishing: Option<JoinHandle<Result<PublishedRepository, HostError>>>,

    events: EventQueue,
}

impl PublishController {
    /// Build a controller over an already-authenticated destination list.
    ///
    /// The first destination (if any) is auto-selected and its identity
    /// fetch starts immediately. `default_name` seeds the draft, typically
    /// with the local repository's directory name; an empty seed leaves the
    /// name unentered.
    #[must_use]
    pub fn new(
        hosts: Vec<Arc<dyn RepositoryHost>>,
        default_name: impl Into<String>,
        normalize: NormalizationFn,
    ) -> Self {
        let mut controller = Self {
            hosts,
            normalize,
            draft: RepositoryDraft::seeded(default_name),
            selected_host: None,
            identities: Vec::new(),
            selected_identity: None,
            title: DEFAULT_TITLE.to_string(),
            name_verdict: NameVerdict::Unevaluated,
            safe_name_warning: None,
            fetch: None,
            publishing: None,
            events: EventQueue::new(),
        };
        if !controller.hosts.is_empty() {
            controller.select_host_index(0);
        }
        controller.refresh_derived();
        controller
    }

    // ------------------------------------------------------------------
    // Destinations
    // ------------------------------------------------------------------

    #[must_use]
    pub fn hosts(&self) -> &[Arc<dyn RepositoryHost>] {
        &self.hosts
    }

    #[must_use]
    pub fn selected_host(&self) -> Option<&Arc<dyn RepositoryHost>> {
        self.selected_host.map(|index| &self.hosts[index])
    }

    /// Whether a destination picker should be shown; with zero or one
    /// destination there is nothing to pick.
    #[must_use]
    pub fn host_picker_visible(&self) -> bool {
        self.hosts.len() > 1
    }

    /// Select a destination by id.
    ///
    /// Re-selecting the current destination is a no-op. Otherwise the
    /// identity list and owner selection are cleared immediately (they
    /// belong to the old destination) and a fetch for the new destination
    /// starts, superseding any fetch still in flight.
    pub fn select_host(&mut self, id: &HostId) {
        if self.selected_host().is_some_and(|host| host.id() == id) {
            return;
        }
        let Some(index) = self.hosts.iter().position(|host| host.id() == id) else {
            tracing::debug!(host = %id, "ignoring selection of unknown destination");
            return;
        };
        self.select_host_index(index);
        self.refresh_derived();
    }

    fn select_host_index(&mut self, index: usize) {
        self.selected_host = Some(index);
        self.identities.clear();
        self.selected_identity = None;

        let host = Arc::clone(&self.hosts[index]);
        let id = host.id().clone();
        let handle = tokio::spawn(async move { host.identities().await });
        self.fetch = Some(IdentityFetch { host: id, handle });
    }

    // ------------------------------------------------------------------
    // Identities
    // ------------------------------------------------------------------

    #[must_use]
    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    #[must_use]
    pub fn selected_identity(&self) -> Option<&Identity> {
        let id = self.selected_identity?;
        self.identities.iter().find(|identity| identity.id == id)
    }

    /// Select an owner from the current identity list.
    ///
    /// An id not in the list is ignored: the selection is always a member
    /// of the list for the current destination.
    pub fn select_identity(&mut self, id: IdentityId) {
        if self.identities.iter().any(|identity| identity.id == id) {
            self.selected_identity = Some(id);
        } else {
            tracing::debug!(identity = %id, "ignoring selection of unknown identity");
        }
    }

    // ------------------------------------------------------------------
    // Draft
    // ------------------------------------------------------------------

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.draft.name()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.draft.name() == Some(name.as_str()) {
            return;
        }
        self.draft.set_name(name);
        self.refresh_derived();
    }

    #[must_use]
    pub fn description(&self) -> &str {
        self.draft.description()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.draft.set_description(description);
    }

    #[must_use]
    pub fn keep_private(&self) -> bool {
        self.draft.keep_private()
    }

    pub fn set_keep_private(&mut self, keep_private: bool) {
        self.draft.set_keep_private(keep_private);
    }

    // ------------------------------------------------------------------
    // Derived values
    // ------------------------------------------------------------------

    /// Window title for the workflow, destination-specific once one is
    /// selected.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Blocking verdict on the repository name.
    #[must_use]
    pub fn name_verdict(&self) -> NameVerdict {
        self.name_verdict
    }

    /// Advisory warning that the name will be normalized on creation.
    /// Never blocks publishing.
    #[must_use]
    pub fn safe_name_warning(&self) -> Option<&str> {
        self.safe_name_warning.as_deref()
    }

    /// Whether the privacy toggle should be enabled: the selected owner's
    /// plan must allow private repositories, and no publish may be in
    /// flight.
    #[must_use]
    pub fn can_keep_private(&self) -> bool {
        !self.is_publishing()
            && self
                .selected_identity()
                .is_some_and(|identity| identity.owns_private)
    }

    /// The publish command's gating predicate: name valid, a destination
    /// and owner selected, and no publish already running.
    #[must_use]
    pub fn can_publish(&self) -> bool {
        self.name_verdict.is_valid()
            && !self.is_publishing()
            && self.selected_host.is_some()
            && self.selected_identity().is_some()
    }

    #[must_use]
    pub fn is_publishing(&self) -> bool {
        self.publishing.is_some()
    }

    /// Recompute every synchronously derived value, upstream first. Runs
    /// after each root mutation; cheap enough to be unconditional.
    fn refresh_derived(&mut self) {
        self.title = match self.selected_host() {
            Some(host) => format!("{DEFAULT_TITLE} to {}", host.title()),
            None => DEFAULT_TITLE.to_string(),
        };
        self.name_verdict = validation::validate_repository_name(self.draft.name());
        self.safe_name_warning =
            validation::safe_name_warning(self.draft.name(), &*self.normalize);
    }

    // ------------------------------------------------------------------
    // Publish command
    // ------------------------------------------------------------------

    /// Invoke the publish command.
    ///
    /// A no-op unless [`can_publish`](Self::can_publish) holds; invoking a
    /// non-invokable command is an interface contract, not an error. The
    /// draft is frozen into a snapshot at this point: later edits do not
    /// affect the in-flight call.
    pub fn publish(&mut self) {
        if !self.can_publish() {
            return;
        }
        // Gating just verified both selections and the name.
        let Some(host) = self.selected_host() else { return };
        let Some(owner) = self.selected_identity() else { return };
        let request = match self.draft.freeze(host.id(), owner) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("draft not publishable: {e}");
                return;
            }
        };

        tracing::info!(host = %host.id(), owner = %owner.login, name = request.name(), "publishing repository");
        let host = Arc::clone(host);
        self.publishing = Some(tokio::spawn(async move { host.publish(&request).await }));
    }

    // ------------------------------------------------------------------
    // Event loop integration
    // ------------------------------------------------------------------

    /// Apply finished asynchronous work. Non-blocking; call once per tick.
    ///
    /// A panic inside a host implementation resumes unwinding here — it is
    /// not converted into a user-facing error.
    pub fn poll(&mut self) {
        self.poll_identity_fetch();
        self.poll_publish();
    }

    /// Drain the events produced by completed asynchronous work.
    pub fn take_events(&mut self) -> Vec<ControllerEvent> {
        self.events.take()
    }

    fn poll_identity_fetch(&mut self) {
        if !self.fetch.as_ref().is_some_and(|f| f.handle.is_finished()) {
            return;
        }
        let Some(fetch) = self.fetch.take() else { return };

        // Starting a new fetch replaces the slot, so a mismatched tag can
        // only mean the selection changed under a finished-but-unapplied
        // fetch. Discard it; the replacement fetch is already running.
        if self.selected_host().map(|host| host.id()) != Some(&fetch.host) {
            tracing::debug!(host = %fetch.host, "discarding stale identity fetch");
            return;
        }

        // `is_finished` held, so the handle resolves immediately.
        match fetch.handle.now_or_never() {
            Some(Ok(Ok(identities))) => self.apply_identities(identities),
            Some(Ok(Err(e))) => {
                tracing::warn!(host = %fetch.host, "identity fetch failed: {e}");
                self.events.push(ControllerEvent::IdentityFetchFailed {
                    message: e.to_string(),
                });
            }
            Some(Err(e)) => {
                if e.is_panic() {
                    std::panic::resume_unwind(e.into_panic());
                }
                tracing::debug!(host = %fetch.host, "identity fetch cancelled");
            }
            None => {
                tracing::debug!(host = %fetch.host, "identity fetch not ready after is_finished");
            }
        }
    }

    fn apply_identities(&mut self, identities: Vec<Identity>) {
        self.identities = identities;
        // Default-owner policy: first of a non-empty list when nothing is
        // selected. Reacts to list changes, not destination changes, so a
        // refresh that drops the selected owner re-defaults too.
        if self.selected_identity().is_none() {
            self.selected_identity = self.identities.first().map(|identity| identity.id);
        }
        self.events.push(ControllerEvent::IdentitiesLoaded);
    }

    fn poll_publish(&mut self) {
        if !self.publishing.as_ref().is_some_and(JoinHandle::is_finished) {
            return;
        }
        let Some(handle) = self.publishing.take() else { return };

        match handle.now_or_never() {
            Some(Ok(Ok(repository))) => {
                tracing::info!(repository = repository.name_with_owner, "publish succeeded");
                self.events.push(ControllerEvent::PublishSucceeded(repository));
            }
            Some(Ok(Err(e))) => {
                tracing::error!("publish failed: {e}");
                self.events.push(ControllerEvent::PublishFailed(PublishUserError {
                    message: e.to_string(),
                }));
            }
            Some(Err(e)) => {
                if e.is_panic() {
                    std::panic::resume_unwind(e.into_panic());
                }
                tracing::debug!("publish task cancelled");
            }
            None => {
                tracing::debug!("publish task not ready after is_finished");
            }
        }
    }
}

impl std::fmt::Debug for PublishController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishController")
            .field("selected_host", &self.selected_host().map(|h| h.id().clone()))
            .field("selected_identity", &self.selected_identity)
            .field("identities", &self.identities.len())
            .field("name_verdict", &self.name_verdict)
            .field("publishing", &self.is_publishing())
            .finish_non_exhaustive()
    }
}
