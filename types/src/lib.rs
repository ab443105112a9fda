//! Core domain types for slipway.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. Everything here can be used from any layer of the workspace.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Host & Identity Keys
// ============================================================================

/// Stable identity of a publish destination.
///
/// Hosts mint their own ids at construction time ("github.com", an enterprise
/// domain); the controller treats them as opaque keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostId(String);

impl HostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Stable identity of an account or organization under a host.
///
/// Code hosts key accounts numerically; the value is whatever the host's API
/// reported and is only meaningful within that host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityId(u64);

impl IdentityId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Whether an [`Identity`] is a personal account or an organization.
///
/// Hosts route repository creation differently for the two kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityKind {
    User,
    Organization,
}

/// An account or organization that can own the published repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    /// Display label (the account's login name).
    pub login: String,
    pub kind: IdentityKind,
    pub avatar_url: Option<String>,
    /// Whether this owner's plan allows private repositories.
    pub owns_private: bool,
}

// ============================================================================
// Repository Draft
// ============================================================================

/// Upper bound on repository name length, in Unicode scalar values.
pub const MAX_REPOSITORY_NAME_CHARS: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("repository name has not been entered")]
    MissingName,
    #[error("repository name exceeds {MAX_REPOSITORY_NAME_CHARS} characters")]
    NameTooLong,
}

/// The in-progress, user-edited description of the repository to be created.
///
/// `name` stays `None` until the user (or a seed value) first sets it, which
/// lets downstream validation distinguish "not yet entered" from "entered and
/// empty".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryDraft {
    name: Option<String>,
    description: String,
    keep_private: bool,
}

impl RepositoryDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a draft pre-filled with a default name (typically the local
    /// repository's directory name). An empty seed leaves the draft unnamed.
    #[must_use]
    pub fn seeded(default_name: impl Into<String>) -> Self {
        let default_name = default_name.into();
        Self {
            name: if default_name.is_empty() {
                None
            } else {
                Some(default_name)
            },
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    #[must_use]
    pub const fn keep_private(&self) -> bool {
        self.keep_private
    }

    pub const fn set_keep_private(&mut self, keep_private: bool) {
        self.keep_private = keep_private;
    }

    /// Freeze the draft into a [`PublishRequest`] for the given destination
    /// and owner.
    ///
    /// Fails unless a non-empty name within the length bound has been
    /// entered, so a `PublishRequest` is proof of a publishable draft. Later
    /// edits to the draft do not affect a request frozen earlier.
    pub fn freeze(&self, host: &HostId, owner: &Identity) -> Result<PublishRequest, DraftError> {
        let name = match self.name.as_deref() {
            None | Some("") => return Err(DraftError::MissingName),
            Some(name) => name,
        };
        if name.chars().count() > MAX_REPOSITORY_NAME_CHARS {
            return Err(DraftError::NameTooLong);
        }

        Ok(PublishRequest {
            name: name.to_string(),
            description: self.description.clone(),
            private: self.keep_private,
            owner: owner.clone(),
            host: host.clone(),
        })
    }
}

// ============================================================================
// Publish Request & Result
// ============================================================================

/// A frozen snapshot of a publishable draft.
///
/// Constructed only by [`RepositoryDraft::freeze`]; existence proves the name
/// passed the structural checks at freeze time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    name: String,
    description: String,
    private: bool,
    owner: Identity,
    host: HostId,
}

impl PublishRequest {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub const fn private(&self) -> bool {
        self.private
    }

    #[must_use]
    pub const fn owner(&self) -> &Identity {
        &self.owner
    }

    #[must_use]
    pub const fn host(&self) -> &HostId {
        &self.host
    }
}

/// The repository a successful publish created on the remote host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedRepository {
    /// Qualified name, e.g. `octocat/spoon-knife`.
    pub name_with_owner: String,
    pub clone_url: String,
}

// ============================================================================
// Name Legalization
// ============================================================================

/// Turn an arbitrary typed name into a legal repository name.
///
/// Characters outside `[A-Za-z0-9._-]` are replaced with `-`; a run of
/// replaced characters collapses to a single `-`. Case is preserved. The
/// function is deterministic and idempotent: legal output passes through
/// unchanged.
#[must_use]
pub fn legalize_repository_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut replaced = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            out.push(c);
            replaced = false;
        } else if !replaced {
            out.push('-');
            replaced = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Identity {
        Identity {
            id: IdentityId::new(1),
            login: "octocat".to_string(),
            kind: IdentityKind::User,
            avatar_url: None,
            owns_private: true,
        }
    }

    #[test]
    fn legalize_replaces_illegal_characters() {
        assert_eq!(legalize_repository_name("My Repo"), "My-Repo");
        assert_eq!(legalize_repository_name("hello, world!"), "hello-world-");
        assert_eq!(legalize_repository_name("already-legal_1.0"), "already-legal_1.0");
    }

    #[test]
    fn legalize_collapses_replacement_runs() {
        assert_eq!(legalize_repository_name("My Repo!!"), "My-Repo-");
        assert_eq!(legalize_repository_name("a   b"), "a-b");
    }

    #[test]
    fn legalize_is_idempotent() {
        for raw in ["My Repo!!", "héllo wörld", "...", "a b c", ""] {
            let once = legalize_repository_name(raw);
            assert_eq!(legalize_repository_name(&once), once, "raw: {raw:?}");
        }
    }

    #[test]
    fn seeded_draft_ignores_empty_seed() {
        assert_eq!(RepositoryDraft::seeded("").name(), None);
        assert_eq!(RepositoryDraft::seeded("tip").name(), Some("tip"));
    }

    #[test]
    fn freeze_requires_a_name() {
        let host = HostId::new("github.com");

        let draft = RepositoryDraft::new();
        assert_eq!(draft.freeze(&host, &owner()), Err(DraftError::MissingName));

        let mut draft = RepositoryDraft::new();
        draft.set_name("");
        assert_eq!(draft.freeze(&host, &owner()), Err(DraftError::MissingName));
    }

    #[test]
    fn freeze_bounds_name_length() {
        let host = HostId::new("github.com");
        let mut draft = RepositoryDraft::new();

        draft.set_name("r".repeat(MAX_REPOSITORY_NAME_CHARS));
        assert!(draft.freeze(&host, &owner()).is_ok());

        draft.set_name("r".repeat(MAX_REPOSITORY_NAME_CHARS + 1));
        assert_eq!(draft.freeze(&host, &owner()), Err(DraftError::NameTooLong));
    }

    #[test]
    fn freeze_counts_chars_not_bytes() {
        let host = HostId::new("github.com");
        let mut draft = RepositoryDraft::new();

        // 100 two-byte scalars stay within the bound.
        draft.set_name("é".repeat(MAX_REPOSITORY_NAME_CHARS));
        assert!(draft.freeze(&host, &owner()).is_ok());
    }

    #[test]
    fn freeze_captures_the_whole_draft() {
        let host = HostId::new("github.com");
        let mut draft = RepositoryDraft::seeded("spoon-knife");
        draft.set_description("test repository");
        draft.set_keep_private(true);

        let request = draft.freeze(&host, &owner()).expect("freeze");
        assert_eq!(request.name(), "spoon-knife");
        assert_eq!(request.description(), "test repository");
        assert!(request.private());
        assert_eq!(request.owner().login, "octocat");
        assert_eq!(request.host().as_str(), "github.com");

        // A frozen request is a snapshot, not a live view.
        draft.set_name("renamed");
        assert_eq!(request.name(), "spoon-knife");
    }
}
