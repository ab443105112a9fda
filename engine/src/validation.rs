//! Name validation for the publish form.
//!
//! Two independent layers look at the repository name:
//!
//! - Blocking rules ([`validate_repository_name`]) decide whether publishing
//!   is allowed at all, first violation wins.
//! - The advisory ([`safe_name_warning`]) warns that the host will create
//!   the repository under a normalized name. It never blocks.

use slipway_types::MAX_REPOSITORY_NAME_CHARS;

/// Normalization policy the advisory compares against.
///
/// Supplied by the embedding application;
/// [`slipway_types::legalize_repository_name`] is the usual choice.
pub type NormalizationFn = Box<dyn Fn(&str) -> String + Send + Sync>;

pub(crate) const EMPTY_NAME_MESSAGE: &str = "Please enter a repository name";
pub(crate) const LONG_NAME_MESSAGE: &str =
    "Repository name must be fewer than 100 characters";

/// Blocking verdict on the repository name.
///
/// `Unevaluated` is the never-edited default: publishing is blocked, but no
/// message is shown, so a freshly opened form does not greet the user with
/// an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameVerdict {
    /// No name has ever been entered.
    Unevaluated,
    Valid,
    Invalid(&'static str),
}

impl NameVerdict {
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Message to display. Present only for an explicit rule violation.
    #[must_use]
    pub const fn message(&self) -> Option<&'static str> {
        match self {
            Self::Invalid(message) => Some(message),
            Self::Unevaluated | Self::Valid => None,
        }
    }
}

/// Evaluate the blocking rules in order; the first violated rule supplies
/// the message.
#[must_use]
pub fn validate_repository_name(name: Option<&str>) -> NameVerdict {
    let Some(name) = name else {
        return NameVerdict::Unevaluated;
    };
    if name.is_empty() {
        return NameVerdict::Invalid(EMPTY_NAME_MESSAGE);
    }
    if name.chars().count() > MAX_REPOSITORY_NAME_CHARS {
        return NameVerdict::Invalid(LONG_NAME_MESSAGE);
    }
    NameVerdict::Valid
}

/// Advisory warning that the host will normalize the name on creation.
///
/// `None` when the name is already safe (or absent); otherwise the warning
/// text naming the exact repository that would be created.
#[must_use]
pub fn safe_name_warning(
    name: Option<&str>,
    normalize: &(dyn Fn(&str) -> String + Send + Sync),
) -> Option<String> {
    let name = name?;
    if name.is_empty() {
        return None;
    }
    let normalized = normalize(name);
    if normalized == name {
        None
    } else {
        Some(format!("Will be created as {normalized}"))
    }
}
