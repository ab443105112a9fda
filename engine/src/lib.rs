//! Reactive controller for the publish-repository workflow.
//!
//! # Architecture
//!
//! [`PublishController`] owns the whole form state for publishing a local
//! repository to a code host: the destination and owner selection, the
//! draft (name, description, privacy), and the derived values a
//! presentation layer renders. Root mutations run a synchronous derived
//! pass, so reads are cheap and never observe a half-updated form.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`controller`] | Root state, derived pass, identity fetch, publish command |
//! | [`validation`] | Blocking name rules and the non-blocking safe-name advisory |
//! | [`events`] | Drainable queue of asynchronous outcomes |
//!
//! # Concurrency
//!
//! The controller is single-threaded and non-blocking. Identity listing and
//! the publish call run in spawned Tokio tasks; the embedding application
//! drives [`PublishController::poll`] from its event loop to apply
//! completions. Identity fetches are last-request-wins: switching
//! destinations supersedes the in-flight fetch, and a stale completion is
//! never applied.
//!
//! # Error Handling
//!
//! A failed publish is recoverable: it is logged and surfaced as a
//! [`PublishFailed`](events::ControllerEvent::PublishFailed) event whose
//! message is the host's own text, verbatim. A panic inside a host
//! implementation is not recoverable and resumes unwinding out of `poll`.

pub mod controller;
pub mod events;
pub mod validation;

pub use controller::PublishController;
pub use events::{ControllerEvent, EventQueue, PublishUserError};
pub use validation::{NameVerdict, NormalizationFn};

pub use slipway_hosts;
pub use slipway_types;
