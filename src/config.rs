//! Centralized configuration constants for peerflow.
//!
//! All tunable parameters live here so they can be reviewed and adjusted
//! in a single place. Transport-level constants (frame formats, radio
//! parameters) belong to the injected transport, not to this layer.

use std::time::Duration;

// ── Invitations ──────────────────────────────────────────────────────────────

/// Default timeout for an outbound invitation.
///
/// If neither an accept nor a decline arrives from the remote peer within
/// this window, the invitation resolves to a declined outcome carrying a
/// timeout reason. Overridable per browser instance.
pub const DEFAULT_INVITE_TIMEOUT: Duration = Duration::from_secs(10);

// ── Pipelines ────────────────────────────────────────────────────────────────

/// Capacity of the broadcast channel that mirrors every action processed by
/// a pipeline to its observers. Observers that fall further behind than this
/// receive a lag notification instead of the missed actions.
pub const ACTION_TAP_CAPACITY: usize = 256;
