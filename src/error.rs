//! Error taxonomy for the middleware layer.
//!
//! Every failure from an asynchronous source is converted into an action and
//! folded into state; nothing here is ever fatal to a state machine. The
//! enums form a closed set so callers can match exhaustively instead of
//! parsing strings.

use thiserror::Error;

/// Cause of a transport stream termination (advertising, browsing, or
/// session monitoring ending abnormally).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport terminated: {reason}")]
pub struct TransportError {
    /// Human-readable cause reported by the transport.
    pub reason: String,
}

impl TransportError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Why an outbound invitation did not end with the remote peer joining.
///
/// Timeout is a distinct variant: callers that need to tell "the peer said
/// no" apart from "the peer never answered" can match on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InviteError {
    /// The remote peer explicitly declined.
    #[error("invitation declined by remote peer")]
    Declined,
    /// No resolution arrived within the configured timeout.
    #[error("invitation timed out")]
    TimedOut,
    /// The transport failed while the invitation was in flight.
    #[error("invitation failed: {0}")]
    Transport(String),
}

/// Local failure of a send call.
///
/// This reports the outcome of handing the payload to the transport, not
/// end-to-end delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// A broadcast was requested while no peer is connected.
    #[error("no connected peers")]
    NoConnectedPeers,
    /// The unicast target is not part of the current session.
    #[error("peer is not connected")]
    PeerNotConnected,
    /// The payload could not be encoded for the wire.
    #[error("payload serialization failed")]
    Serialization,
    /// The transport's outbound queue refused the payload.
    #[error("transport busy")]
    TransportBusy,
    /// Any other transport-specific cause.
    #[error("transport send failed: {0}")]
    Transport(String),
}

/// Failure to decode a peer identity from its interchange form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The bytes are not a valid interchange blob.
    #[error("malformed peer identity: {0}")]
    Malformed(String),
    /// The embedded display name does not match the token's canonical name.
    /// Rejected to prevent identity spoofing via mismatched metadata.
    #[error("display name {found:?} does not match canonical name {expected:?}")]
    NameMismatch { expected: String, found: String },
}
