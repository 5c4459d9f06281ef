//! Injected transport interface: event types and collaborator traits.
//!
//! This module is a pure data layer between the middleware and whatever
//! radio stack actually performs discovery and transmission. Streams are
//! modeled as unbounded channels: the transport pushes events, the
//! middleware forwards them into its action pipeline. A stream that closes
//! without a [`Terminated`] marker counts as a clean stop.
//!
//! [`Terminated`]: AdvertiserEvent::Terminated

use crate::error::{InviteError, SendError, TransportError};
use crate::identity::Peer;
use crate::session::Session;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Key/value metadata a peer attaches to its discovery broadcast.
pub type DiscoveryInfo = HashMap<String, String>;

// ── Advertisement stream ─────────────────────────────────────────────────────

/// Events delivered while this node is advertising itself as discoverable.
pub enum AdvertiserEvent {
    /// A remote peer invited us to join its session. The responder must be
    /// invoked exactly once; it is a move-only token, so the type system
    /// enforces that.
    InvitationReceived {
        peer: Peer,
        context: Option<Vec<u8>>,
        responder: InviteResponder,
    },
    /// The advertisement ended. `error` is `None` for a clean stop.
    Terminated { error: Option<TransportError> },
}

impl fmt::Debug for AdvertiserEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvitationReceived { peer, context, .. } => f
                .debug_struct("InvitationReceived")
                .field("peer", peer)
                .field("context", context)
                .finish_non_exhaustive(),
            Self::Terminated { error } => {
                f.debug_struct("Terminated").field("error", error).finish()
            }
        }
    }
}

/// One-shot accept/decline handle for an inbound invitation.
///
/// Consuming `self` makes a second invocation unrepresentable. The session
/// handle is passed along so an accepting transport can bind the inviting
/// peer into the live session.
pub struct InviteResponder {
    respond: Box<dyn FnOnce(bool, &Session) + Send>,
}

impl InviteResponder {
    pub fn new(respond: impl FnOnce(bool, &Session) + Send + 'static) -> Self {
        Self {
            respond: Box::new(respond),
        }
    }

    /// Deliver the accept/decline decision to the transport.
    pub fn respond(self, accept: bool, session: &Session) {
        (self.respond)(accept, session);
    }
}

// ── Discovery stream ─────────────────────────────────────────────────────────

/// Events delivered while this node is browsing for discoverable peers.
///
/// Found/lost are edge notifications in transport delivery order. This
/// layer performs no de-duplication and no found-before-lost validation.
#[derive(Debug)]
pub enum BrowserEvent {
    PeerFound {
        peer: Peer,
        info: Option<DiscoveryInfo>,
    },
    PeerLost {
        peer: Peer,
    },
    /// Discovery ended. `error` is `None` for a clean stop.
    Terminated {
        error: Option<TransportError>,
    },
}

// ── Session streams ──────────────────────────────────────────────────────────

/// Raw per-peer connection-state transitions from the session.
///
/// Per-peer ordering (connecting before connected) is inherited from the
/// transport; no ordering holds across distinct peers.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Connecting(Peer),
    Connected(Peer),
    Disconnected(Peer),
}

/// Inbound traffic from the session.
///
/// Only [`MessageEvent::Data`] is surfaced by the messaging layer; the
/// resource-transfer and stream kinds exist so transports can report them
/// and the middleware can explicitly ignore them.
#[derive(Debug, Clone)]
pub enum MessageEvent {
    Data { payload: Vec<u8>, from: Peer },
    ResourceStarted { name: String, from: Peer },
    ResourceFinished { name: String, from: Peer },
    Stream { name: String, from: Peer },
}

/// Eventual resolution of an outbound invitation.
#[derive(Debug, Clone)]
pub enum InviteOutcome {
    Accepted(Peer),
    Declined { peer: Peer, error: InviteError },
}

// ── Collaborator traits ──────────────────────────────────────────────────────

/// Discovery side of the transport: advertisement and browsing lifecycles.
///
/// Each call starts a fresh transport-level activity and returns the stream
/// of its events; dropping the receiver is how the middleware abandons it.
pub trait MeshDiscovery: Send + Sync + 'static {
    /// Begin broadcasting this node as discoverable.
    fn start_advertising(&self) -> mpsc::UnboundedReceiver<AdvertiserEvent>;

    /// Begin searching for discoverable peers.
    fn start_browsing(&self) -> mpsc::UnboundedReceiver<BrowserEvent>;
}

/// Session side of the transport: connection state, messages, invitations,
/// and transmission.
///
/// `connections()` and `messages()` return an independent subscription per
/// call — every subscriber receives its own copy of every event.
pub trait SessionTransport: Send + Sync + 'static {
    fn connections(&self) -> mpsc::UnboundedReceiver<ConnectionEvent>;

    fn messages(&self) -> mpsc::UnboundedReceiver<MessageEvent>;

    /// Issue an invitation to a discovered peer. The timeout is advisory
    /// context for the transport; the browser races its own timer and does
    /// not rely on the transport honoring it.
    fn invite(
        &self,
        peer: &Peer,
        context: Option<Vec<u8>>,
        timeout: Duration,
    ) -> oneshot::Receiver<InviteOutcome>;

    /// Hand a payload to the transport for transmission. `to` is `None` for
    /// broadcast. The result reports the local enqueue outcome only.
    fn send(&self, payload: &[u8], to: Option<&Peer>) -> Result<(), SendError>;

    /// Peers currently part of the session.
    fn connected_peers(&self) -> Vec<Peer>;
}
