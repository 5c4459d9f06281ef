//! Shared session handle.
//!
//! Exactly one `Session` exists per active participation in the mesh. It is
//! cloned into every middleware component: connection and message streams
//! are session-scoped, so all components observe the same underlying
//! transport session, each through its own subscription.

use crate::error::SendError;
use crate::identity::Peer;
use crate::transport::{ConnectionEvent, InviteOutcome, MessageEvent, SessionTransport};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Cloneable handle to the live connectivity session.
#[derive(Clone)]
pub struct Session {
    transport: Arc<dyn SessionTransport>,
}

impl Session {
    pub fn new(transport: Arc<dyn SessionTransport>) -> Self {
        Self { transport }
    }

    /// Subscribe to per-peer connection-state transitions.
    ///
    /// Every call returns an independent subscription with its own copy of
    /// every event.
    pub fn connections(&self) -> mpsc::UnboundedReceiver<ConnectionEvent> {
        self.transport.connections()
    }

    /// Subscribe to inbound session traffic.
    pub fn messages(&self) -> mpsc::UnboundedReceiver<MessageEvent> {
        self.transport.messages()
    }

    /// Issue an invitation to a peer. Resolution arrives on the returned
    /// channel; a dropped sender counts as a transport failure.
    pub fn invite(
        &self,
        peer: &Peer,
        context: Option<Vec<u8>>,
        timeout: Duration,
    ) -> oneshot::Receiver<InviteOutcome> {
        self.transport.invite(peer, context, timeout)
    }

    /// Unicast a payload to one connected peer.
    pub fn send_to(&self, payload: &[u8], peer: &Peer) -> Result<(), SendError> {
        self.transport.send(payload, Some(peer))
    }

    /// Broadcast a payload to all connected peers.
    pub fn broadcast(&self, payload: &[u8]) -> Result<(), SendError> {
        self.transport.send(payload, None)
    }

    /// Peers currently part of the session.
    pub fn connected_peers(&self) -> Vec<Peer> {
        self.transport.connected_peers()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("connected_peers", &self.transport.connected_peers().len())
            .finish()
    }
}
