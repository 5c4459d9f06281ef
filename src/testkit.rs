//! Scripted mock transport for unit tests.
//!
//! `MockMesh` implements both collaborator traits. Tests drive it from the
//! outside: push discovery/advertisement events, flip connected peers,
//! resolve or ignore invitations, and inspect what was sent.

use crate::error::{SendError, TransportError};
use crate::identity::Peer;
use crate::transport::{
    AdvertiserEvent, BrowserEvent, ConnectionEvent, DiscoveryInfo, InviteOutcome, InviteResponder,
    MeshDiscovery, MessageEvent, SessionTransport,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

#[derive(Default)]
struct MockState {
    advertiser_tx: Option<mpsc::UnboundedSender<AdvertiserEvent>>,
    browser_tx: Option<mpsc::UnboundedSender<BrowserEvent>>,
    connection_txs: Vec<mpsc::UnboundedSender<ConnectionEvent>>,
    message_txs: Vec<mpsc::UnboundedSender<MessageEvent>>,
    connected: Vec<Peer>,
    pending_invites: Vec<(Peer, oneshot::Sender<InviteOutcome>)>,
    sent: Vec<(Vec<u8>, Option<Peer>)>,
}

/// Scripted in-memory transport double.
#[derive(Default)]
pub struct MockMesh {
    state: Mutex<MockState>,
}

/// Install the test tracing subscriber once per process.
///
/// Output is opt-in: run with `RUST_LOG=peerflow=debug` (or finer) to see
/// the structured middleware events while a test runs.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl MockMesh {
    pub fn new() -> Arc<Self> {
        init_tracing();
        Arc::new(Self::default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Deliver an inbound invitation on the advertisement stream. The
    /// returned channel yields the accept/decline decision once the
    /// middleware invokes the responder.
    pub fn emit_invitation(
        &self,
        peer: Peer,
        context: Option<Vec<u8>>,
    ) -> oneshot::Receiver<bool> {
        let (decision_tx, decision_rx) = oneshot::channel();
        let responder = InviteResponder::new(move |accept, _session| {
            let _ = decision_tx.send(accept);
        });
        let state = self.lock();
        let tx = state
            .advertiser_tx
            .as_ref()
            .expect("advertising not started");
        let _ = tx.send(AdvertiserEvent::InvitationReceived {
            peer,
            context,
            responder,
        });
        decision_rx
    }

    /// Sender feeding the current advertisement stream. Kept across a
    /// restart it lets a test drive the *replaced* stream and assert that
    /// nothing from it is delivered anymore.
    pub fn advertiser_sender(&self) -> mpsc::UnboundedSender<AdvertiserEvent> {
        self.lock()
            .advertiser_tx
            .as_ref()
            .expect("advertising not started")
            .clone()
    }

    /// Sender feeding the current discovery stream; see [`Self::advertiser_sender`].
    pub fn browser_sender(&self) -> mpsc::UnboundedSender<BrowserEvent> {
        self.lock()
            .browser_tx
            .as_ref()
            .expect("browsing not started")
            .clone()
    }

    /// End the advertisement stream, with an error or cleanly.
    pub fn terminate_advertising(&self, error: Option<TransportError>) {
        let mut state = self.lock();
        if let Some(tx) = state.advertiser_tx.take() {
            let _ = tx.send(AdvertiserEvent::Terminated { error });
        }
    }

    pub fn emit_found(&self, peer: Peer, info: Option<DiscoveryInfo>) {
        let state = self.lock();
        if let Some(tx) = &state.browser_tx {
            let _ = tx.send(BrowserEvent::PeerFound { peer, info });
        }
    }

    pub fn emit_lost(&self, peer: Peer) {
        let state = self.lock();
        if let Some(tx) = &state.browser_tx {
            let _ = tx.send(BrowserEvent::PeerLost { peer });
        }
    }

    /// End the discovery stream, with an error or cleanly.
    pub fn terminate_browsing(&self, error: Option<TransportError>) {
        let mut state = self.lock();
        if let Some(tx) = state.browser_tx.take() {
            let _ = tx.send(BrowserEvent::Terminated { error });
        }
    }

    /// Mark a peer connected and notify all connection subscribers.
    pub fn connect_peer(&self, peer: Peer) {
        let mut state = self.lock();
        state.connected.push(peer.clone());
        state
            .connection_txs
            .retain(|tx| tx.send(ConnectionEvent::Connected(peer.clone())).is_ok());
    }

    pub fn emit_connection(&self, event: ConnectionEvent) {
        let mut state = self.lock();
        state.connection_txs.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn emit_message(&self, event: MessageEvent) {
        let mut state = self.lock();
        state.message_txs.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Drop all connection-stream senders, ending those streams.
    pub fn close_connection_streams(&self) {
        self.lock().connection_txs.clear();
    }

    /// Drop all message-stream senders, ending those streams.
    pub fn close_message_streams(&self) {
        self.lock().message_txs.clear();
    }

    /// Resolve a pending outbound invitation. Late resolutions (after a
    /// timeout already fired) are delivered into a dropped channel and
    /// vanish, exactly like a tardy remote answer would.
    pub fn resolve_invite(&self, peer: &Peer, outcome: InviteOutcome) {
        let mut state = self.lock();
        let idx = state
            .pending_invites
            .iter()
            .position(|(p, _)| p == peer)
            .expect("no pending invitation for peer");
        let (_, tx) = state.pending_invites.remove(idx);
        let _ = tx.send(outcome);
    }

    /// Everything handed to `send`, in order.
    pub fn sent_payloads(&self) -> Vec<(Vec<u8>, Option<Peer>)> {
        self.lock().sent.clone()
    }
}

impl MeshDiscovery for MockMesh {
    fn start_advertising(&self) -> mpsc::UnboundedReceiver<AdvertiserEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().advertiser_tx = Some(tx);
        rx
    }

    fn start_browsing(&self) -> mpsc::UnboundedReceiver<BrowserEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().browser_tx = Some(tx);
        rx
    }
}

impl SessionTransport for MockMesh {
    fn connections(&self) -> mpsc::UnboundedReceiver<ConnectionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().connection_txs.push(tx);
        rx
    }

    fn messages(&self) -> mpsc::UnboundedReceiver<MessageEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().message_txs.push(tx);
        rx
    }

    fn invite(
        &self,
        peer: &Peer,
        _context: Option<Vec<u8>>,
        _timeout: Duration,
    ) -> oneshot::Receiver<InviteOutcome> {
        let (tx, rx) = oneshot::channel();
        self.lock().pending_invites.push((peer.clone(), tx));
        rx
    }

    fn send(&self, payload: &[u8], to: Option<&Peer>) -> Result<(), SendError> {
        let mut state = self.lock();
        match to {
            Some(peer) if !state.connected.contains(peer) => {
                return Err(SendError::PeerNotConnected)
            }
            None if state.connected.is_empty() => return Err(SendError::NoConnectedPeers),
            _ => {}
        }
        state.sent.push((payload.to_vec(), to.cloned()));
        Ok(())
    }

    fn connected_peers(&self) -> Vec<Peer> {
        self.lock().connected.clone()
    }
}

/// Await actions on a pipeline tap until one matches the predicate.
pub async fn recv_until<A, F>(tap: &mut broadcast::Receiver<A>, mut matches: F) -> A
where
    A: Clone,
    F: FnMut(&A) -> bool,
{
    loop {
        let action = tap.recv().await.expect("pipeline tap closed");
        if matches(&action) {
            return action;
        }
    }
}
