//! Browser state machine: peer discovery and outbound invitations.
//!
//! `StartBrowsing` installs the discovery subscription; found/lost
//! notifications are forwarded in transport order with no de-duplication.
//! Invitations — manual or issued by the auto-invite policy — each race a
//! timer against the transport resolution, so an unanswered invite always
//! resolves instead of hanging.

use crate::cancel::StopSignal;
use crate::config::DEFAULT_INVITE_TIMEOUT;
use crate::error::{InviteError, TransportError};
use crate::identity::Peer;
use crate::pipeline::{ActionSender, Middleware, Subscription};
use crate::session::Session;
use crate::transport::{BrowserEvent, DiscoveryInfo, MeshDiscovery};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// ── Actions ──────────────────────────────────────────────────────────────────

/// Commands and notifications of the browser component.
#[derive(Debug, Clone)]
pub enum BrowserAction {
    StartBrowsing,
    StopBrowsing,
    /// Invite a discovered peer by hand, bypassing the auto-invite policy.
    ManuallyInvite(Peer),
    StartedBrowsing,
    StoppedBrowsing,
    StoppedBrowsingWithError(TransportError),
    /// Edge notification in transport order; consumers own the peer set.
    FoundPeer {
        peer: Peer,
        info: Option<DiscoveryInfo>,
    },
    LostPeer(Peer),
    /// Emitted synchronously when an invitation is issued, before any
    /// resolution.
    DidSendInvitation(Peer),
    RemoteAcceptedInvitation(Peer),
    /// Decline, transport failure, and timeout all land here; the error
    /// tags which one it was.
    RemoteDeclinedInvitation {
        peer: Peer,
        error: InviteError,
    },
}

// ── State ────────────────────────────────────────────────────────────────────

/// Discovery lifecycle state. The set of currently visible peers is not
/// tracked here — found/lost are edge events against the consumer's own
/// set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowserState {
    #[default]
    Stopped,
    Browsing,
}

// ── Auto-invite policy ───────────────────────────────────────────────────────

/// Predicate deciding whether a newly found peer is invited automatically.
#[derive(Clone, Default)]
pub enum AutoInvitePolicy {
    #[default]
    Always,
    Never,
    Custom(Arc<dyn Fn(&Peer, Option<&DiscoveryInfo>) -> bool + Send + Sync>),
}

impl AutoInvitePolicy {
    pub fn should_invite(&self, peer: &Peer, info: Option<&DiscoveryInfo>) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Custom(decide) => decide(peer, info),
        }
    }
}

impl fmt::Debug for AutoInvitePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("Always"),
            Self::Never => f.write_str("Never"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Side-effect handler of the browser component.
///
/// Owns at most one discovery subscription plus one in-flight invitation
/// per peer. Invitation guards leave the tracking map as soon as their
/// resolution action is processed, so the map stays bounded.
pub struct BrowserMiddleware {
    discovery: Arc<dyn MeshDiscovery>,
    session: Session,
    auto_invite: AutoInvitePolicy,
    timeout: Duration,
    browsing: Option<Subscription>,
    invitations: HashMap<Peer, Subscription>,
}

impl BrowserMiddleware {
    pub fn new(discovery: Arc<dyn MeshDiscovery>, session: Session) -> Self {
        Self {
            discovery,
            session,
            auto_invite: AutoInvitePolicy::default(),
            timeout: DEFAULT_INVITE_TIMEOUT,
            browsing: None,
            invitations: HashMap::new(),
        }
    }

    pub fn with_auto_invite(mut self, auto_invite: AutoInvitePolicy) -> Self {
        self.auto_invite = auto_invite;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn start_browsing(&mut self, out: &ActionSender<BrowserAction>) {
        let mut events = self.discovery.start_browsing();
        let stop = StopSignal::new();
        let forwarder_stop = stop.clone();
        let out_fwd = out.clone();

        let task = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = forwarder_stop.wait() => break,
                    ev = events.recv() => ev,
                };
                match event {
                    Some(BrowserEvent::PeerFound { peer, info }) => {
                        out_fwd.dispatch(BrowserAction::FoundPeer { peer, info });
                    }
                    Some(BrowserEvent::PeerLost { peer }) => {
                        out_fwd.dispatch(BrowserAction::LostPeer(peer));
                    }
                    Some(BrowserEvent::Terminated { error: Some(e) }) => {
                        warn!(event = "browsing_failed", error = %e, "Discovery stream failed");
                        out_fwd.dispatch(BrowserAction::StoppedBrowsingWithError(e));
                        break;
                    }
                    Some(BrowserEvent::Terminated { error: None }) | None => {
                        out_fwd.dispatch(BrowserAction::StoppedBrowsing);
                        break;
                    }
                }
            }
        });

        self.browsing = Some(Subscription::new(stop, task));
        debug!(event = "browsing_started", "Discovery subscription installed");
        out.dispatch(BrowserAction::StartedBrowsing);
    }

    fn stop_browsing(&mut self) {
        if self.browsing.take().is_some() {
            debug!(event = "browsing_cancelled", "Discovery subscription dropped");
        }
    }

    /// Issue an invitation and track its resolution race.
    ///
    /// The `DidSendInvitation` notification is dispatched synchronously;
    /// exactly one resolution action follows later — real resolution or
    /// timeout, whichever fires first. A second invite to the same peer
    /// replaces (and cancels) the in-flight one.
    fn invite(&mut self, peer: &Peer, out: &ActionSender<BrowserAction>) {
        let resolution = self.session.invite(peer, None, self.timeout);
        let stop = StopSignal::new();
        let race_stop = stop.clone();
        let out_race = out.clone();
        let timeout = self.timeout;
        let invited = peer.clone();

        let task = tokio::spawn(async move {
            let action = tokio::select! {
                biased;
                _ = race_stop.wait() => return,
                res = resolution => match res {
                    Ok(crate::transport::InviteOutcome::Accepted(peer)) => {
                        BrowserAction::RemoteAcceptedInvitation(peer)
                    }
                    Ok(crate::transport::InviteOutcome::Declined { peer, error }) => {
                        BrowserAction::RemoteDeclinedInvitation { peer, error }
                    }
                    Err(_) => BrowserAction::RemoteDeclinedInvitation {
                        peer: invited,
                        error: InviteError::Transport("resolution channel closed".into()),
                    },
                },
                _ = tokio::time::sleep(timeout) => BrowserAction::RemoteDeclinedInvitation {
                    peer: invited,
                    error: InviteError::TimedOut,
                },
            };
            out_race.dispatch(action);
        });

        self.invitations
            .insert(peer.clone(), Subscription::new(stop, task));
        info!(event = "invitation_sent", peer = %peer, "Invitation issued");
        out.dispatch(BrowserAction::DidSendInvitation(peer.clone()));
    }

    fn resolve_invitation(&mut self, peer: &Peer) {
        self.invitations.remove(peer);
    }
}

impl Middleware for BrowserMiddleware {
    type Action = BrowserAction;
    type State = BrowserState;

    fn handle(
        &mut self,
        action: &BrowserAction,
        _state: &BrowserState,
        out: &ActionSender<BrowserAction>,
    ) {
        match action {
            BrowserAction::StartBrowsing => self.start_browsing(out),
            BrowserAction::StopBrowsing => self.stop_browsing(),
            BrowserAction::ManuallyInvite(peer) => self.invite(peer, out),
            BrowserAction::FoundPeer { peer, info } => {
                if self.auto_invite.should_invite(peer, info.as_ref()) {
                    self.invite(peer, out);
                }
            }
            BrowserAction::RemoteAcceptedInvitation(peer) => self.resolve_invitation(peer),
            BrowserAction::RemoteDeclinedInvitation { peer, .. } => self.resolve_invitation(peer),
            BrowserAction::LostPeer(_)
            | BrowserAction::StartedBrowsing
            | BrowserAction::StoppedBrowsing
            | BrowserAction::StoppedBrowsingWithError(_)
            | BrowserAction::DidSendInvitation(_) => {}
        }
    }
}

// ── Reducer ──────────────────────────────────────────────────────────────────

/// Pure fold of browser notifications into lifecycle state.
pub fn browser_reducer(state: &mut BrowserState, action: &BrowserAction) {
    match action {
        BrowserAction::StartedBrowsing => *state = BrowserState::Browsing,
        BrowserAction::StoppedBrowsing | BrowserAction::StoppedBrowsingWithError(_) => {
            *state = BrowserState::Stopped
        }
        _ => {}
    }
}
