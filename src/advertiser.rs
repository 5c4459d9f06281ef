//! Advertiser state machine: discoverability lifecycle and inbound
//! invitation policy.
//!
//! `StartAdvertising` installs the advertisement subscription; inbound
//! invitations are answered through the injected acceptance policy; the
//! reducer folds lifecycle notifications into
//! `Stopped / Advertising / Error`.

use crate::cancel::StopSignal;
use crate::error::TransportError;
use crate::identity::Peer;
use crate::pipeline::{ActionSender, Middleware, Subscription};
use crate::session::Session;
use crate::transport::{AdvertiserEvent, MeshDiscovery};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ── Actions ──────────────────────────────────────────────────────────────────

/// Commands and notifications of the advertiser component.
///
/// `StartAdvertising` / `StopAdvertising` are caller commands; everything
/// else is emitted by the middleware and folded by [`advertiser_reducer`].
#[derive(Debug, Clone)]
pub enum AdvertiserAction {
    StartAdvertising,
    StopAdvertising,
    StartedAdvertising,
    StoppedAdvertising,
    StoppedAdvertisingWithError(TransportError),
    /// A remote peer invited us; emitted before the policy decision.
    Invited {
        peer: Peer,
        context: Option<Vec<u8>>,
    },
    AcceptedInvitation {
        peer: Peer,
        context: Option<Vec<u8>>,
    },
    DeclinedInvitation {
        peer: Peer,
        context: Option<Vec<u8>>,
    },
}

// ── State ────────────────────────────────────────────────────────────────────

/// Advertisement lifecycle state. Only the reducer transitions it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AdvertiserState {
    #[default]
    Stopped,
    Advertising,
    /// The advertisement stream failed; restarting is allowed.
    Error(TransportError),
}

// ── Acceptance policy ────────────────────────────────────────────────────────

/// Predicate deciding whether to accept an inbound invitation.
#[derive(Clone, Default)]
pub enum AcceptancePolicy {
    #[default]
    Always,
    Never,
    Custom(Arc<dyn Fn(&Peer, Option<&[u8]>) -> bool + Send + Sync>),
}

impl AcceptancePolicy {
    pub fn should_accept(&self, peer: &Peer, context: Option<&[u8]>) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Custom(decide) => decide(peer, context),
        }
    }
}

impl fmt::Debug for AcceptancePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("Always"),
            Self::Never => f.write_str("Never"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Side-effect handler of the advertiser component.
///
/// Owns at most one live advertisement subscription; starting while already
/// advertising replaces (and cancels) the previous one.
pub struct AdvertiserMiddleware {
    discovery: Arc<dyn MeshDiscovery>,
    session: Session,
    acceptance: AcceptancePolicy,
    advertisement: Option<Subscription>,
}

impl AdvertiserMiddleware {
    pub fn new(discovery: Arc<dyn MeshDiscovery>, session: Session) -> Self {
        Self {
            discovery,
            session,
            acceptance: AcceptancePolicy::default(),
            advertisement: None,
        }
    }

    pub fn with_acceptance(mut self, acceptance: AcceptancePolicy) -> Self {
        self.acceptance = acceptance;
        self
    }

    fn start_advertising(&mut self, out: &ActionSender<AdvertiserAction>) {
        let mut events = self.discovery.start_advertising();
        let stop = StopSignal::new();
        let forwarder_stop = stop.clone();
        let out_fwd = out.clone();
        let session = self.session.clone();
        let acceptance = self.acceptance.clone();

        let task = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = forwarder_stop.wait() => break,
                    ev = events.recv() => ev,
                };
                match event {
                    Some(AdvertiserEvent::InvitationReceived {
                        peer,
                        context,
                        responder,
                    }) => {
                        out_fwd.dispatch(AdvertiserAction::Invited {
                            peer: peer.clone(),
                            context: context.clone(),
                        });
                        let accepted = acceptance.should_accept(&peer, context.as_deref());
                        responder.respond(accepted, &session);
                        info!(
                            event = "invitation_answered",
                            peer = %peer,
                            accepted,
                            "Answered inbound invitation"
                        );
                        out_fwd.dispatch(if accepted {
                            AdvertiserAction::AcceptedInvitation { peer, context }
                        } else {
                            AdvertiserAction::DeclinedInvitation { peer, context }
                        });
                    }
                    Some(AdvertiserEvent::Terminated { error: Some(e) }) => {
                        warn!(
                            event = "advertisement_failed",
                            error = %e,
                            "Advertisement stream failed"
                        );
                        out_fwd.dispatch(AdvertiserAction::StoppedAdvertisingWithError(e));
                        break;
                    }
                    Some(AdvertiserEvent::Terminated { error: None }) | None => {
                        out_fwd.dispatch(AdvertiserAction::StoppedAdvertising);
                        break;
                    }
                }
            }
        });

        // Replacing the guard cancels any previous advertisement.
        self.advertisement = Some(Subscription::new(stop, task));
        debug!(event = "advertisement_started", "Advertisement subscription installed");
        out.dispatch(AdvertiserAction::StartedAdvertising);
    }

    fn stop_advertising(&mut self) {
        if self.advertisement.take().is_some() {
            debug!(event = "advertisement_cancelled", "Advertisement subscription dropped");
        }
    }
}

impl Middleware for AdvertiserMiddleware {
    type Action = AdvertiserAction;
    type State = AdvertiserState;

    fn handle(
        &mut self,
        action: &AdvertiserAction,
        _state: &AdvertiserState,
        out: &ActionSender<AdvertiserAction>,
    ) {
        match action {
            AdvertiserAction::StartAdvertising => self.start_advertising(out),
            AdvertiserAction::StopAdvertising => self.stop_advertising(),
            AdvertiserAction::StartedAdvertising
            | AdvertiserAction::StoppedAdvertising
            | AdvertiserAction::StoppedAdvertisingWithError(_)
            | AdvertiserAction::Invited { .. }
            | AdvertiserAction::AcceptedInvitation { .. }
            | AdvertiserAction::DeclinedInvitation { .. } => {}
        }
    }
}

// ── Reducer ──────────────────────────────────────────────────────────────────

/// Pure fold of advertiser notifications into lifecycle state.
pub fn advertiser_reducer(state: &mut AdvertiserState, action: &AdvertiserAction) {
    match action {
        AdvertiserAction::StartedAdvertising => *state = AdvertiserState::Advertising,
        AdvertiserAction::StoppedAdvertising => *state = AdvertiserState::Stopped,
        AdvertiserAction::StoppedAdvertisingWithError(e) => {
            *state = AdvertiserState::Error(e.clone())
        }
        AdvertiserAction::StartAdvertising
        | AdvertiserAction::StopAdvertising
        | AdvertiserAction::Invited { .. }
        | AdvertiserAction::AcceptedInvitation { .. }
        | AdvertiserAction::DeclinedInvitation { .. } => {}
    }
}
