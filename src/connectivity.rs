//! Connectivity monitor: raw connection-state stream to lifecycle actions.
//!
//! A pure translation layer with no state beyond its subscription handle.
//! When the underlying stream ends — cleanly or not — a terminal
//! `StoppedMonitoring` is emitted; monitoring resumes only on a new
//! `StartMonitoring` command.

use crate::cancel::StopSignal;
use crate::identity::Peer;
use crate::pipeline::{ActionSender, Middleware, Subscription};
use crate::session::Session;
use crate::transport::ConnectionEvent;
use tracing::debug;

/// Commands and notifications of the connectivity component.
#[derive(Debug, Clone)]
pub enum ConnectivityAction {
    StartMonitoring,
    PeerIsConnecting(Peer),
    PeerConnected(Peer),
    PeerDisconnected(Peer),
    /// The connection stream ended; the cause is not surfaced here, only
    /// the cessation.
    StoppedMonitoring,
}

/// Side-effect handler of the connectivity component.
pub struct ConnectivityMiddleware {
    session: Session,
    monitoring: Option<Subscription>,
}

impl ConnectivityMiddleware {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            monitoring: None,
        }
    }

    fn start_monitoring(&mut self, out: &ActionSender<ConnectivityAction>) {
        let mut events = self.session.connections();
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
                    Some(ConnectionEvent::Connecting(peer)) => {
                        out_fwd.dispatch(ConnectivityAction::PeerIsConnecting(peer));
                    }
                    Some(ConnectionEvent::Connected(peer)) => {
                        out_fwd.dispatch(ConnectivityAction::PeerConnected(peer));
                    }
                    Some(ConnectionEvent::Disconnected(peer)) => {
                        out_fwd.dispatch(ConnectivityAction::PeerDisconnected(peer));
                    }
                    None => {
                        out_fwd.dispatch(ConnectivityAction::StoppedMonitoring);
                        break;
                    }
                }
            }
        });

        self.monitoring = Some(Subscription::new(stop, task));
        debug!(event = "connectivity_monitoring_started", "Connection subscription installed");
    }
}

impl Middleware for ConnectivityMiddleware {
    type Action = ConnectivityAction;
    type State = ();

    fn handle(&mut self, action: &ConnectivityAction, _state: &(), out: &ActionSender<ConnectivityAction>) {
        match action {
            ConnectivityAction::StartMonitoring => self.start_monitoring(out),
            ConnectivityAction::PeerIsConnecting(_)
            | ConnectivityAction::PeerConnected(_)
            | ConnectivityAction::PeerDisconnected(_)
            | ConnectivityAction::StoppedMonitoring => {}
        }
    }
}

/// The connectivity component carries no reducible state.
pub fn connectivity_reducer(_state: &mut (), _action: &ConnectivityAction) {}
