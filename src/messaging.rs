//! Messaging channel: opaque payloads to one peer or to everyone.
//!
//! Sends report their local enqueue outcome synchronously as a
//! `SendDataResult` action — delivery acknowledgment is not part of this
//! layer. Inbound resource transfers and streams reported by the transport
//! are ignored here; only payload messages surface as `GotData`.

use crate::cancel::StopSignal;
use crate::error::SendError;
use crate::identity::Peer;
use crate::pipeline::{ActionSender, Middleware, Subscription};
use crate::session::Session;
use crate::transport::MessageEvent;
use tracing::{debug, trace};

/// Commands and notifications of the messaging component.
#[derive(Debug, Clone)]
pub enum MessagingAction {
    StartMonitoring,
    /// Broadcast a payload to all connected peers.
    SendData(Vec<u8>),
    /// Unicast a payload to one peer.
    SendDataToPeer {
        payload: Vec<u8>,
        peer: Peer,
    },
    GotData {
        payload: Vec<u8>,
        from: Peer,
    },
    /// Local outcome of a send call; `peer` is `None` for broadcasts.
    SendDataResult {
        payload: Vec<u8>,
        peer: Option<Peer>,
        result: Result<(), SendError>,
    },
    /// The inbound message stream ended.
    StoppedMonitoring,
}

/// Side-effect handler of the messaging component.
pub struct MessagingMiddleware {
    session: Session,
    monitoring: Option<Subscription>,
}

impl MessagingMiddleware {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            monitoring: None,
        }
    }

    fn start_monitoring(&mut self, out: &ActionSender<MessagingAction>) {
        let mut events = self.session.messages();
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
                    Some(MessageEvent::Data { payload, from }) => {
                        out_fwd.dispatch(MessagingAction::GotData { payload, from });
                    }
                    Some(
                        MessageEvent::ResourceStarted { .. }
                        | MessageEvent::ResourceFinished { .. }
                        | MessageEvent::Stream { .. },
                    ) => {
                        // Payload messaging only; transfers belong elsewhere.
                        trace!(event = "non_data_message_ignored");
                    }
                    None => {
                        out_fwd.dispatch(MessagingAction::StoppedMonitoring);
                        break;
                    }
                }
            }
        });

        self.monitoring = Some(Subscription::new(stop, task));
        debug!(event = "message_monitoring_started", "Message subscription installed");
    }

    fn send(&self, payload: &[u8], peer: Option<&Peer>, out: &ActionSender<MessagingAction>) {
        let result = match peer {
            Some(peer) => self.session.send_to(payload, peer),
            None if self.session.connected_peers().is_empty() => {
                Err(SendError::NoConnectedPeers)
            }
            None => self.session.broadcast(payload),
        };
        if let Err(e) = &result {
            debug!(event = "send_failed", error = %e, "Send reported a local failure");
        }
        out.dispatch(MessagingAction::SendDataResult {
            payload: payload.to_vec(),
            peer: peer.cloned(),
            result,
        });
    }
}

impl Middleware for MessagingMiddleware {
    type Action = MessagingAction;
    type State = ();

    fn handle(&mut self, action: &MessagingAction, _state: &(), out: &ActionSender<MessagingAction>) {
        match action {
            MessagingAction::StartMonitoring => self.start_monitoring(out),
            MessagingAction::SendData(payload) => self.send(payload, None, out),
            MessagingAction::SendDataToPeer { payload, peer } => {
                self.send(payload, Some(peer), out)
            }
            MessagingAction::GotData { .. }
            | MessagingAction::SendDataResult { .. }
            | MessagingAction::StoppedMonitoring => {}
        }
    }
}

/// The messaging component carries no reducible state.
pub fn messaging_reducer(_state: &mut (), _action: &MessagingAction) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use crate::testkit::{recv_until, MockMesh};
    use std::sync::Arc;

    fn messaging(mesh: &Arc<MockMesh>) -> Pipeline<MessagingMiddleware> {
        let session = Session::new(mesh.clone());
        Pipeline::spawn(MessagingMiddleware::new(session), (), messaging_reducer)
    }

    #[tokio::test]
    async fn test_broadcast_with_no_peers_reports_failure() {
        let mesh = MockMesh::new();
        let pipeline = messaging(&mesh);
        let mut tap = pipeline.observe();

        pipeline.dispatch(MessagingAction::SendData(b"hello".to_vec()));
        let action = recv_until(&mut tap, |a| {
            matches!(a, MessagingAction::SendDataResult { .. })
        })
        .await;
        match action {
            MessagingAction::SendDataResult {
                payload,
                peer,
                result,
            } => {
                assert_eq!(payload, b"hello");
                assert_eq!(peer, None);
                assert_eq!(result, Err(SendError::NoConnectedPeers));
            }
            other => panic!("unexpected action: {other:?}"),
        }
        assert!(mesh.sent_payloads().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_transport_when_peers_connected() {
        let mesh = MockMesh::new();
        let pipeline = messaging(&mesh);
        let mut tap = pipeline.observe();

        mesh.connect_peer(Peer::named("neighbor"));
        pipeline.dispatch(MessagingAction::SendData(b"ping".to_vec()));
        let action = recv_until(&mut tap, |a| {
            matches!(a, MessagingAction::SendDataResult { .. })
        })
        .await;
        assert!(matches!(
            action,
            MessagingAction::SendDataResult { result: Ok(()), peer: None, .. }
        ));
        assert_eq!(mesh.sent_payloads(), vec![(b"ping".to_vec(), None)]);
    }

    #[tokio::test]
    async fn test_unicast_carries_target_peer_in_result() {
        let mesh = MockMesh::new();
        let pipeline = messaging(&mesh);
        let mut tap = pipeline.observe();

        let peer = Peer::named("neighbor");
        mesh.connect_peer(peer.clone());
        pipeline.dispatch(MessagingAction::SendDataToPeer {
            payload: b"direct".to_vec(),
            peer: peer.clone(),
        });
        let action = recv_until(&mut tap, |a| {
            matches!(a, MessagingAction::SendDataResult { .. })
        })
        .await;
        match action {
            MessagingAction::SendDataResult { peer: to, result, .. } => {
                assert_eq!(to, Some(peer.clone()));
                assert_eq!(result, Ok(()));
            }
            other => panic!("unexpected action: {other:?}"),
        }
        assert_eq!(
            mesh.sent_payloads(),
            vec![(b"direct".to_vec(), Some(peer))]
        );
    }

    #[tokio::test]
    async fn test_unicast_to_unconnected_peer_fails() {
        let mesh = MockMesh::new();
        let pipeline = messaging(&mesh);
        let mut tap = pipeline.observe();

        pipeline.dispatch(MessagingAction::SendDataToPeer {
            payload: b"direct".to_vec(),
            peer: Peer::named("stranger"),
        });
        let action = recv_until(&mut tap, |a| {
            matches!(a, MessagingAction::SendDataResult { .. })
        })
        .await;
        assert!(matches!(
            action,
            MessagingAction::SendDataResult {
                result: Err(SendError::PeerNotConnected),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_inbound_data_surfaces_and_transfers_are_ignored() {
        let mesh = MockMesh::new();
        let pipeline = messaging(&mesh);
        let mut tap = pipeline.observe();

        pipeline.dispatch(MessagingAction::StartMonitoring);
        recv_until(&mut tap, |a| matches!(a, MessagingAction::StartMonitoring)).await;

        let sender = Peer::named("sender");
        mesh.emit_message(MessageEvent::ResourceStarted {
            name: "photo.jpg".to_string(),
            from: sender.clone(),
        });
        mesh.emit_message(MessageEvent::Data {
            payload: b"payload".to_vec(),
            from: sender.clone(),
        });
        mesh.emit_message(MessageEvent::ResourceFinished {
            name: "photo.jpg".to_string(),
            from: sender.clone(),
        });

        let action = recv_until(&mut tap, |a| matches!(a, MessagingAction::GotData { .. })).await;
        match action {
            MessagingAction::GotData { payload, from } => {
                assert_eq!(payload, b"payload");
                assert_eq!(from, sender);
            }
            other => panic!("unexpected action: {other:?}"),
        }

        // Stream end right after: nothing but the terminal action may follow.
        mesh.close_message_streams();
        let action = tap.recv().await.unwrap();
        assert!(matches!(action, MessagingAction::StoppedMonitoring));
    }
}
