//! peerflow: reactive middleware over peer-to-peer local-network transports.
//!
//! Wraps an injected discovery/session transport in a unidirectional data
//! flow: callers dispatch command **actions**, middleware components perform
//! the side effects (subscriptions, invitations, sends) and emit follow-up
//! actions, and pure **reducers** fold every action into observable state.
//! Each component runs on its own serialized [`Pipeline`], so concurrent
//! transport callbacks, timers, and commands are always observed in a
//! single consistent order.
//!
//! The four components mirror the session lifecycle:
//! - [`advertiser`] — discoverability broadcast and inbound invitations.
//! - [`browser`] — peer discovery and outbound invitations with timeouts.
//! - [`connectivity`] — per-peer connection lifecycle notifications.
//! - [`messaging`] — opaque payload exchange with per-send results.
//!
//! ```no_run
//! use peerflow::{
//!     AdvertiserAction, AdvertiserMiddleware, AdvertiserState, advertiser_reducer,
//!     MeshDiscovery, Pipeline, Session, SessionTransport,
//! };
//! use std::sync::Arc;
//!
//! fn wire_up(discovery: Arc<dyn MeshDiscovery>, transport: Arc<dyn SessionTransport>) {
//!     let session = Session::new(transport);
//!     let advertiser = Pipeline::spawn(
//!         AdvertiserMiddleware::new(discovery, session.clone()),
//!         AdvertiserState::default(),
//!         advertiser_reducer,
//!     );
//!     advertiser.dispatch(AdvertiserAction::StartAdvertising);
//! }
//! ```

pub mod advertiser;
pub mod browser;
pub mod cancel;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod identity;
pub mod messaging;
pub mod pipeline;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testkit;

pub use advertiser::{
    advertiser_reducer, AcceptancePolicy, AdvertiserAction, AdvertiserMiddleware, AdvertiserState,
};
pub use browser::{
    browser_reducer, AutoInvitePolicy, BrowserAction, BrowserMiddleware, BrowserState,
};
pub use cancel::StopSignal;
pub use connectivity::{connectivity_reducer, ConnectivityAction, ConnectivityMiddleware};
pub use error::{IdentityError, InviteError, SendError, TransportError};
pub use identity::{Peer, PeerToken};
pub use messaging::{messaging_reducer, MessagingAction, MessagingMiddleware};
pub use pipeline::{ActionSender, Middleware, Pipeline, Reducer, Subscription};
pub use session::Session;
pub use transport::{
    AdvertiserEvent, BrowserEvent, ConnectionEvent, DiscoveryInfo, InviteOutcome, InviteResponder,
    MeshDiscovery, MessageEvent, SessionTransport,
};
