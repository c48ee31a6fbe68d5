//! Request/response transport over one persistent websocket per peer.
//!
//! [`SocketClient`] owns the client side of a connection, including the
//! bounded reconnect loop. [`SocketServer`] accepts authenticated clients
//! and fans outbound messages through a [`Pipeline`]. Both dispatch inbound
//! requests through a [`Router`] and correlate responses with
//! [`PendingCalls`].

mod client;
mod config;
mod error;
mod frame;
mod pending;
mod pipeline;
mod router;
mod server;

pub use client::ClientContext;
pub use client::ConnectionState;
pub use client::SocketClient;
pub use config::ClientConfig;
pub use config::ReconnectPolicy;
pub use error::SocketError;
pub use pending::CallResult;
pub use pending::PendingCalls;
pub use pipeline::Flow;
pub use pipeline::Middleware;
pub use pipeline::Next;
pub use pipeline::Pipeline;
pub use pipeline::PipelineError;
pub use router::HandlerError;
pub use router::ObserverId;
pub use router::Router;
pub use server::ClientId;
pub use server::Outbound;
pub use server::Peer;
pub use server::SocketServer;
pub use server::Target;
