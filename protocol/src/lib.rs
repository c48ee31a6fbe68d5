//! Wire protocol shared by the back process and its clients.
//!
//! * [`envelope`]: request/response envelopes as they travel over the socket.
//! * [`validate`]: untrusted frame decoding and shape validation.
//! * [`message`]: the [`Message`] trait binding closed message enums to envelopes.
//! * [`messages`]: the concrete [`BackIn`] and [`BackOut`] message sets.
//! * [`search`] and [`game`]: payload types carried by those messages.

pub mod envelope;
pub mod game;
pub mod message;
pub mod messages;
pub mod search;
pub mod validate;

pub use envelope::Envelope;
pub use envelope::RequestEnvelope;
pub use envelope::ResponseEnvelope;
pub use envelope::TypeTag;
pub use message::Args;
pub use message::DecodeError;
pub use message::Message;
pub use messages::BackIn;
pub use messages::BackInKind;
pub use messages::BackOut;
pub use messages::BackOutKind;
pub use validate::FrameError;
pub use validate::parse_message;

/// Bumped whenever an envelope or payload shape changes incompatibly.
pub const PROTOCOL_VERSION: u32 = 1;

/// Number of rows in one page of a results view.
pub const VIEW_PAGE_SIZE: usize = 50;

/// Text frame the server sends once a client presented the right secret.
pub const AUTH_ACK: &str = "auth successful";
