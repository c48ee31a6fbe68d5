use crate::error::SocketError;
use arcade_protocol::Envelope;
use arcade_protocol::Message;
use arcade_protocol::ResponseEnvelope;
use arcade_protocol::parse_message;
use tracing::warn;

/// Parses an inbound frame, logging and dropping it when malformed.
pub(crate) fn read_envelope(raw: &[u8], peer: &str) -> Option<Envelope> {
    match parse_message(raw) {
        Ok(envelope) => Some(envelope),
        Err(err) => {
            warn!(peer, "dropping malformed frame: {err}");
            None
        }
    }
}

pub(crate) fn encode_request<M: Message>(message: M, id: Option<u64>) -> Result<String, SocketError> {
    let request = message.into_request(id)?;
    Ok(Envelope::from(request).to_text()?)
}

pub(crate) fn encode_response(response: ResponseEnvelope) -> Result<String, SocketError> {
    Ok(Envelope::from(response).to_text()?)
}
