/// Streaming transcription session: the bidirectional connection to a
/// remote transcription server ([`AsyncSession`]) and the pure message
/// decoder that turns its incoming text frames into [`MessageDecoder`]
/// actions.
pub mod async_session;
pub mod decoder;

pub use async_session::{AsyncSession, NoHandshakeHooks, SessionHooks};
pub use decoder::MessageDecoder;
