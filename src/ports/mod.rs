/// Port trait definitions (interfaces)
///
/// These traits define the contracts for adapters to implement.
/// Following the ports-and-adapters (hexagonal) architecture pattern.
pub mod audio;
pub mod plugin;
pub mod streaming;
pub mod sync_transcriber;

pub use audio::{AudioCallback, AudioSource};
pub use plugin::Plugin;
pub use streaming::{ConnectRequest, SessionListener, StreamingTransport};
pub use sync_transcriber::SyncTranscriber;
