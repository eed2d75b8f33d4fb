/// Recorder lifecycle: state + callback registry ([`RecorderModel`]) and the
/// state machine that drives it ([`RecorderCore`]).
pub mod callbacks;
pub mod core;
pub mod model;

pub use callbacks::{CallbackHandle, CallbackRegistry};
pub use core::RecorderCore;
pub use model::RecorderModel;
