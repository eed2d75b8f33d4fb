/// Extension point consumed by [`crate::recorder::RecorderCore`].
///
/// A plugin subscribes to recorder lifecycle events and audio frames through
/// whatever registrations it makes inside `activate`; it has no other
/// channel back into the recorder than `model` itself, so releasing the
/// recorder and dropping the plugin are enough to tear everything down — no
/// reference cycle between the two is possible.
use crate::recorder::model::RecorderModel;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Plugin: Send + Sync {
    /// Registers this plugin's callbacks against `model`. Called once, in
    /// registration order, under the recorder's lifecycle mutex.
    async fn activate(&self, model: Arc<RecorderModel>);

    /// Unregisters/cleans up. Called once, in reverse registration order.
    /// Most plugins have nothing to undo beyond letting their registered
    /// callbacks be dropped with the handle, so this defaults to a no-op.
    async fn deactivate(&self, model: Arc<RecorderModel>) {
        let _ = model;
    }
}
