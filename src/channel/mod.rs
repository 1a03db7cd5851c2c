//! The real-time link to the room broadcaster.

mod wire;
mod ws;

use crate::SessionResult;

pub use wire::{InboundEvent, OutboundEvent, WireMessage, decode_frame, encode_event};
pub use ws::WsChannel;

/// Outbound half of the transport. Emission is fire-and-forget: `Ok` means
/// the event was handed to the transport, not that anyone received it.
///
/// Inbound traffic is not part of this trait; each implementation hands out
/// a queue of [`InboundEvent`]s when it connects.
pub trait Channel: Send + Sync {
    fn emit(&self, event: OutboundEvent) -> SessionResult<()>;
}

impl<C: Channel + ?Sized> Channel for std::sync::Arc<C> {
    fn emit(&self, event: OutboundEvent) -> SessionResult<()> {
        (**self).emit(event)
    }
}
