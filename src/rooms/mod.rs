mod msg;
mod session;
mod timeline;

pub use msg::{Message, MessageKind, SYSTEM_SENDER};
pub use session::{RoomMembership, Session, SessionEvent, SessionState, SessionUpdate};
pub use timeline::{Timeline, TimelineEntry};
