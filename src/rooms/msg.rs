use time::{Duration, OffsetDateTime, Time, format_description::well_known::Rfc3339, macros::format_description};

use crate::channel::WireMessage;

/// Sender name the broadcaster uses for join/leave notices.
pub const SYSTEM_SENDER: &str = "System";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    User,
    System,
}

/// A chat line, either from the history endpoint or from the live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender_name: String,
    pub body: String,
    pub timestamp: OffsetDateTime,
}

impl Message {
    pub fn new(sender_name: impl Into<String>, body: impl Into<String>, timestamp: OffsetDateTime) -> Self {
        Message {
            sender_name: sender_name.into(),
            body: body.into(),
            timestamp,
        }
    }

    /// `received_at` fills in whatever the wire timestamp leaves open: the
    /// date for a bare `HH:MM:SS`, or everything when it is missing or
    /// unreadable. A clock time later than `received_at` belongs to the day
    /// before.
    pub fn from_wire(WireMessage { name, msg, timestamp }: WireMessage, received_at: OffsetDateTime) -> Self {
        let timestamp = match timestamp.as_deref() {
            Some(raw) => parse_timestamp(raw, received_at).unwrap_or_else(|| {
                tracing::debug!(raw, "unreadable message timestamp, using receipt time");
                received_at
            }),
            None => received_at,
        };

        Message::new(name, msg, timestamp)
    }

    pub fn kind(&self) -> MessageKind {
        if self.sender_name == SYSTEM_SENDER {
            MessageKind::System
        } else {
            MessageKind::User
        }
    }

    /// Exact, case-sensitive name match. Two users sharing a name both see
    /// each other's lines as their own.
    pub fn is_own(&self, display_name: &str) -> bool {
        self.sender_name == display_name
    }
}

fn parse_timestamp(raw: &str, received_at: OffsetDateTime) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(timestamp) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(timestamp);
    }

    let clock = format_description!("[hour]:[minute]:[second]");
    Time::parse(raw, clock).ok().map(|time| {
        let stamped = received_at.replace_time(time);
        if stamped > received_at {
            stamped - Duration::DAY
        } else {
            stamped
        }
    })
}
