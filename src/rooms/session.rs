use time::OffsetDateTime;

use crate::{
    SessionError, SessionResult,
    channel::{Channel, InboundEvent, OutboundEvent},
    identity::Identity,
    store::{DISPLAY_NAME, KeyValueStore, ROOM_CODE, USER_ID},
};

use super::{Message, Timeline, TimelineEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unjoined,
    /// Join emitted, nothing heard back yet.
    Joining,
    Joined,
    Leaving,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMembership {
    pub room_code: String,
    pub identity: Identity,
    pub joined_at: OffsetDateTime,
}

/// Everything the session reacts to, consumed one at a time in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Message(Message),
    HistoryLoaded {
        room_code: String,
        messages: Vec<Message>,
    },
    Disconnected,
}

impl SessionEvent {
    pub fn from_inbound(event: InboundEvent, received_at: OffsetDateTime) -> Self {
        match event {
            InboundEvent::Message(msg) => SessionEvent::Message(Message::from_wire(msg, received_at)),
            InboundEvent::Disconnected => SessionEvent::Disconnected,
        }
    }
}

impl From<InboundEvent> for SessionEvent {
    fn from(event: InboundEvent) -> Self {
        SessionEvent::from_inbound(event, OffsetDateTime::now_utc())
    }
}

/// What a handled [`SessionEvent`] did to the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    Appended(TimelineEntry),
    HistoryMerged(Vec<TimelineEntry>),
    Disconnected,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryProgress {
    NotRequested,
    Pending,
    Loaded,
}

/// One chat session of this client: identity, the room it is in, and the
/// timeline of that room.
///
/// A room *entry* starts with a join after a leave (or the first join) and
/// lasts across reconnects. History is fetched once per entry and a new entry
/// starts a new timeline; leaving keeps the timeline around for display.
pub struct Session<C, S> {
    channel: C,
    store: S,
    identity: Identity,
    membership: Option<RoomMembership>,
    state: SessionState,
    timeline: Timeline,
    entered_room: Option<String>,
    history: HistoryProgress,
    forget_device_on_leave: bool,
}

impl<C: Channel, S: KeyValueStore> Session<C, S> {
    pub fn new(identity: Identity, channel: C, store: S) -> Self {
        Session {
            channel,
            store,
            identity,
            membership: None,
            state: SessionState::Unjoined,
            timeline: Timeline::new(),
            entered_room: None,
            history: HistoryProgress::NotRequested,
            forget_device_on_leave: false,
        }
    }

    /// Also drop the device user id from storage when leaving.
    pub fn forget_device_on_leave(mut self, forget: bool) -> Self {
        self.forget_device_on_leave = forget;
        self
    }

    /// Remembers name and room for [`Session::restore`] and announces the
    /// join. The membership is confirmed later, by the first message heard
    /// from the room.
    pub async fn join_room(&mut self, room_code: &str) -> SessionResult<RoomMembership> {
        let room_code = room_code.trim();
        if room_code.is_empty() {
            return Err(SessionError::InvalidInput("room code is empty"));
        }
        if self.identity.display_name.trim().is_empty() {
            return Err(SessionError::InvalidInput("display name is empty"));
        }

        self.store.set(DISPLAY_NAME, &self.identity.display_name).await?;
        self.store.set(ROOM_CODE, room_code).await?;

        if self.entered_room.as_deref() != Some(room_code) {
            self.timeline.clear();
            self.history = HistoryProgress::NotRequested;
            self.entered_room = Some(room_code.to_owned());
        }

        self.emit(OutboundEvent::Join {
            name: self.identity.display_name.clone(),
            room_code: room_code.to_owned(),
            user_id: self.identity.user_id.clone(),
        })?;

        let membership = RoomMembership {
            room_code: room_code.to_owned(),
            identity: self.identity.clone(),
            joined_at: OffsetDateTime::now_utc(),
        };
        self.membership = Some(membership.clone());
        self.state = SessionState::Joining;
        tracing::info!(room_code, name = %self.identity.display_name, "joining room");

        Ok(membership)
    }

    /// Rejoins the remembered room, if a previous session left one behind.
    /// Used on start-up and again after the transport reconnects.
    pub async fn restore(&mut self) -> SessionResult<Option<RoomMembership>> {
        let stored_name = self.store.get(DISPLAY_NAME).await?.filter(|name| !name.trim().is_empty());
        let stored_room = self.store.get(ROOM_CODE).await?.filter(|room| !room.trim().is_empty());

        match (stored_name, stored_room) {
            (Some(_), Some(room_code)) => self.join_room(&room_code).await.map(Some),
            _ => Ok(None),
        }
    }

    /// Sends a chat line to the room. Blank input is dropped silently.
    ///
    /// Nothing is appended locally; the line shows up once the broadcaster
    /// echoes it back through [`Session::on_message`].
    pub fn send_message(&mut self, body: &str) -> SessionResult<()> {
        let body = body.trim();
        if body.is_empty() {
            return Ok(());
        }

        let Some(membership) = &self.membership else {
            return Err(SessionError::NotJoined);
        };

        let event = OutboundEvent::SendMessage {
            name: membership.identity.display_name.clone(),
            room_code: membership.room_code.clone(),
            message: body.to_owned(),
            user_id: membership.identity.user_id.clone(),
        };
        self.emit(event)
    }

    /// Announces the departure (best effort) and forgets the room so the next
    /// start does not rejoin it. The device user id stays unless configured
    /// otherwise.
    pub async fn leave_room(&mut self) -> SessionResult<()> {
        if let Some(membership) = self.membership.take() {
            self.state = SessionState::Leaving;
            let event = OutboundEvent::Leave {
                name: membership.identity.display_name,
                room_code: membership.room_code.clone(),
                user_id: membership.identity.user_id,
            };
            if let Err(err) = self.emit(event) {
                tracing::debug!(error = %err, "leave not delivered");
            }
            tracing::info!(room_code = %membership.room_code, "left room");
        }
        self.state = SessionState::Unjoined;
        self.entered_room = None;
        self.history = HistoryProgress::NotRequested;

        self.store.remove(ROOM_CODE).await?;
        self.store.remove(DISPLAY_NAME).await?;
        if self.forget_device_on_leave {
            self.store.remove(USER_ID).await?;
        }

        Ok(())
    }

    /// Appends a live message. Every call adds exactly one entry, whatever
    /// the state; the first message after a join confirms it.
    pub fn on_message(&mut self, message: Message) -> &TimelineEntry {
        if self.state == SessionState::Joining {
            self.state = SessionState::Joined;
            tracing::debug!("join confirmed");
        }

        let own = message.is_own(&self.identity.display_name);
        self.timeline.append(TimelineEntry { message, own })
    }

    /// The transport dropped. Treated like a leave for display purposes, but
    /// nothing is emitted and the remembered room is kept for a rejoin.
    pub fn on_disconnect(&mut self) {
        if let Some(membership) = self.membership.take() {
            tracing::warn!(room_code = %membership.room_code, "transport disconnected");
        }
        self.state = SessionState::Unjoined;
    }

    /// Room whose history should be fetched now. Yields once per room entry.
    pub fn history_request(&mut self) -> Option<String> {
        if self.history != HistoryProgress::NotRequested {
            return None;
        }
        let room_code = self.membership.as_ref()?.room_code.clone();
        self.history = HistoryProgress::Pending;
        Some(room_code)
    }

    /// Merges a fetched backlog into the timeline. Batches for a room that
    /// is no longer entered, or arriving twice, are dropped.
    pub fn apply_history(&mut self, room_code: &str, messages: Vec<Message>) -> Option<Vec<TimelineEntry>> {
        if self.history != HistoryProgress::Pending || self.entered_room.as_deref() != Some(room_code) {
            tracing::debug!(room_code, "ignoring stale history batch");
            return None;
        }
        self.history = HistoryProgress::Loaded;

        let entries: Vec<TimelineEntry> = messages
            .into_iter()
            .map(|message| {
                let own = message.is_own(&self.identity.display_name);
                TimelineEntry { message, own }
            })
            .collect();
        self.timeline.merge_history(entries.clone());

        Some(entries)
    }

    pub fn handle(&mut self, event: SessionEvent) -> SessionUpdate {
        match event {
            SessionEvent::Message(message) => SessionUpdate::Appended(self.on_message(message).clone()),
            SessionEvent::HistoryLoaded { room_code, messages } => match self.apply_history(&room_code, messages) {
                Some(entries) => SessionUpdate::HistoryMerged(entries),
                None => SessionUpdate::Ignored,
            },
            SessionEvent::Disconnected => {
                self.on_disconnect();
                SessionUpdate::Disconnected
            }
        }
    }

    fn emit(&mut self, event: OutboundEvent) -> SessionResult<()> {
        let result = self.channel.emit(event);
        if let Err(SessionError::TransportDisconnect) = result {
            self.on_disconnect();
        }
        result
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_joined(&self) -> bool {
        self.state == SessionState::Joined
    }

    /// Sending needs a membership; a pending join is enough.
    pub fn can_send(&self) -> bool {
        self.membership.is_some()
    }

    pub fn membership(&self) -> Option<&RoomMembership> {
        self.membership.as_ref()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_channel(self) -> C {
        self.channel
    }
}
