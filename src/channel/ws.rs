use futures_util::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::{AppResult, SessionError, SessionResult};

use super::{Channel, InboundEvent, OutboundEvent, decode_frame, encode_event};

/// WebSocket transport. Events go out as JSON text frames through a writer
/// task; inbound frames are decoded by a reader task onto the queue returned
/// from [`WsChannel::connect`], which always ends with
/// [`InboundEvent::Disconnected`].
pub struct WsChannel {
    tx: mpsc::UnboundedSender<OutboundEvent>,
    writer: JoinHandle<()>,
}

impl WsChannel {
    pub async fn connect(url: &str) -> AppResult<(WsChannel, mpsc::UnboundedReceiver<InboundEvent>)> {
        let (stream, _) = tokio_tungstenite::connect_async(url).await?;
        tracing::debug!(url, "websocket connected");

        let (mut sink, mut stream) = stream.split();
        let (tx, mut outbound) = mpsc::unbounded_channel::<OutboundEvent>();
        let (inbound, rx) = mpsc::unbounded_channel();

        let writer = tokio::spawn(async move {
            while let Some(event) = outbound.recv().await {
                let text = match encode_event(&event) {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::warn!(event = event.name(), error = %err, "dropping unencodable event");
                        continue;
                    }
                };
                if sink.send(WsMessage::Text(text)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => match decode_frame(&text) {
                        Ok(Some(msg)) => {
                            if inbound.send(InboundEvent::Message(msg)).is_err() {
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(err) => tracing::warn!(error = %err, "skipping malformed frame"),
                    },
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(error = %err, "websocket read failed");
                        break;
                    }
                }
            }
            let _ = inbound.send(InboundEvent::Disconnected);
        });

        Ok((WsChannel { tx, writer }, rx))
    }

    /// Stops accepting events and waits until everything already emitted
    /// has been written and the socket closed.
    pub async fn shutdown(self) {
        let WsChannel { tx, writer } = self;
        drop(tx);
        let _ = writer.await;
    }
}

impl Channel for WsChannel {
    fn emit(&self, event: OutboundEvent) -> SessionResult<()> {
        tracing::debug!(event = event.name(), "emit");
        self.tx.send(event).map_err(|_| SessionError::TransportDisconnect)
    }
}
