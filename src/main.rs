use std::io::Write;

use roomchat::{
    SessionError, SessionEvent,
    channel::WsChannel,
    config::ClientConfig,
    history::{HttpHistoryStore, load_history},
    identity::{resolve_identity, suggest_display_name},
    rooms::{MessageKind, Session, SessionUpdate, TimelineEntry},
    store::SqliteStore,
};
use time::macros::format_description;
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::mpsc,
};
use tracing_subscriber::EnvFilter;

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roomchat=info")))
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env();
    let store = SqliteStore::connect(&config.store_url).await?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let identity = match resolve_identity(&store, config.display_name.as_deref()).await {
        Ok(identity) => identity,
        Err(SessionError::MissingIdentity) => {
            let suggestion = suggest_display_name();
            let Some(name) = prompt(&mut input, &format!("your name [{suggestion}]: ")).await? else {
                return Ok(());
            };
            let name = if name.trim().is_empty() { suggestion } else { name };
            resolve_identity(&store, Some(name.as_str())).await?
        }
        Err(err) => return Err(err.into()),
    };

    let (channel, mut inbound) = WsChannel::connect(&config.server_url).await?;
    let mut session = Session::new(identity, channel, store).forget_device_on_leave(config.forget_device_on_leave);

    if session.restore().await?.is_none() {
        loop {
            let Some(room_code) = prompt(&mut input, "room code: ").await? else {
                return Ok(());
            };
            match session.join_room(&room_code).await {
                Ok(_) => break,
                Err(SessionError::InvalidInput(reason)) => eprintln!("{reason}"),
                Err(err) => return Err(err.into()),
            }
        }
    }

    let history = HttpHistoryStore::new(&config.history_url);
    let (history_tx, mut history_rx) = mpsc::unbounded_channel();
    if let Some(room_code) = session.history_request() {
        let history = history.clone();
        let history_tx = history_tx.clone();
        tokio::spawn(async move {
            let messages = load_history(&history, &room_code).await;
            let _ = history_tx.send(SessionEvent::HistoryLoaded { room_code, messages });
        });
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut disconnected = false;
    loop {
        tokio::select! {
            event = inbound.recv() => {
                let Some(event) = event else {
                    break;
                };
                if render(&session.handle(event.into())) {
                    disconnected = true;
                    break;
                }
            }
            Some(event) = history_rx.recv() => {
                render(&session.handle(event));
            }
            line = input.next_line() => match line? {
                Some(line) if line.trim() == "/leave" => break,
                Some(line) => {
                    if let Err(err) = session.send_message(&line) {
                        eprintln!("not sent: {err}");
                    }
                }
                None => break,
            },
            _ = &mut ctrl_c => break,
        }
    }

    if disconnected {
        eprintln!("disconnected, restart to rejoin");
    } else {
        session.leave_room().await?;
    }
    session.into_channel().shutdown().await;

    Ok(())
}

async fn prompt(input: &mut Input, question: &str) -> anyhow::Result<Option<String>> {
    print!("{question}");
    std::io::stdout().flush()?;
    Ok(input.next_line().await?)
}

/// Prints what changed; true once the transport is gone.
fn render(update: &SessionUpdate) -> bool {
    match update {
        SessionUpdate::Appended(entry) => print_entry(entry),
        SessionUpdate::HistoryMerged(entries) => entries.iter().for_each(print_entry),
        SessionUpdate::Disconnected => return true,
        SessionUpdate::Ignored => {}
    }
    false
}

fn print_entry(entry: &TimelineEntry) {
    let message = &entry.message;
    let clock = message
        .timestamp
        .format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default();

    match message.kind() {
        MessageKind::System => println!("  * {}", message.body),
        MessageKind::User if entry.own => println!("[{clock}] {} (you): {}", message.sender_name, message.body),
        MessageKind::User => println!("[{clock}] {}: {}", message.sender_name, message.body),
    }
}
