//! Main loop: pull events from every channel, answer on the same channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bot::router::ConnectHubBot;
use crate::channels::{ChannelManager, IncomingMessage, OutgoingResponse};
use crate::error::Error;

/// Reply sent when a turn fails for a reason the user cannot fix.
pub const FALLBACK_MESSAGE: &str = "Sorry, something went wrong.";

/// A conversation worker with an empty queue exits after this long.
const WORKER_IDLE: Duration = Duration::from_secs(60);

/// How long shutdown waits for turns still in flight.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Queue and task serving one conversation.
struct Worker {
    tx: mpsc::UnboundedSender<IncomingMessage>,
    handle: JoinHandle<()>,
}

/// Run until Ctrl+C or until every channel stream ends.
///
/// Each conversation gets its own worker, so events in one conversation are
/// handled in arrival order while a slow turn elsewhere does not hold them up.
pub async fn run(bot: Arc<ConnectHubBot>, channels: ChannelManager) -> Result<(), Error> {
    let channels = Arc::new(channels);
    let mut message_stream = channels.start_all().await?;
    let mut workers: HashMap<String, Worker> = HashMap::new();

    tracing::info!(flow = %bot.flow(), "ConnectHub bot ready and listening");

    loop {
        let message = tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down...");
                break;
            }
            msg = message_stream.next() => {
                match msg {
                    Some(m) => m,
                    None => {
                        tracing::info!("All channel streams ended, shutting down...");
                        break;
                    }
                }
            }
        };

        workers.retain(|_, w| !w.handle.is_finished());
        route(&bot, &channels, &mut workers, message);
    }

    // Dropping the senders lets every worker drain its queue and exit.
    let handles: Vec<JoinHandle<()>> = workers.into_values().map(|w| w.handle).collect();
    if tokio::time::timeout(SHUTDOWN_GRACE, futures::future::join_all(handles))
        .await
        .is_err()
    {
        tracing::warn!("Turns still running at shutdown were abandoned");
    }

    channels.shutdown_all().await?;
    Ok(())
}

/// Queue `message` on its conversation's worker, starting one if needed.
fn route(
    bot: &Arc<ConnectHubBot>,
    channels: &Arc<ChannelManager>,
    workers: &mut HashMap<String, Worker>,
    message: IncomingMessage,
) {
    let scope = bot.conversation_scope(&message);
    let message = match workers.get(&scope) {
        Some(worker) => match worker.tx.send(message) {
            Ok(()) => return,
            // The worker went idle and closed its queue.
            Err(mpsc::error::SendError(message)) => message,
        },
        None => message,
    };

    let previous = workers.remove(&scope).map(|w| w.handle);
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(conversation_worker(
        Arc::clone(bot),
        Arc::clone(channels),
        message,
        rx,
        previous,
    ));
    tracing::debug!(conversation = %scope, "Conversation worker started");
    workers.insert(scope, Worker { tx, handle });
}

async fn conversation_worker(
    bot: Arc<ConnectHubBot>,
    channels: Arc<ChannelManager>,
    first: IncomingMessage,
    mut rx: mpsc::UnboundedReceiver<IncomingMessage>,
    previous: Option<JoinHandle<()>>,
) {
    // A closing worker may still be draining this conversation.
    if let Some(previous) = previous {
        if let Err(e) = previous.await {
            tracing::warn!("Previous conversation worker failed: {e}");
        }
    }

    dispatch(&bot, &channels, &first).await;
    loop {
        match tokio::time::timeout(WORKER_IDLE, rx.recv()).await {
            Ok(Some(message)) => dispatch(&bot, &channels, &message).await,
            Ok(None) => break,
            Err(_) => {
                rx.close();
                while let Some(message) = rx.recv().await {
                    dispatch(&bot, &channels, &message).await;
                }
                break;
            }
        }
    }
}

async fn dispatch(bot: &ConnectHubBot, channels: &ChannelManager, message: &IncomingMessage) {
    let replies = match bot.on_turn(message).await {
        Ok(replies) => replies,
        Err(e) => {
            tracing::error!(channel = %message.channel, "Error handling message: {e}");
            vec![FALLBACK_MESSAGE.to_string()]
        }
    };

    for reply in replies {
        if let Err(e) = channels
            .respond(message, OutgoingResponse::text(reply))
            .await
        {
            tracing::warn!(channel = %message.channel, "Failed to send reply: {e}");
            break;
        }
    }
}
