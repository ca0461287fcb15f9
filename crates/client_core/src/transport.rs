//! Websocket session supervision: connect, pump frames both ways, and
//! retry dropped sessions until the attempt budget runs out.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use futures::{SinkExt, StreamExt};
use shared::{domain::ConnectionState, protocol::EngineEvent};
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::{EngineClient, MAX_CONNECT_ATTEMPTS, RECONNECT_DELAY};

/// Derives the websocket endpoint from the engine's HTTP base URL.
pub fn websocket_url(engine_url: &str) -> Result<String> {
    let base = if let Some(rest) = engine_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = engine_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(anyhow!("engine_url must start with http:// or https://"));
    };
    Ok(format!("{}/ws", base.trim_end_matches('/')))
}

pub(crate) fn spawn_session_supervisor(client: Arc<EngineClient>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut attempts = 0u32;
        loop {
            client.set_connection_state(ConnectionState::Connecting).await;
            match run_session(&client).await {
                Ok(()) => {
                    // A session was established and later dropped;
                    // the next drop gets a fresh budget.
                    attempts = 0;
                }
                Err(err) => {
                    warn!(error = %err, "engine connection attempt failed");
                }
            }
            client.clear_outbound().await;
            client.set_connection_state(ConnectionState::Disconnected).await;
            attempts += 1;
            if attempts >= MAX_CONNECT_ATTEMPTS {
                warn!(
                    attempts,
                    "giving up on automatic reconnect; waiting for operator"
                );
                return;
            }
            sleep(RECONNECT_DELAY).await;
        }
    })
}

/// Runs one websocket session to completion. Returns Ok(()) when an
/// established session ends, Err when the connection never came up.
async fn run_session(client: &Arc<EngineClient>) -> Result<()> {
    let ws_url = websocket_url(client.engine_url())?;
    let (ws_stream, _) = connect_async(&ws_url)
        .await
        .with_context(|| format!("failed to connect websocket: {ws_url}"))?;
    info!(%ws_url, "engine websocket connected");
    let (mut writer, mut reader) = ws_stream.split();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    client.install_outbound(outbound_tx).await;
    client.set_connection_state(ConnectionState::Connected).await;

    loop {
        tokio::select! {
            command = outbound_rx.recv() => {
                let Some(command) = command else { break };
                let text = match serde_json::to_string(&command) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(error = %err, "failed to encode outbound command");
                        continue;
                    }
                };
                if let Err(err) = writer.send(Message::Text(text)).await {
                    warn!(error = %err, "engine websocket write failed");
                    break;
                }
            }
            frame = reader.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<EngineEvent>(&text) {
                            Ok(event) => client.emit_engine_event(event),
                            Err(err) => {
                                warn!(error = %err, "ignoring unparseable engine frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("engine websocket closed");
                        break;
                    }
                    Some(Ok(_)) => {
                        debug!("ignoring non-text engine frame");
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "engine websocket read failed");
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}
