use crate::domain::Instruction;
use crate::interface_adapters::protocol::{ClientMessage, DEFAULT_ERROR_MESSAGE, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::time::now_millis;
use crate::use_cases::{StateHandle, SubscriberId};

use axum::{
    Error,
    body::Bytes,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let engine = state.engine.clone();
    let ping_period = state.ping_period;
    ws.on_upgrade(move |socket| handle_socket(socket, engine, ping_period))
}

async fn handle_socket(mut socket: WebSocket, engine: StateHandle, ping_period: Duration) {
    // One subscriber id per connection; re-subscribing reuses it.
    let subscriber_id: SubscriberId = Uuid::new_v4();
    let span = info_span!("conn", subscriber_id = %subscriber_id);

    async move {
        info!("client connected");
        let mut ctx = ConnCtx::new(subscriber_id, engine, ping_period);

        if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
            warn!(error = ?e, "client loop exited with error");
        }
    }
    .instrument(span)
    .await
}

struct ConnCtx {
    pub subscriber_id: SubscriberId,
    pub engine: StateHandle,
    pub subscribed: bool,
    pub ping_period: Duration,
    // Instruction batches delivered by the state engine for this connection only.
    pub outbox_tx: mpsc::UnboundedSender<Vec<Instruction>>,
    pub outbox_rx: mpsc::UnboundedReceiver<Vec<Instruction>>,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_messages: u32,
}

impl ConnCtx {
    fn new(subscriber_id: SubscriberId, engine: StateHandle, ping_period: Duration) -> Self {
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        Self {
            subscriber_id,
            engine,
            subscribed: false,
            ping_period,
            outbox_tx,
            outbox_rx,
            msgs_in: 0,
            msgs_out: 0,
            bytes_in: 0,
            bytes_out: 0,
            invalid_messages: 0,
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket.send(Message::Text(txt.into())).await?;
    Ok(bytes)
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;
    // First ping goes out one period after connecting.
    let mut keepalive = interval_at(Instant::now() + ctx.ping_period, ctx.ping_period);

    loop {
        let disconnect: bool = tokio::select! {
            // Incoming Message from Viewer
            incoming = socket.recv() => {
                match handle_incoming_ws(socket, incoming, ctx).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing Instruction Batch
            batch = ctx.outbox_rx.recv() => {
                match batch {
                    Some(batch) => match forward_instructions(socket, &batch, ctx).await {
                        Ok(()) => false,
                        Err(e) => {
                            // Send failures end the connection; cleanup deregisters below.
                            warn!(error = ?e, "failed to send instructions");
                            true
                        }
                    },
                    // Unreachable while `ctx` owns a sender.
                    None => true,
                }
            }

            // Keepalive
            _ = keepalive.tick() => {
                match socket.send(Message::Ping(Bytes::new())).await {
                    Ok(()) => {
                        ctx.msgs_out += 1;
                        false
                    }
                    Err(e) => {
                        warn!(error = ?e, "failed to send keepalive ping");
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Err(err) = socket.send(Message::Close(None)).await {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    disconnect_cleanup(ctx);

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Subscribe { time }) => {
                        subscribe(ctx);
                        debug!(client_time = time, "subscribe accepted");
                        Ok(LoopControl::Continue)
                    }
                    Err(parse_err) => {
                        warn!(
                            bytes = text.len(),
                            error = %parse_err,
                            "failed to parse client message"
                        );
                        reply_protocol_error(socket, ctx).await
                    }
                }
            }
            Message::Binary(bytes) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += bytes.len() as u64;
                warn!(bytes = bytes.len(), "binary message not supported");
                reply_protocol_error(socket, ctx).await
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

// (Re-)registers this connection with an empty view; the next snapshot
// produces a full set of creates for it.
fn subscribe(ctx: &mut ConnCtx) {
    let outbox_tx = ctx.outbox_tx.clone();
    ctx.engine.register(ctx.subscriber_id, move |batch| {
        let _ = outbox_tx.send(batch);
    });
    ctx.subscribed = true;
}

async fn reply_protocol_error(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    ctx.invalid_messages += 1;
    socket
        .send(Message::Text(DEFAULT_ERROR_MESSAGE.into()))
        .await?;
    ctx.msgs_out += 1;
    ctx.bytes_out += DEFAULT_ERROR_MESSAGE.len() as u64;
    Ok(LoopControl::Continue)
}

async fn forward_instructions(
    socket: &mut WebSocket,
    batch: &[Instruction],
    ctx: &mut ConnCtx,
) -> Result<(), NetError> {
    let msg = ServerMessage::instructions(now_millis(), batch);
    let bytes = send_message(socket, &msg).await?;
    ctx.msgs_out += 1;
    ctx.bytes_out += bytes as u64;
    Ok(())
}

fn disconnect_cleanup(ctx: &mut ConnCtx) {
    if ctx.subscribed {
        // Only connections that subscribed hold a registration.
        ctx.engine.deregister(ctx.subscriber_id);
        ctx.subscribed = false;
    }

    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_messages = ctx.invalid_messages,
        "connection stats"
    );
    info!("client disconnected");
}
