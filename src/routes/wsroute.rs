use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::metrics;
use crate::session::{ChatMessage, ConnectionId, SessionCoordinator, SessionEvent, SessionId};
use crate::state::AppState;
use crate::websocket::message_types::WsInboundEvent;
use crate::websocket::{ConnectionRegistry, Frame};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Tells the actor its start-session request completed.
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct SessionStarted(SessionId);

/// One actor per websocket connection: the transport adapter between the
/// socket and the session coordinator.
///
/// The actor owns the connection's stable identity, decodes inbound
/// frames into coordinator operations, and drains the outbound frame
/// queue filled by the broadcast gateway. Actor stop triggers the
/// coordinator's `disconnect` exactly once.
pub struct WsSession {
    identity: ConnectionId,
    /// Session this connection publishes to, set once start-session
    /// succeeds. Binary frames are only meaningful afterwards.
    publishing: Option<SessionId>,
    outbound: Option<UnboundedReceiver<Frame>>,
    connections: ConnectionRegistry,
    coordinator: Arc<SessionCoordinator>,
    hb: Instant,
}

impl WsSession {
    fn new(
        identity: ConnectionId,
        outbound: UnboundedReceiver<Frame>,
        connections: ConnectionRegistry,
        coordinator: Arc<SessionCoordinator>,
    ) -> Self {
        Self {
            identity,
            publishing: None,
            outbound: Some(outbound),
            connections,
            coordinator,
            hb: Instant::now(),
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(identity = %act.identity, "websocket heartbeat timed out");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn dispatch(&self, event: WsInboundEvent, ctx: &mut ws::WebsocketContext<Self>) {
        metrics::observe_event(event.label());
        let identity = self.identity;
        let coordinator = self.coordinator.clone();

        match event {
            WsInboundEvent::StartSession => {
                let addr = ctx.address();
                actix::spawn(async move {
                    let session_id = coordinator.start_session(identity).await;
                    metrics::observe_session_started();
                    addr.do_send(SessionStarted(session_id));
                });
            }
            WsInboundEvent::JoinSession { session_id } => {
                let connections = self.connections.clone();
                actix::spawn(async move {
                    // Subscribe the socket first so the joiner sees its own
                    // viewer-count broadcast.
                    connections.join_room(&session_id, identity).await;
                    if coordinator.join_session(&session_id, identity).await.is_none() {
                        connections.leave_room(&session_id, identity).await;
                    }
                });
            }
            WsInboundEvent::ChatMessage {
                session_id,
                author,
                text,
            } => {
                actix::spawn(async move {
                    coordinator
                        .chat_message(&session_id, ChatMessage { author, text })
                        .await;
                });
            }
            WsInboundEvent::CastVote { session_id, kind } => {
                actix::spawn(async move {
                    let _ = coordinator.cast_vote(&session_id, identity, kind).await;
                });
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(identity = %self.identity, "websocket session started");
        self.heartbeat(ctx);

        // Bridge the gateway's frame queue into this actor.
        if let Some(rx) = self.outbound.take() {
            ctx.add_stream(UnboundedReceiverStream::new(rx));
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(identity = %self.identity, "websocket session stopped");
        metrics::observe_connection_closed();

        let identity = self.identity;
        let connections = self.connections.clone();
        let coordinator = self.coordinator.clone();
        actix::spawn(async move {
            // Drop the socket from the fan-out maps before the coordinator
            // broadcasts to the remaining members.
            connections.unregister(identity).await;
            coordinator.disconnect(identity).await;
        });
    }
}

impl Handler<SessionStarted> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: SessionStarted, ctx: &mut Self::Context) {
        self.publishing = Some(msg.0.clone());
        let event = SessionEvent::SessionStarted { session_id: msg.0 };
        match serde_json::to_string(&event) {
            Ok(json) => ctx.text(json),
            Err(err) => tracing::error!(error = %err, "failed to encode session-started"),
        }
    }
}

// Outbound frames queued by the broadcast gateway.
impl StreamHandler<Frame> for WsSession {
    fn handle(&mut self, frame: Frame, ctx: &mut Self::Context) {
        match frame {
            Frame::Text(text) => ctx.text(text),
            Frame::Binary(chunk) => ctx.binary(chunk),
        }
    }
}

// Inbound websocket protocol messages.
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.hb = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<WsInboundEvent>(&text) {
                Ok(event) => self.dispatch(event, ctx),
                Err(err) => {
                    tracing::warn!(identity = %self.identity, error = %err, "unparseable ws event");
                }
            },
            Ok(ws::Message::Binary(chunk)) => {
                let Some(session_id) = self.publishing.clone() else {
                    tracing::debug!(
                        identity = %self.identity,
                        "media chunk from a connection that publishes nothing"
                    );
                    return;
                };
                metrics::observe_event("media-chunk");
                let coordinator = self.coordinator.clone();
                actix::spawn(async move {
                    coordinator.relay_media_chunk(&session_id, chunk).await;
                });
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(identity = %self.identity, ?reason, "websocket closed by peer");
                ctx.stop();
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(identity = %self.identity, error = %err, "websocket protocol error");
                ctx.stop();
            }
        }
    }
}

/// GET /ws — upgrade the connection and hand it a stable identity.
#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let identity = ConnectionId::new();
    let outbound = state.connections.register(identity).await;
    metrics::observe_connection_opened();

    let session = WsSession::new(
        identity,
        outbound,
        state.connections.clone(),
        state.coordinator.clone(),
    );
    match ws::start(session, &req, stream) {
        Ok(resp) => Ok(resp),
        Err(err) => {
            // Handshake failed before the actor started; undo the
            // registration ourselves since `stopped` will never run.
            state.connections.unregister(identity).await;
            metrics::observe_connection_closed();
            Err(err)
        }
    }
}
