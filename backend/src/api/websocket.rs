//! GraphQL subscriptions over WebSocket.
//!
//! async-graphql runs the protocol itself; this module adds the gateway
//! handshake, a keep-alive frame sent every `keep_alive` once the connection is
//! acknowledged, and the gateway's error code on a refused handshake.

use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use async_graphql::{
    http::{WebSocket as GraphQLConnection, WebSocketProtocols, WsMessage},
    Data, ErrorExtensions,
};
use axum::{
    extract::ws::{CloseFrame, Message, WebSocket},
    http::{header::SEC_WEBSOCKET_PROTOCOL, HeaderMap},
};
use futures::{
    future,
    stream::{self, BoxStream},
    SinkExt, Stream, StreamExt,
};
use serde_json::{json, Value};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::errors::AppError;
use crate::AppState;

/// Close code used for a refused `graphql-transport-ws` handshake without an
/// error code of its own.
const FORBIDDEN_CLOSE_CODE: u16 = 4403;

/// First protocol named in `Sec-WebSocket-Protocol` that async-graphql speaks.
pub fn protocol(headers: &HeaderMap) -> Option<WebSocketProtocols> {
    headers
        .get(SEC_WEBSOCKET_PROTOCOL)?
        .to_str()
        .ok()?
        .split(',')
        .find_map(|name| WebSocketProtocols::from_str(name.trim()).ok())
}

pub fn keep_alive_frame(protocol: WebSocketProtocols) -> WsMessage {
    let kind = match protocol {
        WebSocketProtocols::SubscriptionsTransportWS => "ka",
        WebSocketProtocols::GraphQLWS => "ping",
    };
    WsMessage::Text(json!({ "type": kind }).to_string())
}

/// `connection_error` carrying the error code, or a close frame in the
/// 4000 range for the newer protocol, which has no error payload.
pub fn refusal_frame(protocol: WebSocketProtocols, err: &AppError) -> WsMessage {
    match protocol {
        WebSocketProtocols::SubscriptionsTransportWS => WsMessage::Text(
            json!({
                "type": "connection_error",
                "payload": {
                    "message": err.to_string(),
                    "extensions": { "code": err.code() },
                },
            })
            .to_string(),
        ),
        WebSocketProtocols::GraphQLWS => {
            let code = match err {
                AppError::Authorization { code, .. } if *code < 1000 => 4000 + code,
                _ => FORBIDDEN_CLOSE_CODE,
            };
            WsMessage::Close(code, err.to_string())
        }
    }
}

/// Server frames for one connection, given the client's text or binary frames.
/// The stream ends when the protocol closes the connection or the input ends.
pub fn connection<S>(
    state: &AppState,
    protocol: WebSocketProtocols,
    input: S,
) -> BoxStream<'static, WsMessage>
where
    S: Stream + Send + 'static,
    S::Item: AsRef<[u8]>,
{
    let keep_alive = state.gateway.options().subscriptions.keep_alive;
    let acknowledged = Arc::new(AtomicBool::new(false));
    let refused: Arc<Mutex<Option<AppError>>> = Arc::default();

    let on_connection_init = {
        let gateway = state.gateway.clone();
        let acknowledged = acknowledged.clone();
        let refused = refused.clone();

        move |params: Value| async move {
            match gateway.connect(&params).await {
                Ok(context) => {
                    acknowledged.store(true, Ordering::Release);
                    let mut data = Data::default();
                    data.insert(context);
                    Ok(data)
                }
                Err(err) => {
                    let extended = err.extend();
                    if let Ok(mut slot) = refused.lock() {
                        *slot = Some(err);
                    }
                    Err(extended)
                }
            }
        }
    };

    // The frame that follows a refused handshake is the protocol's own
    // rejection, which drops the error code.
    let frames = GraphQLConnection::new(state.schema.clone(), input, protocol)
        .on_connection_init(on_connection_init)
        .map(move |frame| {
            match refused.lock().ok().and_then(|mut slot| slot.take()) {
                Some(err) => refusal_frame(protocol, &err),
                None => frame,
            }
        })
        .map(Some)
        .chain(stream::once(future::ready(None)));

    let mut ticker = interval_at(Instant::now() + keep_alive, keep_alive);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let keep_alives = stream::unfold(ticker, |mut ticker| async move {
        ticker.tick().await;
        Some(((), ticker))
    })
    .filter(move |_| future::ready(acknowledged.load(Ordering::Acquire)))
    .map(move |_| Some(keep_alive_frame(protocol)));

    // `None` marks the end of the protocol stream; the ticker never ends.
    stream::select(frames, keep_alives)
        .take_while(|frame| future::ready(frame.is_some()))
        .filter_map(future::ready)
        .boxed()
}

/// Drives an upgraded socket until either side closes it.
pub async fn serve(state: AppState, protocol: WebSocketProtocols, socket: WebSocket) {
    let (mut sink, input) = socket.split();

    let input = input
        .take_while(|message| future::ready(message.is_ok()))
        .filter_map(|message| {
            future::ready(match message {
                Ok(message @ (Message::Text(_) | Message::Binary(_))) => Some(message.into_data()),
                _ => None,
            })
        });

    let mut frames = connection(&state, protocol, input);
    while let Some(frame) = frames.next().await {
        let message = match frame {
            WsMessage::Text(text) => Message::Text(text.into()),
            WsMessage::Close(code, reason) => Message::Close(Some(CloseFrame {
                code,
                reason: reason.into(),
            })),
        };
        if sink.send(message).await.is_err() {
            break;
        }
    }

    state.gateway.disconnect();
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn protocol_is_read_from_the_offered_list() {
        let mut headers = HeaderMap::new();
        assert_eq!(protocol(&headers), None);

        headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static("chat, graphql-ws"));
        assert_eq!(protocol(&headers), Some(WebSocketProtocols::SubscriptionsTransportWS));

        headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static("graphql-transport-ws"));
        assert_eq!(protocol(&headers), Some(WebSocketProtocols::GraphQLWS));
    }

    #[test]
    fn keep_alive_frame_follows_the_protocol() {
        assert_eq!(
            keep_alive_frame(WebSocketProtocols::SubscriptionsTransportWS),
            WsMessage::Text(r#"{"type":"ka"}"#.to_string())
        );
        assert_eq!(
            keep_alive_frame(WebSocketProtocols::GraphQLWS),
            WsMessage::Text(r#"{"type":"ping"}"#.to_string())
        );
    }

    #[test]
    fn refusal_keeps_the_error_code() {
        let err = AppError::Authorization {
            message: "currentUser Required".to_string(),
            code: 499,
        };

        let WsMessage::Text(text) = refusal_frame(WebSocketProtocols::SubscriptionsTransportWS, &err)
        else {
            panic!("expected a text frame");
        };
        let frame: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(frame["type"], "connection_error");
        assert_eq!(frame["payload"]["message"], "currentUser Required");
        assert_eq!(frame["payload"]["extensions"]["code"], "499");

        assert_eq!(
            refusal_frame(WebSocketProtocols::GraphQLWS, &err),
            WsMessage::Close(4499, "currentUser Required".to_string())
        );
        assert_eq!(
            refusal_frame(
                WebSocketProtocols::GraphQLWS,
                &AppError::Authentication("invalid token".to_string())
            ),
            WsMessage::Close(4403, "invalid token".to_string())
        );
    }
}
