//! Handler for `GET /live`: the WebSocket event stream.
//!
//! Each connection registers one observer. The server sends every event as
//! a JSON text frame, starting with `INITIAL_STATE`. Anything the client
//! sends is ignored except `Close`.

use std::sync::Arc;

use axum::{
  extract::{
    State,
    ws::{Message, WebSocket, WebSocketUpgrade},
  },
  response::Response,
};
use futures::{SinkExt as _, StreamExt as _};
use sluice_core::store::DurableStore;
use sluice_engine::Hub;
use tracing::{debug, warn};

/// `GET /live`
pub async fn handler<S>(
  State(hub): State<Arc<Hub<S>>>,
  upgrade: WebSocketUpgrade,
) -> Response
where
  S: DurableStore + 'static,
{
  upgrade.on_upgrade(move |socket| stream_events(socket, hub))
}

async fn stream_events<S>(socket: WebSocket, hub: Arc<Hub<S>>)
where
  S: DurableStore + 'static,
{
  let mut observer = hub.connect();
  let id = observer.id();
  let (mut sink, mut incoming) = socket.split();

  loop {
    tokio::select! {
      event = observer.recv() => {
        let Some(event) = event else { break };
        let text = match serde_json::to_string(&*event) {
          Ok(text) => text,
          Err(e) => {
            warn!(kind = event.kind(), error = %e, "failed to encode event");
            continue;
          }
        };
        if sink.send(Message::Text(text.into())).await.is_err() {
          debug!(observer = %id, "send failed");
          break;
        }
      }
      message = incoming.next() => match message {
        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
        Some(Ok(_)) => {}
      },
    }
  }

  hub.disconnect(id);
}
