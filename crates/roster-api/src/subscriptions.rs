//! `GET /subscriptions` — live `personAdded` notifications over a websocket.
//!
//! The subscription is attached to the bus before the upgrade completes, so
//! every person added after the handshake request arrives is delivered.
//! Each event is one text frame: `{"addedPerson": {...}}`.

use std::sync::Arc;

use axum::{
  extract::{
    State,
    ws::{Message, WebSocket, WebSocketUpgrade},
  },
  response::Response,
};
use futures::StreamExt as _;
use roster_core::{
  event::{DirectoryEvent, Topic},
  store::DirectoryStore,
};
use serde_json::json;

use crate::{Directory, bus::Subscription};

pub async fn handler<S: DirectoryStore + 'static>(
  State(directory): State<Arc<Directory<S>>>,
  ws: WebSocketUpgrade,
) -> Response {
  let subscription = directory.bus().subscribe(Topic::PersonAdded);
  tracing::debug!(subscribers = directory.bus().subscriber_count(), "subscription opened");
  ws.on_upgrade(move |socket| forward(socket, subscription))
}

/// Render an event as the frame a subscriber receives.
pub fn frame(event: &DirectoryEvent) -> serde_json::Result<String> {
  match event {
    DirectoryEvent::PersonAdded(person) => {
      serde_json::to_string(&json!({ "addedPerson": person }))
    }
  }
}

async fn forward(mut socket: WebSocket, mut subscription: Subscription) {
  loop {
    tokio::select! {
      event = subscription.next() => {
        let Some(event) = event else { break };
        let text = match frame(&event) {
          Ok(text) => text,
          Err(e) => {
            tracing::error!(error = %e, "cannot encode event");
            continue;
          }
        };
        if socket.send(Message::Text(text.into())).await.is_err() {
          break;
        }
      }
      incoming = socket.recv() => {
        match incoming {
          Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
          Some(Ok(_)) => {}
        }
      }
    }
  }

  subscription.close();
  tracing::debug!("subscription closed");
}
