//! WebSocket endpoint the browser extension connects to.

use std::future::Future;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use pagebridge::{Bridge, OutboundMessage};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

pub fn router(bridge: Bridge) -> Router {
	Router::new()
		.route("/", get(|| async { "OK" }))
		.route(
			"/extension",
			get(
				|ws: WebSocketUpgrade, State(bridge): State<Bridge>| async move {
					ws.on_upgrade(|socket| handle_extension_socket(socket, bridge))
				},
			),
		)
		.with_state(bridge)
}

pub async fn bind(host: &str, port: u16) -> Result<TcpListener> {
	let addr: SocketAddr = format!("{host}:{port}")
		.parse()
		.with_context(|| format!("Invalid host/port combination: {host}:{port}"))?;

	let listener = TcpListener::bind(addr)
		.await
		.with_context(|| format!("Failed to bind extension endpoint to {addr}"))?;

	info!(target: "pagebridge.relay", %addr, "listening for extension");
	Ok(listener)
}

/// Serves the extension endpoint on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, bridge: Bridge, shutdown: F) -> Result<()>
where
	F: Future<Output = ()> + Send + 'static,
{
	axum::serve(listener, router(bridge).into_make_service())
		.with_graceful_shutdown(shutdown)
		.await
		.context("Extension endpoint error")
}

async fn handle_extension_socket(mut socket: WebSocket, bridge: Bridge) {
	let (tx, rx) = mpsc::unbounded_channel::<OutboundMessage>();
	let link = match bridge.attach_extension(tx) {
		Ok(link) => link,
		Err(err) => {
			warn!(target: "pagebridge.relay", error = %err, "refusing second extension connection");
			let frame = CloseFrame {
				code: close_code::POLICY,
				reason: err.to_string().into(),
			};
			let _ = socket.send(Message::Close(Some(frame))).await;
			return;
		}
	};
	info!(target: "pagebridge.relay", %link, "extension socket open");

	let mut rx_stream = UnboundedReceiverStream::new(rx);
	let (mut ws_tx, mut ws_rx) = socket.split();

	let send_task = tokio::spawn(async move {
		while let Some(message) = rx_stream.next().await {
			let text = match message.to_json() {
				Ok(text) => text,
				Err(err) => {
					warn!(target: "pagebridge.relay", kind = message.kind(), error = %err, "failed to encode message");
					continue;
				}
			};
			if ws_tx.send(Message::Text(text.into())).await.is_err() {
				break;
			}
		}
	});

	while let Some(msg) = ws_rx.next().await {
		match msg {
			Ok(Message::Text(text)) => {
				if let Err(err) = bridge.handle_extension_text(text.as_str()) {
					debug!(target: "pagebridge.relay", %link, error = %err, "dropped extension frame");
				}
			}
			Ok(Message::Close(_)) => break,
			Ok(_) => {}
			Err(err) => {
				warn!(target: "pagebridge.relay", %link, error = %err, "extension websocket error");
				break;
			}
		}
	}

	send_task.abort();
	let rejected = bridge.detach_extension(link);
	info!(target: "pagebridge.relay", %link, rejected, "extension socket closed");
}
