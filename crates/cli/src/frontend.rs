//! NDJSON request/response front-end.
//!
//! One request object per input line, one response object per output line.
//! Requests run concurrently, so responses may come back out of order and
//! are matched by the echoed `id`.

use anyhow::{Context, Result};
use pagebridge::{Bridge, TabId, router::DEFAULT_SESSION};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::CommandError;

/// One line of input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
	/// Echoed back verbatim; any JSON value.
	pub id: Value,
	#[serde(default)]
	pub session_id: Option<String>,
	#[serde(flatten)]
	pub op: Op,
}

impl Request {
	pub fn session(&self) -> &str {
		self.session_id.as_deref().unwrap_or(DEFAULT_SESSION)
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Op {
	Connect,
	OpenTab {
		url: String,
	},
	FocusTab {
		tab_id: TabId,
	},
	CloseTab {
		tab_id: TabId,
	},
	CallTool {
		tab_id: TabId,
		tool_name: String,
		#[serde(default = "empty_args")]
		args: Value,
	},
	DiscoverTools {
		tab_id: TabId,
	},
	ListTabs,
	ListSessions,
	EndSession,
}

fn empty_args() -> Value {
	json!({})
}

impl Op {
	pub fn name(&self) -> &'static str {
		match self {
			Op::Connect => "connect",
			Op::OpenTab { .. } => "open_tab",
			Op::FocusTab { .. } => "focus_tab",
			Op::CloseTab { .. } => "close_tab",
			Op::CallTool { .. } => "call_tool",
			Op::DiscoverTools { .. } => "discover_tools",
			Op::ListTabs => "list_tabs",
			Op::ListSessions => "list_sessions",
			Op::EndSession => "end_session",
		}
	}
}

/// One line of output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
	pub id: Value,
	pub ok: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

impl Response {
	pub fn success(id: Value, data: Value) -> Self {
		Self {
			id,
			ok: true,
			data: Some(data),
			error: None,
		}
	}

	pub fn failure(id: Value, error: CommandError) -> Self {
		Self {
			id,
			ok: false,
			data: None,
			error: Some(error),
		}
	}
}

/// Parses one input line. Failures still carry the request id when one
/// could be read.
pub fn parse_request(line: &str) -> std::result::Result<Request, Response> {
	let value: Value = serde_json::from_str(line)
		.map_err(|err| Response::failure(Value::Null, CommandError::invalid_input(format!("Invalid JSON: {err}"))))?;
	let id = value.get("id").cloned().unwrap_or(Value::Null);
	serde_json::from_value(value)
		.map_err(|err| Response::failure(id, CommandError::invalid_input(format!("Invalid request: {err}"))))
}

/// Runs one request against the bridge.
pub async fn execute(bridge: &Bridge, request: Request) -> Response {
	let id = request.id.clone();
	let session = request.session().to_string();
	debug!(target: "pagebridge.frontend", %session, op = request.op.name(), "request");
	match run_op(bridge, &session, request.op).await {
		Ok(data) => Response::success(id, data),
		Err(error) => Response::failure(id, error),
	}
}

async fn run_op(bridge: &Bridge, session: &str, op: Op) -> std::result::Result<Value, CommandError> {
	let data = match op {
		Op::Connect => to_data(bridge.connect(session).await?)?,
		Op::OpenTab { url } => {
			let url = url::Url::parse(&url)
				.map_err(|err| CommandError::invalid_input(format!("Invalid URL '{url}': {err}")))?;
			to_data(bridge.open_tab(session, url.as_str()).await?)?
		}
		Op::FocusTab { tab_id } => to_data(bridge.focus_tab(session, tab_id).await?)?,
		Op::CloseTab { tab_id } => {
			bridge.close_tab(session, tab_id).await?;
			json!({ "closed": tab_id })
		}
		Op::CallTool { tab_id, tool_name, args } => bridge.call_page_tool(session, tab_id, &tool_name, args).await?,
		Op::DiscoverTools { tab_id } => to_data(bridge.discover_tools_for_tab(session, tab_id).await?)?,
		Op::ListTabs => to_data(bridge.list_tabs())?,
		Op::ListSessions => to_data(bridge.session_snapshots())?,
		Op::EndSession => {
			let rejected = bridge.delete_session(session);
			json!({ "ended": rejected.is_some(), "rejected": rejected.unwrap_or(0) })
		}
	};
	Ok(data)
}

fn to_data<T: Serialize>(value: T) -> std::result::Result<Value, CommandError> {
	serde_json::to_value(value).map_err(|err| CommandError::new(crate::error::ErrorCode::InternalError, err.to_string()))
}

/// Serves requests from `input` until EOF, then waits for in-flight
/// requests to answer.
pub async fn run<R, W>(bridge: Bridge, input: R, mut output: W) -> Result<()>
where
	R: AsyncRead + Unpin,
	W: AsyncWrite + Unpin + Send + 'static,
{
	let (tx, mut rx) = mpsc::unbounded_channel::<Response>();

	let writer = tokio::spawn(async move {
		while let Some(response) = rx.recv().await {
			write_response(&mut output, &response).await?;
		}
		Ok::<_, anyhow::Error>(())
	});

	let mut lines = BufReader::new(input).lines();
	while let Some(line) = lines.next_line().await.context("Failed reading request")? {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}
		match parse_request(line) {
			Ok(request) => {
				let bridge = bridge.clone();
				let tx = tx.clone();
				tokio::spawn(async move {
					let response = execute(&bridge, request).await;
					let _ = tx.send(response);
				});
			}
			Err(response) => {
				warn!(target: "pagebridge.frontend", "rejected malformed request");
				let _ = tx.send(response);
			}
		}
	}

	info!(target: "pagebridge.frontend", "input closed");
	drop(tx);
	writer.await.context("Response writer panicked")?
}

async fn write_response<W>(writer: &mut W, response: &Response) -> Result<()>
where
	W: AsyncWrite + Unpin,
{
	let payload = serde_json::to_string(response).context("Failed to serialize response")?;
	writer
		.write_all(format!("{payload}\n").as_bytes())
		.await
		.context("Failed writing response")?;
	writer.flush().await.context("Failed flushing response")?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ErrorCode;

	#[test]
	fn test_parse_call_tool() {
		let request =
			parse_request(r#"{"id":1,"sessionId":"s1","op":"call_tool","tabId":3,"toolName":"search"}"#).unwrap();

		assert_eq!(request.id, json!(1));
		assert_eq!(request.session(), "s1");
		assert_eq!(
			request.op,
			Op::CallTool {
				tab_id: 3,
				tool_name: "search".to_string(),
				args: json!({}),
			}
		);
	}

	#[test]
	fn test_missing_session_uses_default() {
		let request = parse_request(r#"{"id":"a","op":"list_tabs"}"#).unwrap();
		assert_eq!(request.session(), DEFAULT_SESSION);
		assert_eq!(request.op, Op::ListTabs);
	}

	#[test]
	fn test_unknown_op_keeps_id() {
		let response = parse_request(r#"{"id":7,"op":"reload"}"#).unwrap_err();

		assert_eq!(response.id, json!(7));
		assert!(!response.ok);
		assert_eq!(response.error.unwrap().code, ErrorCode::InvalidInput);
	}

	#[test]
	fn test_invalid_json_has_null_id() {
		let response = parse_request("{nope").unwrap_err();
		assert_eq!(response.id, Value::Null);
	}

	#[test]
	fn test_response_shape() {
		let ok = serde_json::to_value(Response::success(json!(1), json!([]))).unwrap();
		assert_eq!(ok, json!({"id": 1, "ok": true, "data": []}));

		let failed = Response::failure(json!(2), CommandError::new(ErrorCode::Timeout, "Timeout waiting for tool result"));
		assert_eq!(
			serde_json::to_value(failed).unwrap(),
			json!({"id": 2, "ok": false, "error": {"code": "TIMEOUT", "message": "Timeout waiting for tool result"}})
		);
	}
}
