use std::collections::HashMap;

use pagebridge::{Bridge, BridgeConfig, BrowserInfo, InboundMessage, OutboundMessage, TabRecord};
use pagebridge_cli::error::ErrorCode;
use pagebridge_cli::frontend::{self, Response};
use serde_json::{Value, json};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

/// Feeds `input` through the front-end and returns responses keyed by id.
async fn run_lines(bridge: Bridge, input: &str) -> HashMap<String, Response> {
	let (writer, mut reader) = tokio::io::duplex(64 * 1024);
	frontend::run(bridge, input.as_bytes(), writer).await.unwrap();

	let mut output = String::new();
	reader.read_to_string(&mut output).await.unwrap();
	output
		.lines()
		.map(|line| {
			let response: Response = serde_json::from_str(line).unwrap();
			(response.id.to_string(), response)
		})
		.collect()
}

fn error_code(response: &Response) -> ErrorCode {
	response.error.as_ref().expect("expected an error").code
}

#[tokio::test]
async fn test_requests_without_extension() {
	let bridge = Bridge::new(BridgeConfig::default());
	let input = [
		r#"{"id":1,"sessionId":"s1","op":"connect"}"#,
		r#"{"id":2,"sessionId":"s1","op":"open_tab","url":"not a url"}"#,
		r#"{"id":3,"op":"list_tabs"}"#,
		r#"{"id":4,"sessionId":"ghost","op":"end_session"}"#,
		"",
		"{garbage",
	]
	.join("\n");

	let responses = run_lines(bridge, &input).await;

	assert_eq!(responses.len(), 5);
	assert_eq!(error_code(&responses["1"]), ErrorCode::NotConnected);
	assert_eq!(error_code(&responses["2"]), ErrorCode::InvalidInput);
	assert_eq!(responses["3"].data, Some(json!([])));
	assert_eq!(responses["4"].data, Some(json!({"ended": false, "rejected": 0})));
	assert_eq!(error_code(&responses["null"]), ErrorCode::InvalidInput);
}

#[tokio::test]
async fn test_tool_call_through_fake_extension() {
	let bridge = Bridge::new(BridgeConfig::default());
	let (tx, mut rx) = mpsc::unbounded_channel();
	bridge.attach_extension(tx).unwrap();
	bridge.dispatch(InboundMessage::Connected {
		session_id: None,
		browser: BrowserInfo {
			name: "Chrome".to_string(),
			version: "120.0".to_string(),
		},
		tabs: vec![TabRecord::new(1, "Search", "https://example.com")],
	});

	let extension = bridge.clone();
	tokio::spawn(async move {
		while let Some(message) = rx.recv().await {
			if let OutboundMessage::CallTool { call_id, args, .. } = message {
				let reply = json!({"type": "toolResult", "callId": call_id, "result": {"echo": args}});
				extension.handle_extension_text(&reply.to_string()).unwrap();
			}
		}
	});

	let input = [
		r#"{"id":"a","sessionId":"agent-1","op":"call_tool","tabId":1,"toolName":"search","args":{"q":"rust"}}"#,
		r#"{"id":"b","sessionId":"agent-2","op":"call_tool","tabId":1,"toolName":"search"}"#,
		r#"{"id":"c","sessionId":"agent-1","op":"call_tool","tabId":42,"toolName":"search"}"#,
	]
	.join("\n");

	let responses = run_lines(bridge.clone(), &input).await;

	assert_eq!(responses[r#""a""#].data, Some(json!({"echo": {"q": "rust"}})));
	assert_eq!(responses[r#""b""#].data, Some(json!({"echo": {}})));
	let missing = &responses[r#""c""#];
	assert!(!missing.ok);
	assert_eq!(error_code(missing), ErrorCode::NotFound);
	assert_eq!(missing.error.as_ref().unwrap().message, "Tab not found: 42");

	let sessions: Vec<String> = bridge.session_ids();
	assert_eq!(sessions, vec!["agent-1".to_string(), "agent-2".to_string()]);
	assert!(responses.values().all(|r| r.id != Value::Null));
}
