use pagebridge::{Bridge, BridgeConfig};
use pagebridge_cli::relay;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

#[tokio::test]
async fn test_health_check() {
	let listener = relay::bind("127.0.0.1", 0).await.unwrap();
	let addr = listener.local_addr().unwrap();
	let (stop_tx, stop_rx) = oneshot::channel::<()>();
	let server = tokio::spawn(relay::serve(listener, Bridge::new(BridgeConfig::default()), async move {
		let _ = stop_rx.await;
	}));

	let mut stream = TcpStream::connect(addr).await.unwrap();
	stream
		.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
		.await
		.unwrap();
	let mut response = String::new();
	stream.read_to_string(&mut response).await.unwrap();

	assert!(response.starts_with("HTTP/1.1 200"));
	assert!(response.ends_with("OK"));

	stop_tx.send(()).unwrap();
	server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_bind_rejects_bad_address() {
	let err = relay::bind("not a host", 80).await.unwrap_err();
	assert!(err.to_string().contains("Invalid host/port combination"));
}
