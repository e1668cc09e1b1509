use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

#[derive(Default)]
struct RecordingHost {
	scripts: Mutex<Vec<String>>,
	callbacks: Mutex<Vec<(String, bool)>>,
	fail: bool,
}

impl ScriptHost for RecordingHost {
	fn evaluate_script(&self, script: String) -> anyhow::Result<()> {
		if self.fail {
			anyhow::bail!("web view detached");
		}
		self.scripts.lock().push(script);
		Ok(())
	}

	fn set_message_callback(&self, channel: &str, callback: Option<InboundHandler>) {
		self.callbacks.lock().push((channel.to_string(), callback.is_some()));
	}
}

#[test]
fn test_web_view_send_wraps_in_dispatch_script() {
	let host = Arc::new(RecordingHost::default());
	let transport = WebViewTransport::new(host.clone(), "LinkBridgeBLE");

	transport.send(r#"{"jsonrpc":"2.0","id":1,"result":{"type":"SuccessResult"}}"#.to_string());

	let scripts = host.scripts.lock();
	assert_eq!(scripts.len(), 1);
	assert!(scripts[0].starts_with("dispatchEvent(new CustomEvent('LinkBridgeBLEResponse'"));
}

#[test]
fn test_web_view_send_swallows_host_failures() {
	let host = Arc::new(RecordingHost {
		fail: true,
		..Default::default()
	});
	let transport = WebViewTransport::new(host.clone(), "LinkBridge");

	transport.send("{}".to_string());

	assert!(host.scripts.lock().is_empty());
}

#[test]
fn test_web_view_registers_under_channel_name() {
	let host = Arc::new(RecordingHost::default());
	let transport = WebViewTransport::new(host.clone(), "LinkBridge");

	transport.set_inbound(Some(Arc::new(|_| {})));
	transport.set_inbound(None);

	assert_eq!(
		*host.callbacks.lock(),
		vec![("LinkBridge".to_string(), true), ("LinkBridge".to_string(), false)]
	);
}

#[tokio::test]
async fn test_memory_transport_delivers_both_ways() {
	let (transport, mut peer) = MemoryTransport::pair();
	let received = Arc::new(Mutex::new(Vec::new()));

	let sink = Arc::clone(&received);
	transport.set_inbound(Some(Arc::new(move |message| sink.lock().push(message))));

	assert!(peer.post("ping"));
	transport.send("pong".to_string());

	assert_eq!(*received.lock(), vec!["ping".to_string()]);
	assert_eq!(peer.recv().await.as_deref(), Some("pong"));
}

#[test]
fn test_memory_transport_replaces_handler() {
	let (transport, peer) = MemoryTransport::pair();
	let first = Arc::new(AtomicUsize::new(0));
	let second = Arc::new(AtomicUsize::new(0));

	let counter = Arc::clone(&first);
	transport.set_inbound(Some(Arc::new(move |_| {
		counter.fetch_add(1, Ordering::SeqCst);
	})));
	let counter = Arc::clone(&second);
	transport.set_inbound(Some(Arc::new(move |_| {
		counter.fetch_add(1, Ordering::SeqCst);
	})));

	peer.post("a");
	peer.post("b");

	assert_eq!(first.load(Ordering::SeqCst), 0);
	assert_eq!(second.load(Ordering::SeqCst), 2);
}

#[test]
fn test_memory_transport_drops_without_handler() {
	let (transport, peer) = MemoryTransport::pair();
	assert!(!peer.post("lost"));

	transport.set_inbound(Some(Arc::new(|_| {})));
	assert!(peer.has_handler());
	transport.set_inbound(None);
	assert!(!peer.post("lost again"));
}

#[test]
fn test_memory_transport_send_after_peer_dropped() {
	let (transport, peer) = MemoryTransport::pair();
	drop(peer);
	transport.send("nobody listening".to_string());
}

#[test]
fn test_handler_may_reenter_transport() {
	let (transport, mut peer) = MemoryTransport::pair();

	let echo = Arc::clone(&transport);
	transport.set_inbound(Some(Arc::new(move |message| echo.send(message))));

	peer.post("echo");
	assert_eq!(peer.try_recv().as_deref(), Some("echo"));
}
