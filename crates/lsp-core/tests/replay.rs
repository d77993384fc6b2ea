//! End-to-end replay of a recorded session through the full `Server`
//! facade, not just the transport in isolation.

use std::io::Write as _;
use std::sync::Arc;

use lsp_core::server::{LanguageServer, Server};
use lsp_core::transport::replay::ReplayTransport;

struct Noop;
impl LanguageServer for Noop {}

fn write_journal(contents: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let mut file = std::fs::File::create(dir.path().join("session.log")).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    dir
}

#[test]
fn a_full_handshake_replays_cleanly_and_matches_every_response() {
    let dir = write_journal(concat!(
        "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n\n",
        "# MATCH: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"capabilities\":{}}}\n\n",
        "---\n",
        "{\"jsonrpc\":\"2.0\",\"method\":\"initialized\"}\n\n",
        "---\n",
        "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"shutdown\"}\n\n",
        "# MATCH: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":null}\n\n",
        "---\n",
        "{\"jsonrpc\":\"2.0\",\"method\":\"exit\"}\n\n",
        "---\n",
    ));

    let transport = Arc::new(ReplayTransport::open(dir.path().join("session.log")).unwrap());
    let server = Server::new(transport.clone(), Arc::new(Noop));
    assert!(server.run().unwrap());

    let stats = transport.stats();
    assert_eq!(stats.matches, 2);
    assert_eq!(stats.timeouts, 0);
    assert_eq!(stats.ooo_matches, 0);
}

#[test]
fn a_handler_emitted_notification_is_matched_alongside_its_reply() {
    use lsp_core::client::Client;
    use lsp_core::dispatcher::Dispatcher;
    use lsp_core::error::HostError;

    struct NotifiesThenReplies;
    impl LanguageServer for NotifiesThenReplies {
        fn setup(&self, dispatcher: &Dispatcher, client: &Client) -> Result<(), HostError> {
            let client = client.clone();
            dispatcher.bind_request("index/run", move |request| {
                client.notify("index/status", Some(serde_json::json!({"running": true})));
                request.reply(None);
            })
        }
    }

    let dir = write_journal(concat!(
        "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n\n",
        "# MATCH: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"capabilities\":{}}}\n\n",
        "---\n",
        "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"index/run\"}\n\n",
        "# MATCH: {\"jsonrpc\":\"2.0\",\"method\":\"index/status\",\"params\":{\"running\":true}}\n\n",
        "# MATCH: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":null}\n\n",
        "---\n",
        "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"shutdown\"}\n\n",
        "# MATCH: {\"jsonrpc\":\"2.0\",\"id\":3,\"result\":null}\n\n",
        "---\n",
        "{\"jsonrpc\":\"2.0\",\"method\":\"exit\"}\n\n",
        "---\n",
    ));

    let transport = Arc::new(ReplayTransport::open(dir.path().join("session.log")).unwrap());
    let server = Server::new(transport.clone(), Arc::new(NotifiesThenReplies));
    assert!(server.run().unwrap());

    let stats = transport.stats();
    assert_eq!(stats.matches, 3);
    assert_eq!(stats.timeouts, 0);
}
