use cursor_relay::prelude::*;
use futures_util::{SinkExt, StreamExt};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestRelay {
    addr: SocketAddr,
    repo: Arc<dyn ConnectionRepository>,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<cursor_relay::Result<()>>,
}

impl TestRelay {
    async fn start(config: Config) -> Self {
        let config = Config {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            ..config
        };
        let server = WebSocketServer::new(config);
        let repo = server.connection_repo().clone();
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.run(listener, async move {
            let _ = stopped.await;
        }));
        TestRelay {
            addr,
            repo,
            stop: Some(stop),
            handle,
        }
    }

    async fn connect(&self, uuid: Option<&str>) -> Client {
        let url = match uuid {
            Some(uuid) => format!("ws://{}/connect?uuid={}", self.addr, uuid),
            None => format!("ws://{}/connect", self.addr),
        };
        let (client, _) = connect_async(url).await.unwrap();
        client
    }

    /// Connects and waits until the relay has registered the connection.
    async fn join(&self, uuid: Option<&str>) -> Client {
        let before = self.repo.len().await.unwrap();
        let client = self.connect(uuid).await;
        self.wait_for_connections(before + 1).await;
        client
    }

    async fn wait_for_connections(&self, expected: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.repo.len().await.unwrap() != expected {
            assert!(
                Instant::now() < deadline,
                "expected {expected} connections, found {}",
                self.repo.len().await.unwrap()
            );
            sleep(Duration::from_millis(10)).await;
        }
    }
}

async fn recv_text(client: &mut Client) -> String {
    loop {
        let message = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("websocket error");
        if message.is_text() {
            return message.to_text().unwrap().to_string();
        }
    }
}

async fn assert_silent(client: &mut Client) {
    assert!(
        timeout(Duration::from_millis(200), client.next()).await.is_err(),
        "expected no message"
    );
}

async fn send_text(client: &mut Client, text: &str) {
    client.send(Message::text(text)).await.unwrap();
}

async fn assert_closed(client: &mut Client) {
    let deadline = Duration::from_secs(5);
    loop {
        match timeout(deadline, client.next()).await {
            Ok(None) | Ok(Some(Err(_))) => return,
            Ok(Some(Ok(message))) if message.is_close() => return,
            Ok(Some(Ok(_))) => continue,
            Err(_) => panic!("connection was not closed"),
        }
    }
}

#[tokio::test]
async fn test_alice_join_update_leave() {
    let relay = TestRelay::start(Config::default()).await;
    let mut bob = relay.join(Some("bob")).await;
    let mut alice = relay.join(Some("alice")).await;

    assert_eq!(recv_text(&mut bob).await, r#"{"type":"join","uuid":"alice"}"#);

    send_text(&mut alice, r#"{"x":10,"y":20}"#).await;
    assert_eq!(
        recv_text(&mut bob).await,
        r#"{"type":"update","uuid":"alice","x":10,"y":20}"#
    );

    alice.close(None).await.unwrap();
    assert_eq!(recv_text(&mut bob).await, r#"{"type":"leave","uuid":"alice"}"#);
    relay.wait_for_connections(1).await;
}

#[tokio::test]
async fn test_sender_does_not_receive_own_events() {
    let relay = TestRelay::start(Config::default()).await;
    let mut alice = relay.join(Some("alice")).await;
    let mut bob = relay.join(Some("bob")).await;
    assert_eq!(recv_text(&mut alice).await, r#"{"type":"join","uuid":"bob"}"#);

    send_text(&mut bob, r#"{"x":1,"y":2}"#).await;
    assert_eq!(
        recv_text(&mut alice).await,
        r#"{"type":"update","uuid":"bob","x":1,"y":2}"#
    );
    assert_silent(&mut bob).await;
}

#[tokio::test]
async fn test_malformed_payload_keeps_connection_open() {
    let relay = TestRelay::start(Config::default()).await;
    let mut bob = relay.join(Some("bob")).await;
    let mut alice = relay.join(Some("alice")).await;
    recv_text(&mut bob).await;

    send_text(&mut alice, "definitely not json").await;
    send_text(&mut alice, r#"["x", "y"]"#).await;
    alice
        .send(Message::binary(vec![1u8, 2, 3]))
        .await
        .unwrap();
    assert_silent(&mut bob).await;

    send_text(&mut alice, r#"{"x":7,"y":8}"#).await;
    assert_eq!(
        recv_text(&mut bob).await,
        r#"{"type":"update","uuid":"alice","x":7,"y":8}"#
    );
    assert_eq!(relay.repo.len().await.unwrap(), 2);
}

#[tokio::test]
async fn test_client_cannot_spoof_identity() {
    let relay = TestRelay::start(Config::default()).await;
    let mut bob = relay.join(Some("bob")).await;
    let mut alice = relay.join(Some("alice")).await;
    recv_text(&mut bob).await;

    send_text(&mut alice, r#"{"uuid":"bob","x":3,"y":4}"#).await;
    assert_eq!(
        recv_text(&mut bob).await,
        r#"{"type":"update","uuid":"alice","x":3,"y":4}"#
    );
}

#[tokio::test]
async fn test_anonymous_client_is_relayed_verbatim() {
    let relay = TestRelay::start(Config::default()).await;
    let mut bob = relay.join(Some("bob")).await;
    let mut anonymous = relay.join(None).await;
    assert_silent(&mut bob).await;

    send_text(&mut anonymous, r#"{"x":5,"y":6}"#).await;
    assert_eq!(recv_text(&mut bob).await, r#"{"x":5,"y":6}"#);

    anonymous.close(None).await.unwrap();
    relay.wait_for_connections(1).await;
    assert_silent(&mut bob).await;
}

#[tokio::test]
async fn test_empty_identity_is_anonymous() {
    let relay = TestRelay::start(Config::default()).await;
    let mut bob = relay.join(Some("bob")).await;
    let _anonymous = relay.join(Some("")).await;
    assert_silent(&mut bob).await;
}

#[tokio::test]
async fn test_reconnect_replaces_previous_connection() {
    let relay = TestRelay::start(Config::default()).await;
    let mut stale = relay.join(Some("alice")).await;
    let mut bob = relay.join(Some("bob")).await;
    recv_text(&mut stale).await;

    let mut alice = relay.connect(Some("alice")).await;
    assert_closed(&mut stale).await;

    // Peers drop the stale cursor before the new one appears, and nothing
    // follows once the displaced session has closed.
    assert_eq!(recv_text(&mut bob).await, r#"{"type":"leave","uuid":"alice"}"#);
    assert_eq!(recv_text(&mut bob).await, r#"{"type":"join","uuid":"alice"}"#);
    relay.wait_for_connections(2).await;
    assert_silent(&mut bob).await;

    send_text(&mut alice, r#"{"x":1,"y":1}"#).await;
    assert_eq!(
        recv_text(&mut bob).await,
        r#"{"type":"update","uuid":"alice","x":1,"y":1}"#
    );
}

#[tokio::test]
async fn test_hundred_clients_each_receive_ninety_nine_updates() {
    let relay = TestRelay::start(Config {
        queue_capacity: 512,
        ..Config::default()
    })
    .await;

    let mut clients = Vec::new();
    for i in 0..100 {
        let uuid = format!("client-{i}");
        clients.push((uuid.clone(), relay.connect(Some(uuid.as_str())).await));
    }
    relay.wait_for_connections(100).await;

    for (i, (_, client)) in clients.iter_mut().enumerate() {
        send_text(client, &format!(r#"{{"x":{i},"y":{i}}}"#)).await;
    }

    for (uuid, client) in clients.iter_mut() {
        let mut senders = HashSet::new();
        while senders.len() < 99 {
            let event = Event::decode(&recv_text(client).await).unwrap();
            if let Event::Update { uuid: sender, .. } = event {
                assert_ne!(sender.as_str(), uuid.as_str());
                assert!(senders.insert(sender));
            }
        }
    }
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let relay = TestRelay::start(Config {
        idle_timeout_secs: 1,
        ..Config::default()
    })
    .await;
    let mut sleepy = relay.join(Some("sleepy")).await;

    assert_closed(&mut sleepy).await;
    relay.wait_for_connections(0).await;
}

#[tokio::test]
async fn test_shutdown_closes_sessions() {
    let mut relay = TestRelay::start(Config::default()).await;
    let mut alice = relay.join(Some("alice")).await;

    relay.stop.take().unwrap().send(()).unwrap();
    assert_closed(&mut alice).await;
    relay.wait_for_connections(0).await;

    let result = timeout(Duration::from_secs(5), relay.handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_oversized_queue_capacity_fails_to_bind() {
    let server = WebSocketServer::new(Config {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        queue_capacity: usize::MAX,
        ..Config::default()
    });
    assert!(matches!(
        server.bind().await,
        Err(RelayError::InvalidConfig(_))
    ));
}
