//! End-to-end exercises of the session engine over a plain TCP loopback
//! standing in for the venue. The engine itself only knows about the
//! `Transport` trait, so these tests never touch TLS.

use bytes::{Buf, BytesMut};
use ed25519_dalek::SigningKey;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use spot_fix_connector::config::{MessageHandling, Role, SessionConfig};
use spot_fix_connector::message::FixMessage;
use spot_fix_connector::session::Session;
use spot_fix_connector::signing::SigningCredential;
use spot_fix_connector::transport::PlainTcpTransport;

fn test_credential() -> SigningCredential {
    let seed = [3u8; 32];
    let _ = SigningKey::from_bytes(&seed);
    let pem = pem::Pem::new("PRIVATE KEY", seed.to_vec());
    SigningCredential::from_pem(&pem::encode(&pem)).unwrap()
}

async fn loopback_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).await.unwrap();
    let (server, _) = listener.accept().await.unwrap();
    (client, server)
}

async fn read_frame(stream: &mut TcpStream, buf: &mut BytesMut) -> FixMessage {
    loop {
        if let Some((msg, consumed)) = FixMessage::decode(buf).unwrap() {
            buf.advance(consumed);
            return msg;
        }
        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).await.unwrap();
        buf.extend_from_slice(&chunk[..n]);
    }
}

async fn accept_logon(stream: &mut TcpStream, buf: &mut BytesMut, seq_reply: u64) {
    let logon = read_frame(stream, buf).await;
    assert_eq!(logon.msg_type(), Some("A"));
    let mut reply = FixMessage::with_basic_header("A");
    reply.append_pair(49, "SPOT");
    reply.append_pair(56, "BMDWATCH");
    reply.append_pair(34, seq_reply.to_string());
    stream.write_all(&reply.encode().unwrap()).await.unwrap();
}

#[tokio::test]
async fn instrument_list_request_is_stamped_and_sequenced() {
    let (client_stream, mut server_stream) = loopback_pair().await;
    let config = SessionConfig::builder(Role::MarketData)
        .api_key("API_KEY")
        .endpoint("tcp+tls://unused:1")
        .message_handling(MessageHandling::Sequenced)
        .build()
        .unwrap();

    let server_task = tokio::spawn(async move {
        let mut buf = BytesMut::new();
        accept_logon(&mut server_stream, &mut buf, 1).await;

        let request = read_frame(&mut server_stream, &mut buf).await;
        assert_eq!(request.msg_type(), Some("x"));
        assert_eq!(request.get_str(34, 1), Some("2"));
        assert_eq!(request.get_str(320, 1), Some("GetInstrumentList"));
        assert_eq!(request.get_str(559, 1), Some("0"));
        assert_eq!(request.get_str(55, 1), Some("BNBUSDT"));
        server_stream
    });

    let transport = Box::new(PlainTcpTransport::from_stream(client_stream));
    let session = Session::connect_with_transport(config, test_credential(), transport)
        .await
        .unwrap();

    let mut request = session.create_fix_message_with_basic_header("x");
    request.append_pair(320, "GetInstrumentList");
    request.append_pair(559, "0");
    request.append_pair(55, "BNBUSDT");
    session.send_message(request).await.unwrap();

    server_task.await.unwrap();
    session.disconnect().await;
}

#[tokio::test]
async fn logout_round_trip_returns_acknowledgement() {
    let (client_stream, mut server_stream) = loopback_pair().await;
    let config = SessionConfig::builder(Role::MarketData)
        .api_key("API_KEY")
        .endpoint("tcp+tls://unused:1")
        .build()
        .unwrap();

    let server_task = tokio::spawn(async move {
        let mut buf = BytesMut::new();
        accept_logon(&mut server_stream, &mut buf, 1).await;

        let logout = read_frame(&mut server_stream, &mut buf).await;
        assert_eq!(logout.msg_type(), Some("5"));

        let mut ack = FixMessage::with_basic_header("5");
        ack.append_pair(58, "Logout acknowledgment.");
        server_stream.write_all(&ack.encode().unwrap()).await.unwrap();
        server_stream
    });

    let transport = Box::new(PlainTcpTransport::from_stream(client_stream));
    let session = Session::connect_with_transport(config, test_credential(), transport)
        .await
        .unwrap();

    session.logout().await.unwrap();
    let drained = session.retrieve_messages_until(&["5"], None, 5).await;

    server_task.await.unwrap();
    assert_eq!(drained.last().unwrap().msg_type(), Some("5"));
    assert_eq!(drained.last().unwrap().get_str(58, 1), Some("Logout acknowledgment."));
}

#[tokio::test]
async fn retrieve_messages_until_times_out_with_partial_drain() {
    let (client_stream, mut server_stream) = loopback_pair().await;
    let config = SessionConfig::builder(Role::MarketData)
        .api_key("API_KEY")
        .endpoint("tcp+tls://unused:1")
        .build()
        .unwrap();

    let server_task = tokio::spawn(async move {
        let mut buf = BytesMut::new();
        accept_logon(&mut server_stream, &mut buf, 1).await;

        let mut heartbeat = FixMessage::with_basic_header("0");
        heartbeat.append_pair(112, "unused");
        server_stream
            .write_all(&heartbeat.encode().unwrap())
            .await
            .unwrap();
        server_stream
    });

    let transport = Box::new(PlainTcpTransport::from_stream(client_stream));
    let session = Session::connect_with_transport(config, test_credential(), transport)
        .await
        .unwrap();

    let drained = session.retrieve_messages_until(&["5"], None, 1).await;
    assert!(drained.iter().all(|m| m.msg_type() != Some("5")));

    server_task.await.unwrap();
    session.disconnect().await;
}
