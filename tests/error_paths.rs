use std::time::Duration;

use melsec_1e::endpoint::ConnectionTarget;
use melsec_1e::{McClient, Melsec1eError};
use melsec_1e_mock::MockServer;

async fn spawn_server(server: &MockServer) -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    let srv_clone = server.clone();
    tokio::spawn(async move {
        let _ = srv_clone.run_listener_on(listener).await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    port
}

fn client_for(port: u16) -> McClient {
    McClient::new().with_target(
        ConnectionTarget::direct("127.0.0.1", port).with_timeout(Duration::from_millis(500)),
    )
}

#[tokio::test]
async fn error_end_code_surfaces_without_partial_data() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = MockServer::new();
    server.load_words(0, &[1, 2, 3]);
    let port = spawn_server(&server).await;

    let mut client = client_for(port);
    // resolve the byte order first so the failure below is not a discovery retry
    client.read_d(0, 3).await?;

    server.force_end_code(Some("C0"));
    let err = client.read_d(0, 3).await.expect_err("adapter reported C0");
    match err {
        Melsec1eError::Protocol { end_code, raw } => {
            assert_eq!(end_code, "C0");
            assert!(raw.starts_with("81C0"));
        }
        other => panic!("expected Protocol, got {other:?}"),
    }

    // clearing the fault brings the same session back
    server.force_end_code(None);
    assert_eq!(client.read_d(0, 3).await?, vec![1, 2, 3]);
    client.close().await;
    Ok(())
}

#[tokio::test]
async fn reply_shorter_than_header_is_malformed() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::new();
    let port = spawn_server(&server).await;

    let mut client = client_for(port);
    client.read_d(0, 1).await?;

    server.force_raw_reply(Some("81"));
    let err = client.read_d(0, 1).await.expect_err("2-char reply");
    assert!(matches!(err, Melsec1eError::MalformedResponse(_)));
    client.close().await;
    Ok(())
}

#[tokio::test]
async fn unreachable_adapter_is_a_connection_error() {
    // nothing listens here; connect retries then gives up
    let mut client = McClient::new().with_target(
        ConnectionTarget::direct("127.0.0.1", 9)
            .with_connect_timeout(Duration::from_millis(200))
            .with_connect_retries(2)
            .with_connect_backoff(Duration::from_millis(10)),
    );
    let err = client.read_d(0, 1).await.expect_err("no adapter");
    assert!(matches!(err, Melsec1eError::Connection(_)));
}
