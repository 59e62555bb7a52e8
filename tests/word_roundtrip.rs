use std::time::Duration;

use melsec_1e::endpoint::ConnectionTarget;
use melsec_1e::McClient;
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
    // give server a moment to start
    tokio::time::sleep(Duration::from_millis(20)).await;
    port
}

fn client_for(port: u16) -> McClient {
    McClient::new().with_target(
        ConnectionTarget::direct("127.0.0.1", port).with_timeout(Duration::from_millis(500)),
    )
}

#[tokio::test]
async fn read_d_decodes_seeded_words() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = MockServer::new();
    // the bench capture: D0..D9 with D5 = 0x051B
    server.load_words(0, &[10, 11, 12, 0, 0, 1307, 0, 0, 0, 0]);
    let port = spawn_server(&server).await;

    let mut client = client_for(port);
    let values = client.read_d(0, 10).await?;
    assert_eq!(values, vec![10, 11, 12, 0, 0, 1307, 0, 0, 0, 0]);
    client.close().await;
    Ok(())
}

#[tokio::test]
async fn write_d_then_read_back() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::new();
    let port = spawn_server(&server).await;

    let mut client = client_for(port);
    client.write_d(10, &[10, 20, 30]).await?;
    assert_eq!(server.word_at(10), 10);
    assert_eq!(server.word_at(12), 30);

    client.write_d_word(5, 123).await?;
    let values = client.read_d(0, 20).await?;
    assert_eq!(values[5], 123);
    assert_eq!(&values[10..13], &[10, 20, 30]);
    client.close().await;
    Ok(())
}

#[tokio::test]
async fn word_values_survive_full_16_bit_range() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::new();
    let port = spawn_server(&server).await;

    let mut client = client_for(port);
    client.write_d(100, &[0x0000, 0xFFFF, 0x8000, 0x7FFF]).await?;
    let values = client.read_d(100, 4).await?;
    assert_eq!(values, vec![0x0000, 0xFFFF, 0x8000, 0x7FFF]);
    client.close().await;
    Ok(())
}

#[tokio::test]
async fn truncated_payload_is_a_short_response() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::new();
    server.load_words(0, &[1, 2, 3, 4]);
    let port = spawn_server(&server).await;

    // 4 words requested but only 2 words of payload survive
    server.truncate_payload(Some(8));
    let mut client = client_for(port);
    let err = client.read_d(0, 4).await.expect_err("payload was truncated");
    match err {
        melsec_1e::Melsec1eError::ShortResponse { expected, got, .. } => {
            assert_eq!(expected, 16);
            assert_eq!(got, 8);
        }
        other => panic!("expected ShortResponse, got {other:?}"),
    }
    Ok(())
}
