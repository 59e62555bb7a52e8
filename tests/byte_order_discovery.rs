use std::time::Duration;

use melsec_1e::endpoint::ConnectionTarget;
use melsec_1e::{Command, CountByteOrder, DeviceClass, McClient};
use melsec_1e_mock::{AcceptedOrder, MockServer};

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
async fn discovery_costs_one_extra_frame_then_sticks() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    // adapter firmware that only speaks the swapped order
    let server = MockServer::new().with_accepted_order(AcceptedOrder::Swapped);
    server.load_words(0, &[42; 5]);
    let port = spawn_server(&server).await;

    let mut client = client_for(port);
    assert_eq!(
        client.cached_count_order(Command::ReadWords, DeviceClass::WordRegister),
        None
    );

    // first call: big-endian trial rejected, swapped accepted
    let values = client.read_d(0, 5).await?;
    assert_eq!(values, vec![42; 5]);
    assert_eq!(server.frames_served(), 2);
    assert_eq!(
        client.cached_count_order(Command::ReadWords, DeviceClass::WordRegister),
        Some(CountByteOrder::Swapped)
    );

    // subsequent calls reuse the cached mode: exactly one frame each
    client.read_d(0, 5).await?;
    assert_eq!(server.frames_served(), 3);
    client.read_d(0, 5).await?;
    assert_eq!(server.frames_served(), 4);
    client.close().await;
    Ok(())
}

#[tokio::test]
async fn discovery_is_per_command_device_pair() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::new().with_accepted_order(AcceptedOrder::Swapped);
    let port = spawn_server(&server).await;

    let mut client = client_for(port);
    client.read_d(0, 2).await?;
    assert_eq!(server.frames_served(), 2);

    // a different (command, device) pair pays its own discovery round trip
    client.read_y(0, 4).await?;
    assert_eq!(server.frames_served(), 4);
    assert_eq!(
        client.cached_count_order(Command::ReadBits, DeviceClass::BitOutput),
        Some(CountByteOrder::Swapped)
    );
    client.close().await;
    Ok(())
}

#[tokio::test]
async fn stale_cached_mode_is_evicted_and_rediscovered() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::new().with_accepted_order(AcceptedOrder::BigEndian);
    server.load_words(0, &[7; 4]);
    let port = spawn_server(&server).await;

    let mut client = client_for(port);
    client.read_d(0, 4).await?;
    assert_eq!(server.frames_served(), 1);
    assert_eq!(
        client.cached_count_order(Command::ReadWords, DeviceClass::WordRegister),
        Some(CountByteOrder::BigEndian)
    );

    // firmware personality flips: the cached mode starts failing
    server.set_accepted_order(AcceptedOrder::Swapped);
    let values = client.read_d(0, 4).await?;
    assert_eq!(values, vec![7; 4]);
    // cached frame rejected (1) + big-endian retrial rejected (1) + swapped ok (1)
    assert_eq!(server.frames_served(), 4);
    assert_eq!(
        client.cached_count_order(Command::ReadWords, DeviceClass::WordRegister),
        Some(CountByteOrder::Swapped)
    );
    client.close().await;
    Ok(())
}

#[tokio::test]
async fn both_orders_failing_surfaces_last_error() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::new();
    server.force_end_code(Some("C0"));
    let port = spawn_server(&server).await;

    let mut client = client_for(port);
    let err = client.read_d(0, 2).await.expect_err("adapter rejects everything");
    match err {
        melsec_1e::Melsec1eError::Protocol { end_code, .. } => assert_eq!(end_code, "C0"),
        other => panic!("expected Protocol, got {other:?}"),
    }
    // both encodings were tried, nothing was cached
    assert_eq!(server.frames_served(), 2);
    assert_eq!(
        client.cached_count_order(Command::ReadWords, DeviceClass::WordRegister),
        None
    );
    client.close().await;
    Ok(())
}
