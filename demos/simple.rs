use std::env;

use melsec_1e::endpoint::ConnectionTarget;
use melsec_1e::McClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // initialize logging so session debug dumps are visible with
    // RUST_LOG=debug LOG_1E_PAYLOADS=1
    env_logger::init();

    let addr = env::var("PLC_ADDR").unwrap_or_else(|_| "192.168.3.254".into());
    let port: u16 = env::var("PLC_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1027);

    let target = ConnectionTarget::direct(addr, port);
    let mut client = McClient::new().with_target(target);

    println!(
        "Attempting to read D0..D9 from {addr}",
        addr = client.target().addr
    );
    match client.read_d(0, 10).await {
        Ok(values) => println!("D0..D9 = {values:?}"),
        Err(e) => eprintln!("Read failed: {e}"),
    }

    client.close().await;
    Ok(())
}
