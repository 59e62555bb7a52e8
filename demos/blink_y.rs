//! Bench exercise against an FX3U-16M + FX3U-ENET-L: read the X inputs,
//! walk the Y outputs off and on one point at a time, then bump D5.

use std::env;
use std::time::Duration;

use melsec_1e::endpoint::ConnectionTarget;
use melsec_1e::McClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let addr = env::var("PLC_ADDR").unwrap_or_else(|_| "192.168.3.254".into());
    let port: u16 = env::var("PLC_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1027);

    let mut client = McClient::new().with_target(ConnectionTarget::direct(addr, port));
    client.connect().await?;

    let x_vals = client.read_x(0, 8).await?;
    println!("X0..X7 = {x_vals:?}");

    for i in 0..8 {
        client.write_y_bit(i, false).await?;
        println!("Y{i} = 0");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    for i in 0..8 {
        client.write_y_bit(i, true).await?;
        println!("Y{i} = 1");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let y_vals = client.read_y(0, 8).await?;
    println!("Y0..Y7 = {y_vals:?}");

    let d_vals = client.read_d(0, 10).await?;
    println!("D0..D9 = {d_vals:?}");
    let new_val = d_vals[5].wrapping_add(1);
    client.write_d_word(5, new_val).await?;
    println!("Wrote D5 = {new_val}");

    client.close().await;
    Ok(())
}
