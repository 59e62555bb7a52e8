use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use melsec_1e_mock::{AcceptedOrder, MemoryFixture, MockServer};

#[derive(Parser, Debug)]
#[command(
    name = "melsec_1e_mock",
    about = "Mock A-compatible 1E (ASCII) adapter for local testing"
)]
struct Args {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Listen port (FX3U-ENET-L factory default)
    #[arg(long, default_value_t = 1027)]
    port: u16,

    /// Accepted count-field byte order: big_endian | swapped | either
    #[arg(long, default_value = "either")]
    order: String,

    /// Initial device memory fixture (TOML with [[seed]] tables)
    #[arg(long)]
    fixture: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let order = match args.order.as_str() {
        "big_endian" => AcceptedOrder::BigEndian,
        "swapped" => AcceptedOrder::Swapped,
        "either" => AcceptedOrder::Either,
        other => anyhow::bail!("unknown order: {other}"),
    };

    let server = MockServer::new().with_accepted_order(order);
    if let Some(path) = &args.fixture {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        let fixture: MemoryFixture =
            toml::from_str(&text).with_context(|| format!("parsing fixture {}", path.display()))?;
        server.apply_fixture(&fixture);
    }

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("binding {}:{}", args.host, args.port))?;
    tracing::info!("mock 1E adapter listening on {}", listener.local_addr()?);
    server.run_listener_on(listener).await
}
