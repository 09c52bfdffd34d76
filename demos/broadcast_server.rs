//! Detection broadcast server example with a synthetic producer
//!
//! Run with: cargo run --example broadcast_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example broadcast_server                  # binds to 0.0.0.0:9000
//!   cargo run --example broadcast_server localhost        # binds to 127.0.0.1:9000
//!   cargo run --example broadcast_server 127.0.0.1:9100   # binds to 127.0.0.1:9100
//!
//! A fake detection pipeline publishes a snapshot twice a second; attach
//! any number of subscribers with:
//!
//!   cargo run --example detections_client 127.0.0.1:9000

use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use detcast_rs::{BoundingBox, BroadcastServer, Detection, DetectionList, MetaInfo, ServerConfig};

const DEFAULT_PORT: u16 = 9000;

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:9000
/// - "127.0.0.1" -> 127.0.0.1:9000
/// - "127.0.0.1:9100" -> 127.0.0.1:9100
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

/// Fabricate one snapshot the way a detection pipeline would
fn synthetic_snapshot(frame_index: u64) -> DetectionList {
    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let wobble = (frame_index % 20) as i32;

    DetectionList {
        meta: MetaInfo {
            timestamp_ms,
            image_width: 1280,
            image_height: 720,
            crop_width: 640,
            crop_height: 640,
            elapsed_ms: 12,
        },
        detections: vec![
            Detection {
                class_id: 0,
                class_name: "person".into(),
                bounding_box: BoundingBox::new(200 + wobble, 150, 80, 220),
                confidence: 0.91,
            },
            Detection {
                class_id: 16,
                class_name: "dog".into(),
                bounding_box: BoundingBox::new(400, 300 + wobble, 120, 90),
                confidence: 0.64,
            },
        ],
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let bind_addr = match args.get(1) {
        Some(arg) => match parse_bind_addr(arg) {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Usage: broadcast_server [BIND_ADDR]");
                std::process::exit(1);
            }
        },
        None => SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("detcast_rs=debug".parse()?),
        )
        .init();

    let config = ServerConfig::with_addr(bind_addr).max_subscribers(16);
    let mut server = BroadcastServer::start(config)?;

    println!("Detection broadcast server on {}", server.local_addr());
    println!("Attach a subscriber with:");
    println!(
        "  cargo run --example detections_client {}",
        server.local_addr()
    );
    println!();

    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    let mut frame_index = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                server.publish(synthetic_snapshot(frame_index));
                frame_index += 1;
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    server.shutdown();

    let stats = server.stats();
    println!(
        "Published {} snapshots ({} oversize drops), served {} subscribers",
        stats.publishes(),
        stats.oversize_drops(),
        stats.subscribers_joined(),
    );

    Ok(())
}
