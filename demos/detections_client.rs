//! Subscriber client example
//!
//! Connects to a detection broadcast server, reads frames, and prints each
//! decoded detection list.
//!
//! Run with: cargo run --example detections_client [ADDR]
//!
//! Examples:
//!   cargo run --example detections_client                  # 127.0.0.1:9000
//!   cargo run --example detections_client 127.0.0.1:9100

use std::net::SocketAddr;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use detcast_rs::protocol::constants::HEADER_LENGTH;
use detcast_rs::protocol::{decode_detection_list, decode_header};
use detcast_rs::DetectionList;

fn print_detection_list(list: &DetectionList) {
    println!(
        "Detection list: ts={}ms image={}x{} crop={}x{} inference={}ms",
        list.meta.timestamp_ms,
        list.meta.image_width,
        list.meta.image_height,
        list.meta.crop_width,
        list.meta.crop_height,
        list.meta.elapsed_ms,
    );

    if list.is_empty() {
        println!("  (no detections)");
        return;
    }

    for detection in &list.detections {
        println!("  {}", detection);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9000".into())
        .parse()?;

    let mut stream = TcpStream::connect(addr).await?;
    println!("Connected to {}", addr);

    loop {
        let mut header = [0u8; HEADER_LENGTH];
        if let Err(e) = stream.read_exact(&mut header).await {
            println!("Server disconnected ({}). Exiting.", e);
            break;
        }

        let body_len = match decode_header(&header) {
            Ok(len) => len,
            Err(e) => {
                eprintln!("Bad frame header: {}", e);
                break;
            }
        };

        let mut body = vec![0u8; body_len];
        if let Err(e) = stream.read_exact(&mut body).await {
            println!("Server disconnected ({}). Exiting.", e);
            break;
        }

        match decode_detection_list(&mut body.as_slice()) {
            Ok(list) => print_detection_list(&list),
            Err(e) => eprintln!("Failed to decode detection list: {}", e),
        }
    }

    Ok(())
}
