//! Replica client - clicks the counter a few times and prints the replica
//!
//! Start `counter_server` first. The template below must match the server's.

use session::{ReplicaClient, TriggerEvent};

const TEMPLATE: &str = "<!DOCTYPE html><html><head><title>Counter</title></head>\
    <body><h1>Counter</h1><div id=\"counter\" sc-click=\"increment\">0</div></body></html>";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:8080".to_string());

    let mut replica = ReplicaClient::connect(&url, TEMPLATE).await?;
    println!("Connected to {}", url);

    for _ in 0..3 {
        let applied = replica.trigger(&TriggerEvent::click("increment")).await?;
        println!("Applied {} records", applied);
    }

    if let Some(counter) = replica.document().body().by_id("counter") {
        println!("Counter: {}", counter.text_content()?);
    }
    println!("{}", replica.document().render()?);

    replica.close().await?;
    Ok(())
}
