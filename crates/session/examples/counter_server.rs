//! Counter server - every click on the counter increments it
//!
//! Run with `cargo run -p session --example counter_server`, then drive it
//! with the `replica_client` example.

use dom::Document;
use session::{FnHandler, HandlerSet, Result, ServerConfig, SessionError, SyncServer, TriggerEvent};

const TEMPLATE: &str = "<!DOCTYPE html><html><head><title>Counter</title></head>\
    <body><h1>Counter</h1><div id=\"counter\" sc-click=\"increment\">0</div></body></html>";

fn increment(event: &TriggerEvent, doc: &mut Document) -> Result<()> {
    if event.event_type != "click" || event.message != "increment" {
        return Ok(());
    }

    let (counter, value) = {
        let counter = doc
            .body()
            .by_id("counter")
            .ok_or_else(|| SessionError::handler("increment", "no #counter element"))?;
        let value = counter.text_content()?.trim().parse::<i64>().unwrap_or(0);
        (counter.id(), value)
    };

    let text = doc.create_text(&(value + 1).to_string());
    let mut node = doc.edit(counter)?;
    node.remove_child(0)?;
    node.insert_child(text, 0)?;
    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig {
        bind_addr: std::env::args()
            .nth(1)
            .unwrap_or_else(|| "127.0.0.1:8080".to_string()),
        template: TEMPLATE.to_string(),
        ..Default::default()
    };

    let mut handlers = HandlerSet::new();
    handlers.register(FnHandler::new("increment", increment));

    let server = SyncServer::bind(config, handlers).await?;
    println!("Counter server on ws://{}", server.local_addr()?);

    let mut event_rx = server.event_bus().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            println!("Event: {:?}", event);
        }
    });

    server.run().await?;
    Ok(())
}
