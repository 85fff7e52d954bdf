//! Replica Client - the receiving end of a sync session
//!
//! Holds its own copy of the template and replays every batch the server
//! sends back. This is what a thin browser client does, minus the browser.

use dom::Document;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::{Result, SessionError};
use crate::protocol::{decode_batch, PatchBatch, TriggerEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct ReplicaClient {
    ws: WsStream,
    document: Document,
}

impl ReplicaClient {
    /// Connect to a sync server. `template` must be the markup the server
    /// seeds its sessions with.
    pub async fn connect(ws_url: &str, template: &str) -> Result<Self> {
        Self::connect_with(ws_url, Document::parse(template)?).await
    }

    /// Connect with an already parsed replica document
    pub async fn connect_with(ws_url: &str, document: Document) -> Result<Self> {
        let url = validate_url(ws_url)?;
        let (ws, _) = connect_async(url.as_str()).await?;
        tracing::info!("Replica connected to {}", url);

        Ok(Self { ws, document })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Send one trigger and apply the batch it produces.
    ///
    /// Returns the number of records applied. A record that no longer fits
    /// the replica comes back as [`SessionError::Dom`]; records before it
    /// stay applied.
    pub async fn trigger(&mut self, event: &TriggerEvent) -> Result<usize> {
        self.ws.send(Message::Text(event.encode()?)).await?;

        let batch = self.next_batch().await?;
        self.document.apply_batch(&batch)?;
        Ok(batch.len())
    }

    async fn next_batch(&mut self) -> Result<PatchBatch> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return decode_batch(&text),
                Some(Ok(Message::Close(_))) | None => return Err(SessionError::Closed),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}

fn validate_url(ws_url: &str) -> Result<Url> {
    let url = Url::parse(ws_url).map_err(|e| SessionError::InvalidUrl(format!("{}: {}", ws_url, e)))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(SessionError::InvalidUrl(format!(
            "{}: unsupported scheme `{}`",
            ws_url, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("ws://127.0.0.1:8080").is_ok());
        assert!(validate_url("wss://example.com/sync").is_ok());
        assert!(matches!(
            validate_url("http://example.com"),
            Err(SessionError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_url("not a url"),
            Err(SessionError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_template() {
        let result = ReplicaClient::connect("ws://127.0.0.1:1", "<div").await;
        assert!(matches!(result, Err(SessionError::Dom(_))));
    }
}
