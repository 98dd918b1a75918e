//! tokio-tungstenite implementation of the transport seams.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, trace};
use url::Url;

use super::{Connector, Link, TransportError};

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens real WebSocket connections (`ws://` and `wss://`).
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Link>, TransportError> {
        let (stream, response) = connect_async(url.as_str()).await?;
        debug!("handshake complete (HTTP {})", response.status());
        Ok(Box::new(WsLink { stream }))
    }
}

/// One open WebSocket connection.
pub struct WsLink {
    stream: Stream,
}

#[async_trait]
impl Link for WsLink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv_text(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    debug!("close frame received: {frame:?}");
                    return None;
                }
                // tungstenite queues the pong itself.
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => trace!("keepalive"),
                Ok(Message::Binary(data)) => {
                    debug!("ignoring {} byte binary frame", data.len());
                }
                Ok(Message::Frame(_)) => {}
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return None;
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
