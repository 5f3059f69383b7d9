// src/ami/connection.rs
use futures::StreamExt;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use tracing::{debug, info};

use crate::ami::{AmiCodec, AmiError, RawEvent};
use crate::config::AmiConfig;

/// One live TCP session against the manager interface.
///
/// Reads are framed through [`AmiCodec`]; the write half only carries the
/// login action. Dropping the connection closes the socket.
pub struct AmiConnection {
    frames: FramedRead<OwnedReadHalf, AmiCodec>,
    writer: OwnedWriteHalf,
    server_id: String,
}

impl AmiConnection {
    /// Open the TCP connection without authenticating.
    pub async fn open(config: &AmiConfig) -> Result<Self, AmiError> {
        let server_id = format!("{}:{}", config.host, config.port);
        debug!("Connecting to AMI: {}", server_id);

        let stream = TcpStream::connect(&server_id).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            frames: FramedRead::new(read_half, AmiCodec::new()),
            writer: write_half,
            server_id,
        })
    }

    /// Send the login action and await the manager's verdict.
    ///
    /// An explicit `Response: Error` block is a credential rejection and maps
    /// to [`AmiError::AuthRejected`]; anything else that prevents a
    /// `Response: Success` within the timeout is a transport failure.
    pub async fn login(
        &mut self,
        username: &str,
        secret: &str,
        timeout: Duration,
    ) -> Result<(), AmiError> {
        let action = format!(
            "Action: Login\r\nUsername: {}\r\nSecret: {}\r\nEvents: on\r\n\r\n",
            username, secret
        );
        self.send(&action).await?;

        let verdict = async {
            while let Some(frame) = self.frames.next().await {
                let block = frame?;
                let Some(response) = block.response() else {
                    // Events may already be flowing before the reply; skip them.
                    continue;
                };
                if response.eq_ignore_ascii_case("Success") {
                    return Ok(());
                }
                let message = block
                    .message()
                    .unwrap_or("authentication failed")
                    .to_string();
                return Err(AmiError::AuthRejected(message));
            }
            Err(AmiError::ConnectionClosed)
        };

        match tokio::time::timeout(timeout, verdict).await {
            Ok(result) => result?,
            Err(_) => return Err(AmiError::HandshakeTimeout(timeout)),
        }

        info!("Authenticated to AMI: {}", self.server_id);
        Ok(())
    }

    /// Next decoded block off the wire. `Ok(None)` means the peer closed.
    pub async fn read_event(&mut self) -> Result<Option<RawEvent>, AmiError> {
        match self.frames.next().await {
            Some(Ok(event)) => Ok(Some(event)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    async fn send(&mut self, action: &str) -> Result<(), AmiError> {
        self.writer.write_all(action.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
