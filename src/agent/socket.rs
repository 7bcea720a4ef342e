//! Keep-alive TCP connection to the Agent's development socket.

use crate::errors::{Result, SdkError};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

/// 4-byte big-endian length followed by the 16 raw UUID bytes.
pub const HANDSHAKE_FRAME_LEN: usize = 20;

pub struct LivenessSocket {
    stream: Mutex<Option<TcpStream>>,
    host: String,
    port: u16,
}

impl LivenessSocket {
    /// Connects to `host:port`; when `expected_uuid` is given, the Agent's
    /// handshake frame must carry the same UUID within `handshake_timeout`.
    pub async fn open(
        host: &str,
        port: u16,
        expected_uuid: Option<&str>,
        handshake_timeout: Duration,
    ) -> Result<Self> {
        let addr = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| {
                SdkError::AgentConnect(format!(
                    "Could not resolve Agent socket address {}:{}: {}",
                    host, port, e
                ))
            })?
            .next()
            .ok_or_else(|| {
                SdkError::AgentConnect(format!("Could not resolve Agent socket address {}:{}", host, port))
            })?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_keepalive(true)?;

        let mut stream = socket.connect(addr).await.map_err(|e| {
            SdkError::AgentConnect(format!(
                "Failed connecting to Agent socket {}:{}: {}",
                host, port, e
            ))
        })?;

        if let Some(expected) = expected_uuid {
            validate_handshake(&mut stream, expected, handshake_timeout).await?;
        }

        info!("Socket connection to {}:{} established successfully", host, port);

        Ok(Self {
            stream: Mutex::new(Some(stream)),
            host: host.to_string(),
            port,
        })
    }

    pub async fn is_open(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    pub async fn close(&self) {
        let mut guard = self.stream.lock().await;
        if let Some(mut stream) = guard.take() {
            match stream.shutdown().await {
                Ok(()) => info!("Connection to Agent closed successfully"),
                Err(e) => error!("Failed to close socket connection to Agent: {}", e),
            }
        } else {
            debug!("Socket to {}:{} already closed", self.host, self.port);
        }
    }
}

async fn validate_handshake(stream: &mut TcpStream, expected: &str, wait: Duration) -> Result<()> {
    let expected = Uuid::parse_str(expected).map_err(|e| {
        SdkError::AgentConnect(format!("Agent returned an invalid session UUID [{}]: {}", expected, e))
    })?;

    let mut frame = [0u8; HANDSHAKE_FRAME_LEN];
    match tokio::time::timeout(wait, stream.read_exact(&mut frame)).await {
        Err(_) => {
            return Err(SdkError::AgentConnect(format!(
                "Timed out after {}s waiting for the Agent development socket handshake. \
                 Make sure the Agent is running and that no firewall or proxy blocks the socket port",
                wait.as_secs()
            )))
        }
        Ok(Err(e)) => {
            return Err(SdkError::AgentConnect(format!(
                "Agent closed the development socket during handshake: {}",
                e
            )))
        }
        Ok(Ok(_)) => {}
    }

    let declared = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    if declared != HANDSHAKE_FRAME_LEN - 4 {
        return Err(SdkError::AgentConnect(format!(
            "Unexpected development socket handshake length {}",
            declared
        )));
    }

    let received = Uuid::from_slice(&frame[4..]).map_err(|e| {
        SdkError::AgentConnect(format!("Malformed development socket handshake: {}", e))
    })?;

    if received != expected {
        return Err(SdkError::AgentConnect(
            "Development socket handshake does not match the started session. \
             Another SDK process may be connected to this Agent"
                .to_string(),
        ));
    }

    debug!(uuid = %received, "Development socket handshake validated");
    Ok(())
}
