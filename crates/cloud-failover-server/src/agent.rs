//! Client side of the agent protocol.
//!
//! Each call opens a fresh connection to the agent's Unix socket, writes one
//! request line and reads one response line.

use crate::types::{AgentRequest, AgentResponse};
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UnixStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::debug;

/// Longest response line accepted from an agent
const MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("agent framing error: {0}")]
    Codec(#[from] LinesCodecError),

    #[error("agent message malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("agent closed the connection without replying")]
    Closed,

    #[error("agent did not reply within {0:?}")]
    Timeout(Duration),

    /// The agent handled the request and reported a failure
    #[error("{0}")]
    Remote(String),
}

/// Agent connection parameters
#[derive(Debug, Clone)]
pub struct AgentClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl AgentClient {
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
        }
    }

    /// Send `request` and decode the `result` of an `ok` reply as `T`
    pub async fn call<T: DeserializeOwned>(&self, request: &AgentRequest) -> Result<T, AgentError> {
        let line = serde_json::to_string(request)?;
        debug!(op = request.op(), socket = %self.socket_path.display(), "Agent request");

        let reply = tokio::time::timeout(self.timeout, self.exchange(line))
            .await
            .map_err(|_| AgentError::Timeout(self.timeout))??;

        match serde_json::from_str::<AgentResponse>(&reply)? {
            AgentResponse::Ok { result } => Ok(serde_json::from_value(result)?),
            AgentResponse::Error { message } => Err(AgentError::Remote(message)),
        }
    }

    async fn exchange(&self, line: String) -> Result<String, AgentError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));

        framed.send(line).await?;
        let reply = framed.next().await.ok_or(AgentError::Closed)??;
        Ok(reply)
    }
}
