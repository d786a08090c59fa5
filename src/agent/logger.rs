use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::agent::output_log::OutputLog;
use crate::error::LoggerError;
use crate::monitoring::{IngestEvents, IngestSnapshot, IngestStats};
use crate::transport::websocket::{self, Endpoint, WsStream, DEFAULT_CONNECT_TIMEOUT};
use crate::transport::{ConnectionState, Payload};

/// Owns one connection and one output log, and appends every received
/// message to the log in receipt order.
#[derive(Debug)]
pub struct MessageLogger {
    output: OutputLog,
    connect_timeout: Duration,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    stats: IngestStats,
    events: IngestEvents,
}

impl MessageLogger {
    pub fn new(output: OutputLog) -> Self {
        Self {
            output,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            state: watch::Sender::new(ConnectionState::Idle),
            cancel: CancellationToken::new(),
            stats: IngestStats::new(),
            events: IngestEvents::new(),
        }
    }

    /// Limit on how long `start` waits for the handshake.
    pub fn with_connect_timeout(mut self, limit: Duration) -> Self {
        self.connect_timeout = limit;
        self
    }

    pub fn output(&self) -> &OutputLog {
        &self.output
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> IngestSnapshot {
        self.stats.snapshot()
    }

    /// Connect to `endpoint` and run the receive loop until the connection
    /// ends or [`stop`](Self::stop) is called.
    pub async fn start(&self, endpoint: &str) -> Result<(), LoggerError> {
        let endpoint = Endpoint::parse(endpoint)?;

        let claimed = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Idle {
                *state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(LoggerError::Configuration(format!(
                "logger already started (state: {})",
                self.state()
            )));
        }

        self.events.connecting(endpoint.as_str());
        let stream = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                self.finish(&endpoint, ConnectionState::Closed);
                return Ok(());
            }
            connected = websocket::connect(&endpoint, self.connect_timeout) => match connected {
                Ok(stream) => stream,
                Err(e) => {
                    self.events.connect_failed(endpoint.as_str(), &e.to_string());
                    self.finish(&endpoint, ConnectionState::Failed);
                    return Err(e);
                }
            },
        };

        // stop() may have won the race while the handshake was completing.
        let opened = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Open;
                true
            } else {
                false
            }
        });
        if !opened {
            close_quietly(stream).await;
            return Ok(());
        }

        self.stats.mark_started();
        self.events.connected(endpoint.as_str());
        self.receive_loop(&endpoint, stream).await
    }

    async fn receive_loop(&self, endpoint: &Endpoint, mut stream: WsStream) -> Result<(), LoggerError> {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                frame = stream.next() => Some(frame),
            };
            let Some(frame) = next else {
                close_quietly(stream).await;
                self.finish(endpoint, ConnectionState::Closed);
                return Ok(());
            };

            match frame {
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "peer sent close frame");
                    close_quietly(stream).await;
                    self.finish(endpoint, ConnectionState::Closed);
                    return Ok(());
                }
                Some(Ok(msg)) => {
                    let Some(payload) = Payload::from_frame(msg) else {
                        continue;
                    };
                    if let Err(e) = self.on_message(&payload) {
                        close_quietly(stream).await;
                        self.finish(endpoint, ConnectionState::Failed);
                        return Err(e);
                    }
                }
                Some(Err(e)) => {
                    self.events.transport_error(endpoint.as_str(), &e.to_string());
                    self.finish(endpoint, ConnectionState::Failed);
                    return Err(LoggerError::Transport(e.to_string()));
                }
                None => {
                    self.finish(endpoint, ConnectionState::Closed);
                    return Ok(());
                }
            }
        }
    }

    /// Append one received payload as a single line of the output log.
    pub fn on_message(&self, payload: &Payload) -> Result<(), LoggerError> {
        match self.output.append(payload) {
            Ok(bytes) => {
                self.stats.record_append(bytes);
                self.events
                    .message_appended(self.stats.snapshot().messages_appended, bytes);
                Ok(())
            }
            Err(e) => {
                self.events
                    .persistence_failed(&self.output.path().display().to_string(), &e.to_string());
                Err(e)
            }
        }
    }

    /// Ask the receive loop to close the connection. Calling this more than
    /// once, or after the connection has ended, has no further effect.
    pub fn stop(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.events.stop_requested(self.state());
        self.cancel.cancel();
        // Without a running loop nobody else will record the transition.
        self.state.send_if_modified(|state| match *state {
            ConnectionState::Idle | ConnectionState::Connecting => {
                *state = ConnectionState::Closed;
                true
            }
            _ => false,
        });
    }

    fn finish(&self, endpoint: &Endpoint, terminal: ConnectionState) {
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = terminal;
                true
            }
        });
        self.events.connection_closed(
            endpoint.as_str(),
            self.state(),
            self.stats.snapshot().messages_appended,
        );
    }
}

async fn close_quietly(mut stream: WsStream) {
    if let Err(e) = stream.close(None).await {
        tracing::debug!(error = %e, "close handshake did not complete");
    }
}
