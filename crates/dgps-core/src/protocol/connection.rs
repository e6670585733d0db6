//! Connection management
//!
//! A [`Receiver`] runs the two exchanges the driver supports over a
//! [`Channel`]: the `ENQ` handshake and the position query. Each call is a
//! complete request/response cycle; nothing but the channel and the last
//! decoded fix survives between calls, and nothing is retried.

use std::fmt;
use std::sync::Arc;
use tokio_serial::SerialStream;

use super::{
    serial::open_channel, Channel, FrameError, ParsedPacket, QueryError, Transport,
    TransportError, ACK, ENQ, NAK, RECEIVE_BUFFER_SIZE,
};
use crate::config::ReceiverConfig;
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink, TracingSink};
use crate::gps::GpsFix;
use crate::protocol::packet::position_request;

/// Result of the `ENQ` handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The receiver answered ACK
    Ready,
    /// The receiver answered NAK or something unexpected
    NotReady,
    /// Nothing came back
    NoResponse,
}

impl ProbeOutcome {
    /// True for [`ProbeOutcome::Ready`]
    pub fn is_ready(self) -> bool {
        self == ProbeOutcome::Ready
    }
}

/// Progress of a position query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    /// No query has run yet
    Idle,
    /// Writing the request
    Requesting,
    /// Waiting for the reply
    AwaitingReply,
    /// Checking the reply frame
    Validating,
    /// Decoding the record
    Decoding,
    /// The last query produced a fix
    Succeeded,
    /// The last query failed
    Failed,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryStage::Idle => "idle",
            QueryStage::Requesting => "requesting",
            QueryStage::AwaitingReply => "awaiting reply",
            QueryStage::Validating => "validating",
            QueryStage::Decoding => "decoding",
            QueryStage::Succeeded => "succeeded",
            QueryStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// GNSS receiver reachable over a byte-stream transport
pub struct Receiver<T: Transport = SerialStream> {
    /// Link to the receiver
    channel: Channel<T>,
    /// Destination of diagnostic events
    diagnostics: Arc<dyn DiagnosticSink>,
    /// Stage of the current or last position query
    stage: QueryStage,
    /// Fix decoded by the last successful query
    last_fix: Option<GpsFix>,
}

impl Receiver<SerialStream> {
    /// Open the receiver on serial port `port` at `baud_rate`
    pub fn open(
        port: &str,
        baud_rate: u32,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, TransportError> {
        Self::open_with_config(&ReceiverConfig::new(port, baud_rate), diagnostics)
    }

    /// Open the receiver described by `config`
    pub fn open_with_config(
        config: &ReceiverConfig,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, TransportError> {
        diagnostics.emit(DiagnosticEvent::info(
            "Establishing serial connection to GPS device...",
        ));
        diagnostics.emit(DiagnosticEvent::info(format!("Port: {}", config.port_name)));
        diagnostics.emit(DiagnosticEvent::info(format!(
            "Baud rate: {}",
            config.baud_rate
        )));

        match open_channel(
            &config.port_name,
            config.baud_rate,
            config.response_timeout(),
        ) {
            Ok(channel) => {
                diagnostics.emit(DiagnosticEvent::info("Connection established."));
                Ok(Self::new(channel, diagnostics))
            }
            Err(e) => {
                diagnostics.emit(DiagnosticEvent::error(format!(
                    "Failed to establish connection. Device is not available on given port: {e}"
                )));
                Err(e)
            }
        }
    }
}

impl<T: Transport> Receiver<T> {
    /// Drive the receiver through `channel`, reporting to `diagnostics`
    pub fn new(channel: Channel<T>, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            channel,
            diagnostics,
            stage: QueryStage::Idle,
            last_fix: None,
        }
    }

    /// Drive the receiver through `channel` with diagnostics going to `tracing` only
    pub fn with_tracing(channel: Channel<T>) -> Self {
        Self::new(channel, Arc::new(|_: DiagnosticEvent| {}))
    }

    /// Stage of the current or last position query
    pub fn stage(&self) -> QueryStage {
        self.stage
    }

    /// Fix decoded by the last successful position query
    pub fn last_fix(&self) -> Option<&GpsFix> {
        self.last_fix.as_ref()
    }

    /// Borrow the channel
    pub fn channel(&self) -> &Channel<T> {
        &self.channel
    }

    /// Give up the receiver, keeping the channel
    pub fn into_channel(self) -> Channel<T> {
        self.channel
    }

    /// Mirror `event` to `tracing`, then hand it to the sink
    fn report(&self, event: DiagnosticEvent) {
        TracingSink.emit(event.clone());
        self.diagnostics.emit(event);
    }

    /// Check the link with an `ENQ`; the receiver answers ACK when ready
    pub fn probe(&mut self) -> ProbeOutcome {
        self.report(DiagnosticEvent::info("Testing the communication link..."));

        match self.channel.send(&[ENQ]) {
            Ok(n) if n > 0 => {}
            Ok(_) => {
                self.report(DiagnosticEvent::error(
                    "Could not send test command. Device is not available.",
                ));
                return ProbeOutcome::NoResponse;
            }
            Err(e) => {
                self.report(DiagnosticEvent::error(format!(
                    "Could not send test command: {e}"
                )));
                return ProbeOutcome::NoResponse;
            }
        }

        let reply = match self.channel.receive_with_timeout(1) {
            Ok(bytes) => bytes.first().copied(),
            Err(e) => {
                tracing::debug!("probe: no reply: {}", e);
                None
            }
        };

        match reply {
            None => {
                self.report(DiagnosticEvent::error("Device does not respond."));
                ProbeOutcome::NoResponse
            }
            Some(NAK) => {
                self.report(DiagnosticEvent::warning(
                    "Test result is NAK (15h). Device is not ready yet.",
                ));
                ProbeOutcome::NotReady
            }
            Some(ACK) => {
                self.report(DiagnosticEvent::info(
                    "Test result is ACK (06h). Device is available.",
                ));
                ProbeOutcome::Ready
            }
            Some(other) => {
                self.report(DiagnosticEvent::warning(format!(
                    "Unknown test response {other:#04x}. Device is not ready yet."
                )));
                ProbeOutcome::NotReady
            }
        }
    }

    /// Request, validate and decode one position record.
    ///
    /// On success the fix also replaces [`Receiver::last_fix`]; on failure the
    /// previous fix is kept and one diagnostic event describes the failure.
    pub fn query_position(&mut self) -> Result<GpsFix, QueryError> {
        match self.run_query() {
            Ok(fix) => {
                self.stage = QueryStage::Succeeded;
                if fix.satellites.is_empty() {
                    self.report(DiagnosticEvent::info("Currently no tracked satellites."));
                } else {
                    self.report(DiagnosticEvent::info(format!(
                        "Position fix decoded with {} satellites.",
                        fix.satellites.len()
                    )));
                }
                self.last_fix = Some(fix.clone());
                Ok(fix)
            }
            Err(e) => {
                tracing::debug!("query_position: failed while {}: {}", self.stage, e);
                self.stage = QueryStage::Failed;
                self.report(failure_event(&e));
                Err(e)
            }
        }
    }

    fn run_query(&mut self) -> Result<GpsFix, QueryError> {
        self.stage = QueryStage::Requesting;
        let request = position_request();
        let written = self.channel.send(&request)?;
        if written != request.len() {
            return Err(TransportError::WriteIncomplete {
                written,
                expected: request.len(),
            }
            .into());
        }

        self.stage = QueryStage::AwaitingReply;
        let raw = self.channel.receive_with_timeout(RECEIVE_BUFFER_SIZE)?;

        self.stage = QueryStage::Validating;
        let packet = ParsedPacket::parse(&raw)?;

        self.stage = QueryStage::Decoding;
        Ok(GpsFix::from_packet(&packet)?)
    }
}

/// Diagnostic describing a failed query
fn failure_event(error: &QueryError) -> DiagnosticEvent {
    match error {
        QueryError::Transport(TransportError::WriteIncomplete { .. }) => {
            DiagnosticEvent::warning(error.to_string())
        }
        QueryError::Transport(_) | QueryError::Frame(FrameError::NoResponse) => {
            DiagnosticEvent::error(error.to_string())
        }
        QueryError::Frame(_) | QueryError::Decode(_) => DiagnosticEvent::warning(error.to_string()),
    }
}
