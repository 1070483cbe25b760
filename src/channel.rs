//! The single exchange a native messaging host performs per launch:
//! register, announce, receive one frame, forward it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Read, StdinLock, StdoutLock, Write};

use crate::config::ChannelConfig;
use crate::host::{self, DecodedMessage, NmError, Result};
use crate::install::manifest::{ensure_registered, Registration};
use crate::sink::Sink;

/// Type tag of the readiness notice.
pub const NOTICE_TYPE: &str = "generic";

/// Lifecycle of a [`Channel`]. Only ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Start,
    Registered,
    Announced,
    AwaitingFrameHeader,
    AwaitingFrameBody,
    Decoded,
    Forwarded,
    Failed,
}

impl ChannelState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ChannelState::Forwarded | ChannelState::Failed)
    }
}

/// First and only frame the host sends: tells the extension it is listening.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundNotice {
    pub time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl OutboundNotice {
    pub fn now() -> Self {
        Self {
            time: Utc::now(),
            kind: NOTICE_TYPE,
        }
    }
}

/// Write the readiness notice frame. Returns the number of bytes written.
pub fn announce<W: Write>(output: &mut W) -> Result<usize> {
    host::write_message(output, &OutboundNotice::now())
}

/// Block until one full frame is read and decode it.
pub fn receive_one<R: Read>(input: &mut R, max_size: usize) -> Result<DecodedMessage> {
    host::decode_message(input, max_size)
}

pub struct Channel<R, W> {
    config: ChannelConfig,
    input: R,
    output: W,
    state: ChannelState,
    pending: Option<DecodedMessage>,
}

impl Channel<StdinLock<'static>, StdoutLock<'static>> {
    /// Channel over the process's own stdin/stdout.
    pub fn stdio(config: ChannelConfig) -> Self {
        Self::new(config, io::stdin().lock(), io::stdout().lock())
    }
}

impl<R: Read, W: Write> Channel<R, W> {
    pub fn new(config: ChannelConfig, input: R, output: W) -> Self {
        Self {
            config,
            input,
            output,
            state: ChannelState::Start,
            pending: None,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn register(&mut self) -> Result<Registration> {
        self.expect(ChannelState::Start)?;
        let registration = ensure_registered(&self.config.manifest_path, &self.config.host)
            .map_err(|e| self.fail(e))?;
        self.transition(ChannelState::Registered);
        Ok(registration)
    }

    pub fn announce(&mut self) -> Result<()> {
        self.expect(ChannelState::Registered)?;
        let written = announce(&mut self.output).map_err(|e| self.fail(e))?;
        tracing::debug!(bytes = written, "sent readiness notice");
        self.transition(ChannelState::Announced);
        Ok(())
    }

    /// Blocks with no timeout; only the caller closing stdin ends the wait early.
    pub fn receive(&mut self) -> Result<&DecodedMessage> {
        self.expect(ChannelState::Announced)?;

        self.transition(ChannelState::AwaitingFrameHeader);
        let len = host::read_header(&mut self.input).map_err(|e| self.fail(e))?;
        tracing::debug!(len, "read frame header");

        self.transition(ChannelState::AwaitingFrameBody);
        let raw = host::read_body(&mut self.input, len, self.config.max_message_size)
            .map_err(|e| self.fail(e))?;
        let message = host::decode_payload(raw).map_err(|e| self.fail(e))?;
        tracing::debug!(keys = message.body().len(), "decoded message");

        self.transition(ChannelState::Decoded);
        Ok(&*self.pending.insert(message))
    }

    pub fn forward<S: Sink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        self.expect(ChannelState::Decoded)?;
        let message = match self.pending.take() {
            Some(message) => message,
            None => {
                return Err(self.fail(NmError::OutOfOrder {
                    expected: ChannelState::Decoded,
                    actual: self.state,
                }))
            }
        };
        sink.forward(message).map_err(|e| self.fail(e))?;
        self.transition(ChannelState::Forwarded);
        Ok(())
    }

    /// Run the whole exchange. The channel cannot be reused afterwards.
    pub fn run<S: Sink>(mut self, mut sink: S) -> Result<Registration> {
        let registration = self.register()?;
        self.announce()?;
        self.receive()?;
        self.forward(&mut sink)?;
        Ok(registration)
    }

    fn expect(&mut self, expected: ChannelState) -> Result<()> {
        if self.state == expected {
            return Ok(());
        }
        let actual = self.state;
        Err(self.fail(NmError::OutOfOrder { expected, actual }))
    }

    fn transition(&mut self, next: ChannelState) {
        tracing::trace!(from = ?self.state, to = ?next, "channel state");
        self.state = next;
    }

    /// Terminal states stick: a stray call on a finished channel only errors.
    fn fail(&mut self, err: NmError) -> NmError {
        tracing::debug!(state = ?self.state, error = %err, "channel failed");
        if !self.state.is_terminal() {
            self.state = ChannelState::Failed;
        }
        err
    }
}
