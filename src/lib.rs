//! # odot_host
//!
//! The **native messaging host** of Odot: the browser extension launches it, it
//! receives one message over **stdin**, and hands that message to the Odot
//! desktop app through a file.
//!
//! Each launch performs exactly one exchange:
//!
//! 1. **Register** — write the host manifest if it is not there yet.
//! 2. **Announce** — send one `{"time": ..., "type": "generic"}` frame on stdout.
//! 3. **Receive** — block until one full frame arrives on stdin and decode it.
//! 4. **Forward** — write the raw JSON bytes to the downstream file, then exit.
//!
//! ---
//!
//! ## Wire protocol
//!
//! 1. The sender writes a **4-byte length prefix** (`u32`, little-endian).
//! 2. Then writes **that many bytes** of UTF-8 JSON.
//!
//! There is no timeout. A read only ends early when the browser closes stdin,
//! which is reported as [`host::NmError::Disconnected`] (or one of the
//! truncation errors if a frame was cut short).
//!
//! ### Gotchas
//!
//! - **Never log to stdout:** stdout is reserved for framed protocol messages.
//!   The `odot-host` binary logs with `tracing` to stderr.
//! - **Message limits:** host → browser frames are capped at 1 MiB
//!   ([`host::MAX_TO_BROWSER`]), browser → host at 64 MiB ([`host::MAX_FROM_BROWSER`]).
//! - **The manifest is written once:** if a file already exists at the manifest path it
//!   is left alone, even when its content is stale.
//!
//! ---
//!
//! ## Crate layout
//!
//! - [`host`] — framing over any `Read`/`Write`, and the crate error type.
//! - [`install`] — the host manifest and where browsers look for it.
//! - [`config`] — [`ChannelConfig`] and the TOML configuration file.
//! - [`channel`] — the register → announce → receive → forward state machine.
//! - [`sink`] — the downstream handoff.
//!
//! ---
//!
//! ## Pure framing
//!
//! ```rust
//! use odot_host::host::{encode_message, decode_message, MAX_FROM_BROWSER};
//! use serde_json::json;
//! use std::io::Cursor;
//!
//! let msg = json!({"hello": "world", "n": 42});
//! let frame = encode_message(&msg).unwrap();
//! assert_eq!(&frame[..4], &(frame.len() as u32 - 4).to_le_bytes());
//!
//! let mut cur = Cursor::new(frame);
//! let decoded = decode_message(&mut cur, MAX_FROM_BROWSER).unwrap();
//! assert_eq!(serde_json::Value::Object(decoded.body().clone()), msg);
//! ```
//!
//! ## One exchange with explicit paths
//!
//! ```no_run
//! use odot_host::{Channel, ChannelConfig, FileSink, HostManifest};
//!
//! let host = HostManifest::new(
//!     "com.hackclub.odot",
//!     "Odot",
//!     "/opt/odot/odot-host",
//!     vec!["chrome-extension://knldjmfmopnpolahpmmgbagdohdnhkik/".to_string()],
//! );
//! let config = ChannelConfig::new(
//!     "/home/me/.config/google-chrome/NativeMessagingHosts/com.hackclub.odot.json",
//!     "/home/me/.odot-tracker-data.json",
//!     host,
//! );
//! let sink = FileSink::new(config.downstream_path.clone());
//! Channel::stdio(config).run(sink).unwrap();
//! ```

pub mod channel;
pub mod config;
pub mod exit;
pub mod host;
pub mod install;
pub mod sink;

// -------- Re-exports --------

#[doc(inline)]
pub use channel::{announce, receive_one, Channel, ChannelState, OutboundNotice};
#[doc(inline)]
pub use config::ChannelConfig;
#[doc(inline)]
pub use host::{decode_message, encode_message, DecodedMessage, NmError};
#[doc(inline)]
pub use install::manifest::{ensure_registered, HostManifest, Registration, Transport};
#[doc(inline)]
pub use install::paths::Scope;
#[doc(inline)]
pub use sink::{FileSink, Sink};
