//! Bridge runtime: transport channel, outbound gate, and dispatcher.
//!
//! ```text
//! ┌──────────────┐  raw text   ┌────────────┐  typed request  ┌────────────┐
//! │  Transport   │────────────▶│ Dispatcher │────────────────▶│ RpcService │
//! │ (web view or │             │            │                 │            │
//! │   memory)    │◀────────────│  Outbound  │◀────────────────│  events    │
//! └──────────────┘  envelopes  └────────────┘  results/errors └────────────┘
//! ```
//!
//! A service never touches the transport directly. Responses and
//! unsolicited events both leave through one [`Outbound`] so that disposal
//! silences them together.

pub mod dispatcher;
pub mod error;
pub mod outbound;
pub mod service;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use outbound::Outbound;
pub use service::{HandlerError, RpcService};
pub use transport::{InboundHandler, MemoryTransport, PeerHandle, ScriptHost, Transport, WebViewTransport};
