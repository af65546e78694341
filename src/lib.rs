//! Client-side FIX 4.4 session connector for a crypto spot-trading venue.
//!
//! Maintains an authenticated, heartbeated session over TLS to either the
//! Order Entry or Market Data endpoint role, handles the Ed25519-signed
//! logon handshake, and exposes received messages to callers in FIFO order.
//! See [`factory`] for the two role constructors and [`session::Session`]
//! for the public send/receive API.

#![warn(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod constants;
pub mod error;
pub mod factory;
pub mod message;
pub mod session;
pub mod signing;
pub mod time;
pub mod transport;

pub use config::{MessageHandling, ResponseMode, Role, SessionConfig};
pub use error::{FixConnectorError, Result};
pub use factory::{create_market_data_session, create_order_entry_session};
pub use message::FixMessage;
pub use session::{Session, SessionState};
pub use signing::SigningCredential;
