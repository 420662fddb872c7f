//! TLS session tickets for a censorship circumvention tunnel.
//!
//! This crate encodes resumable session state, encrypts it into session
//! tickets under a rotating list of keys, pads tickets so their sizes
//! resemble those of common TLS stacks, and forges obfuscated session
//! tickets from a pre-shared secret.
//!
//! Issuing a ticket: [`SessionState::encode`], optional
//! [`PaddingObfuscator::pad`], then [`cipher::encrypt`]. Resuming:
//! [`cipher::decrypt`] then [`SessionState::decode`]. [`Ticketer`] wraps
//! both directions. [`ObfuscatedClientSessionState`] forges a ticket that
//! a server holding the shared secret accepts through the same path.

#![deny(missing_docs, unreachable_pub, unused_must_use)]
#![deny(clippy::all)]
#![forbid(unsafe_code)]

pub mod cert;
pub mod cipher;
pub mod codec;
mod config;
mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod forge;
pub mod key;
pub mod padding;
pub mod rand;
pub mod session;
mod ticketer;
pub mod versions;

pub use cert::{Certificate, CertificateRegistry};
pub use config::{TicketConfig, TicketConfigBuilder, TicketConfigBuilderError};
pub use error::{ErrorKind, TicketError};
pub use forge::{contains_obfuscated_cipher_suite, ObfuscatedClientSessionState};
pub use key::{KeyOrigin, TicketKey, TicketKeys};
pub use padding::PaddingObfuscator;
pub use session::{Role, SessionState, TrailingData};
pub use ticketer::{ClientSessionState, Ticketer, TimeBase};
pub use versions::{CipherSuite, ProtocolVersion};
