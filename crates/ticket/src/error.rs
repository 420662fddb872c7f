use core::fmt;
use std::error::Error;

/// A session ticket error.
#[derive(Debug, thiserror::Error)]
pub struct TicketError {
    kind: ErrorKind,
    #[source]
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl TicketError {
    pub(crate) fn new<E>(kind: ErrorKind, source: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        Self {
            kind,
            source: Some(source.into()),
        }
    }

    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, msg.into())
    }

    pub(crate) fn encode(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Encode, msg.into())
    }

    pub(crate) fn not_decryptable() -> Self {
        Self {
            kind: ErrorKind::NotDecryptable,
            source: None,
        }
    }

    pub(crate) fn key_unavailable() -> Self {
        Self::new(
            ErrorKind::KeyUnavailable,
            "session ticket keys unavailable",
        )
    }

    pub(crate) fn rng<E>(source: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Rng, source)
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` if the error only means that a ticket cannot be used
    /// for resumption.
    ///
    /// Such errors are local to one resumption attempt: the caller discards
    /// the ticket and falls back to a full handshake.
    pub fn is_resumption_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::Decode | ErrorKind::NotDecryptable)
    }
}

/// The kind of a [`TicketError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed, truncated or inconsistent session state bytes.
    Decode,
    /// The session state can not be represented in the wire encoding.
    Encode,
    /// No key in the rotation list authenticated the ticket.
    NotDecryptable,
    /// Encryption was attempted with an empty key list.
    KeyUnavailable,
    /// The secure random source failed.
    Rng,
}

impl fmt::Display for TicketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Decode => write!(f, "decode error")?,
            ErrorKind::Encode => write!(f, "encode error")?,
            ErrorKind::NotDecryptable => write!(f, "not decryptable error")?,
            ErrorKind::KeyUnavailable => write!(f, "key unavailable error")?,
            ErrorKind::Rng => write!(f, "rng error")?,
        }

        if let Some(ref source) = self.source {
            write!(f, " caused by: {}", source)?;
        }

        Ok(())
    }
}
