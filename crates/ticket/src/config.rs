//! Ticket configuration.

use serde::{Deserialize, Serialize};

use crate::session::TrailingData;

const DEFAULT_MAX_TICKET_KEYS: usize = 4;

/// Configuration owned by the party issuing and accepting tickets.
#[derive(Debug, Clone, derive_builder::Builder, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct TicketConfig {
    /// Whether encoded session state is padded before encryption.
    #[builder(default = "true")]
    obfuscate_session_tickets: bool,
    /// How trailing bytes are treated when a ticket is authenticated by a
    /// key derived from a shared secret.
    #[builder(default = "TrailingData::Ignore")]
    shared_secret_trailing_data: TrailingData,
    /// Maximum number of keys kept in the rotation list.
    #[builder(default = "DEFAULT_MAX_TICKET_KEYS")]
    max_ticket_keys: usize,
}

impl TicketConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_ticket_keys == Some(0) {
            return Err("max_ticket_keys must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            obfuscate_session_tickets: true,
            shared_secret_trailing_data: TrailingData::Ignore,
            max_ticket_keys: DEFAULT_MAX_TICKET_KEYS,
        }
    }
}

impl TicketConfig {
    /// Creates a new builder for `TicketConfig`.
    pub fn builder() -> TicketConfigBuilder {
        TicketConfigBuilder::default()
    }

    /// Returns whether encoded session state is padded.
    pub fn obfuscate_session_tickets(&self) -> bool {
        self.obfuscate_session_tickets
    }

    /// Returns the trailing data mode for tickets authenticated by a shared
    /// secret key.
    pub fn shared_secret_trailing_data(&self) -> TrailingData {
        self.shared_secret_trailing_data
    }

    /// Returns the maximum number of keys kept in the rotation list.
    pub fn max_ticket_keys(&self) -> usize {
        self.max_ticket_keys.max(1)
    }
}
