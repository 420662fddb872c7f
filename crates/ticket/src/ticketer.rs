//! Issuing and accepting tickets with a rotating key list.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, instrument};
use web_time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use crate::{
    cert::CertificateRegistry,
    cipher,
    config::TicketConfig,
    key::{KeyOrigin, TicketKey, TicketKeys},
    padding::PaddingObfuscator,
    rand::{SecureRandom, SystemRandom},
    session::{Role, SessionState, TrailingData},
    TicketError,
};

/// The timebase for expiring and rolling tickets and ticketing
/// keys.  This is UNIX wall time in seconds.
///
/// This is guaranteed to be on or after the UNIX epoch.
#[derive(Clone, Copy, Debug)]
pub struct TimeBase(std::time::Duration);

impl TimeBase {
    /// Returns the current time.
    #[inline]
    pub fn now() -> Result<Self, SystemTimeError> {
        Ok(Self(SystemTime::now().duration_since(UNIX_EPOCH)?))
    }

    /// Returns whole seconds since the UNIX epoch.
    #[inline]
    pub fn as_secs(&self) -> u64 {
        self.0.as_secs()
    }
}

/// Encodes, optionally pads, and encrypts `state` under `keys[0]`.
pub(crate) fn seal(
    state: &SessionState,
    keys: &[TicketKey],
    obfuscate: bool,
    rng: &dyn SecureRandom,
) -> Result<Vec<u8>, TicketError> {
    let mut plaintext = state.encode()?;
    if obfuscate {
        PaddingObfuscator::new().pad_with_rng(&mut plaintext, rng);
    }

    cipher::encrypt_with_rng(&plaintext, keys, rng)
}

/// Issues and accepts session tickets.
///
/// The key list is held as a snapshot: every call works against the
/// snapshot current when it started, and [`rotate`](Self::rotate) swaps in
/// a new one.
pub struct Ticketer {
    config: TicketConfig,
    keys: RwLock<TicketKeys>,
    registry: Arc<CertificateRegistry>,
    rng: Box<dyn SecureRandom>,
}

impl Ticketer {
    /// Creates a ticketer.
    pub fn new(
        config: TicketConfig,
        keys: TicketKeys,
        registry: Arc<CertificateRegistry>,
    ) -> Self {
        Self::with_rng(config, keys, registry, Box::new(SystemRandom))
    }

    /// Creates a ticketer drawing randomness from `rng`.
    pub fn with_rng(
        config: TicketConfig,
        keys: TicketKeys,
        registry: Arc<CertificateRegistry>,
        rng: Box<dyn SecureRandom>,
    ) -> Self {
        Self {
            config,
            keys: RwLock::new(keys),
            registry,
            rng,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TicketConfig {
        &self.config
    }

    /// Returns the certificate registry decoded sessions share.
    pub fn registry(&self) -> &Arc<CertificateRegistry> {
        &self.registry
    }

    /// Returns the current key snapshot.
    pub fn keys(&self) -> TicketKeys {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the key snapshot.
    pub fn set_keys(&self, keys: TicketKeys) {
        *self.keys.write().unwrap_or_else(PoisonError::into_inner) = keys;
    }

    /// Puts `key` in front of the rotation list, dropping the oldest keys
    /// beyond the configured maximum.
    pub fn rotate(&self, key: TicketKey) {
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        *keys = keys.rotate(key, self.config.max_ticket_keys());
    }

    /// Encrypts `state` into a ticket.
    #[instrument(level = "debug", skip_all, err)]
    pub fn wrap_session(&self, state: &SessionState) -> Result<Vec<u8>, TicketError> {
        let keys = self.keys();
        seal(
            state,
            &keys,
            self.config.obfuscate_session_tickets(),
            self.rng.as_ref(),
        )
    }

    /// Decrypts and decodes a ticket.
    ///
    /// Returns `None` if the ticket cannot be used, in which case the
    /// caller falls back to a full handshake.
    pub fn unwrap_session(&self, ticket: &[u8]) -> Option<SessionState> {
        match self.try_unwrap_session(ticket) {
            Ok(state) => Some(state),
            Err(err) => {
                debug!("dropping session ticket: {}", err);
                None
            }
        }
    }

    /// Decrypts and decodes a ticket, reporting why it cannot be used.
    pub fn try_unwrap_session(&self, ticket: &[u8]) -> Result<SessionState, TicketError> {
        let keys = self.keys();
        let (plaintext, key) =
            cipher::open(ticket, &keys).ok_or_else(TicketError::not_decryptable)?;

        let trailing = match key.origin() {
            KeyOrigin::Issued => TrailingData::RequireZeros,
            KeyOrigin::SharedSecret => self.config.shared_secret_trailing_data(),
        };

        SessionState::decode(&plaintext, &self.registry, trailing)
    }
}

/// The state a client needs to resume a session: the ticket and the
/// session state it stands for.
#[derive(Clone)]
pub struct ClientSessionState {
    ticket: Vec<u8>,
    session: SessionState,
}

opaque_debug::implement!(ClientSessionState);

impl ClientSessionState {
    /// Creates a resumption state from a ticket and a client session.
    pub fn new(ticket: Vec<u8>, session: SessionState) -> Result<Self, TicketError> {
        if session.role() != Role::Client {
            return Err(TicketError::encode(
                "resumption state requires a client session",
            ));
        }

        Ok(Self { ticket, session })
    }

    /// Returns the ticket, also known as the session identity.
    pub fn ticket(&self) -> &[u8] {
        &self.ticket
    }

    /// Returns the session state.
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Returns the ticket and the state needed to resume with it.
    pub fn resumption_state(&self) -> (&[u8], &SessionState) {
        (&self.ticket, &self.session)
    }
}
