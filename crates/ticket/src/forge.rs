//! Obfuscated session tickets.
//!
//! An obfuscated session ticket looks like ordinary TLS session resumption
//! to an observer, but the ticket was never issued by the server: the client
//! builds it itself and encrypts it under a key derived from a secret it
//! shares with the server operator. The server lists that key in its
//! rotation list next to its own keys and resumes the session through the
//! usual ticket path, so the handshake skips the most fingerprintable parts
//! of TLS.
//!
//! An adversary without the shared secret cannot form a ticket the server
//! accepts, and gets standard tickets instead. An adversary holding the
//! secret can decrypt the ticket and the session traffic, so the tunnelled
//! payload must carry its own protection.
//!
//! The client chooses parameters that were never negotiated, such as the
//! cipher suite; the server is assumed to support them. Only TLS 1.2
//! sessions are forged.

use std::sync::Arc;

use tracing::instrument;
use zeroize::Zeroizing;

use crate::{
    cert::Certificate,
    config::TicketConfig,
    key::{TicketKey, KEY_SEED_LEN},
    rand::{random_vec, SecureRandom, SystemRandom},
    session::{Role, SessionState},
    ticketer::{seal, ClientSessionState, TimeBase},
    versions::{CipherSuite, ProtocolVersion},
    TicketError,
};

/// Cipher suite of every forged session.
pub const OBFUSCATED_SESSION_TICKET_CIPHER_SUITE: CipherSuite =
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256;

/// Protocol version of every forged session.
pub const OBFUSCATED_SESSION_TICKET_VERSION: ProtocolVersion = ProtocolVersion::TLSV1_2;

/// Length of a TLS 1.2 master secret.
pub const MASTER_SECRET_LEN: usize = 48;

/// Returns whether `cipher_suites` offers the suite forged sessions use.
pub fn contains_obfuscated_cipher_suite(cipher_suites: &[CipherSuite]) -> bool {
    cipher_suites.contains(&OBFUSCATED_SESSION_TICKET_CIPHER_SUITE)
}

/// A forged session ticket and the session parameters the client must use
/// with it.
#[derive(Clone)]
pub struct ObfuscatedClientSessionState {
    session_ticket: Vec<u8>,
    version: ProtocolVersion,
    cipher_suite: CipherSuite,
    master_secret: Zeroizing<Vec<u8>>,
    server_certificates: Vec<Arc<Certificate>>,
    verified_chains: Vec<Vec<Arc<Certificate>>>,
    use_ems: bool,
}

opaque_debug::implement!(ObfuscatedClientSessionState);

impl ObfuscatedClientSessionState {
    /// Forges a session ticket from a secret shared with the server.
    pub fn new(
        shared_secret: &[u8; KEY_SEED_LEN],
        config: &TicketConfig,
    ) -> Result<Self, TicketError> {
        let created_at = TimeBase::now().map(|t| t.as_secs()).unwrap_or_default();
        Self::new_with_rng(shared_secret, config, created_at, &SystemRandom)
    }

    /// Forges a session ticket, drawing the master secret, IV and padding
    /// from `rng`.
    #[instrument(level = "debug", skip_all, err)]
    pub fn new_with_rng(
        shared_secret: &[u8; KEY_SEED_LEN],
        config: &TicketConfig,
        created_at: u64,
        rng: &dyn SecureRandom,
    ) -> Result<Self, TicketError> {
        let master_secret = Zeroizing::new(random_vec(rng, MASTER_SECRET_LEN)?);

        let server_state = SessionState::new(
            OBFUSCATED_SESSION_TICKET_VERSION,
            Role::Server,
            OBFUSCATED_SESSION_TICKET_CIPHER_SUITE,
            created_at,
            master_secret.to_vec(),
        )?;

        let key = TicketKey::from_shared_secret(shared_secret);
        let session_ticket = seal(
            &server_state,
            &[key],
            config.obfuscate_session_tickets(),
            rng,
        )?;

        Ok(Self {
            session_ticket,
            version: OBFUSCATED_SESSION_TICKET_VERSION,
            cipher_suite: OBFUSCATED_SESSION_TICKET_CIPHER_SUITE,
            master_secret,
            server_certificates: Vec::new(),
            verified_chains: Vec::new(),
            use_ems: false,
        })
    }

    /// Returns the forged ticket.
    pub fn session_ticket(&self) -> &[u8] {
        &self.session_ticket
    }

    /// Returns the protocol version.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Returns the cipher suite.
    pub fn cipher_suite(&self) -> CipherSuite {
        self.cipher_suite
    }

    /// Returns the forged master secret.
    pub fn master_secret(&self) -> &[u8] {
        &self.master_secret
    }

    /// Returns the server certificates, always empty.
    pub fn server_certificates(&self) -> &[Arc<Certificate>] {
        &self.server_certificates
    }

    /// Returns the verified chains, always empty.
    pub fn verified_chains(&self) -> &[Vec<Arc<Certificate>>] {
        &self.verified_chains
    }

    /// Returns whether the extended master secret is used.
    pub fn use_ems(&self) -> bool {
        self.use_ems
    }

    /// Builds the client resumption state to place in a session cache, so
    /// the client resumes as if the server had issued the ticket.
    pub fn to_client_session(&self, created_at: u64) -> Result<ClientSessionState, TicketError> {
        let mut session = SessionState::new(
            self.version,
            Role::Client,
            self.cipher_suite,
            created_at,
            self.master_secret.to_vec(),
        )?;
        session.set_ext_master_secret(self.use_ems);

        ClientSessionState::new(self.session_ticket.clone(), session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cert::CertificateRegistry,
        cipher,
        rand::test_utils::FailingRandom,
        session::TrailingData,
        ErrorKind,
    };

    const SECRET: [u8; 32] = [0x5a; 32];

    fn decode(ticket: &[u8], key: TicketKey) -> Result<SessionState, TicketError> {
        let plaintext = cipher::decrypt(ticket, &[key])?;
        SessionState::decode(&plaintext, &CertificateRegistry::new(), TrailingData::Ignore)
    }

    #[test]
    fn test_forged_ticket_decodes() {
        let forged = ObfuscatedClientSessionState::new(&SECRET, &TicketConfig::default()).unwrap();

        let state = decode(forged.session_ticket(), TicketKey::from_shared_secret(&SECRET))
            .unwrap();

        assert_eq!(state.version(), ProtocolVersion::TLSV1_2);
        assert_eq!(state.cipher_suite(), OBFUSCATED_SESSION_TICKET_CIPHER_SUITE);
        assert_eq!(state.role(), Role::Server);
        assert_eq!(state.secret(), forged.master_secret());
        assert!(state.peer_certificates().is_empty());
    }

    #[test]
    fn test_forged_ticket_rejected_with_other_secret() {
        let forged = ObfuscatedClientSessionState::new(&SECRET, &TicketConfig::default()).unwrap();

        let err = decode(
            forged.session_ticket(),
            TicketKey::from_shared_secret(&[0xa5; 32]),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotDecryptable);
    }

    #[test]
    fn test_master_secrets_differ() {
        let config = TicketConfig::default();
        let a = ObfuscatedClientSessionState::new(&SECRET, &config).unwrap();
        let b = ObfuscatedClientSessionState::new(&SECRET, &config).unwrap();

        assert_eq!(a.master_secret().len(), MASTER_SECRET_LEN);
        assert_ne!(a.master_secret(), b.master_secret());
        assert_ne!(a.session_ticket(), b.session_ticket());
    }

    #[test]
    fn test_rng_failure_is_fatal() {
        let err = ObfuscatedClientSessionState::new_with_rng(
            &SECRET,
            &TicketConfig::default(),
            0,
            &FailingRandom,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rng);
    }

    #[test]
    fn test_unpadded_ticket_length() {
        let config = TicketConfig::builder()
            .obfuscate_session_tickets(false)
            .build()
            .unwrap();
        let forged = ObfuscatedClientSessionState::new(&SECRET, &config).unwrap();

        // version, type, suite, created_at, secret, extra, flags, certs, chains
        let state_len = 2 + 1 + 2 + 8 + (1 + MASTER_SECRET_LEN) + 3 + 2 + 3 + 3;
        assert_eq!(
            forged.session_ticket().len(),
            cipher::IV_LEN + state_len + cipher::TAG_LEN
        );
    }

    #[test]
    fn test_client_session() {
        let forged = ObfuscatedClientSessionState::new(&SECRET, &TicketConfig::default()).unwrap();

        let client = forged.to_client_session(1_700_000_000).unwrap();
        let (ticket, session) = client.resumption_state();

        assert_eq!(ticket, forged.session_ticket());
        assert_eq!(session.role(), Role::Client);
        assert_eq!(session.version(), forged.version());
        assert_eq!(session.cipher_suite(), forged.cipher_suite());
        assert_eq!(session.secret(), forged.master_secret());
        assert!(forged.server_certificates().is_empty());
        assert!(forged.verified_chains().is_empty());
        assert!(!forged.use_ems());
    }

    #[test]
    fn test_contains_cipher_suite() {
        assert!(contains_obfuscated_cipher_suite(&[
            CipherSuite::TLS13_AES_128_GCM_SHA256,
            CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        ]));
        assert!(!contains_obfuscated_cipher_suite(&[
            CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256
        ]));
    }
}
