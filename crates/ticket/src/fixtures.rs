//! Fixtures for testing

use std::sync::Arc;

use crate::{
    cert::{Certificate, CertificateRegistry},
    key::{KeyOrigin, TicketKey},
    session::{Role, SessionState},
    versions::{CipherSuite, ProtocolVersion},
};

/// Creation time used by fixture sessions.
pub const CREATED_AT: u64 = 1_700_000_000;

/// Returns a leaf, intermediate and root certificate from `registry`.
pub fn certificates(registry: &CertificateRegistry) -> Vec<Arc<Certificate>> {
    [
        &b"\x30\x82fixture leaf certificate"[..],
        &b"\x30\x82fixture intermediate certificate"[..],
        &b"\x30\x82fixture root certificate"[..],
    ]
    .into_iter()
    .map(|der| registry.get_or_insert(der).unwrap())
    .collect()
}

/// Returns a TLS 1.2 server session with a 48 byte master secret and no
/// certificates.
pub fn server_state() -> SessionState {
    SessionState::new(
        ProtocolVersion::TLSV1_2,
        Role::Server,
        CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        CREATED_AT,
        vec![0x11; 48],
    )
    .unwrap()
}

/// Returns a TLS 1.3 client session using every optional field.
pub fn client_state_tls13(registry: &CertificateRegistry) -> SessionState {
    let mut state = SessionState::new(
        ProtocolVersion::TLSV1_3,
        Role::Client,
        CipherSuite::TLS13_AES_128_GCM_SHA256,
        CREATED_AT,
        vec![0x22; 32],
    )
    .unwrap();

    let certs = certificates(registry);
    let other_root = registry
        .get_or_insert(b"\x30\x82fixture cross-signed root")
        .unwrap();

    state.push_extra(b"layer-a/v1".to_vec());
    state.push_extra(b"layer-b/v3:payload".to_vec());
    state.set_ext_master_secret(true);
    state.allow_early_data(b"h2".to_vec()).unwrap();
    state
        .set_peer_certificates(
            certs.clone(),
            b"ocsp response".to_vec(),
            vec![b"sct one".to_vec(), b"sct two".to_vec()],
        )
        .unwrap();
    state.push_verified_chain(certs.clone()).unwrap();
    state
        .push_verified_chain(vec![certs[0].clone(), other_root])
        .unwrap();
    state.set_ticket_lifetime(CREATED_AT + 7 * 24 * 60 * 60, 0xdead_beef);

    state
}

/// Returns an issuing ticket key derived from a repeated byte.
pub fn ticket_key(seed: u8) -> TicketKey {
    TicketKey::from_seed(&[seed; 32], KeyOrigin::Issued)
}
