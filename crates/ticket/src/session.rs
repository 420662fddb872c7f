//! Resumable session state and its binary encoding.
//!
//! The layout, in the TLS presentation language:
//!
//! ```text
//! enum { server(1), client(2) } SessionStateType;
//!
//! struct {
//!     uint16 version;
//!     SessionStateType type;
//!     uint16 cipher_suite;
//!     uint64 created_at;
//!     opaque secret<1..2^8-1>;
//!     opaque extra<0..2^24-1>;            /* of opaque<0..2^24-1> */
//!     uint8 ext_master_secret = { 0, 1 };
//!     uint8 early_data = { 0, 1 };
//!     CertificateEntry certificate_list<0..2^24-1>;
//!     CertificateChain verified_chains<0..2^24-1>; /* excluding leaf */
//!     select (early_data) {
//!         case 0: Empty;
//!         case 1: opaque alpn<0..2^8-1>;
//!     };
//!     select (type) {
//!         case server: Empty;
//!         case client: select (version) {
//!             case TLS 1.0..1.2: Empty;
//!             case TLS 1.3: uint64 use_by; uint32 age_add;
//!         };
//!     };
//! } SessionState;
//! ```
//!
//! The field order is a compatibility contract with the TLS layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    cert::{Certificate, CertificateRegistry},
    codec::{encode_bytes, encode_prefixed, read_bytes, read_prefixed, Codec, ListLength, Reader},
    versions::{CipherSuite, ProtocolVersion},
    TicketError,
};

const EXTENSION_STATUS_REQUEST: u16 = 5;
const EXTENSION_SCT: u16 = 18;
const STATUS_TYPE_OCSP: u8 = 1;

/// Which side of the connection a session state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Issued by a server, carried inside a ticket.
    Server,
    /// Held by a client alongside the ticket it received.
    Client,
}

impl Codec for Role {
    fn encode(&self, bytes: &mut Vec<u8>) {
        let typ: u8 = match self {
            Role::Server => 1,
            Role::Client => 2,
        };
        typ.encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<Self> {
        match u8::read(r)? {
            1 => Some(Role::Server),
            2 => Some(Role::Client),
            _ => None,
        }
    }
}

/// How [`SessionState::decode`] treats bytes after the last field.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingData {
    /// Trailing bytes are accepted only if every one of them is zero, as
    /// written by the padding obfuscator.
    #[default]
    RequireZeros,
    /// Trailing bytes are not inspected. Used for obfuscated tickets whose
    /// length accounting is owned by the peer that forged them.
    Ignore,
}

/// A resumable TLS session.
///
/// Certificates are shared with a [`CertificateRegistry`]; every verified
/// chain starts with the same leaf `Arc` as the peer certificates.
#[derive(Clone, PartialEq)]
pub struct SessionState {
    version: ProtocolVersion,
    role: Role,
    cipher_suite: CipherSuite,
    created_at: u64,
    secret: Zeroizing<Vec<u8>>,
    extra: Vec<Vec<u8>>,
    ext_master_secret: bool,
    /// ALPN protocol negotiated for early data, `Some` iff early data is
    /// allowed.
    early_data: Option<Vec<u8>>,
    peer_certificates: Vec<Arc<Certificate>>,
    ocsp_response: Vec<u8>,
    scts: Vec<Vec<u8>>,
    verified_chains: Vec<Vec<Arc<Certificate>>>,
    use_by: u64,
    age_add: u32,
}

opaque_debug::implement!(SessionState);

impl SessionState {
    /// Creates a session state without certificates, extra data or early
    /// data.
    ///
    /// `secret` is the master secret for TLS 1.2 or the PSK for TLS 1.3 and
    /// must be 1 to 255 bytes long.
    pub fn new(
        version: ProtocolVersion,
        role: Role,
        cipher_suite: CipherSuite,
        created_at: u64,
        secret: Vec<u8>,
    ) -> Result<Self, TicketError> {
        check_secret(&secret).map_err(TicketError::encode)?;

        Ok(Self {
            version,
            role,
            cipher_suite,
            created_at,
            secret: Zeroizing::new(secret),
            extra: Vec::new(),
            ext_master_secret: false,
            early_data: None,
            peer_certificates: Vec::new(),
            ocsp_response: Vec::new(),
            scts: Vec::new(),
            verified_chains: Vec::new(),
            use_by: 0,
            age_add: 0,
        })
    }

    /// Returns the protocol version.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Returns the role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the cipher suite.
    pub fn cipher_suite(&self) -> CipherSuite {
        self.cipher_suite
    }

    /// Returns the creation time in seconds since the UNIX epoch.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Returns the master secret or PSK.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Returns the extra data blocks, in the order they were appended.
    pub fn extra(&self) -> &[Vec<u8>] {
        &self.extra
    }

    /// Appends an extra data block.
    ///
    /// Blocks from different layers can be reordered, so each block must
    /// identify itself, e.g. with an id and version prefix.
    pub fn push_extra(&mut self, block: Vec<u8>) {
        self.extra.push(block);
    }

    /// Returns whether the extended master secret was negotiated.
    pub fn ext_master_secret(&self) -> bool {
        self.ext_master_secret
    }

    /// Sets whether the extended master secret was negotiated.
    pub fn set_ext_master_secret(&mut self, ext_master_secret: bool) {
        self.ext_master_secret = ext_master_secret;
    }

    /// Returns whether the ticket may be used for early data.
    pub fn early_data(&self) -> bool {
        self.early_data.is_some()
    }

    /// Returns the ALPN protocol, only present when early data is allowed.
    pub fn alpn_protocol(&self) -> Option<&[u8]> {
        self.early_data.as_deref()
    }

    /// Allows early data with the given ALPN protocol.
    pub fn allow_early_data(&mut self, alpn_protocol: Vec<u8>) -> Result<(), TicketError> {
        if alpn_protocol.len() > 0xff {
            return Err(TicketError::encode("alpn protocol longer than 255 bytes"));
        }
        self.early_data = Some(alpn_protocol);

        Ok(())
    }

    /// Declines early data.
    pub fn decline_early_data(&mut self) {
        self.early_data = None;
    }

    /// Returns the peer certificate chain, leaf first.
    pub fn peer_certificates(&self) -> &[Arc<Certificate>] {
        &self.peer_certificates
    }

    /// Returns the stapled OCSP response of the leaf, empty if none.
    pub fn ocsp_response(&self) -> &[u8] {
        &self.ocsp_response
    }

    /// Returns the signed certificate timestamps of the leaf.
    pub fn scts(&self) -> &[Vec<u8>] {
        &self.scts
    }

    /// Sets the peer certificate chain with the leaf's OCSP staple and SCTs.
    ///
    /// The OCSP response and SCTs belong to the leaf, so both must be empty
    /// when `certificates` is. Clears any verified chains, which must share
    /// the new leaf.
    pub fn set_peer_certificates(
        &mut self,
        certificates: Vec<Arc<Certificate>>,
        ocsp_response: Vec<u8>,
        scts: Vec<Vec<u8>>,
    ) -> Result<(), TicketError> {
        if certificates.is_empty() && (!ocsp_response.is_empty() || !scts.is_empty()) {
            return Err(TicketError::encode(
                "ocsp response or scts without a leaf certificate",
            ));
        }
        if scts.iter().any(Vec::is_empty) {
            return Err(TicketError::encode("empty signed certificate timestamp"));
        }

        self.peer_certificates = certificates;
        self.ocsp_response = ocsp_response;
        self.scts = scts;
        self.verified_chains.clear();

        Ok(())
    }

    /// Returns the verified chains, each starting with the peer leaf.
    pub fn verified_chains(&self) -> &[Vec<Arc<Certificate>>] {
        &self.verified_chains
    }

    /// Adds a verified chain.
    ///
    /// The chain must start with the peer leaf certificate. The leaf is
    /// replaced by the peer leaf itself so both share one identity.
    pub fn push_verified_chain(
        &mut self,
        mut chain: Vec<Arc<Certificate>>,
    ) -> Result<(), TicketError> {
        let leaf = self
            .peer_certificates
            .first()
            .ok_or_else(|| TicketError::encode("verified chain without peer certificates"))?;

        match chain.first_mut() {
            Some(first) if **first == **leaf => *first = leaf.clone(),
            Some(_) => {
                return Err(TicketError::encode(
                    "verified chain does not start with the peer leaf",
                ))
            }
            None => return Err(TicketError::encode("empty verified chain")),
        }
        self.verified_chains.push(chain);

        Ok(())
    }

    /// Returns whether the client-side ticket lifetime fields are part of
    /// the encoding.
    pub fn has_ticket_lifetime(&self) -> bool {
        self.role == Role::Client && self.version >= ProtocolVersion::TLSV1_3
    }

    /// Returns the time after which the ticket must not be used, in seconds
    /// since the UNIX epoch. Only meaningful for TLS 1.3 client sessions.
    pub fn use_by(&self) -> u64 {
        self.use_by
    }

    /// Returns the ticket age obfuscation value. Only meaningful for TLS 1.3
    /// client sessions.
    pub fn age_add(&self) -> u32 {
        self.age_add
    }

    /// Sets the TLS 1.3 client ticket lifetime fields.
    pub fn set_ticket_lifetime(&mut self, use_by: u64, age_add: u32) {
        self.use_by = use_by;
        self.age_add = age_add;
    }

    /// Encodes the session state.
    ///
    /// The encoding contains the session secret.
    pub fn encode(&self) -> Result<Vec<u8>, TicketError> {
        let mut bytes = Vec::with_capacity(64 + self.secret.len());

        self.version.encode(&mut bytes);
        self.role.encode(&mut bytes);
        self.cipher_suite.encode(&mut bytes);
        self.created_at.encode(&mut bytes);
        check_secret(&self.secret).map_err(TicketError::encode)?;
        encode_bytes(ListLength::U8, &mut bytes, &self.secret)?;
        encode_prefixed(ListLength::U24, &mut bytes, |bytes| {
            self.extra
                .iter()
                .try_for_each(|block| encode_bytes(ListLength::U24, bytes, block))
        })?;
        u8::from(self.ext_master_secret).encode(&mut bytes);
        u8::from(self.early_data.is_some()).encode(&mut bytes);
        self.encode_certificates(&mut bytes)?;
        encode_prefixed(ListLength::U24, &mut bytes, |bytes| {
            self.verified_chains
                .iter()
                .try_for_each(|chain| encode_chain(bytes, chain))
        })?;
        if let Some(alpn) = &self.early_data {
            encode_bytes(ListLength::U8, &mut bytes, alpn)?;
        }
        if self.has_ticket_lifetime() {
            self.use_by.encode(&mut bytes);
            self.age_add.encode(&mut bytes);
        }

        Ok(bytes)
    }

    fn encode_certificates(&self, bytes: &mut Vec<u8>) -> Result<(), TicketError> {
        encode_prefixed(ListLength::U24, bytes, |bytes| {
            for (i, cert) in self.peer_certificates.iter().enumerate() {
                encode_bytes(ListLength::U24, bytes, cert.as_der())?;
                encode_prefixed(ListLength::U16, bytes, |bytes| {
                    // OCSP and SCTs are only carried for the leaf.
                    if i > 0 {
                        return Ok(());
                    }
                    if !self.ocsp_response.is_empty() {
                        EXTENSION_STATUS_REQUEST.encode(bytes);
                        encode_prefixed(ListLength::U16, bytes, |bytes| {
                            STATUS_TYPE_OCSP.encode(bytes);
                            encode_bytes(ListLength::U24, bytes, &self.ocsp_response)
                        })?;
                    }
                    if !self.scts.is_empty() {
                        EXTENSION_SCT.encode(bytes);
                        encode_prefixed(ListLength::U16, bytes, |bytes| {
                            encode_prefixed(ListLength::U16, bytes, |bytes| {
                                self.scts
                                    .iter()
                                    .try_for_each(|sct| encode_bytes(ListLength::U16, bytes, sct))
                            })
                        })?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })
    }

    /// Decodes a session state.
    ///
    /// Certificates are looked up in, or inserted into, `registry`.
    /// `trailing` selects how bytes after the last field are treated.
    pub fn decode(
        bytes: &[u8],
        registry: &CertificateRegistry,
        trailing: TrailingData,
    ) -> Result<Self, TicketError> {
        let mut r = Reader::init(bytes);

        let version = ProtocolVersion::read(&mut r).ok_or_else(|| truncated("version"))?;
        let role = Role::read(&mut r).ok_or_else(|| invalid("session state type"))?;
        let cipher_suite = CipherSuite::read(&mut r).ok_or_else(|| truncated("cipher suite"))?;
        let created_at = u64::read(&mut r).ok_or_else(|| truncated("created at"))?;
        let secret = read_bytes(ListLength::U8, &mut r).ok_or_else(|| truncated("secret"))?;
        if secret.is_empty() {
            return Err(invalid("empty secret"));
        }

        let mut extra_list = read_prefixed(ListLength::U24, &mut r)
            .ok_or_else(|| truncated("extra"))?;
        let mut extra = Vec::new();
        while extra_list.any_left() {
            let block = read_bytes(ListLength::U24, &mut extra_list)
                .ok_or_else(|| truncated("extra block"))?;
            extra.push(block.to_vec());
        }

        let ext_master_secret = read_flag(&mut r, "extended master secret")?;
        let early_data = read_flag(&mut r, "early data")?;

        let (certs, ocsp_response, scts) = read_certificates(&mut r)?;
        let peer_certificates = certs
            .into_iter()
            .map(|der| registry.get_or_insert(der).map_err(|_| invalid("empty certificate")))
            .collect::<Result<Vec<_>, _>>()?;

        let mut chain_list = read_prefixed(ListLength::U24, &mut r)
            .ok_or_else(|| truncated("verified chains"))?;
        let mut verified_chains = Vec::new();
        while chain_list.any_left() {
            let mut cert_list = read_prefixed(ListLength::U24, &mut chain_list)
                .ok_or_else(|| truncated("verified chain"))?;
            let leaf = peer_certificates
                .first()
                .ok_or_else(|| invalid("verified chain without peer certificates"))?;

            let mut chain = vec![leaf.clone()];
            while cert_list.any_left() {
                let der = read_bytes(ListLength::U24, &mut cert_list)
                    .ok_or_else(|| truncated("verified chain certificate"))?;
                chain.push(
                    registry
                        .get_or_insert(der)
                        .map_err(|_| invalid("empty certificate"))?,
                );
            }
            verified_chains.push(chain);
        }

        let early_data = if early_data {
            let alpn = read_bytes(ListLength::U8, &mut r).ok_or_else(|| truncated("alpn"))?;
            Some(alpn.to_vec())
        } else {
            None
        };

        let mut state = Self {
            version,
            role,
            cipher_suite,
            created_at,
            secret: Zeroizing::new(secret.to_vec()),
            extra,
            ext_master_secret,
            early_data,
            peer_certificates,
            ocsp_response,
            scts,
            verified_chains,
            use_by: 0,
            age_add: 0,
        };

        if state.has_ticket_lifetime() {
            state.use_by = u64::read(&mut r).ok_or_else(|| truncated("use by"))?;
            state.age_add = u32::read(&mut r).ok_or_else(|| truncated("age add"))?;
        }

        match trailing {
            TrailingData::RequireZeros if r.rest().iter().any(|b| *b != 0) => {
                Err(invalid("non-zero trailing data"))
            }
            _ => Ok(state),
        }
    }
}

fn check_secret(secret: &[u8]) -> Result<(), &'static str> {
    match secret.len() {
        0 => Err("empty secret"),
        1..=0xff => Ok(()),
        _ => Err("secret longer than 255 bytes"),
    }
}

fn encode_chain(bytes: &mut Vec<u8>, chain: &[Arc<Certificate>]) -> Result<(), TicketError> {
    // The leaf is elided, it is always the first peer certificate.
    let (_, rest) = chain
        .split_first()
        .ok_or_else(|| TicketError::encode("empty verified chain"))?;

    encode_prefixed(ListLength::U24, bytes, |bytes| {
        rest.iter()
            .try_for_each(|cert| encode_bytes(ListLength::U24, bytes, cert.as_der()))
    })
}

fn read_flag(r: &mut Reader, field: &str) -> Result<bool, TicketError> {
    match u8::read(r) {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        Some(_) => Err(invalid(field)),
        None => Err(truncated(field)),
    }
}

type CertificateBlock<'a> = (Vec<&'a [u8]>, Vec<u8>, Vec<Vec<u8>>);

fn read_certificates<'a>(r: &mut Reader<'a>) -> Result<CertificateBlock<'a>, TicketError> {
    let mut cert_list =
        read_prefixed(ListLength::U24, r).ok_or_else(|| truncated("certificate list"))?;

    let mut certs = Vec::new();
    let mut ocsp_response = Vec::new();
    let mut scts = Vec::new();
    while cert_list.any_left() {
        let der = read_bytes(ListLength::U24, &mut cert_list)
            .ok_or_else(|| truncated("certificate"))?;
        let mut extensions = read_prefixed(ListLength::U16, &mut cert_list)
            .ok_or_else(|| truncated("certificate extensions"))?;
        certs.push(der);

        while extensions.any_left() {
            let typ = u16::read(&mut extensions).ok_or_else(|| truncated("extension type"))?;
            let mut data = read_prefixed(ListLength::U16, &mut extensions)
                .ok_or_else(|| truncated("extension data"))?;

            // OCSP and SCTs are only carried for the leaf.
            if certs.len() > 1 {
                continue;
            }

            match typ {
                EXTENSION_STATUS_REQUEST => {
                    if u8::read(&mut data) != Some(STATUS_TYPE_OCSP) {
                        return Err(invalid("certificate status type"));
                    }
                    let response = read_bytes(ListLength::U24, &mut data)
                        .ok_or_else(|| truncated("ocsp response"))?;
                    if response.is_empty() {
                        return Err(invalid("empty ocsp response"));
                    }
                    ocsp_response = response.to_vec();
                }
                EXTENSION_SCT => {
                    let mut sct_list = read_prefixed(ListLength::U16, &mut data)
                        .ok_or_else(|| truncated("sct list"))?;
                    if !sct_list.any_left() {
                        return Err(invalid("empty sct list"));
                    }
                    while sct_list.any_left() {
                        let sct = read_bytes(ListLength::U16, &mut sct_list)
                            .ok_or_else(|| truncated("sct"))?;
                        if sct.is_empty() {
                            return Err(invalid("empty sct"));
                        }
                        scts.push(sct.to_vec());
                    }
                }
                _ => continue,
            }

            if data.any_left() {
                return Err(invalid("certificate extension length"));
            }
        }
    }

    Ok((certs, ocsp_response, scts))
}

fn truncated(field: &str) -> TicketError {
    TicketError::decode(format!("truncated session state: {field}"))
}

fn invalid(field: &str) -> TicketError {
    TicketError::decode(format!("invalid session state: {field}"))
}
