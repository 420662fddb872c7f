//! TLS protocol versions and cipher suites.

use serde::{Deserialize, Serialize};

use crate::codec::{Codec, Reader};

/// A TLS protocol version, as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProtocolVersion(pub u16);

impl ProtocolVersion {
    /// TLS 1.0
    pub const TLSV1_0: Self = Self(0x0301);
    /// TLS 1.1
    pub const TLSV1_1: Self = Self(0x0302);
    /// TLS 1.2
    pub const TLSV1_2: Self = Self(0x0303);
    /// TLS 1.3
    pub const TLSV1_3: Self = Self(0x0304);

    /// Returns the wire value.
    pub fn get_u16(&self) -> u16 {
        self.0
    }
}

impl Codec for ProtocolVersion {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.0.encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<Self> {
        u16::read(r).map(Self)
    }
}

/// A TLS cipher suite identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CipherSuite(pub u16);

#[allow(missing_docs)]
impl CipherSuite {
    pub const TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256: Self = Self(0xc02f);
    pub const TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384: Self = Self(0xc030);
    pub const TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256: Self = Self(0xc02b);
    pub const TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384: Self = Self(0xc02c);
    pub const TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256: Self = Self(0xcca8);
    pub const TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256: Self = Self(0xcca9);
    pub const TLS13_AES_128_GCM_SHA256: Self = Self(0x1301);
    pub const TLS13_AES_256_GCM_SHA384: Self = Self(0x1302);
    pub const TLS13_CHACHA20_POLY1305_SHA256: Self = Self(0x1303);

    /// Returns the wire value.
    pub fn get_u16(&self) -> u16 {
        self.0
    }
}

impl Codec for CipherSuite {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.0.encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<Self> {
        u16::read(r).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_ordered() {
        assert!(ProtocolVersion::TLSV1_0 < ProtocolVersion::TLSV1_2);
        assert!(ProtocolVersion::TLSV1_2 < ProtocolVersion::TLSV1_3);
    }

    #[test]
    fn test_cipher_suite_wire_value() {
        let mut buf = Vec::new();
        CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256.encode(&mut buf);
        assert_eq!(buf, [0xc0, 0x2f]);
    }
}
