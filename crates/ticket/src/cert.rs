//! Shared storage for certificates referenced by decoded session state.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use crate::TicketError;

/// A DER encoded X.509 certificate.
///
/// Trust evaluation happens before a chain reaches this crate, so the
/// bytes are carried as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Certificate(Vec<u8>);

impl Certificate {
    /// Creates a certificate from its DER encoding.
    pub fn new(der: Vec<u8>) -> Result<Self, TicketError> {
        if der.is_empty() {
            return Err(TicketError::encode("empty certificate"));
        }

        Ok(Self(der))
    }

    /// Returns the DER encoding.
    pub fn as_der(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Certificate {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Deduplicates certificates by their raw bytes.
///
/// Entries are weak, so a certificate lives exactly as long as some
/// session state (or other holder) references it. Dropped entries are
/// replaced on the next lookup and can be swept with [`purge`](Self::purge).
///
/// The registry is an ordinary value: share it by wrapping it in an `Arc`
/// and passing it to every decode call that should deduplicate against it.
#[derive(Debug, Default)]
pub struct CertificateRegistry {
    entries: Mutex<HashMap<Vec<u8>, Weak<Certificate>>>,
}

impl CertificateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared certificate for `der`, inserting it if there is no
    /// live entry.
    pub fn get_or_insert(&self, der: &[u8]) -> Result<Arc<Certificate>, TicketError> {
        let mut entries = self.lock();

        if let Some(cert) = entries.get(der).and_then(Weak::upgrade) {
            return Ok(cert);
        }

        let cert = Arc::new(Certificate::new(der.to_vec())?);
        entries.insert(der.to_vec(), Arc::downgrade(&cert));

        Ok(cert)
    }

    /// Removes entries whose certificate is no longer referenced.
    pub fn purge(&self) {
        self.lock().retain(|_, cert| cert.strong_count() > 0);
    }

    /// Returns the number of live certificates.
    pub fn len(&self) -> usize {
        self.lock()
            .values()
            .filter(|cert| cert.strong_count() > 0)
            .count()
    }

    /// Returns `true` if no certificate is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Vec<u8>, Weak<Certificate>>> {
        // The map holds no invariant a panicking holder could break.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_registry_dedups_by_bytes() {
        let registry = CertificateRegistry::new();

        let a = registry.get_or_insert(b"cert-a").unwrap();
        let b = registry.get_or_insert(b"cert-a").unwrap();
        let c = registry.get_or_insert(b"cert-c").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_drops_unreferenced() {
        let registry = CertificateRegistry::new();

        let a = registry.get_or_insert(b"cert-a").unwrap();
        let held = a.clone();
        drop(a);
        registry.purge();
        assert_eq!(registry.len(), 1);

        drop(held);
        assert!(registry.is_empty());
        registry.purge();
        assert!(registry.lock().is_empty());

        // A dead entry is replaced by a fresh certificate.
        let again = registry.get_or_insert(b"cert-a").unwrap();
        assert_eq!(again.as_der(), b"cert-a");
    }

    #[test]
    fn test_registry_rejects_empty() {
        let registry = CertificateRegistry::new();
        assert!(registry.get_or_insert(&[]).is_err());
    }

    #[test]
    fn test_registry_concurrent_insert() {
        let registry = Arc::new(CertificateRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || registry.get_or_insert(b"shared").unwrap())
            })
            .collect();
        let certs: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert!(certs.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.len(), 1);
    }
}
