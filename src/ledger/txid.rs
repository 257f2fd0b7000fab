//! Transaction id derivation
//!
//! `hex(sha256(nonce || org_id || client_id))` with a fresh 24-byte random
//! nonce per operation.

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::access::Credential;

const NONCE_LEN: usize = 24;

/// Derives a fresh transaction id for the creator.
pub fn derive_tx_id(creator: &Credential) -> String {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    tx_id_from_nonce(&nonce, creator)
}

/// Deterministic part of the derivation.
pub fn tx_id_from_nonce(nonce: &[u8], creator: &Credential) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce);
    hasher.update(creator.org_id.as_bytes());
    hasher.update(creator.client_id.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_id_shape() {
        let id = derive_tx_id(&Credential::new("Factory", "f1"));
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let cred = Credential::new("Factory", "f1");
        assert_ne!(derive_tx_id(&cred), derive_tx_id(&cred));
    }

    #[test]
    fn test_deterministic_for_fixed_nonce() {
        let a = tx_id_from_nonce(b"nonce", &Credential::new("Factory", "f1"));
        let b = tx_id_from_nonce(b"nonce", &Credential::new("Factory", "f1"));
        let c = tx_id_from_nonce(b"nonce", &Credential::new("Dealer", "f1"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
