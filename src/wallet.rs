//! Funding-wallet loading.
//!
//! Wallet files come in two formats: the Solana CLI's JSON array of byte
//! values, or a bare base-58 string. The probes run in that order and the
//! first one that decodes wins; the decoded secret must be a 64-byte full
//! secret key or a 32-byte seed.

use std::{fs, path::Path};

use solana_sdk::signature::Keypair;
use solana_sdk::signer::keypair::keypair_from_seed;
use tracing::debug;

use crate::error::{PayoutError, Result};

/// Reads and decodes a keypair file.
pub fn load_keypair_file(path: &Path) -> Result<Keypair> {
    let raw = fs::read_to_string(path).map_err(|err| {
        PayoutError::WalletLoad(format!("cannot read wallet file {}: {err}", path.display()))
    })?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PayoutError::WalletLoad(format!(
            "wallet file {} is empty",
            path.display()
        )));
    }
    let secret = decode_secret(raw).ok_or_else(|| {
        PayoutError::WalletLoad(format!(
            "wallet file {} is neither a JSON byte array nor a base-58 secret",
            path.display()
        ))
    })?;
    keypair_from_secret_bytes(&secret)
}

/// Ordered format probes; the first definitive success short-circuits.
fn decode_secret(raw: &str) -> Option<Vec<u8>> {
    if let Ok(bytes) = serde_json::from_str::<Vec<u8>>(raw) {
        debug!(len = bytes.len(), "wallet secret decoded from json byte array");
        return Some(bytes);
    }
    if let Ok(bytes) = bs58::decode(raw).into_vec() {
        debug!(len = bytes.len(), "wallet secret decoded from base-58");
        return Some(bytes);
    }
    None
}

fn keypair_from_secret_bytes(secret: &[u8]) -> Result<Keypair> {
    match secret.len() {
        64 => Keypair::from_bytes(secret)
            .map_err(|err| PayoutError::WalletLoad(format!("invalid 64-byte secret key: {err}"))),
        32 => keypair_from_seed(secret)
            .map_err(|err| PayoutError::WalletLoad(format!("invalid 32-byte seed: {err}"))),
        other => Err(PayoutError::WalletLoad(format!(
            "secret key must be 32 bytes (seed) or 64 bytes (full key), got {other}"
        ))),
    }
}
