//! Confirmation polling for submitted transactions.

use std::time::{Duration, Instant};

use solana_sdk::{commitment_config::{CommitmentConfig, CommitmentLevel}, signature::Signature};
use solana_transaction_status::{TransactionConfirmationStatus, TransactionStatus};
use tracing::debug;

use crate::{
    error::{PayoutError, Result},
    invoker::ResilientInvoker,
};

/// Interval between status polls. The status endpoint is cheap; sub-second
/// polling keeps per-chunk latency low without hammering the RPC.
const POLL_INTERVAL: Duration = Duration::from_millis(800);

/// Blocks until `signature` reaches `commitment`, fails on-chain, or the
/// deadline passes. At least one poll happens even with a zero timeout.
///
/// Resolution per poll: no status yet → keep polling; an error field →
/// [`PayoutError::TransactionFailed`] immediately; a named confirmation
/// level at or above the requested commitment → confirmed; a positive
/// confirmation count with no named level → confirmed (some RPCs omit the
/// named field). A timeout is an ambiguous outcome, not a failure: the
/// transaction may still land.
pub fn await_confirmation(
    invoker: &mut ResilientInvoker,
    signature: &Signature,
    timeout: Duration,
    commitment: CommitmentConfig,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let mut last_status: Option<TransactionStatus> = None;
    loop {
        let status = invoker.invoke(|transport| transport.signature_status(signature))?;
        if let Some(status) = status {
            if let Some(err) = &status.err {
                return Err(PayoutError::TransactionFailed {
                    signature: signature.to_string(),
                    reason: err.to_string(),
                });
            }
            if satisfies(&status, commitment.commitment) {
                debug!(%signature, "transaction confirmed");
                return Ok(());
            }
            last_status = Some(status);
        }
        if Instant::now() >= deadline {
            return Err(PayoutError::ConfirmationTimeout {
                signature: signature.to_string(),
                timeout,
                last_status: last_status.map(|status| format!("{status:?}")),
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn satisfies(status: &TransactionStatus, requested: CommitmentLevel) -> bool {
    match &status.confirmation_status {
        Some(level) => confirmation_rank(level) >= commitment_rank(requested),
        // Fallback for RPCs that omit the named field.
        None => status.confirmations.is_some_and(|count| count > 0),
    }
}

fn confirmation_rank(level: &TransactionConfirmationStatus) -> u8 {
    match level {
        TransactionConfirmationStatus::Processed => 0,
        TransactionConfirmationStatus::Confirmed => 1,
        TransactionConfirmationStatus::Finalized => 2,
    }
}

fn commitment_rank(level: CommitmentLevel) -> u8 {
    // The pre-1.x aliases still exist on the enum; rank them as their
    // documented replacements.
    #[allow(deprecated)]
    match level {
        CommitmentLevel::Processed | CommitmentLevel::Recent => 0,
        CommitmentLevel::Confirmed | CommitmentLevel::Single | CommitmentLevel::SingleGossip => 1,
        CommitmentLevel::Finalized | CommitmentLevel::Max | CommitmentLevel::Root => 2,
    }
}
