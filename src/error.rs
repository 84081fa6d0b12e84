//! Error taxonomy for the payout manager.
//!
//! Transport-level failures travel as `anyhow::Error` inside the retry loop
//! and are only surfaced once the retry budget is spent, wrapped in
//! [`PayoutError::RetryExhausted`] so the last underlying error is never
//! swallowed.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayoutError {
    /// Bad pool or retry configuration, rejected before any state mutation.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to load wallet: {0}")]
    WalletLoad(String),

    #[error("no funding wallet loaded; load the funding wallet before this operation")]
    WalletNotLoaded,

    #[error("failed to parse recipients: {0}")]
    RecipientParse(String),

    /// Every endpoint/attempt in the pool budget failed.
    #[error("rpc call failed after {attempts} attempts across {endpoints} endpoint(s): {source}")]
    RetryExhausted {
        attempts: usize,
        endpoints: usize,
        #[source]
        source: anyhow::Error,
    },

    /// The remote ledger confirmed the transaction failed. Terminal.
    #[error("transaction {signature} failed on-chain: {reason}")]
    TransactionFailed { signature: String, reason: String },

    /// Ambiguous outcome: the transaction may still land. Not a failure
    /// in the [`PayoutError::TransactionFailed`] sense.
    #[error(
        "transaction {signature} was not confirmed within {timeout:?} \
         (it may still land); last observed status: {last_status:?}"
    )]
    ConfirmationTimeout {
        signature: String,
        timeout: Duration,
        last_status: Option<String>,
    },

    /// The connectivity check reached the endpoint but it reported not-healthy.
    #[error("rpc endpoint responded but reports itself unhealthy")]
    Unhealthy,

    /// The connectivity check succeeded but took longer than the caller allows.
    #[error("rpc endpoint answered in {elapsed:?}, exceeding the {limit:?} limit")]
    PingTimeout { elapsed: Duration, limit: Duration },

    /// A chunk of a mass payment failed; earlier chunks already confirmed.
    #[error(
        "mass payment aborted at chunk {failed_chunk}: {source} \
         ({} chunk(s) already confirmed)", .confirmed.len()
    )]
    PaymentsAborted {
        /// Signatures of chunks confirmed before the failure, in send order.
        confirmed: Vec<String>,
        /// One-based index of the chunk that failed.
        failed_chunk: usize,
        #[source]
        source: Box<PayoutError>,
    },

    #[error("airdrop request failed after {attempts} attempt(s): {source}")]
    AirdropFailed {
        attempts: usize,
        #[source]
        source: Box<PayoutError>,
    },
}

pub type Result<T> = std::result::Result<T, PayoutError>;
