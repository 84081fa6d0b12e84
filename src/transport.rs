//! Transport collaborator: the narrow RPC surface the core needs.
//!
//! Everything the manager does against the remote ledger goes through
//! [`RpcTransport`]. The production implementation wraps the blocking
//! `solana_client::rpc_client::RpcClient`; tests substitute mocks through
//! the [`TransportFactory`] seam.

use std::time::Duration;

use anyhow::{Context, Result};
use solana_client::{rpc_client::RpcClient, rpc_config::RpcSendTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use solana_transaction_status::TransactionStatus;

/// Blocking RPC operations required by the payout manager. Each method may
/// fail with a generic transport error; the invoker treats every failure as
/// retryable.
pub trait RpcTransport {
    /// Lightweight connectivity check. `Ok(false)` means the endpoint
    /// answered but reports itself unhealthy.
    fn check_connectivity(&self) -> Result<bool>;

    fn get_balance(&self, address: &Pubkey, commitment: CommitmentConfig) -> Result<u64>;

    /// Lamport balances for many accounts in one round trip; `None` for
    /// accounts the ledger does not know.
    fn get_multiple_balances(
        &self,
        addresses: &[Pubkey],
        commitment: CommitmentConfig,
    ) -> Result<Vec<Option<u64>>>;

    fn latest_blockhash(&self, commitment: CommitmentConfig) -> Result<Hash>;

    fn send_transaction(
        &self,
        transaction: &Transaction,
        skip_preflight: bool,
        commitment: CommitmentConfig,
    ) -> Result<Signature>;

    fn signature_status(&self, signature: &Signature) -> Result<Option<TransactionStatus>>;

    fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature>;
}

/// Builds a transport for an endpoint URL. The invoker calls this on every
/// rotation and reconfiguration so each endpoint gets a fresh client.
pub type TransportFactory = Box<dyn Fn(&str, Duration) -> Box<dyn RpcTransport>>;

/// Default factory producing [`HttpTransport`] instances.
pub fn http_transport_factory() -> TransportFactory {
    Box::new(|url, timeout| Box::new(HttpTransport::new(url, timeout)))
}

/// [`RpcTransport`] over the blocking Solana JSON-RPC client.
pub struct HttpTransport {
    client: RpcClient,
}

impl HttpTransport {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            client: RpcClient::new_with_timeout(url.to_string(), timeout),
        }
    }
}

impl RpcTransport for HttpTransport {
    fn check_connectivity(&self) -> Result<bool> {
        // getHealth returns an error payload when the node is behind; that
        // still counts as "answered but unhealthy" rather than unreachable,
        // but the distinction is not observable through the client, so any
        // Ok is healthy and errors propagate as transport failures.
        self.client.get_health().context("getHealth request failed")?;
        Ok(true)
    }

    fn get_balance(&self, address: &Pubkey, commitment: CommitmentConfig) -> Result<u64> {
        let response = self
            .client
            .get_balance_with_commitment(address, commitment)
            .with_context(|| format!("getBalance failed for {address}"))?;
        Ok(response.value)
    }

    fn get_multiple_balances(
        &self,
        addresses: &[Pubkey],
        commitment: CommitmentConfig,
    ) -> Result<Vec<Option<u64>>> {
        let response = self
            .client
            .get_multiple_accounts_with_commitment(addresses, commitment)
            .context("getMultipleAccounts request failed")?;
        Ok(response
            .value
            .into_iter()
            .map(|account| account.map(|a| a.lamports))
            .collect())
    }

    fn latest_blockhash(&self, commitment: CommitmentConfig) -> Result<Hash> {
        let (blockhash, _last_valid_height) = self
            .client
            .get_latest_blockhash_with_commitment(commitment)
            .context("getLatestBlockhash request failed")?;
        Ok(blockhash)
    }

    fn send_transaction(
        &self,
        transaction: &Transaction,
        skip_preflight: bool,
        commitment: CommitmentConfig,
    ) -> Result<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight,
            preflight_commitment: Some(commitment.commitment),
            ..RpcSendTransactionConfig::default()
        };
        self.client
            .send_transaction_with_config(transaction, config)
            .context("sendTransaction request failed")
    }

    fn signature_status(&self, signature: &Signature) -> Result<Option<TransactionStatus>> {
        let response = self
            .client
            .get_signature_statuses(&[*signature])
            .with_context(|| format!("getSignatureStatuses failed for {signature}"))?;
        Ok(response.value.into_iter().next().flatten())
    }

    fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature> {
        self.client
            .request_airdrop(address, lamports)
            .with_context(|| format!("requestAirdrop of {lamports} lamports failed for {address}"))
    }
}
