//! The payout manager: endpoint pool ownership, wallet state, mass
//! payments, airdrop chunking and balance fetching.
//!
//! All chunked operations are strictly sequential; each chunk waits for its
//! network round trip (and confirmation, where applicable) before the next
//! starts. That bounds outstanding RPC load and pins any failure to a single
//! chunk. Callers wanting a responsive UI run these blocking calls on their
//! own worker.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use solana_sdk::{
    commitment_config::CommitmentConfig,
    compute_budget::ComputeBudgetInstruction,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    system_instruction,
    transaction::Transaction,
};
use tracing::{debug, info};

use crate::{
    confirm::await_confirmation,
    constants::{
        DEFAULT_ACCOUNTS_QUERY_CHUNK, DEFAULT_COMPUTE_UNIT_LIMIT, DEFAULT_MAX_RECIPIENTS_PER_TX,
        LAMPORTS_PER_SOL,
    },
    error::{PayoutError, Result},
    invoker::ResilientInvoker,
    pool::{EndpointPool, RetryPolicy},
    recipients::{parse_recipients, ParsedRecipients, Recipient},
    transport::{http_transport_factory, TransportFactory},
};

#[derive(Debug, Clone)]
pub struct MassPaymentOptions {
    /// Recipients per transaction; `None` uses the manager default.
    pub max_per_transaction: Option<usize>,
    pub skip_preflight: bool,
    pub commitment: CommitmentConfig,
    /// Chunk-level override; `None` falls back to the manager default.
    pub compute_unit_limit: Option<u32>,
    pub compute_unit_price: Option<u64>,
    pub confirmation_timeout: Duration,
}

impl Default for MassPaymentOptions {
    fn default() -> Self {
        Self {
            max_per_transaction: None,
            skip_preflight: false,
            commitment: CommitmentConfig::confirmed(),
            compute_unit_limit: None,
            compute_unit_price: None,
            confirmation_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AirdropOptions {
    /// Faucet cap per request, in SOL.
    pub max_per_request_sol: f64,
    /// Inner retry budget per chunk, independent of the pool retry budget.
    pub max_attempts: usize,
    /// Base pause: grows linearly with the inner attempt number, and is also
    /// the flat delay between consecutive chunks.
    pub pause: Duration,
    pub commitment: CommitmentConfig,
    pub confirmation_timeout: Duration,
}

impl Default for AirdropOptions {
    fn default() -> Self {
        Self {
            max_per_request_sol: 2.0,
            max_attempts: 3,
            pause: Duration::from_secs(2),
            commitment: CommitmentConfig::confirmed(),
            confirmation_timeout: Duration::from_secs(60),
        }
    }
}

/// Passed to the progress callback after each chunk confirms.
#[derive(Debug, Clone)]
pub struct ChunkProgress {
    /// One-based chunk index.
    pub chunk: usize,
    pub chunks_total: usize,
    pub recipients_in_chunk: usize,
    pub signature: String,
}

pub struct PayoutManager {
    invoker: ResilientInvoker,
    wallet: Option<Keypair>,
    accounts_query_chunk: usize,
    default_max_recipients_per_tx: usize,
    default_compute_unit_limit: Option<u32>,
    default_compute_unit_price: Option<u64>,
}

impl PayoutManager {
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_factory(endpoint, http_transport_factory())
    }

    /// Builds a manager over a custom transport factory. The seam tests use
    /// to substitute a scripted ledger for the real RPC client.
    pub fn with_factory(endpoint: &str, factory: TransportFactory) -> Result<Self> {
        let pool = EndpointPool::new([endpoint])?;
        Ok(Self {
            invoker: ResilientInvoker::new(pool, RetryPolicy::default(), factory),
            wallet: None,
            accounts_query_chunk: DEFAULT_ACCOUNTS_QUERY_CHUNK,
            default_max_recipients_per_tx: DEFAULT_MAX_RECIPIENTS_PER_TX,
            default_compute_unit_limit: Some(DEFAULT_COMPUTE_UNIT_LIMIT),
            default_compute_unit_price: None,
        })
    }

    // ------------------------------------------------------------------
    // Pool management
    // ------------------------------------------------------------------

    /// Replaces the endpoint pool; see [`ResilientInvoker::configure`].
    pub fn set_rpc_pool(
        &mut self,
        urls: &[String],
        max_retries: Option<usize>,
        backoff: Option<Duration>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.invoker.configure(urls, max_retries, backoff, timeout)
    }

    /// Switches to a single endpoint (resets the pool).
    pub fn set_endpoint(&mut self, url: &str, timeout: Option<Duration>) -> Result<()> {
        self.invoker
            .configure(&[url.to_string()], None, None, timeout)
    }

    pub fn endpoints(&self) -> &[String] {
        self.invoker.pool().urls()
    }

    pub fn active_endpoint(&self) -> &str {
        self.invoker.pool().active_url()
    }

    pub fn ping(&mut self, limit: Duration) -> Result<Duration> {
        self.invoker.ping(limit)
    }

    // ------------------------------------------------------------------
    // Wallet
    // ------------------------------------------------------------------

    /// Loads the funding wallet from a keypair file and returns its address.
    pub fn load_wallet_from_file(&mut self, path: &Path) -> Result<String> {
        let keypair = crate::wallet::load_keypair_file(path)?;
        let address = keypair.pubkey().to_string();
        info!(%address, "funding wallet loaded");
        self.wallet = Some(keypair);
        Ok(address)
    }

    pub fn set_wallet(&mut self, keypair: Keypair) {
        self.wallet = Some(keypair);
    }

    pub fn wallet_address(&self) -> Result<String> {
        Ok(self.require_wallet()?.pubkey().to_string())
    }

    fn require_wallet(&self) -> Result<&Keypair> {
        self.wallet.as_ref().ok_or(PayoutError::WalletNotLoaded)
    }

    // ------------------------------------------------------------------
    // Tuning
    // ------------------------------------------------------------------

    pub fn set_accounts_query_chunk(&mut self, chunk: usize) {
        self.accounts_query_chunk = chunk.max(1);
    }

    pub fn set_default_batch_size(&mut self, batch_size: usize) {
        self.default_max_recipients_per_tx = batch_size.max(1);
    }

    pub fn set_default_compute_budget(&mut self, limit: Option<u32>, price: Option<u64>) {
        self.default_compute_unit_limit = limit;
        self.default_compute_unit_price = price;
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Lamport balance of the funding wallet.
    pub fn get_balance(&mut self, commitment: CommitmentConfig) -> Result<u64> {
        let address = self.require_wallet()?.pubkey();
        self.invoker
            .invoke(|transport| transport.get_balance(&address, commitment))
    }

    /// Lamport balances for arbitrary addresses, paged into
    /// `accounts_query_chunk`-sized multi-account queries. The result has
    /// one entry per input address, in input order, duplicates included;
    /// unknown accounts map to zero.
    pub fn fetch_balances(
        &mut self,
        addresses: &[String],
        commitment: CommitmentConfig,
    ) -> Result<Vec<(String, u64)>> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }
        let mut unique: Vec<(String, Pubkey)> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for address in addresses {
            if seen.insert(address.as_str()) {
                let pubkey = Pubkey::from_str(address).map_err(|_| {
                    PayoutError::InvalidArgument(format!("invalid address: {address}"))
                })?;
                unique.push((address.clone(), pubkey));
            }
        }
        let mut by_address: HashMap<&str, u64> = HashMap::new();
        for page in unique.chunks(self.accounts_query_chunk) {
            let pubkeys: Vec<Pubkey> = page.iter().map(|(_, pubkey)| *pubkey).collect();
            let balances = self
                .invoker
                .invoke(|transport| transport.get_multiple_balances(&pubkeys, commitment))?;
            for ((address, _), lamports) in page.iter().zip(balances) {
                by_address.insert(address.as_str(), lamports.unwrap_or(0));
            }
        }
        Ok(addresses
            .iter()
            .map(|address| {
                (
                    address.clone(),
                    by_address.get(address.as_str()).copied().unwrap_or(0),
                )
            })
            .collect())
    }

    // ------------------------------------------------------------------
    // Recipients
    // ------------------------------------------------------------------

    /// Reads and parses a recipients file; see
    /// [`crate::recipients::parse_recipients`].
    pub fn read_recipients_from_file(
        &self,
        path: &Path,
        default_amount_sol: Option<&str>,
    ) -> Result<ParsedRecipients> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            PayoutError::RecipientParse(format!(
                "cannot read recipients file {}: {err}",
                path.display()
            ))
        })?;
        parse_recipients(&text, default_amount_sol)
    }

    // ------------------------------------------------------------------
    // Airdrops
    // ------------------------------------------------------------------

    /// Requests `amount_sol` from the faucet in chunks of at most
    /// `max_per_request_sol`, confirming each chunk before the next.
    /// Returns each chunk's signature in request order.
    pub fn request_airdrop(&mut self, amount_sol: f64, options: &AirdropOptions) -> Result<Vec<String>> {
        let total = sol_to_lamports(amount_sol)
            .ok_or_else(|| PayoutError::InvalidArgument(format!(
                "airdrop amount must be greater than zero, got {amount_sol}"
            )))?;
        let cap = sol_to_lamports(options.max_per_request_sol)
            .ok_or_else(|| PayoutError::InvalidArgument(format!(
                "max_per_request_sol must be greater than zero, got {}",
                options.max_per_request_sol
            )))?;
        if options.max_attempts < 1 {
            return Err(PayoutError::InvalidArgument(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        let recipient = self.require_wallet()?.pubkey();
        let mut remaining = total;
        let mut signatures = Vec::new();
        while remaining > 0 {
            let chunk = remaining.min(cap);
            let signature = self.request_airdrop_lamports(&recipient, chunk, options)?;
            await_confirmation(
                &mut self.invoker,
                &signature,
                options.confirmation_timeout,
                options.commitment,
            )?;
            info!(%signature, lamports = chunk, "airdrop chunk confirmed");
            signatures.push(signature.to_string());
            remaining -= chunk;
            if remaining > 0 {
                std::thread::sleep(options.pause);
            }
        }
        Ok(signatures)
    }

    /// One faucet request with its own linear retry loop. This policy is
    /// deliberately separate from the pool backoff: faucets rate-limit far
    /// more aggressively than regular RPC methods.
    fn request_airdrop_lamports(
        &mut self,
        recipient: &Pubkey,
        lamports: u64,
        options: &AirdropOptions,
    ) -> Result<Signature> {
        let mut last_error: Option<PayoutError> = None;
        for attempt in 1..=options.max_attempts {
            match self
                .invoker
                .invoke(|transport| transport.request_airdrop(recipient, lamports))
            {
                Ok(signature) => return Ok(signature),
                Err(err) => {
                    debug!(attempt, max_attempts = options.max_attempts, error = %err, "airdrop attempt failed");
                    last_error = Some(err);
                    if attempt < options.max_attempts {
                        std::thread::sleep(options.pause * attempt as u32);
                    }
                }
            }
        }
        Err(PayoutError::AirdropFailed {
            attempts: options.max_attempts,
            source: Box::new(last_error.expect("max_attempts >= 1 guarantees one attempt")),
        })
    }

    // ------------------------------------------------------------------
    // Mass payments
    // ------------------------------------------------------------------

    /// Sends one transfer per recipient, batched into transactions of at
    /// most `max_per_transaction` recipients, in input order. Each chunk
    /// fetches a fresh blockhash, is signed once by the funding wallet, and
    /// is confirmed before the next chunk goes out. On a chunk failure the
    /// remaining chunks are abandoned and the signatures already confirmed
    /// travel inside [`PayoutError::PaymentsAborted`].
    pub fn send_mass_payments(
        &mut self,
        recipients: &[Recipient],
        options: &MassPaymentOptions,
    ) -> Result<Vec<String>> {
        self.send_mass_payments_with_progress(recipients, options, &mut |_| {})
    }

    /// Like [`Self::send_mass_payments`] but invokes `progress` after each
    /// confirmed chunk, so a CLI or UI layer can render progress while the
    /// operation blocks.
    pub fn send_mass_payments_with_progress(
        &mut self,
        recipients: &[Recipient],
        options: &MassPaymentOptions,
        progress: &mut dyn FnMut(&ChunkProgress),
    ) -> Result<Vec<String>> {
        let batch_size = options
            .max_per_transaction
            .unwrap_or(self.default_max_recipients_per_tx);
        if batch_size < 1 {
            return Err(PayoutError::InvalidArgument(
                "max_per_transaction must be at least 1".to_string(),
            ));
        }
        let wallet = self.wallet.as_ref().ok_or(PayoutError::WalletNotLoaded)?;
        let compute_unit_limit = options.compute_unit_limit.or(self.default_compute_unit_limit);
        let compute_unit_price = options.compute_unit_price.or(self.default_compute_unit_price);
        let chunks_total = recipients.len().div_ceil(batch_size);
        let mut confirmed: Vec<String> = Vec::with_capacity(chunks_total);
        for (index, chunk) in recipients.chunks(batch_size).enumerate() {
            let chunk_number = index + 1;
            match send_chunk(
                &mut self.invoker,
                wallet,
                chunk,
                options,
                compute_unit_limit,
                compute_unit_price,
            ) {
                Ok(signature) => {
                    info!(
                        %signature,
                        chunk = chunk_number,
                        chunks_total,
                        recipients = chunk.len(),
                        "payment chunk confirmed"
                    );
                    confirmed.push(signature.to_string());
                    progress(&ChunkProgress {
                        chunk: chunk_number,
                        chunks_total,
                        recipients_in_chunk: chunk.len(),
                        signature: signature.to_string(),
                    });
                }
                Err(err) => {
                    return Err(PayoutError::PaymentsAborted {
                        confirmed,
                        failed_chunk: chunk_number,
                        source: Box::new(err),
                    });
                }
            }
        }
        Ok(confirmed)
    }
}

/// Builds, signs, submits and confirms one transaction for `chunk`. The
/// blockhash is fetched here, per chunk, so it cannot expire while earlier
/// chunks confirm.
fn send_chunk(
    invoker: &mut ResilientInvoker,
    wallet: &Keypair,
    chunk: &[Recipient],
    options: &MassPaymentOptions,
    compute_unit_limit: Option<u32>,
    compute_unit_price: Option<u64>,
) -> Result<Signature> {
    let payer = wallet.pubkey();
    let mut instructions: Vec<Instruction> = Vec::with_capacity(chunk.len() + 2);
    if let Some(limit) = compute_unit_limit {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(limit));
    }
    if let Some(price) = compute_unit_price {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_price(price));
    }
    for recipient in chunk {
        let to = Pubkey::from_str(&recipient.address).map_err(|_| {
            PayoutError::InvalidArgument(format!("invalid recipient address: {}", recipient.address))
        })?;
        instructions.push(system_instruction::transfer(&payer, &to, recipient.lamports));
    }
    let blockhash = invoker.invoke(|transport| transport.latest_blockhash(options.commitment))?;
    let transaction =
        Transaction::new_signed_with_payer(&instructions, Some(&payer), &[wallet], blockhash);
    let signature = invoker.invoke(|transport| {
        transport.send_transaction(&transaction, options.skip_preflight, options.commitment)
    })?;
    await_confirmation(invoker, &signature, options.confirmation_timeout, options.commitment)?;
    Ok(signature)
}

/// Whole-SOL amounts from user input, truncated toward zero. `None` when the
/// amount is non-positive, non-finite, or under one lamport.
fn sol_to_lamports(amount_sol: f64) -> Option<u64> {
    if !amount_sol.is_finite() || amount_sol <= 0.0 {
        return None;
    }
    let lamports = (amount_sol * LAMPORTS_PER_SOL as f64).floor();
    if lamports < 1.0 {
        return None;
    }
    Some(lamports as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use anyhow::anyhow;
    use solana_sdk::hash::Hash;
    use solana_transaction_status::{TransactionConfirmationStatus, TransactionStatus};

    use crate::transport::RpcTransport;

    #[derive(Debug)]
    struct SentTx {
        transfers: usize,
        budget_instructions: usize,
        blockhash: Hash,
    }

    /// Scripted ledger: confirms everything instantly, remembers what was
    /// sent, and can be told to fail from a given transaction onwards.
    #[derive(Default)]
    struct LedgerState {
        blockhash_requests: usize,
        sends: Vec<SentTx>,
        fail_sends_from: Option<usize>,
        airdrops: Vec<u64>,
        airdrop_failures_remaining: usize,
        balances: HashMap<Pubkey, u64>,
        balance_page_sizes: Vec<usize>,
    }

    struct ScriptedLedger(Arc<Mutex<LedgerState>>);

    impl RpcTransport for ScriptedLedger {
        fn check_connectivity(&self) -> anyhow::Result<bool> {
            Ok(true)
        }

        fn get_balance(&self, address: &Pubkey, _: CommitmentConfig) -> anyhow::Result<u64> {
            let state = self.0.lock().unwrap();
            Ok(state.balances.get(address).copied().unwrap_or(0))
        }

        fn get_multiple_balances(
            &self,
            addresses: &[Pubkey],
            _: CommitmentConfig,
        ) -> anyhow::Result<Vec<Option<u64>>> {
            let mut state = self.0.lock().unwrap();
            state.balance_page_sizes.push(addresses.len());
            Ok(addresses
                .iter()
                .map(|address| state.balances.get(address).copied())
                .collect())
        }

        fn latest_blockhash(&self, _: CommitmentConfig) -> anyhow::Result<Hash> {
            let mut state = self.0.lock().unwrap();
            state.blockhash_requests += 1;
            Ok(Hash::new_unique())
        }

        fn send_transaction(
            &self,
            transaction: &Transaction,
            _: bool,
            _: CommitmentConfig,
        ) -> anyhow::Result<Signature> {
            let mut state = self.0.lock().unwrap();
            let index = state.sends.len() + 1;
            if state.fail_sends_from.is_some_and(|from| index >= from) {
                return Err(anyhow!("node rejected transaction {index}"));
            }
            let message = &transaction.message;
            let budget_program = solana_sdk::compute_budget::id();
            let system_program = solana_sdk::system_program::id();
            let mut transfers = 0;
            let mut budget_instructions = 0;
            for instruction in &message.instructions {
                let program = message.account_keys[instruction.program_id_index as usize];
                if program == budget_program {
                    budget_instructions += 1;
                } else if program == system_program {
                    transfers += 1;
                }
            }
            state.sends.push(SentTx {
                transfers,
                budget_instructions,
                blockhash: message.recent_blockhash,
            });
            Ok(Signature::new_unique())
        }

        fn signature_status(&self, _: &Signature) -> anyhow::Result<Option<TransactionStatus>> {
            Ok(Some(TransactionStatus {
                slot: 1,
                confirmations: Some(1),
                status: Ok(()),
                err: None,
                confirmation_status: Some(TransactionConfirmationStatus::Confirmed),
            }))
        }

        fn request_airdrop(&self, _: &Pubkey, lamports: u64) -> anyhow::Result<Signature> {
            let mut state = self.0.lock().unwrap();
            if state.airdrop_failures_remaining > 0 {
                state.airdrop_failures_remaining -= 1;
                return Err(anyhow!("faucet rate limit"));
            }
            state.airdrops.push(lamports);
            Ok(Signature::new_unique())
        }
    }

    fn test_manager(state: Arc<Mutex<LedgerState>>) -> PayoutManager {
        let factory: TransportFactory = Box::new(move |_url, _timeout| {
            Box::new(ScriptedLedger(Arc::clone(&state))) as Box<dyn RpcTransport>
        });
        let mut manager = PayoutManager::with_factory("mock", factory).unwrap();
        // Zero backoff keeps the retry paths instant in tests.
        manager
            .set_rpc_pool(&["mock".to_string()], Some(1), Some(Duration::ZERO), None)
            .unwrap();
        manager.set_wallet(Keypair::new());
        manager
    }

    fn recipients(count: usize) -> Vec<Recipient> {
        (0..count)
            .map(|i| Recipient {
                address: Pubkey::new_unique().to_string(),
                lamports: (i as u64 + 1) * 1_000,
            })
            .collect()
    }

    fn fast_airdrop_options() -> AirdropOptions {
        AirdropOptions {
            pause: Duration::ZERO,
            confirmation_timeout: Duration::from_secs(5),
            ..AirdropOptions::default()
        }
    }

    #[test]
    fn batches_preserve_order_and_fetch_one_blockhash_per_chunk() {
        let state = Arc::new(Mutex::new(LedgerState::default()));
        let mut manager = test_manager(Arc::clone(&state));

        let signatures = manager
            .send_mass_payments(
                &recipients(25),
                &MassPaymentOptions {
                    max_per_transaction: Some(10),
                    ..MassPaymentOptions::default()
                },
            )
            .unwrap();

        assert_eq!(signatures.len(), 3);
        let state = state.lock().unwrap();
        assert_eq!(state.blockhash_requests, 3);
        let sizes: Vec<usize> = state.sends.iter().map(|tx| tx.transfers).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
        let hashes: HashSet<Hash> = state.sends.iter().map(|tx| tx.blockhash).collect();
        assert_eq!(hashes.len(), 3, "each chunk must use its own blockhash");
    }

    #[test]
    fn compute_budget_instructions_are_prepended_when_configured() {
        let state = Arc::new(Mutex::new(LedgerState::default()));
        let mut manager = test_manager(Arc::clone(&state));

        manager
            .send_mass_payments(
                &recipients(2),
                &MassPaymentOptions {
                    compute_unit_limit: Some(150_000),
                    compute_unit_price: Some(1_000),
                    ..MassPaymentOptions::default()
                },
            )
            .unwrap();
        assert_eq!(state.lock().unwrap().sends[0].budget_instructions, 2);

        // Manager default is a unit limit only.
        manager.send_mass_payments(&recipients(2), &MassPaymentOptions::default()).unwrap();
        assert_eq!(state.lock().unwrap().sends[1].budget_instructions, 1);

        manager.set_default_compute_budget(None, None);
        manager.send_mass_payments(&recipients(2), &MassPaymentOptions::default()).unwrap();
        assert_eq!(state.lock().unwrap().sends[2].budget_instructions, 0);
    }

    #[test]
    fn chunk_failure_aborts_rest_and_reports_partial_progress() {
        let state = Arc::new(Mutex::new(LedgerState::default()));
        state.lock().unwrap().fail_sends_from = Some(2);
        let mut manager = test_manager(Arc::clone(&state));

        let err = manager
            .send_mass_payments(
                &recipients(25),
                &MassPaymentOptions {
                    max_per_transaction: Some(10),
                    ..MassPaymentOptions::default()
                },
            )
            .unwrap_err();

        match err {
            PayoutError::PaymentsAborted {
                confirmed,
                failed_chunk,
                source,
            } => {
                assert_eq!(confirmed.len(), 1);
                assert_eq!(failed_chunk, 2);
                assert!(matches!(*source, PayoutError::RetryExhausted { .. }));
            }
            other => panic!("expected PaymentsAborted, got {other:?}"),
        }
        // Chunk 3 was never built: chunk 1 sent, chunk 2 attempted once.
        let state = state.lock().unwrap();
        assert_eq!(state.sends.len(), 1);
        assert_eq!(state.blockhash_requests, 2);
    }

    #[test]
    fn mass_payment_preconditions_are_checked() {
        let state = Arc::new(Mutex::new(LedgerState::default()));
        let mut manager = test_manager(Arc::clone(&state));

        let err = manager
            .send_mass_payments(
                &recipients(1),
                &MassPaymentOptions {
                    max_per_transaction: Some(0),
                    ..MassPaymentOptions::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, PayoutError::InvalidArgument(_)));

        let factory: TransportFactory = Box::new(move |_url, _timeout| {
            Box::new(ScriptedLedger(Arc::new(Mutex::new(LedgerState::default()))))
                as Box<dyn RpcTransport>
        });
        let mut no_wallet = PayoutManager::with_factory("mock", factory).unwrap();
        let err = no_wallet
            .send_mass_payments(&recipients(1), &MassPaymentOptions::default())
            .unwrap_err();
        assert!(matches!(err, PayoutError::WalletNotLoaded));
    }

    #[test]
    fn progress_callback_fires_per_confirmed_chunk() {
        let state = Arc::new(Mutex::new(LedgerState::default()));
        let mut manager = test_manager(state);

        let mut seen: Vec<(usize, usize)> = Vec::new();
        manager
            .send_mass_payments_with_progress(
                &recipients(25),
                &MassPaymentOptions {
                    max_per_transaction: Some(10),
                    ..MassPaymentOptions::default()
                },
                &mut |progress| seen.push((progress.chunk, progress.recipients_in_chunk)),
            )
            .unwrap();
        assert_eq!(seen, vec![(1, 10), (2, 10), (3, 5)]);
    }

    #[test]
    fn airdrop_splits_into_capped_chunks_in_order() {
        let state = Arc::new(Mutex::new(LedgerState::default()));
        let mut manager = test_manager(Arc::clone(&state));

        let signatures = manager
            .request_airdrop(5.0, &fast_airdrop_options())
            .unwrap();
        assert_eq!(signatures.len(), 3);
        assert_eq!(
            *state.lock().unwrap().airdrops,
            vec![2 * LAMPORTS_PER_SOL, 2 * LAMPORTS_PER_SOL, LAMPORTS_PER_SOL]
        );
    }

    #[test]
    fn airdrop_inner_retry_survives_transient_faucet_failures() {
        let state = Arc::new(Mutex::new(LedgerState::default()));
        state.lock().unwrap().airdrop_failures_remaining = 2;
        let mut manager = test_manager(Arc::clone(&state));

        let signatures = manager
            .request_airdrop(1.0, &fast_airdrop_options())
            .unwrap();
        assert_eq!(signatures.len(), 1);
        assert_eq!(*state.lock().unwrap().airdrops, vec![LAMPORTS_PER_SOL]);
    }

    #[test]
    fn airdrop_gives_up_after_inner_attempt_budget() {
        let state = Arc::new(Mutex::new(LedgerState::default()));
        state.lock().unwrap().airdrop_failures_remaining = 3;
        let mut manager = test_manager(Arc::clone(&state));

        let err = manager
            .request_airdrop(1.0, &fast_airdrop_options())
            .unwrap_err();
        assert!(matches!(err, PayoutError::AirdropFailed { attempts: 3, .. }));
        assert!(state.lock().unwrap().airdrops.is_empty());
    }

    #[test]
    fn airdrop_rejects_non_positive_amounts() {
        let state = Arc::new(Mutex::new(LedgerState::default()));
        let mut manager = test_manager(state);

        let err = manager.request_airdrop(0.0, &fast_airdrop_options()).unwrap_err();
        assert!(matches!(err, PayoutError::InvalidArgument(_)));

        let err = manager
            .request_airdrop(
                1.0,
                &AirdropOptions {
                    max_per_request_sol: 0.0,
                    ..fast_airdrop_options()
                },
            )
            .unwrap_err();
        assert!(matches!(err, PayoutError::InvalidArgument(_)));
    }

    #[test]
    fn balances_cover_every_input_address_including_duplicates() {
        let state = Arc::new(Mutex::new(LedgerState::default()));
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        state.lock().unwrap().balances.insert(a, 7);
        let mut manager = test_manager(Arc::clone(&state));

        let result = manager
            .fetch_balances(
                &[a.to_string(), b.to_string(), a.to_string()],
                CommitmentConfig::confirmed(),
            )
            .unwrap();
        assert_eq!(
            result,
            vec![
                (a.to_string(), 7),
                (b.to_string(), 0),
                (a.to_string(), 7),
            ]
        );
        // One page: two unique addresses.
        assert_eq!(*state.lock().unwrap().balance_page_sizes, vec![2]);
    }

    #[test]
    fn balances_page_unique_addresses_by_query_chunk() {
        let state = Arc::new(Mutex::new(LedgerState::default()));
        let mut manager = test_manager(Arc::clone(&state));
        manager.set_accounts_query_chunk(2);

        let addresses: Vec<String> =
            (0..5).map(|_| Pubkey::new_unique().to_string()).collect();
        let result = manager
            .fetch_balances(&addresses, CommitmentConfig::confirmed())
            .unwrap();
        assert_eq!(result.len(), 5);
        assert_eq!(*state.lock().unwrap().balance_page_sizes, vec![2, 2, 1]);
    }

    #[test]
    fn wallet_balance_comes_from_the_ledger() {
        let state = Arc::new(Mutex::new(LedgerState::default()));
        let wallet = Keypair::new();
        state.lock().unwrap().balances.insert(wallet.pubkey(), 123);
        let mut manager = test_manager(Arc::clone(&state));
        manager.set_wallet(wallet);

        let balance = manager.get_balance(CommitmentConfig::confirmed()).unwrap();
        assert_eq!(balance, 123);
    }

    #[test]
    fn sol_to_lamports_truncates_and_rejects_non_positive() {
        assert_eq!(sol_to_lamports(1.5), Some(1_500_000_000));
        assert_eq!(sol_to_lamports(0.0), None);
        assert_eq!(sol_to_lamports(-1.0), None);
        assert_eq!(sol_to_lamports(f64::NAN), None);
    }
}
