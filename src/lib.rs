//! Mass SOL distribution with RPC endpoint failover.
//!
//! The crate funds many wallets from one funding account: it parses and
//! aggregates recipient lists, batches transfers into size-capped
//! transactions, chunks faucet airdrops, and polls confirmations, all
//! through a retrying invoker that fails over across a pool of RPC
//! endpoints. Everything is blocking; callers that need a responsive UI run
//! these operations on their own worker thread.
//!
//! ```no_run
//! use sol_payout::{constants::DEVNET_RPC_URL, MassPaymentOptions, PayoutManager};
//!
//! # fn main() -> Result<(), sol_payout::PayoutError> {
//! let mut manager = PayoutManager::new(DEVNET_RPC_URL)?;
//! manager.load_wallet_from_file("wallet.json".as_ref())?;
//! let parsed = manager.read_recipients_from_file("recipients.txt".as_ref(), Some("0.1"))?;
//! for warning in &parsed.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! let signatures =
//!     manager.send_mass_payments(&parsed.recipients, &MassPaymentOptions::default())?;
//! println!("sent {} transaction(s)", signatures.len());
//! # Ok(())
//! # }
//! ```

pub mod confirm;
pub mod constants;
pub mod error;
pub mod invoker;
pub mod manager;
pub mod pool;
pub mod recipients;
pub mod transport;
pub mod wallet;

pub use error::{PayoutError, Result};
pub use manager::{AirdropOptions, ChunkProgress, MassPaymentOptions, PayoutManager};
pub use recipients::{parse_recipients, sum_lamports, ParsedRecipients, Recipient};
