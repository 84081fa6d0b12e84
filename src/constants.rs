//! Chain constants and well-known public RPC endpoints.
//!
//! The endpoint URLs are exposed for caller convenience (CLI defaults,
//! config files); nothing in the core logic hardcodes them.

pub use solana_sdk::native_token::LAMPORTS_PER_SOL;

pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";
pub const TESTNET_RPC_URL: &str = "https://api.testnet.solana.com";
pub const MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

pub const ANKR_MAINNET_RPC: &str = "https://rpc.ankr.com/solana";
pub const ANKR_DEVNET_RPC: &str = "https://rpc.ankr.com/solana_devnet";
pub const ANKR_TESTNET_RPC: &str = "https://rpc.ankr.com/solana_testnet";

/// Hard cap on addresses per `getMultipleAccounts` request imposed by public
/// RPC providers (the protocol limit is 100; 95 leaves headroom).
pub const DEFAULT_ACCOUNTS_QUERY_CHUNK: usize = 95;

/// Default number of transfer instructions packed into one transaction.
/// Ten keeps legacy transactions comfortably under the packet size limit.
pub const DEFAULT_MAX_RECIPIENTS_PER_TX: usize = 10;

/// Default compute-unit limit prepended to batched transfer transactions.
pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 200_000;
