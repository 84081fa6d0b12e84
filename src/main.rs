use std::{io::Write, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use tracing_subscriber::EnvFilter;

use sol_payout::{
    constants::{DEVNET_RPC_URL, LAMPORTS_PER_SOL},
    AirdropOptions, MassPaymentOptions, PayoutError, PayoutManager,
};

#[derive(Parser)]
#[clap(author, version, about = "Mass SOL distribution with RPC endpoint failover")]
struct Cli {
    /// RPC endpoint URL; repeat to build a failover pool
    #[clap(long = "url", global = true)]
    urls: Vec<String>,

    /// Retry attempts per endpoint before rotating to the next
    #[clap(long, global = true)]
    max_retries: Option<usize>,

    /// Base retry backoff in seconds
    #[clap(long, global = true)]
    backoff: Option<f64>,

    /// RPC request timeout in seconds
    #[clap(long, global = true)]
    timeout: Option<f64>,

    /// Funding wallet keypair file (JSON byte array or base-58 secret)
    #[clap(long, global = true)]
    keypair: Option<PathBuf>,

    /// Commitment level: processed, confirmed or finalized
    #[clap(long, global = true, default_value = "confirmed")]
    commitment: String,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check RPC connectivity and latency
    Ping {
        /// Fail if the endpoint takes longer than this many seconds
        #[clap(long, default_value = "5")]
        limit: f64,
    },
    /// Print the funding wallet address
    Address,
    /// Print the funding wallet balance
    Balance,
    /// Look up balances for many addresses
    Balances {
        /// Addresses to query; omit to read them from --input
        addresses: Vec<String>,

        /// File with one address per line (amounts, if present, are ignored)
        #[clap(long)]
        input: Option<PathBuf>,
    },
    /// Request a faucet airdrop, chunked to respect faucet limits
    Airdrop {
        /// Amount in SOL
        amount: f64,

        /// Faucet cap per request, in SOL
        #[clap(long, default_value = "2")]
        max_per_request: f64,

        /// Retry attempts per chunk
        #[clap(long, default_value = "3")]
        max_attempts: usize,

        /// Pause between attempts and between chunks, in seconds
        #[clap(long, default_value = "2")]
        pause: f64,
    },
    /// Distribute SOL to the recipients in a file
    Distribute(DistributeArgs),
    /// Generate a test recipients file
    GenerateRecipients {
        /// Number of recipients
        #[clap(long)]
        count: usize,

        /// Amount per recipient, in SOL
        #[clap(long, default_value = "0.1")]
        amount: String,

        /// Output file
        #[clap(long)]
        output: PathBuf,
    },
}

#[derive(Parser)]
struct DistributeArgs {
    /// Recipients file: `<address> [<amount-in-sol>]` per line
    input: PathBuf,

    /// Amount for lines that omit one, in SOL
    #[clap(long)]
    default_amount: Option<String>,

    /// Recipients per transaction
    #[clap(long)]
    batch_size: Option<usize>,

    /// Compute-unit limit per transaction
    #[clap(long)]
    cu_limit: Option<u32>,

    /// Compute-unit price in micro-lamports
    #[clap(long)]
    cu_price: Option<u64>,

    /// Skip the preflight simulation
    #[clap(long)]
    skip_preflight: bool,

    /// Skip the confirmation prompt
    #[clap(long)]
    yes: bool,

    /// Parse and summarize without sending anything
    #[clap(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let commitment = parse_commitment(&cli.commitment)?;

    let urls = if cli.urls.is_empty() {
        vec![DEVNET_RPC_URL.to_string()]
    } else {
        cli.urls.clone()
    };
    let mut manager = PayoutManager::new(&urls[0])?;
    manager.set_rpc_pool(
        &urls,
        cli.max_retries,
        cli.backoff.map(Duration::from_secs_f64),
        cli.timeout.map(Duration::from_secs_f64),
    )?;
    if let Some(path) = &cli.keypair {
        let address = manager
            .load_wallet_from_file(path)
            .with_context(|| format!("loading wallet from {}", path.display()))?;
        eprintln!("Funding wallet: {address}");
    }

    match cli.command {
        Commands::Ping { limit } => ping(&mut manager, limit),
        Commands::Address => {
            println!("{}", manager.wallet_address()?);
            Ok(())
        }
        Commands::Balance => {
            let lamports = manager.get_balance(commitment)?;
            println!("{} SOL ({lamports} lamports)", format_sol(lamports));
            Ok(())
        }
        Commands::Balances { addresses, input } => {
            balances(&mut manager, addresses, input, commitment)
        }
        Commands::Airdrop {
            amount,
            max_per_request,
            max_attempts,
            pause,
        } => {
            let options = AirdropOptions {
                max_per_request_sol: max_per_request,
                max_attempts,
                pause: Duration::from_secs_f64(pause),
                commitment,
                ..AirdropOptions::default()
            };
            let signatures = manager.request_airdrop(amount, &options)?;
            println!("Airdrop complete in {} chunk(s):", signatures.len());
            for signature in signatures {
                println!("  {signature}");
            }
            Ok(())
        }
        Commands::Distribute(args) => distribute(&mut manager, args, commitment),
        Commands::GenerateRecipients {
            count,
            amount,
            output,
        } => generate_recipients(count, &amount, &output),
    }
}

fn parse_commitment(name: &str) -> Result<CommitmentConfig> {
    match name {
        "processed" => Ok(CommitmentConfig::processed()),
        "confirmed" => Ok(CommitmentConfig::confirmed()),
        "finalized" => Ok(CommitmentConfig::finalized()),
        other => {
            bail!("unknown commitment level: {other} (expected processed, confirmed or finalized)")
        }
    }
}

fn ping(manager: &mut PayoutManager, limit: f64) -> Result<()> {
    let elapsed = manager.ping(Duration::from_secs_f64(limit))?;
    println!(
        "{} answered in {:.0} ms",
        manager.active_endpoint(),
        elapsed.as_secs_f64() * 1000.0
    );
    Ok(())
}

fn balances(
    manager: &mut PayoutManager,
    mut addresses: Vec<String>,
    input: Option<PathBuf>,
    commitment: CommitmentConfig,
) -> Result<()> {
    if let Some(path) = input {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading addresses from {}", path.display()))?;
        for line in text.lines() {
            let line = line.trim_start_matches('\u{feff}').trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(address) = line
                .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
                .find(|token| !token.is_empty())
            {
                addresses.push(address.to_string());
            }
        }
    }
    if addresses.is_empty() {
        bail!("no addresses given; pass them as arguments or via --input");
    }
    let balances = manager.fetch_balances(&addresses, commitment)?;
    let mut total = 0u128;
    for (address, lamports) in &balances {
        println!("{address}  {} SOL", format_sol(*lamports));
        total += u128::from(*lamports);
    }
    println!(
        "Total: {} SOL across {} entries",
        format_sol(total),
        balances.len()
    );
    Ok(())
}

fn distribute(
    manager: &mut PayoutManager,
    args: DistributeArgs,
    commitment: CommitmentConfig,
) -> Result<()> {
    let parsed = manager.read_recipients_from_file(&args.input, args.default_amount.as_deref())?;
    for warning in &parsed.warnings {
        eprintln!("⚠️  {warning}");
    }

    let total = parsed.total_lamports();
    let batch_size = args.batch_size.unwrap_or(10).max(1);
    let chunks = parsed.recipients.len().div_ceil(batch_size);
    println!("Recipients: {}", parsed.recipients.len());
    println!("Total to send: {} SOL", format_sol(total));
    println!("Transactions: {chunks} (up to {batch_size} transfers each)");

    if args.dry_run {
        println!("\nDry run, nothing sent.");
        return Ok(());
    }

    let balance = manager.get_balance(commitment)?;
    println!("Funding balance: {} SOL", format_sol(balance));
    if u128::from(balance) < total {
        bail!(
            "insufficient balance: have {} SOL, need {} SOL",
            format_sol(balance),
            format_sol(total)
        );
    }

    if !args.yes {
        print!("\nReady to distribute? [y/N] ");
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let progress = ProgressBar::new(parsed.recipients.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} Transferring")?,
    );

    let options = MassPaymentOptions {
        max_per_transaction: Some(batch_size),
        skip_preflight: args.skip_preflight,
        commitment,
        compute_unit_limit: args.cu_limit,
        compute_unit_price: args.cu_price,
        ..MassPaymentOptions::default()
    };
    let result =
        manager.send_mass_payments_with_progress(&parsed.recipients, &options, &mut |chunk| {
            progress.inc(chunk.recipients_in_chunk as u64);
            progress.println(format!(
                "✅ Chunk {}/{} confirmed: {}",
                chunk.chunk, chunk.chunks_total, chunk.signature
            ));
        });

    match result {
        Ok(signatures) => {
            progress.finish_with_message("done");
            println!(
                "\n✅ Distribution complete: {} transaction(s)",
                signatures.len()
            );
            for signature in signatures {
                println!("  {signature}");
            }
            Ok(())
        }
        Err(PayoutError::PaymentsAborted {
            confirmed,
            failed_chunk,
            source,
        }) => {
            progress.abandon();
            eprintln!("\n❌ Aborted at chunk {failed_chunk}: {source}");
            if confirmed.is_empty() {
                eprintln!("No chunks were confirmed.");
            } else {
                eprintln!("Confirmed before the failure:");
                for signature in &confirmed {
                    eprintln!("  {signature}");
                }
            }
            bail!("distribution aborted at chunk {failed_chunk}");
        }
        Err(err) => Err(err.into()),
    }
}

fn generate_recipients(count: usize, amount: &str, output: &PathBuf) -> Result<()> {
    // Hash a timestamped seed so repeated runs produce distinct addresses.
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .context("system clock before unix epoch")?
        .as_secs();
    let mut text = String::from("# Test recipients: <address> <amount-in-sol>\n");
    for i in 0..count {
        let seed = format!("recipient_{timestamp}_{i}");
        let hash = solana_sdk::hash::hash(seed.as_bytes());
        let address = Pubkey::new_from_array(hash.to_bytes());
        text.push_str(&format!("{address} {amount}\n"));
    }
    std::fs::write(output, text).with_context(|| format!("writing {}", output.display()))?;
    println!("Generated {count} recipients in {}", output.display());
    Ok(())
}

fn format_sol(lamports: impl Into<u128>) -> String {
    format!("{:.9}", lamports.into() as f64 / LAMPORTS_PER_SOL as f64)
}
