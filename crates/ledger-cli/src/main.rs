use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ledger_core::{Ledger, LedgerConfig, Transaction, Wallet};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use zeroize::Zeroizing;

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "Demonstration driver and wallet tool for the proof-of-work ledger")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct LedgerArgs {
    /// Leading zero hex characters required of each block hash
    #[arg(long, default_value_t = ledger_core::constants::DEFAULT_DIFFICULTY)]
    difficulty: usize,
    /// Reward paid to the miner of each block
    #[arg(long, default_value_t = ledger_core::constants::DEFAULT_MINING_REWARD)]
    reward: i64,
    /// Mining threads (defaults to one per core)
    #[arg(long)]
    workers: Option<usize>,
}

impl LedgerArgs {
    fn ledger(&self) -> Result<Ledger> {
        let config = LedgerConfig {
            difficulty: self.difficulty,
            mining_reward: self.reward,
            workers: self.workers,
        };
        Ledger::with_config(config).context("invalid ledger settings")
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the Alice/Bob/Charlie demonstration
    Demo {
        #[command(flatten)]
        ledger: LedgerArgs,
        /// Print the final chain as JSON
        #[arg(long)]
        dump: bool,
    },
    /// Wallet key file management
    Wallet {
        #[command(subcommand)]
        cmd: WalletCommand,
    },
    /// Fund a wallet, submit a signed transfer from it and mine it
    SignDemo {
        /// Encrypted key file
        #[arg(long)]
        file: PathBuf,
        #[arg(long, env = "LEDGER_PASSPHRASE", hide_env_values = true)]
        passphrase: String,
        /// Recipient of the signed transfer
        #[arg(long, default_value = "Bob")]
        to: String,
        #[arg(long, default_value_t = 40)]
        amount: i64,
        #[command(flatten)]
        ledger: LedgerArgs,
    },
}

#[derive(Subcommand, Debug)]
enum WalletCommand {
    /// Generate a keypair and write it encrypted to disk
    New {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, env = "LEDGER_PASSPHRASE", hide_env_values = true)]
        passphrase: String,
        /// RSA modulus size
        #[arg(long, default_value_t = ledger_core::constants::DEFAULT_KEY_BITS)]
        bits: usize,
    },
    /// Decrypt a key file and print its address and public key
    Show {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, env = "LEDGER_PASSPHRASE", hide_env_values = true)]
        passphrase: String,
    },
}

fn print_balances(ledger: &Ledger, accounts: &[&str]) {
    for account in accounts {
        println!("  balance of {account}: {}", ledger.get_balance(account));
    }
}

/// Submits a transfer, printing rather than aborting on rejection.
fn submit(ledger: &mut Ledger, tx: Transaction) {
    let label = format!("{:?} -> {:?} ({})", tx.sender, tx.receiver, tx.amount);
    match ledger.add_transaction(tx) {
        Ok(()) => println!("accepted {label}"),
        Err(err) => println!("rejected {label}: {err}"),
    }
}

fn run_demo(mut ledger: Ledger, dump: bool) -> Result<()> {
    let accounts = ["Alice", "Bob", "Charlie", "Miner1"];

    println!("Funding Alice with a mining reward...");
    ledger.mine_pending_transactions("Alice")?;

    submit(&mut ledger, Transaction::transfer("Alice", "Bob", 50));
    submit(&mut ledger, Transaction::transfer("Bob", "Charlie", 25));

    println!("Starting the miner for the first block...");
    ledger.mine_pending_transactions("Miner1")?;
    println!("After first mining:");
    print_balances(&ledger, &accounts);

    submit(&mut ledger, Transaction::transfer("Charlie", "Alice", 10));

    println!("\nStarting the miner for the second block...");
    ledger.mine_pending_transactions("Miner1")?;
    println!("After second mining:");
    print_balances(&ledger, &accounts);

    println!("\nIs blockchain valid? {}", ledger.is_chain_valid());
    if dump {
        println!("{}", serde_json::to_string_pretty(ledger.chain())?);
    }
    Ok(())
}

fn run_sign_demo(mut ledger: Ledger, wallet: &Wallet, to: &str, amount: i64) -> Result<()> {
    ledger.mine_pending_transactions(wallet.address())?;
    let tx = wallet.transfer(to, amount)?;
    ledger
        .submit_signed(tx, wallet.public_key())
        .context("signed transfer rejected")?;
    ledger.mine_pending_transactions("Miner1")?;

    print_balances(&ledger, &[wallet.address(), to, "Miner1"]);
    println!("Is blockchain valid? {}", ledger.is_chain_valid());
    Ok(())
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Demo { ledger, dump } => run_demo(ledger.ledger()?, dump)?,
        Command::Wallet { cmd } => match cmd {
            WalletCommand::New {
                out,
                passphrase,
                bits,
            } => {
                let passphrase = Zeroizing::new(passphrase);
                let wallet = Wallet::generate_keypair(bits)?;
                wallet
                    .save_encrypted(&out, &passphrase)
                    .with_context(|| format!("writing {}", out.display()))?;
                info!("wrote wallet to {}", out.display());
                println!("address: {}", wallet.address());
            }
            WalletCommand::Show { file, passphrase } => {
                let passphrase = Zeroizing::new(passphrase);
                let wallet = Wallet::load_encrypted(&file, &passphrase)
                    .with_context(|| format!("loading {}", file.display()))?;
                println!("address: {}", wallet.address());
                print!("{}", wallet.public_key_pem()?);
            }
        },
        Command::SignDemo {
            file,
            passphrase,
            to,
            amount,
            ledger,
        } => {
            let passphrase = Zeroizing::new(passphrase);
            let wallet = Wallet::load_encrypted(&file, &passphrase)
                .with_context(|| format!("loading {}", file.display()))?;
            run_sign_demo(ledger.ledger()?, &wallet, &to, amount)?;
        }
    }
    Ok(())
}
