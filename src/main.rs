use clap::{Parser, Subcommand};
use multisig::{
    address::Address,
    config::Config,
    ledger::BlockfrostClient,
    pipeline::{generate_wallets, MultisigPipeline, SpendRequest},
    registry::Registry,
    Validator,
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "multisig", about = "M-of-N multisig exercise on a Cardano testnet")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "config/default.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate signer wallets and print their environment lines
    GenerateWallets {
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
    /// Run the validator scenarios against the configured signers
    Scenarios,
    /// Lock funds from the funding wallet at the multisig script address
    Lock,
    /// Spend a locked output with the configured signer slots
    Spend,
    /// Send lovelace from the funding wallet to an address, single signer
    Transfer {
        /// Recipient bech32 address
        #[arg(long)]
        to: String,
        #[arg(long, default_value_t = 5_000_000)]
        lovelace: u64,
    },
}

/// The main entry point for the multisig application.
///
/// Initializes logging, loads the configuration, wires the Blockfrost ledger
/// client into the pipeline and runs the requested stage.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    info!("Multisig starting with config: {:?}", config);

    let network = config.network()?;
    let validator = Validator::new(config.policy()?).with_exact_count(config.multisig.exact_count);

    if let Command::GenerateWallets { count } = cli.command {
        for wallet in generate_wallets(network, config.wallets.derivation, count)? {
            info!("Wallet {}: {}", wallet.slot, wallet.address);
            println!("{}", wallet.env_line());
        }
        return Ok(());
    }

    let ledger = Arc::new(BlockfrostClient::new(
        config.require_api_key()?,
        config.network.base_url.clone(),
    ));
    let pipeline = MultisigPipeline::new(ledger, validator, network, config.tx.fee_lovelace)
        .with_derivation(config.wallets.derivation);

    if let Command::Transfer { to, lovelace } = &cli.command {
        let recipient = Address::parse(to)?.to_identity()?;
        let funding = pipeline.load_wallet(config.require_funding_seed()?)?;
        let tx_hash = pipeline.transfer(&funding, &recipient, *lovelace).await?;
        println!("Transaction: {}", tx_hash);
        return Ok(());
    }

    let signers = pipeline.load_signers(config.require_signer_seeds()?)?;

    match cli.command {
        Command::GenerateWallets { .. } | Command::Transfer { .. } => {}
        Command::Scenarios => {
            let report = pipeline.run_scenarios(&signers);
            for scenario in &report.scenarios {
                println!(
                    "{:<24} {:<8} {}",
                    scenario.name,
                    if scenario.result.is_valid() { "VALID" } else { "INVALID" },
                    scenario.result.message()
                );
            }
            println!(
                "{} valid, {} invalid",
                report.valid_count(),
                report.invalid_count()
            );
            if !report.passed() {
                anyhow::bail!("validator scenarios did not produce the expected verdicts");
            }
        }
        Command::Lock => {
            let funding = pipeline.load_wallet(config.require_funding_seed()?)?;
            let script = pipeline.build_script(&signers)?;
            let receipt = pipeline
                .lock_funds(&funding, &script, config.spend.lock_lovelace)
                .await?;

            let registry = Registry::connect(&config.database.url).await?;
            registry.store(&receipt.to_record()).await?;
            for line in receipt.env_lines() {
                println!("{}", line);
            }
        }
        Command::Spend => {
            let script = pipeline.build_script(&signers)?;
            let registry = Registry::connect(&config.database.url).await?;

            let (out_ref, expected_lovelace) = match config.utxo_ref()? {
                Some(out_ref) => {
                    let lovelace = match registry.get(&out_ref).await? {
                        Some(record) => record.lovelace,
                        None => config.spend.lock_lovelace,
                    };
                    (out_ref, lovelace)
                }
                None => {
                    let record = registry.latest().await?.ok_or_else(|| {
                        anyhow::anyhow!("no locked output configured or registered; run `lock` first")
                    })?;
                    (record.out_ref, record.lovelace)
                }
            };
            if let Some(record) = registry.get(&out_ref).await? {
                if record.script_address != script.address {
                    warn!(
                        "Registered script address {} differs from {}",
                        record.script_address, script.address
                    );
                }
            }

            let request = SpendRequest {
                out_ref,
                expected_lovelace,
                fee_reserve: config.spend.fee_reserve_lovelace,
                slots: config.wallets.signing_slots.clone(),
            };
            let receipt = pipeline.spend(&signers, &script, &request).await?;
            for (recipient, amount) in &receipt.distribution.payouts {
                println!("{} lovelace -> {}", amount, recipient);
            }
            println!("Transaction: {}", receipt.tx_hash);
        }
    }

    Ok(())
}
