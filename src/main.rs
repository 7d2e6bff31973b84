use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};

use momo_airdrop::bot::{BotEngine, Reply};
use momo_airdrop::chain::{Holdings, InMemoryChain};
use momo_airdrop::config::BotConfig;
use momo_airdrop::model::{ChainId, DistributionStatus, MOMO_SCALE};
use momo_airdrop::store::CampaignStore;
use momo_airdrop::{distribution, tasks, AirdropError};

/// Momo Coin airdrop campaign engine.
///
/// Drives the same conversation engine a chat frontend would: `start`,
/// `press`, and `text` replay user interactions against the persisted
/// campaign state, while the remaining commands are operator shortcuts.
#[derive(Parser)]
#[command(name = "momo-airdrop", version, about)]
struct Cli {
    /// Deployment config file.
    #[arg(long, global = true, default_value = "momo_config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write fresh config, state, and chain-fixture files.
    Init,
    /// Replay a /start, optionally arriving through a referral link.
    Start {
        user_id: String,
        username: String,
        /// Referrer id carried by the deep link.
        #[arg(long)]
        referrer: Option<String>,
    },
    /// Replay a menu button press by its callback id.
    Press { user_id: String, callback: String },
    /// Replay a free-text reply.
    Text { user_id: String, text: Vec<String> },
    /// Print a summary of the campaign state.
    Status,
    /// Write the distribution log as CSV.
    Export {
        #[arg(long, default_value = "airdrop_log.csv")]
        out: PathBuf,
    },
    /// Print the top Momo balances.
    Leaderboard,
    /// Seed holdings for a wallet in the chain fixture.
    Fund {
        chain: String,
        wallet: String,
        /// Native balance in whole coins.
        #[arg(long, default_value_t = 0)]
        native: u64,
        /// Token balance in whole coins.
        #[arg(long, default_value_t = 0)]
        tokens: u64,
        #[arg(long, default_value_t = 0)]
        nfts: u64,
    },
    /// Mark a wallet in the fixture so transfers to it fail.
    MarkFailing { wallet: String },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(2);
    }
}

fn run() -> Result<(), AirdropError> {
    let cli = Cli::parse();
    let now = unix_now();
    let config = BotConfig::load(&cli.config)?;

    match cli.command {
        Command::Init => {
            if !cli.config.exists() {
                config.save(&cli.config)?;
            }
            CampaignStore::seeded(now).save(&config.state_path, now)?;
            InMemoryChain::new().save(&config.chain_fixture_path)?;
            println!("initialized {}", config.state_path.display());
            println!("initialized {}", config.chain_fixture_path.display());
            Ok(())
        }
        Command::Start {
            user_id,
            username,
            referrer,
        } => {
            let mut engine = BotEngine::new(config.clone(), load_store(&config, now)?);
            let reply = engine.handle_start(&user_id, &username, referrer.as_deref(), now);
            print_reply(&reply)?;
            engine.store.save(&config.state_path, now)?;
            Ok(())
        }
        Command::Press { user_id, callback } => {
            let mut engine = BotEngine::new(config.clone(), load_store(&config, now)?);
            let mut chain = load_chain(&config)?;
            let reply = engine.handle_callback(&user_id, &callback, &mut chain, now);
            print_reply(&reply)?;
            engine.store.save(&config.state_path, now)?;
            chain.save(&config.chain_fixture_path)?;
            Ok(())
        }
        Command::Text { user_id, text } => {
            let mut engine = BotEngine::new(config.clone(), load_store(&config, now)?);
            let mut chain = load_chain(&config)?;
            let reply = engine.handle_text(&user_id, &text.join(" "), &mut chain, now);
            print_reply(&reply)?;
            engine.store.save(&config.state_path, now)?;
            chain.save(&config.chain_fixture_path)?;
            Ok(())
        }
        Command::Status => {
            let store = load_store(&config, now)?;
            print_status(&store);
            Ok(())
        }
        Command::Export { out } => {
            let store = load_store(&config, now)?;
            std::fs::write(&out, distribution::export_csv(&store))?;
            println!("wrote {}", out.display());
            Ok(())
        }
        Command::Leaderboard => {
            let store = load_store(&config, now)?;
            for (rank, (username, balance)) in store.leaderboard(10).iter().enumerate() {
                println!(
                    "{:>2}. {username} - {}.{:02}",
                    rank + 1,
                    balance / MOMO_SCALE,
                    balance % MOMO_SCALE
                );
            }
            Ok(())
        }
        Command::Fund {
            chain,
            wallet,
            native,
            tokens,
            nfts,
        } => {
            let chain_id = parse_chain_arg(&chain);
            let mut fixture = load_chain(&config)?;
            fixture.fund(
                chain_id,
                &wallet,
                Holdings {
                    native_balance: native * MOMO_SCALE,
                    token_balance: tokens * MOMO_SCALE,
                    nft_count: nfts,
                },
            );
            fixture.save(&config.chain_fixture_path)?;
            println!("funded {wallet} on {chain_id}");
            Ok(())
        }
        Command::MarkFailing { wallet } => {
            let mut fixture = load_chain(&config)?;
            fixture.mark_failing(&wallet);
            fixture.save(&config.chain_fixture_path)?;
            println!("marked {wallet} as failing");
            Ok(())
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn load_store(config: &BotConfig, now: u64) -> Result<CampaignStore, AirdropError> {
    if config.state_path.exists() {
        Ok(CampaignStore::load(&config.state_path)?)
    } else {
        Ok(CampaignStore::seeded(now))
    }
}

fn load_chain(config: &BotConfig) -> Result<InMemoryChain, AirdropError> {
    if config.chain_fixture_path.exists() {
        Ok(InMemoryChain::load(&config.chain_fixture_path)?)
    } else {
        Ok(InMemoryChain::new())
    }
}

fn parse_chain_arg(value: &str) -> ChainId {
    match ChainId::parse(value) {
        Some(chain) => chain,
        None => {
            eprintln!("error: unknown chain {value} (expected ETH, BSC, SOL, or XRP)");
            std::process::exit(2);
        }
    }
}

fn print_reply(reply: &Reply) -> Result<(), AirdropError> {
    println!("{}", reply.text);
    for notice in &reply.notices {
        println!("[notice -> {}] {}", notice.to, notice.text);
    }
    if let Some((name, content)) = &reply.attachment {
        std::fs::write(Path::new(name), content)?;
        println!("[attachment] wrote {name}");
    }
    Ok(())
}

fn print_status(store: &CampaignStore) {
    for campaign in &store.campaigns {
        println!(
            "campaign {}: {} ({} - {}) {}",
            campaign.id,
            campaign.name,
            campaign.start_date,
            campaign.end_date,
            if campaign.active { "active" } else { "inactive" }
        );
    }
    println!("users: {}", store.users.len());
    println!("wallet submissions: {}", store.submissions.len());
    println!("eligible: {}", store.eligible.len());
    for status in [
        DistributionStatus::Pending,
        DistributionStatus::Claimable,
        DistributionStatus::Claimed,
        DistributionStatus::Failed,
    ] {
        let count = store
            .distributions
            .values()
            .filter(|d| d.status == status)
            .count();
        if count > 0 {
            println!("distributions {status}: {count}");
        }
    }
    println!(
        "pending reviews: {} kyc, {} referrals, {} tasks",
        momo_airdrop::kyc::pending(store).len(),
        momo_airdrop::referral::pending(store).len(),
        tasks::pending(store).len()
    );
}
