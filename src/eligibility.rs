//! Eligibility evaluator: wallet submission, anti-bot captcha, and the
//! tier mapping from on-chain holdings.
//!
//! Tiers are integers 0–3. ETH/BSC tiers derive from NFT holdings, SOL and
//! XRP from native balance; tier 0 means not eligible.

use rand::Rng;

use crate::chain::{ChainError, ChainInspector, Holdings};
use crate::model::{
    Amount, CaptchaChallenge, ChainId, EligibleEntry, Submission, MOMO_SCALE,
};
use crate::store::{CampaignStore, StoreError};

pub const MAX_TIER: u8 = 3;
/// Offset added to the stored captcha value to form the expected reply.
pub const CAPTCHA_OFFSET: u8 = 5;

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("invalid {chain} address {wallet}")]
    InvalidAddress { chain: ChainId, wallet: String },
    #[error("wallet {wallet} is blacklisted")]
    Blacklisted { wallet: String },
    #[error("user {user_id} already submitted a wallet")]
    AlreadySubmitted { user_id: String },
    #[error("no pending captcha for user {user_id}")]
    NoCaptcha { user_id: String },
    #[error("no wallet submission found for user {user_id}")]
    NoSubmission { user_id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a wallet submission: either a captcha must be answered first,
/// or (for whitelisted wallets) verification can run immediately.
#[derive(Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    CaptchaIssued(u8),
    Whitelisted,
}

#[derive(Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Wallet verified at the given tier.
    Verified { tier: u8, token_balance: Amount },
    /// No qualifying assets found.
    NoAssets,
    /// The chain inspector failed; treated as tier 0.
    InspectorFailed(String),
}

/// Syntactic address check per chain. Cheap prefilter only; real ownership
/// is established by the captcha plus the on-chain lookup.
pub fn is_valid_address(chain: ChainId, wallet: &str) -> bool {
    match chain {
        ChainId::Eth | ChainId::Bsc => {
            wallet.len() == 42
                && wallet.starts_with("0x")
                && wallet[2..].chars().all(|c| c.is_ascii_hexdigit())
        }
        ChainId::Sol => (43..=44).contains(&wallet.len()) && is_base58(wallet),
        ChainId::Xrp => {
            (25..=35).contains(&wallet.len()) && wallet.starts_with('r') && is_base58(wallet)
        }
    }
}

fn is_base58(s: &str) -> bool {
    // Bitcoin base58 alphabet: no 0, O, I, l.
    s.chars().all(|c| {
        c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
    })
}

/// Maps raw holdings to a tier. NFT chains grade on NFT count, the rest on
/// native balance in whole coins. On NFT chains a wallet with no NFTs and a
/// token balance below `min_token_balance` grades tier 0.
pub fn tier_for(chain: ChainId, holdings: &Holdings, min_token_balance: Amount) -> (u8, Amount) {
    match chain {
        ChainId::Eth | ChainId::Bsc => {
            if holdings.nft_count == 0 && holdings.token_balance < min_token_balance {
                return (0, holdings.token_balance);
            }
            let tier = (holdings.nft_count / 2).clamp(1, MAX_TIER as u64) as u8;
            (tier, holdings.token_balance)
        }
        ChainId::Sol | ChainId::Xrp => {
            let coins = holdings.native_balance / MOMO_SCALE;
            let tier = (coins / 10).clamp(1, MAX_TIER as u64) as u8;
            (tier, holdings.native_balance)
        }
    }
}

/// Records a wallet submission. Blacklisted wallets are rejected, repeat
/// submissions are duplicates, and whitelisted wallets skip the captcha.
pub fn submit_wallet<R: Rng>(
    store: &mut CampaignStore,
    user_id: &str,
    chain: ChainId,
    wallet: &str,
    rng: &mut R,
    now: u64,
) -> Result<SubmitOutcome, SubmitError> {
    if !is_valid_address(chain, wallet) {
        return Err(SubmitError::InvalidAddress {
            chain,
            wallet: wallet.to_string(),
        });
    }
    if store.is_blacklisted(wallet) {
        return Err(SubmitError::Blacklisted {
            wallet: wallet.to_string(),
        });
    }
    if store.submissions.contains_key(user_id) {
        return Err(SubmitError::AlreadySubmitted {
            user_id: user_id.to_string(),
        });
    }

    store.submissions.insert(
        user_id.to_string(),
        Submission {
            user_id: user_id.to_string(),
            wallet: wallet.to_string(),
            chain,
            submitted_at: now,
        },
    );

    if store.is_whitelisted(wallet) {
        return Ok(SubmitOutcome::Whitelisted);
    }

    let value = rng.gen_range(1..=10u8);
    store.captchas.insert(
        user_id.to_string(),
        CaptchaChallenge {
            value,
            issued_at: now,
        },
    );
    Ok(SubmitOutcome::CaptchaIssued(value))
}

/// Consumes the pending captcha and reports whether the answer matched.
pub fn answer_captcha(
    store: &mut CampaignStore,
    user_id: &str,
    answer: i64,
) -> Result<bool, SubmitError> {
    let challenge = store
        .captchas
        .remove(user_id)
        .ok_or_else(|| SubmitError::NoCaptcha {
            user_id: user_id.to_string(),
        })?;
    Ok(answer == i64::from(challenge.value) + i64::from(CAPTCHA_OFFSET))
}

/// Runs the eligibility check against the user's submitted wallet and, on a
/// positive tier, records the verified eligibility row.
pub fn verify_wallet(
    store: &mut CampaignStore,
    inspector: &dyn ChainInspector,
    user_id: &str,
) -> Result<VerifyOutcome, SubmitError> {
    let submission = store
        .submissions
        .get(user_id)
        .cloned()
        .ok_or_else(|| SubmitError::NoSubmission {
            user_id: user_id.to_string(),
        })?;

    let min_token_balance = store.config_amount("min_token_balance")?;
    let (tier, token_balance) = match inspector.holdings(submission.chain, &submission.wallet) {
        Ok(holdings) => tier_for(submission.chain, &holdings, min_token_balance),
        Err(ChainError::UnknownAccount { .. }) => (0, 0),
        Err(err) => return Ok(VerifyOutcome::InspectorFailed(err.to_string())),
    };

    if tier == 0 {
        return Ok(VerifyOutcome::NoAssets);
    }
    store.eligible.insert(
        user_id.to_string(),
        EligibleEntry {
            user_id: user_id.to_string(),
            wallet: submission.wallet,
            chain: submission.chain,
            tier,
            verified: true,
            token_balance,
            social_tasks_completed: 0,
        },
    );
    Ok(VerifyOutcome::Verified { tier, token_balance })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::InMemoryChain;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const ETH_WALLET: &str = "0x00000000000000000000000000000000000000aa";
    const XRP_WALLET: &str = "rEb8TK3gBgk5auZkwc6sHnwrGVJH8DuaLh";

    fn store_with_user(user_id: &str) -> CampaignStore {
        let mut store = CampaignStore::seeded(0);
        store.upsert_user(user_id, user_id, "link".into());
        store
    }

    #[test]
    fn address_validation_per_chain() {
        assert!(is_valid_address(ChainId::Eth, ETH_WALLET));
        assert!(!is_valid_address(ChainId::Eth, "0x1234"));
        assert!(!is_valid_address(ChainId::Eth, &format!("0y{}", &ETH_WALLET[2..])));
        assert!(is_valid_address(
            ChainId::Sol,
            "So11111111111111111111111111111111111111112"
        ));
        assert!(!is_valid_address(ChainId::Sol, "short"));
        assert!(is_valid_address(ChainId::Xrp, XRP_WALLET));
        assert!(!is_valid_address(ChainId::Xrp, "xEb8TK3gBgk5auZkwc6sHnwrG"));
    }

    #[test]
    fn tier_mapping_clamps_to_range() {
        let min = 100 * MOMO_SCALE;
        let nft = |n| Holdings { nft_count: n, ..Default::default() };
        // no NFTs and an empty token balance fails the minimum gate
        assert_eq!(tier_for(ChainId::Eth, &nft(0), min).0, 0);
        assert_eq!(tier_for(ChainId::Eth, &nft(1), min).0, 1);
        assert_eq!(tier_for(ChainId::Eth, &nft(4), min).0, 2);
        assert_eq!(tier_for(ChainId::Eth, &nft(40), min).0, 3);
        let holder = Holdings {
            token_balance: min,
            ..Default::default()
        };
        assert_eq!(tier_for(ChainId::Bsc, &holder, min).0, 1);

        let native = |coins: u64| Holdings {
            native_balance: coins * MOMO_SCALE,
            ..Default::default()
        };
        assert_eq!(tier_for(ChainId::Xrp, &native(5), min).0, 1);
        assert_eq!(tier_for(ChainId::Xrp, &native(25), min).0, 2);
        assert_eq!(tier_for(ChainId::Xrp, &native(300), min).0, 3);
        assert_eq!(tier_for(ChainId::Sol, &native(25), min).0, 2);
    }

    #[test]
    fn submission_gates_blacklist_and_duplicates() {
        let mut store = store_with_user("u1");
        let mut rng = StdRng::seed_from_u64(7);
        store.blacklist.insert(ETH_WALLET.to_string());
        assert!(matches!(
            submit_wallet(&mut store, "u1", ChainId::Eth, ETH_WALLET, &mut rng, 1),
            Err(SubmitError::Blacklisted { .. })
        ));

        store.blacklist.clear();
        let outcome = submit_wallet(&mut store, "u1", ChainId::Eth, ETH_WALLET, &mut rng, 1).unwrap();
        assert!(matches!(outcome, SubmitOutcome::CaptchaIssued(n) if (1..=10).contains(&n)));
        assert!(matches!(
            submit_wallet(&mut store, "u1", ChainId::Eth, ETH_WALLET, &mut rng, 2),
            Err(SubmitError::AlreadySubmitted { .. })
        ));
    }

    #[test]
    fn whitelisted_wallet_skips_captcha() {
        let mut store = store_with_user("u1");
        let mut rng = StdRng::seed_from_u64(7);
        store.whitelist.insert(XRP_WALLET.to_string());
        let outcome = submit_wallet(&mut store, "u1", ChainId::Xrp, XRP_WALLET, &mut rng, 1).unwrap();
        assert_eq!(outcome, SubmitOutcome::Whitelisted);
        assert!(store.captchas.is_empty());
    }

    #[test]
    fn captcha_answer_is_value_plus_offset() {
        let mut store = store_with_user("u1");
        let mut rng = StdRng::seed_from_u64(7);
        let outcome = submit_wallet(&mut store, "u1", ChainId::Eth, ETH_WALLET, &mut rng, 1).unwrap();
        let value = match outcome {
            SubmitOutcome::CaptchaIssued(n) => n,
            _ => panic!("expected captcha"),
        };
        assert!(answer_captcha(&mut store, "u1", i64::from(value) + 5).unwrap());
        // the captcha is consumed
        assert!(matches!(
            answer_captcha(&mut store, "u1", 0),
            Err(SubmitError::NoCaptcha { .. })
        ));
    }

    #[test]
    fn verify_records_eligible_row() {
        let mut store = store_with_user("u1");
        let mut rng = StdRng::seed_from_u64(7);
        submit_wallet(&mut store, "u1", ChainId::Eth, ETH_WALLET, &mut rng, 1).unwrap();

        let mut chain = InMemoryChain::new();
        chain.fund(
            ChainId::Eth,
            ETH_WALLET,
            Holdings {
                token_balance: 400 * MOMO_SCALE,
                nft_count: 6,
                ..Default::default()
            },
        );
        let outcome = verify_wallet(&mut store, &chain, "u1").unwrap();
        assert_eq!(
            outcome,
            VerifyOutcome::Verified {
                tier: 3,
                token_balance: 400 * MOMO_SCALE
            }
        );
        let entry = &store.eligible["u1"];
        assert!(entry.verified);
        assert_eq!(entry.tier, 3);
    }

    #[test]
    fn inspector_outage_keeps_submission_without_eligibility() {
        let mut store = store_with_user("u1");
        let mut rng = StdRng::seed_from_u64(7);
        submit_wallet(&mut store, "u1", ChainId::Eth, ETH_WALLET, &mut rng, 1).unwrap();

        let mut chain = InMemoryChain::new();
        chain.fund(
            ChainId::Eth,
            ETH_WALLET,
            Holdings {
                nft_count: 6,
                ..Default::default()
            },
        );
        chain.mark_unreachable(ETH_WALLET);
        let outcome = verify_wallet(&mut store, &chain, "u1").unwrap();
        assert!(matches!(outcome, VerifyOutcome::InspectorFailed(_)));
        // the submission survives so verification can be retried later
        assert!(store.submissions.contains_key("u1"));
        assert!(store.eligible.is_empty());
    }

    #[test]
    fn unknown_account_is_not_eligible() {
        let mut store = store_with_user("u1");
        let mut rng = StdRng::seed_from_u64(7);
        submit_wallet(&mut store, "u1", ChainId::Xrp, XRP_WALLET, &mut rng, 1).unwrap();
        let chain = InMemoryChain::new();
        let outcome = verify_wallet(&mut store, &chain, "u1").unwrap();
        assert_eq!(outcome, VerifyOutcome::NoAssets);
        assert!(store.eligible.is_empty());
    }
}
