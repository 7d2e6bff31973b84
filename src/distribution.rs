//! Distribution calculator, payout dispatcher, and claim semantics.
//!
//! `calculate_airdrop` turns the verified eligibility set into pending
//! per-user allocations with a vesting deadline; `dispatch_payouts` pushes
//! each pending allocation through the chain sender; `claim` releases a
//! claimable allocation into the user's Momo balance once vesting ends.

use crate::chain::ChainSender;
use crate::model::{Amount, ChainId, Distribution, DistributionStatus, UserId, Wallet};
use crate::store::{CampaignStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum DistributionError {
    #[error("campaign {id} is not active")]
    CampaignNotActive { id: u64 },
    #[error("no verified eligible users to distribute to")]
    NoEligibleTiers,
    #[error("nothing to claim for user {user_id}")]
    NothingToClaim { user_id: UserId },
    #[error("tokens for user {user_id} vest until {vesting_end}")]
    StillVesting { user_id: UserId, vesting_end: u64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-user share computed by `calculate_airdrop`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub user_id: UserId,
    pub wallet: Wallet,
    pub chain: ChainId,
    pub tier: u8,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationReport {
    pub campaign_id: u64,
    pub token_per_tier: Amount,
    pub vesting_end: u64,
    pub allocations: Vec<Allocation>,
}

/// Outcome of one transfer attempt during a dispatch run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayoutResult {
    pub user_id: UserId,
    pub wallet: Wallet,
    pub chain: ChainId,
    pub amount: Amount,
    pub outcome: Result<String, String>,
}

/// Splits the campaign budget proportionally over verified tiers and stamps
/// pending distributions with the vesting deadline. Integer division: the
/// sub-tier remainder of the budget stays undistributed.
pub fn calculate_airdrop(
    store: &mut CampaignStore,
    campaign_id: u64,
    now: u64,
) -> Result<AllocationReport, DistributionError> {
    let campaign = store.campaign(campaign_id)?;
    if !campaign.active {
        return Err(DistributionError::CampaignNotActive { id: campaign_id });
    }
    let total_tokens = campaign.total_tokens;

    let total_tiers: u64 = store
        .eligible
        .values()
        .filter(|e| e.verified)
        .map(|e| e.tier as u64)
        .sum();
    if total_tiers == 0 {
        return Err(DistributionError::NoEligibleTiers);
    }
    let token_per_tier = total_tokens / total_tiers;

    let vesting_days = store.config_u64("vesting_period_days")?;
    let vesting_end = vesting_days
        .checked_mul(86_400)
        .and_then(|secs| now.checked_add(secs))
        .ok_or_else(|| StoreError::MalformedConfigValue {
            key: "vesting_period_days".to_string(),
            value: vesting_days.to_string(),
        })?;

    let mut allocations = Vec::new();
    for entry in store.eligible.values().filter(|e| e.verified) {
        let amount = token_per_tier * entry.tier as u64;
        allocations.push(Allocation {
            user_id: entry.user_id.clone(),
            wallet: entry.wallet.clone(),
            chain: entry.chain,
            tier: entry.tier,
            amount,
        });
    }
    for alloc in &allocations {
        store.distributions.insert(
            alloc.user_id.clone(),
            Distribution {
                user_id: alloc.user_id.clone(),
                wallet: alloc.wallet.clone(),
                chain: alloc.chain,
                amount: alloc.amount,
                status: DistributionStatus::Pending,
                tx_hash: None,
                vesting_end,
            },
        );
    }

    Ok(AllocationReport {
        campaign_id,
        token_per_tier,
        vesting_end,
        allocations,
    })
}

/// Issues one transfer per pending distribution. A successful transfer
/// promotes the row to claimable with its tx hash; a failed one marks the
/// row failed and the run continues.
pub fn dispatch_payouts(
    store: &mut CampaignStore,
    sender: &mut dyn ChainSender,
) -> Vec<PayoutResult> {
    let pending: Vec<UserId> = store
        .distributions
        .values()
        .filter(|d| d.status == DistributionStatus::Pending)
        .map(|d| d.user_id.clone())
        .collect();

    let mut results = Vec::with_capacity(pending.len());
    for user_id in pending {
        let (wallet, chain, amount) = {
            let dist = &store.distributions[&user_id];
            (dist.wallet.clone(), dist.chain, dist.amount)
        };
        let outcome = match sender.transfer(chain, &wallet, amount) {
            Ok(tx_hash) => {
                let dist = store.distributions.get_mut(&user_id).expect("pending row");
                dist.status = DistributionStatus::Claimable;
                dist.tx_hash = Some(tx_hash.clone());
                Ok(tx_hash)
            }
            Err(err) => {
                let dist = store.distributions.get_mut(&user_id).expect("pending row");
                dist.status = DistributionStatus::Failed;
                Err(err.to_string())
            }
        };
        results.push(PayoutResult {
            user_id,
            wallet,
            chain,
            amount,
            outcome,
        });
    }
    results
}

/// Releases a claimable distribution after its vesting window, crediting
/// the amount to the user's Momo balance.
pub fn claim(
    store: &mut CampaignStore,
    user_id: &str,
    now: u64,
) -> Result<Amount, DistributionError> {
    let (amount, vesting_end) = match store.distributions.get(user_id) {
        Some(d) if d.status == DistributionStatus::Claimable => (d.amount, d.vesting_end),
        _ => {
            return Err(DistributionError::NothingToClaim {
                user_id: user_id.to_string(),
            })
        }
    };
    if now < vesting_end {
        return Err(DistributionError::StillVesting {
            user_id: user_id.to_string(),
            vesting_end,
        });
    }
    let dist = store.distributions.get_mut(user_id).expect("claimable row");
    dist.status = DistributionStatus::Claimed;
    store.credit_balance(user_id, amount)?;
    Ok(amount)
}

/// Renders the distributions table as CSV for the admin export.
pub fn export_csv(store: &CampaignStore) -> String {
    let mut out = String::from("user_id,wallet,chain,amount,status,tx_hash,vesting_end\n");
    for dist in store.distributions.values() {
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            dist.user_id,
            dist.wallet,
            dist.chain,
            dist.amount,
            dist.status,
            dist.tx_hash.as_deref().unwrap_or(""),
            dist.vesting_end,
        ));
    }
    out
}
