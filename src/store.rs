//! Single-writer campaign store.
//!
//! All campaign state lives in one [`CampaignStore`] value: users,
//! submissions, eligibility rows, distributions, referrals, task ledgers,
//! campaigns, and the key/value config. Persistence is a JSON snapshot with
//! an integrity digest, written after each mutating command and verified on
//! load.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::{
    Amount, CaptchaChallenge, Campaign, DailyTask, Distribution, EligibleEntry, KycStatus,
    Referral, Submission, TaskCompletion, User, UserId, Wallet, MOMO_SCALE,
};

pub const SNAPSHOT_VERSION: u8 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown user {user_id}")]
    UnknownUser { user_id: UserId },
    #[error("unknown campaign {id}")]
    UnknownCampaign { id: u64 },
    #[error("unknown config key {key}")]
    UnknownConfigKey { key: String },
    #[error("config key {key} holds non-numeric value {value}")]
    MalformedConfigValue { key: String, value: String },
    #[error("snapshot digest mismatch (file corrupted or edited by hand)")]
    DigestMismatch,
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u8),
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CampaignStore {
    pub users: BTreeMap<UserId, User>,
    pub captchas: BTreeMap<UserId, CaptchaChallenge>,
    pub submissions: BTreeMap<UserId, Submission>,
    pub eligible: BTreeMap<UserId, EligibleEntry>,
    pub distributions: BTreeMap<UserId, Distribution>,
    /// Keyed by referee: one inbound referral per user.
    pub referrals: BTreeMap<UserId, Referral>,
    pub blacklist: BTreeSet<Wallet>,
    pub whitelist: BTreeSet<Wallet>,
    pub config: BTreeMap<String, String>,
    pub campaigns: Vec<Campaign>,
    pub daily_tasks: Vec<DailyTask>,
    pub task_completions: Vec<TaskCompletion>,
}

#[derive(Serialize, Deserialize)]
struct StoreSnapshot {
    version: u8,
    saved_at: u64,
    digest_hex: String,
    state: CampaignStore,
}

impl CampaignStore {
    /// Fresh store with the config defaults, a sample campaign, and the
    /// default daily-task catalog already seeded.
    pub fn seeded(now: u64) -> Self {
        let mut store = Self::default();
        for (key, value) in [
            ("total_supply", "1000000"),
            ("tier_1_amount", "1000"),
            ("tier_2_amount", "2000"),
            ("tier_3_amount", "5000"),
            ("referral_bonus", "15"),
            ("min_token_balance", "100"),
            ("vesting_period_days", "30"),
        ] {
            store.config.insert(key.to_string(), value.to_string());
        }
        store.campaigns.push(Campaign {
            id: 1,
            name: "Launch Airdrop".into(),
            start_date: crate::model::utc_date(now),
            end_date: crate::model::utc_date(now + 7 * 86_400),
            total_tokens: 1_000_000 * MOMO_SCALE,
            active: true,
        });
        store.daily_tasks = crate::tasks::default_tasks();
        store
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let bytes = std::fs::read(path)?;
        let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::UnsupportedVersion(snapshot.version));
        }
        if state_digest(&snapshot.state)? != snapshot.digest_hex {
            return Err(StoreError::DigestMismatch);
        }
        Ok(snapshot.state)
    }

    pub fn save(&self, path: &Path, now: u64) -> Result<(), StoreError> {
        let snapshot = StoreSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: now,
            digest_hex: state_digest(self)?,
            state: self.clone(),
        };
        let json = serde_json::to_vec_pretty(&snapshot)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    //---- users ----//

    /// Registers the user on first contact; repeated calls only refresh the
    /// username.
    pub fn upsert_user(&mut self, user_id: &str, username: &str, referral_link: String) -> &mut User {
        let user = self
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| User {
                user_id: user_id.to_string(),
                username: username.to_string(),
                referral_link,
                referred_by: None,
                kyc_status: KycStatus::Pending,
                agreed_terms: false,
                momo_balance: 0,
                kyc_telegram_link: None,
                kyc_x_link: None,
                kyc_wallet: None,
                kyc_chain: None,
                kyc_submitted_at: None,
                has_seen_menu: false,
                joined_groups: false,
            });
        user.username = username.to_string();
        user
    }

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.get(user_id)
    }

    pub fn user_mut(&mut self, user_id: &str) -> Result<&mut User, StoreError> {
        self.users.get_mut(user_id).ok_or_else(|| StoreError::UnknownUser {
            user_id: user_id.to_string(),
        })
    }

    pub fn balance(&self, user_id: &str) -> Amount {
        self.users.get(user_id).map(|u| u.momo_balance).unwrap_or(0)
    }

    pub fn credit_balance(&mut self, user_id: &str, amount: Amount) -> Result<(), StoreError> {
        let user = self.user_mut(user_id)?;
        user.momo_balance += amount;
        Ok(())
    }

    pub fn kyc_status(&self, user_id: &str) -> KycStatus {
        self.users
            .get(user_id)
            .map(|u| u.kyc_status)
            .unwrap_or(KycStatus::Pending)
    }

    /// Top earners by Momo balance, descending, ties broken by user id.
    pub fn leaderboard(&self, limit: usize) -> Vec<(String, Amount)> {
        let mut rows: Vec<(String, Amount)> = self
            .users
            .values()
            .map(|u| (u.username.clone(), u.momo_balance))
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        rows.truncate(limit);
        rows
    }

    //---- config ----//

    pub fn config_value(&self, key: &str) -> Result<&str, StoreError> {
        self.config
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| StoreError::UnknownConfigKey { key: key.to_string() })
    }

    pub fn config_u64(&self, key: &str) -> Result<u64, StoreError> {
        let value = self.config_value(key)?;
        value.parse().map_err(|_| StoreError::MalformedConfigValue {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Config amount expressed in whole coins, returned in minimal units.
    /// Values too large to scale are malformed, not wrapped.
    pub fn config_amount(&self, key: &str) -> Result<Amount, StoreError> {
        let coins = self.config_u64(key)?;
        coins
            .checked_mul(MOMO_SCALE)
            .ok_or_else(|| StoreError::MalformedConfigValue {
                key: key.to_string(),
                value: coins.to_string(),
            })
    }

    pub fn set_config(&mut self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    //---- campaigns ----//

    pub fn campaign(&self, id: u64) -> Result<&Campaign, StoreError> {
        self.campaigns
            .iter()
            .find(|c| c.id == id)
            .ok_or(StoreError::UnknownCampaign { id })
    }

    pub fn campaign_mut(&mut self, id: u64) -> Result<&mut Campaign, StoreError> {
        self.campaigns
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::UnknownCampaign { id })
    }

    pub fn add_campaign(
        &mut self,
        name: &str,
        start_date: &str,
        end_date: &str,
        total_tokens: Amount,
    ) -> u64 {
        let id = self.campaigns.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        self.campaigns.push(Campaign {
            id,
            name: name.to_string(),
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            total_tokens,
            active: true,
        });
        id
    }

    pub fn active_campaigns(&self) -> impl Iterator<Item = &Campaign> {
        self.campaigns.iter().filter(|c| c.active)
    }

    //---- wallet lists ----//

    pub fn is_blacklisted(&self, wallet: &str) -> bool {
        self.blacklist.contains(wallet)
    }

    pub fn is_whitelisted(&self, wallet: &str) -> bool {
        self.whitelist.contains(wallet)
    }
}

fn state_digest(state: &CampaignStore) -> Result<String, StoreError> {
    let mut hasher = Sha256::new();
    hasher.update(b"momo-store-v1");
    hasher.update(serde_json::to_vec(state)?);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_store_carries_defaults() {
        let store = CampaignStore::seeded(0);
        assert_eq!(store.config_u64("vesting_period_days").unwrap(), 30);
        assert_eq!(store.config_amount("referral_bonus").unwrap(), 15 * MOMO_SCALE);
        assert_eq!(store.campaigns.len(), 1);
        assert!(store.campaigns[0].active);
        assert!(!store.daily_tasks.is_empty());
        assert!(store.daily_tasks.iter().any(|t| t.mandatory));
    }

    #[test]
    fn balance_credit_requires_known_user() {
        let mut store = CampaignStore::seeded(0);
        assert!(matches!(
            store.credit_balance("ghost", 10),
            Err(StoreError::UnknownUser { .. })
        ));
        store.upsert_user("u1", "alice", "link".into());
        store.credit_balance("u1", 1_000).unwrap();
        assert_eq!(store.balance("u1"), 1_000);
    }

    #[test]
    fn leaderboard_orders_by_balance() {
        let mut store = CampaignStore::seeded(0);
        store.upsert_user("u1", "alice", "l1".into());
        store.upsert_user("u2", "bob", "l2".into());
        store.upsert_user("u3", "carol", "l3".into());
        store.credit_balance("u2", 500).unwrap();
        store.credit_balance("u3", 200).unwrap();
        let rows = store.leaderboard(2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "bob");
        assert_eq!(rows[1].0, "carol");
    }

    #[test]
    fn snapshot_round_trips_and_detects_tampering() {
        let mut store = CampaignStore::seeded(100);
        store.upsert_user("u1", "alice", "link".into());
        store.credit_balance("u1", 42).unwrap();

        let dir = std::env::temp_dir();
        let path = dir.join(format!("momo-store-test-{}.json", std::process::id()));
        store.save(&path, 100).unwrap();
        let loaded = CampaignStore::load(&path).unwrap();
        assert_eq!(loaded, store);

        let mut text = std::fs::read_to_string(&path).unwrap();
        text = text.replace("\"momo_balance\": 42", "\"momo_balance\": 9999");
        std::fs::write(&path, text).unwrap();
        assert!(matches!(CampaignStore::load(&path), Err(StoreError::DigestMismatch)));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn config_amount_rejects_unscalable_values() {
        let mut store = CampaignStore::seeded(0);
        store.set_config("referral_bonus", &u64::MAX.to_string());
        assert!(matches!(
            store.config_amount("referral_bonus"),
            Err(StoreError::MalformedConfigValue { .. })
        ));
    }

    #[test]
    fn campaign_ids_increment() {
        let mut store = CampaignStore::seeded(0);
        let id = store.add_campaign("Summer", "2025-03-01", "2025-03-15", 500_000 * MOMO_SCALE);
        assert_eq!(id, 2);
        assert_eq!(store.campaign(2).unwrap().name, "Summer");
        assert!(matches!(store.campaign(9), Err(StoreError::UnknownCampaign { id: 9 })));
    }
}
