use serde::{Deserialize, Serialize};

pub type UserId = String;
pub type Wallet = String;
pub type Amount = u64;

pub const MOMO_SCALE: u64 = 100; // 1 Momo Coin = 100 minimal units

/// Supported payout chains.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChainId {
    Eth,
    Bsc,
    Sol,
    Xrp,
}

impl ChainId {
    pub const ALL: [ChainId; 4] = [ChainId::Eth, ChainId::Bsc, ChainId::Sol, ChainId::Xrp];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainId::Eth => "ETH",
            ChainId::Bsc => "BSC",
            ChainId::Sol => "SOL",
            ChainId::Xrp => "XRP",
        }
    }

    pub fn parse(s: &str) -> Option<ChainId> {
        match s.to_ascii_uppercase().as_str() {
            "ETH" => Some(ChainId::Eth),
            "BSC" => Some(ChainId::Bsc),
            "SOL" => Some(ChainId::Sol),
            "XRP" => Some(ChainId::Xrp),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    Pending,
    Submitted,
    Verified,
    Rejected,
}

impl std::fmt::Display for KycStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            KycStatus::Pending => "pending",
            KycStatus::Submitted => "submitted",
            KycStatus::Verified => "verified",
            KycStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Lifecycle of a single user's allocation: calculated as `Pending`,
/// promoted to `Claimable` once the on-chain transfer lands, `Claimed`
/// after the vesting window, or `Failed` when the transfer errored.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStatus {
    Pending,
    Claimable,
    Claimed,
    Failed,
}

impl std::fmt::Display for DistributionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DistributionStatus::Pending => "pending",
            DistributionStatus::Claimable => "claimable",
            DistributionStatus::Claimed => "claimed",
            DistributionStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub referral_link: String,
    pub referred_by: Option<UserId>,
    pub kyc_status: KycStatus,
    pub agreed_terms: bool,
    pub momo_balance: Amount,
    pub kyc_telegram_link: Option<String>,
    pub kyc_x_link: Option<String>,
    pub kyc_wallet: Option<Wallet>,
    pub kyc_chain: Option<ChainId>,
    pub kyc_submitted_at: Option<u64>,
    pub has_seen_menu: bool,
    pub joined_groups: bool,
}

/// One wallet per user, pending anti-bot verification.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Submission {
    pub user_id: UserId,
    pub wallet: Wallet,
    pub chain: ChainId,
    pub submitted_at: u64,
}

/// Arithmetic captcha issued at wallet submission. The expected reply
/// is `value + 5`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptchaChallenge {
    pub value: u8,
    pub issued_at: u64,
}

/// Verified eligibility outcome for a submitted wallet.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EligibleEntry {
    pub user_id: UserId,
    pub wallet: Wallet,
    pub chain: ChainId,
    pub tier: u8,
    pub verified: bool,
    pub token_balance: Amount,
    pub social_tasks_completed: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Distribution {
    pub user_id: UserId,
    pub wallet: Wallet,
    pub chain: ChainId,
    pub amount: Amount,
    pub status: DistributionStatus,
    pub tx_hash: Option<String>,
    pub vesting_end: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Referral {
    pub referrer_id: UserId,
    pub referee_id: UserId,
    pub registered_at: u64,
    pub status: ReferralStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Campaign {
    pub id: u64,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
    pub total_tokens: Amount,
    pub active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyTask {
    pub id: u64,
    pub description: String,
    pub reward: Amount,
    pub active: bool,
    pub mandatory: bool,
    pub task_link: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Pending,
    Approved,
    Rejected,
}

/// One proof submission per user, task, and UTC day.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskCompletion {
    pub user_id: UserId,
    pub task_id: u64,
    pub completion_date: String,
    pub username: String,
    pub status: CompletionStatus,
}

/// Formats a unix timestamp (seconds) as a `YYYY-MM-DD` UTC day key.
pub fn utc_date(secs: u64) -> String {
    let (y, m, d) = civil_from_days((secs / 86_400) as i64);
    format!("{y:04}-{m:02}-{d:02}")
}

// Gregorian date from days since the unix epoch.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let y = yoe + era * 400 + if m <= 2 { 1 } else { 0 };
    (y, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_id_round_trips_through_text() {
        for chain in ChainId::ALL {
            assert_eq!(ChainId::parse(chain.as_str()), Some(chain));
        }
        assert_eq!(ChainId::parse("eth"), Some(ChainId::Eth));
        assert_eq!(ChainId::parse("DOGE"), None);
    }

    #[test]
    fn utc_date_formats_known_days() {
        assert_eq!(utc_date(0), "1970-01-01");
        // 2024-02-29 00:00:00 UTC
        assert_eq!(utc_date(1_709_164_800), "2024-02-29");
        // 2025-03-01 12:00:00 UTC
        assert_eq!(utc_date(1_740_787_200 + 43_200), "2025-03-01");
    }
}
