//! KYC wizard: a three-step linear flow collecting a Telegram handle, an X
//! handle, and a wallet, then parking the record in the admin approval
//! queue. "KYC" here is informal identity linking, not a compliance
//! pipeline.

use crate::eligibility::is_valid_address;
use crate::model::{ChainId, KycStatus, Submission, UserId};
use crate::store::{CampaignStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum KycError {
    #[error("invalid telegram link")]
    InvalidTelegramLink,
    #[error("invalid x link")]
    InvalidXLink,
    #[error("invalid wallet line (expected e.g. 'ETH 0x...' or 'XRP r...')")]
    InvalidWalletLine,
    #[error("no kyc submission pending review for {user_id}")]
    NoPendingKyc { user_id: UserId },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// `@handle` with 5–32 word characters, or the same behind `https://t.me/`.
pub fn is_valid_telegram_link(link: &str) -> bool {
    handle_len(link, "https://t.me/", 5, 32)
}

/// `@handle` with 1–15 word characters, or the same behind `https://x.com/`.
pub fn is_valid_x_link(link: &str) -> bool {
    handle_len(link, "https://x.com/", 1, 15)
}

fn handle_len(link: &str, url_prefix: &str, min: usize, max: usize) -> bool {
    let handle = match link.strip_prefix('@') {
        Some(rest) => rest,
        None => match link.strip_prefix(url_prefix) {
            Some(rest) => rest,
            None => return false,
        },
    };
    (min..=max).contains(&handle.len())
        && handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parses the final wizard line, `<CHAIN> <wallet>`.
pub fn parse_wallet_line(line: &str) -> Option<(ChainId, &str)> {
    let (chain_str, wallet) = line.trim().split_once(char::is_whitespace)?;
    let chain = ChainId::parse(chain_str)?;
    let wallet = wallet.trim();
    if is_valid_address(chain, wallet) {
        Some((chain, wallet))
    } else {
        None
    }
}

/// Completed wizard output, ready to be written to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KycRecord {
    pub telegram_link: String,
    pub x_link: String,
    pub wallet: String,
    pub chain: ChainId,
}

/// What the wizard expects next after consuming one reply.
#[derive(Debug, PartialEq, Eq)]
pub enum KycProgress {
    NeedXLink,
    NeedWallet,
    Complete(KycRecord),
}

/// In-memory state of one user's walk through the wizard.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KycWizard {
    telegram_link: Option<String>,
    x_link: Option<String>,
}

impl KycWizard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one free-text reply into the wizard. Validation failures leave
    /// the wizard at the same step so the user can retry.
    pub fn advance(&mut self, input: &str) -> Result<KycProgress, KycError> {
        let input = input.trim();
        if self.telegram_link.is_none() {
            if !is_valid_telegram_link(input) {
                return Err(KycError::InvalidTelegramLink);
            }
            self.telegram_link = Some(input.to_string());
            return Ok(KycProgress::NeedXLink);
        }
        if self.x_link.is_none() {
            if !is_valid_x_link(input) {
                return Err(KycError::InvalidXLink);
            }
            self.x_link = Some(input.to_string());
            return Ok(KycProgress::NeedWallet);
        }
        let (chain, wallet) = parse_wallet_line(input).ok_or(KycError::InvalidWalletLine)?;
        Ok(KycProgress::Complete(KycRecord {
            telegram_link: self.telegram_link.clone().expect("step order"),
            x_link: self.x_link.clone().expect("step order"),
            wallet: wallet.to_string(),
            chain,
        }))
    }
}

/// Writes a completed wizard record: the user moves to `submitted` and the
/// wallet becomes their submission unless one already exists.
pub fn submit(
    store: &mut CampaignStore,
    user_id: &str,
    record: &KycRecord,
    now: u64,
) -> Result<(), KycError> {
    let user = store.user_mut(user_id)?;
    user.kyc_telegram_link = Some(record.telegram_link.clone());
    user.kyc_x_link = Some(record.x_link.clone());
    user.kyc_wallet = Some(record.wallet.clone());
    user.kyc_chain = Some(record.chain);
    user.kyc_status = KycStatus::Submitted;
    user.kyc_submitted_at = Some(now);

    store
        .submissions
        .entry(user_id.to_string())
        .or_insert_with(|| Submission {
            user_id: user_id.to_string(),
            wallet: record.wallet.clone(),
            chain: record.chain,
            submitted_at: now,
        });
    Ok(())
}

/// Users whose KYC awaits admin review.
pub fn pending(store: &CampaignStore) -> Vec<&crate::model::User> {
    store
        .users
        .values()
        .filter(|u| u.kyc_status == KycStatus::Submitted)
        .collect()
}

pub fn approve(store: &mut CampaignStore, user_id: &str) -> Result<(), KycError> {
    decide(store, user_id, KycStatus::Verified)
}

/// Rejection returns the user to a state from which they may resubmit.
pub fn reject(store: &mut CampaignStore, user_id: &str) -> Result<(), KycError> {
    decide(store, user_id, KycStatus::Rejected)
}

fn decide(store: &mut CampaignStore, user_id: &str, status: KycStatus) -> Result<(), KycError> {
    let user = store.user_mut(user_id)?;
    if user.kyc_status != KycStatus::Submitted {
        return Err(KycError::NoPendingKyc {
            user_id: user_id.to_string(),
        });
    }
    user.kyc_status = status;
    Ok(())
}
