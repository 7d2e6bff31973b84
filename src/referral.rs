//! Referral tracking: deep-link registration and the admin approval queue.
//!
//! A referral is created when a new user arrives through another user's
//! start link. It sits `pending` until an admin approves it (crediting the
//! configured bonus to the referrer) or rejects it.

use crate::model::{Amount, Referral, ReferralStatus, UserId};
use crate::store::{CampaignStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ReferralError {
    #[error("unknown referrer {referrer_id}")]
    UnknownReferrer { referrer_id: UserId },
    #[error("user {user_id} cannot refer themselves")]
    SelfReferral { user_id: UserId },
    #[error("user {referee_id} has already been referred")]
    Duplicate { referee_id: UserId },
    #[error("no pending referral for {referee_id}")]
    NoPendingReferral { referee_id: UserId },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn referral_link(bot_username: &str, user_id: &str) -> String {
    format!("https://t.me/{bot_username}?start={user_id}")
}

/// Registers a pending referral for a newly arrived referee.
pub fn register(
    store: &mut CampaignStore,
    referrer_id: &str,
    referee_id: &str,
    now: u64,
) -> Result<(), ReferralError> {
    if !store.users.contains_key(referrer_id) {
        return Err(ReferralError::UnknownReferrer {
            referrer_id: referrer_id.to_string(),
        });
    }
    if referrer_id == referee_id {
        return Err(ReferralError::SelfReferral {
            user_id: referee_id.to_string(),
        });
    }
    if store.referrals.contains_key(referee_id) {
        return Err(ReferralError::Duplicate {
            referee_id: referee_id.to_string(),
        });
    }
    store.referrals.insert(
        referee_id.to_string(),
        Referral {
            referrer_id: referrer_id.to_string(),
            referee_id: referee_id.to_string(),
            registered_at: now,
            status: ReferralStatus::Pending,
        },
    );
    store.user_mut(referee_id)?.referred_by = Some(referrer_id.to_string());
    Ok(())
}

pub fn pending(store: &CampaignStore) -> Vec<&Referral> {
    store
        .referrals
        .values()
        .filter(|r| r.status == ReferralStatus::Pending)
        .collect()
}

/// Approves a pending referral and credits the configured bonus to the
/// referrer. Returns the referrer id and the bonus paid.
pub fn approve(
    store: &mut CampaignStore,
    referee_id: &str,
) -> Result<(UserId, Amount), ReferralError> {
    let referrer_id = take_pending(store, referee_id, ReferralStatus::Approved)?;
    let bonus = store.config_amount("referral_bonus")?;
    store.credit_balance(&referrer_id, bonus)?;
    Ok((referrer_id, bonus))
}

pub fn reject(store: &mut CampaignStore, referee_id: &str) -> Result<UserId, ReferralError> {
    take_pending(store, referee_id, ReferralStatus::Rejected)
}

fn take_pending(
    store: &mut CampaignStore,
    referee_id: &str,
    new_status: ReferralStatus,
) -> Result<UserId, ReferralError> {
    let referral = store
        .referrals
        .get_mut(referee_id)
        .filter(|r| r.status == ReferralStatus::Pending)
        .ok_or_else(|| ReferralError::NoPendingReferral {
            referee_id: referee_id.to_string(),
        })?;
    referral.status = new_status;
    Ok(referral.referrer_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MOMO_SCALE;

    fn store_with_users() -> CampaignStore {
        let mut store = CampaignStore::seeded(0);
        store.upsert_user("sponsor", "alice", "l1".into());
        store.upsert_user("invitee", "bob", "l2".into());
        store
    }

    #[test]
    fn registration_rejects_self_and_duplicates() {
        let mut store = store_with_users();
        assert!(matches!(
            register(&mut store, "ghost", "invitee", 0),
            Err(ReferralError::UnknownReferrer { .. })
        ));
        assert!(matches!(
            register(&mut store, "invitee", "invitee", 0),
            Err(ReferralError::SelfReferral { .. })
        ));
        register(&mut store, "sponsor", "invitee", 0).unwrap();
        assert_eq!(
            store.user("invitee").unwrap().referred_by.as_deref(),
            Some("sponsor")
        );
        assert!(matches!(
            register(&mut store, "sponsor", "invitee", 1),
            Err(ReferralError::Duplicate { .. })
        ));
    }

    #[test]
    fn approval_pays_the_configured_bonus() {
        let mut store = store_with_users();
        register(&mut store, "sponsor", "invitee", 0).unwrap();
        assert_eq!(pending(&store).len(), 1);

        let (referrer, bonus) = approve(&mut store, "invitee").unwrap();
        assert_eq!(referrer, "sponsor");
        assert_eq!(bonus, 15 * MOMO_SCALE);
        assert_eq!(store.balance("sponsor"), bonus);
        assert!(pending(&store).is_empty());

        // a decided referral cannot be approved again
        assert!(matches!(
            approve(&mut store, "invitee"),
            Err(ReferralError::NoPendingReferral { .. })
        ));
    }

    #[test]
    fn rejection_pays_nothing() {
        let mut store = store_with_users();
        register(&mut store, "sponsor", "invitee", 0).unwrap();
        let referrer = reject(&mut store, "invitee").unwrap();
        assert_eq!(referrer, "sponsor");
        assert_eq!(store.balance("sponsor"), 0);
        assert_eq!(
            store.referrals["invitee"].status,
            ReferralStatus::Rejected
        );
    }
}
