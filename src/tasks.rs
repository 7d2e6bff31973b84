//! Daily-task reward ledger: the task catalog, per-day proof submissions,
//! the admin approval queue, and the mandatory-task gate used when joining
//! the airdrop.

use crate::model::{Amount, CompletionStatus, DailyTask, KycStatus, TaskCompletion, UserId, MOMO_SCALE};
use crate::store::{CampaignStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("unknown or inactive task {task_id}")]
    UnknownTask { task_id: u64 },
    #[error("task {task_id} already submitted today by {user_id}")]
    AlreadySubmittedToday { user_id: UserId, task_id: u64 },
    #[error("no pending completion for user {user_id}, task {task_id} on {date}")]
    NoPendingCompletion {
        user_id: UserId,
        task_id: u64,
        date: String,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Catalog seeded into a fresh store.
pub fn default_tasks() -> Vec<DailyTask> {
    let defaults: [(&str, bool, &str); 8] = [
        ("Watch YouTube Video", false, "https://youtube.com/example"),
        ("Watch Facebook Video", false, "https://facebook.com/example"),
        ("Visit Website", false, "https://example.com"),
        ("Join Telegram", true, "https://t.me/examplegroup"),
        ("Subscribe Telegram Channel", true, "https://t.me/examplechannel"),
        ("Subscribe YouTube Channel", false, "https://youtube.com/channel/example"),
        ("Follow Twitter", false, "https://twitter.com/example"),
        ("Follow Facebook", false, "https://facebook.com/examplepage"),
    ];
    defaults
        .iter()
        .enumerate()
        .map(|(idx, (description, mandatory, link))| DailyTask {
            id: idx as u64 + 1,
            description: description.to_string(),
            reward: 10 * MOMO_SCALE,
            active: true,
            mandatory: *mandatory,
            task_link: link.to_string(),
        })
        .collect()
}

pub fn add_task(
    store: &mut CampaignStore,
    description: &str,
    task_link: &str,
    mandatory: bool,
) -> u64 {
    let id = store.daily_tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
    store.daily_tasks.push(DailyTask {
        id,
        description: description.to_string(),
        reward: 10 * MOMO_SCALE,
        active: true,
        mandatory,
        task_link: task_link.to_string(),
    });
    id
}

/// Soft delete: the task stops showing up and stops accepting submissions,
/// but history referencing it stays intact.
pub fn deactivate_task(store: &mut CampaignStore, task_id: u64) -> Result<(), TaskError> {
    let task = store
        .daily_tasks
        .iter_mut()
        .find(|t| t.id == task_id && t.active)
        .ok_or(TaskError::UnknownTask { task_id })?;
    task.active = false;
    Ok(())
}

pub fn active_tasks(store: &CampaignStore) -> Vec<&DailyTask> {
    store.daily_tasks.iter().filter(|t| t.active).collect()
}

fn task(store: &CampaignStore, task_id: u64) -> Result<&DailyTask, TaskError> {
    store
        .daily_tasks
        .iter()
        .find(|t| t.id == task_id && t.active)
        .ok_or(TaskError::UnknownTask { task_id })
}

/// Records a `<task_id> <username>` proof submission; one per task per UTC
/// day. Returns the task description for the reply.
pub fn submit_completion(
    store: &mut CampaignStore,
    user_id: &str,
    task_id: u64,
    username: &str,
    date: &str,
) -> Result<String, TaskError> {
    let description = task(store, task_id)?.description.clone();
    let duplicate = store.task_completions.iter().any(|c| {
        c.user_id == user_id && c.task_id == task_id && c.completion_date == date
    });
    if duplicate {
        return Err(TaskError::AlreadySubmittedToday {
            user_id: user_id.to_string(),
            task_id,
        });
    }
    store.task_completions.push(TaskCompletion {
        user_id: user_id.to_string(),
        task_id,
        completion_date: date.to_string(),
        username: username.to_string(),
        status: CompletionStatus::Pending,
    });
    Ok(description)
}

pub fn pending(store: &CampaignStore) -> Vec<&TaskCompletion> {
    store
        .task_completions
        .iter()
        .filter(|c| c.status == CompletionStatus::Pending)
        .collect()
}

/// Approves a pending completion and credits the task reward. Returns the
/// task description and the reward paid.
pub fn approve(
    store: &mut CampaignStore,
    user_id: &str,
    task_id: u64,
    date: &str,
) -> Result<(String, Amount), TaskError> {
    let reward = store
        .daily_tasks
        .iter()
        .find(|t| t.id == task_id)
        .map(|t| t.reward)
        .ok_or(TaskError::UnknownTask { task_id })?;
    decide(store, user_id, task_id, date, CompletionStatus::Approved)?;
    store.credit_balance(user_id, reward)?;
    let description = store
        .daily_tasks
        .iter()
        .find(|t| t.id == task_id)
        .map(|t| t.description.clone())
        .unwrap_or_default();
    Ok((description, reward))
}

pub fn reject(
    store: &mut CampaignStore,
    user_id: &str,
    task_id: u64,
    date: &str,
) -> Result<String, TaskError> {
    decide(store, user_id, task_id, date, CompletionStatus::Rejected)?;
    Ok(store
        .daily_tasks
        .iter()
        .find(|t| t.id == task_id)
        .map(|t| t.description.clone())
        .unwrap_or_default())
}

fn decide(
    store: &mut CampaignStore,
    user_id: &str,
    task_id: u64,
    date: &str,
    status: CompletionStatus,
) -> Result<(), TaskError> {
    let completion = store
        .task_completions
        .iter_mut()
        .find(|c| {
            c.user_id == user_id
                && c.task_id == task_id
                && c.completion_date == date
                && c.status == CompletionStatus::Pending
        })
        .ok_or_else(|| TaskError::NoPendingCompletion {
            user_id: user_id.to_string(),
            task_id,
            date: date.to_string(),
        })?;
    completion.status = status;
    Ok(())
}

/// True when every mandatory task has an approved completion for the user.
pub fn mandatory_complete(store: &CampaignStore, user_id: &str) -> bool {
    store
        .daily_tasks
        .iter()
        .filter(|t| t.mandatory)
        .all(|t| {
            store.task_completions.iter().any(|c| {
                c.user_id == user_id
                    && c.task_id == t.id
                    && c.status == CompletionStatus::Approved
            })
        })
}

/// Gate for joining the airdrop: all mandatory tasks approved and KYC
/// verified.
pub fn may_join_airdrop(store: &CampaignStore, user_id: &str) -> bool {
    mandatory_complete(store, user_id) && store.kyc_status(user_id) == KycStatus::Verified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kyc;
    use crate::model::ChainId;

    fn store_with_user() -> CampaignStore {
        let mut store = CampaignStore::seeded(0);
        store.upsert_user("u1", "alice", "link".into());
        store
    }

    #[test]
    fn default_catalog_marks_telegram_tasks_mandatory() {
        let tasks = default_tasks();
        assert_eq!(tasks.len(), 8);
        let mandatory: Vec<&str> = tasks
            .iter()
            .filter(|t| t.mandatory)
            .map(|t| t.description.as_str())
            .collect();
        assert_eq!(mandatory, ["Join Telegram", "Subscribe Telegram Channel"]);
    }

    #[test]
    fn one_submission_per_task_per_day() {
        let mut store = store_with_user();
        let description = submit_completion(&mut store, "u1", 4, "@alice", "2025-03-01").unwrap();
        assert_eq!(description, "Join Telegram");
        assert!(matches!(
            submit_completion(&mut store, "u1", 4, "@alice", "2025-03-01"),
            Err(TaskError::AlreadySubmittedToday { .. })
        ));
        // a new day opens the task again
        submit_completion(&mut store, "u1", 4, "@alice", "2025-03-02").unwrap();
    }

    #[test]
    fn approval_credits_the_reward() {
        let mut store = store_with_user();
        submit_completion(&mut store, "u1", 4, "@alice", "2025-03-01").unwrap();
        let (description, reward) = approve(&mut store, "u1", 4, "2025-03-01").unwrap();
        assert_eq!(description, "Join Telegram");
        assert_eq!(reward, 10 * MOMO_SCALE);
        assert_eq!(store.balance("u1"), reward);
        assert!(pending(&store).is_empty());
        assert!(matches!(
            approve(&mut store, "u1", 4, "2025-03-01"),
            Err(TaskError::NoPendingCompletion { .. })
        ));
    }

    #[test]
    fn deactivated_task_rejects_submissions() {
        let mut store = store_with_user();
        deactivate_task(&mut store, 1).unwrap();
        assert!(matches!(
            submit_completion(&mut store, "u1", 1, "@alice", "2025-03-01"),
            Err(TaskError::UnknownTask { task_id: 1 })
        ));
        assert!(matches!(
            deactivate_task(&mut store, 1),
            Err(TaskError::UnknownTask { .. })
        ));
    }

    #[test]
    fn airdrop_gate_needs_mandatory_tasks_and_kyc() {
        let mut store = store_with_user();
        assert!(!may_join_airdrop(&store, "u1"));

        for task_id in [4, 5] {
            submit_completion(&mut store, "u1", task_id, "@alice", "2025-03-01").unwrap();
            approve(&mut store, "u1", task_id, "2025-03-01").unwrap();
        }
        assert!(mandatory_complete(&store, "u1"));
        assert!(!may_join_airdrop(&store, "u1")); // kyc still pending

        let record = kyc::KycRecord {
            telegram_link: "@alice_tg".into(),
            x_link: "@alice".into(),
            wallet: "0x00000000000000000000000000000000000000aa".into(),
            chain: ChainId::Eth,
        };
        kyc::submit(&mut store, "u1", &record, 0).unwrap();
        kyc::approve(&mut store, "u1").unwrap();
        assert!(may_join_airdrop(&store, "u1"));
    }
}
