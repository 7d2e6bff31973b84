//! Conversation/menu layer.
//!
//! Maps button-press identifiers and free-text replies onto the store and
//! engine operations, tracks per-user pending-input state (the KYC wizard,
//! awaited wallets, captchas, admin prompts), and renders reply text from
//! the message catalog. Side messages to other users (referrer bonuses,
//! admin notifications, payout receipts) come back as [`Notice`] values so
//! the transport layer can deliver them however it likes.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::chain::ChainClient;
use crate::config::BotConfig;
use crate::model::{Amount, ChainId, KycStatus, UserId, MOMO_SCALE};
use crate::store::CampaignStore;
use crate::{distribution, eligibility, kyc, referral, tasks};

/// One reply to the acting user, plus any side messages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub notices: Vec<Notice>,
    /// Exported file produced by an admin action (name, content).
    pub attachment: Option<(String, String)>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Reply {
            text: text.into(),
            ..Default::default()
        }
    }

    fn with_notice(mut self, to: &str, text: impl Into<String>) -> Self {
        self.notices.push(Notice {
            to: to.to_string(),
            text: text.into(),
        });
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub to: UserId,
    pub text: String,
}

/// What the engine expects from the user's next free-text message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum PendingInput {
    #[default]
    None,
    Kyc(kyc::KycWizard),
    AwaitWallet(Option<ChainId>),
    AwaitCaptcha,
    AwaitBlacklist,
    AwaitWhitelist,
    AwaitConfig,
    AwaitCampaign,
    AwaitCampaignEdit(u64),
    AwaitTaskAdd,
}

pub struct BotEngine {
    pub config: BotConfig,
    pub store: CampaignStore,
    sessions: BTreeMap<UserId, PendingInput>,
    rng: StdRng,
}

impl BotEngine {
    pub fn new(config: BotConfig, store: CampaignStore) -> Self {
        Self::with_rng(config, store, StdRng::from_entropy())
    }

    pub fn with_rng(config: BotConfig, store: CampaignStore, rng: StdRng) -> Self {
        Self {
            config,
            store,
            sessions: BTreeMap::new(),
            rng,
        }
    }

    fn is_admin(&self, user_id: &str) -> bool {
        self.config.is_admin(user_id)
    }

    fn set_pending(&mut self, user_id: &str, pending: PendingInput) {
        self.sessions.insert(user_id.to_string(), pending);
    }

    fn take_pending(&mut self, user_id: &str) -> PendingInput {
        self.sessions.remove(user_id).unwrap_or_default()
    }

    /// `/start` handler: registers the user, wires a deep-link referral,
    /// and shows either the mandatory rules or the main menu.
    pub fn handle_start(
        &mut self,
        user_id: &str,
        username: &str,
        referrer_id: Option<&str>,
        now: u64,
    ) -> Reply {
        let link = referral::referral_link(&self.config.bot_username, user_id);
        self.store.upsert_user(user_id, username, link);

        let mut reply = if self.store.user(user_id).map(|u| u.has_seen_menu) == Some(true) {
            self.welcome(user_id)
        } else {
            Reply::text(messages::MANDATORY_RULES)
        };

        if let Some(referrer_id) = referrer_id {
            match referral::register(&mut self.store, referrer_id, user_id, now) {
                Ok(()) => {
                    reply = reply
                        .with_notice(referrer_id, messages::referral_pending(username));
                    if let Some(admin) = self.config.admin_id.clone() {
                        reply = reply.with_notice(
                            &admin,
                            messages::referral_notification(referrer_id, user_id, username, now),
                        );
                    }
                }
                Err(referral::ReferralError::Duplicate { .. }) => {
                    reply = reply.with_notice(user_id, messages::REFERRAL_DUPLICATE);
                }
                // self-referrals and unknown referrers are silently dropped
                Err(_) => {}
            }
        }
        reply
    }

    /// Button-press handler, keyed by callback identifier.
    pub fn handle_callback(
        &mut self,
        user_id: &str,
        data: &str,
        chain: &mut impl ChainClient,
        now: u64,
    ) -> Reply {
        match data {
            "start" => {
                // returning to the menu abandons any pending text input
                self.take_pending(user_id);
                if self.store.user(user_id).map(|u| u.has_seen_menu) == Some(true) {
                    self.welcome(user_id)
                } else {
                    Reply::text(messages::MANDATORY_RULES)
                }
            }
            "check_groups" => {
                if self.store.user(user_id).map(|u| u.joined_groups) == Some(true) {
                    if let Ok(user) = self.store.user_mut(user_id) {
                        user.has_seen_menu = true;
                    }
                    self.welcome(user_id)
                } else {
                    Reply::text(messages::CONFIRM_GROUPS)
                }
            }
            "confirm_groups" => {
                if let Ok(user) = self.store.user_mut(user_id) {
                    user.joined_groups = true;
                    user.has_seen_menu = true;
                }
                self.welcome(user_id)
            }
            "join_airdrop" => {
                if tasks::may_join_airdrop(&self.store, user_id) {
                    Reply::text(messages::JOIN_AIRDROP)
                } else {
                    Reply::text(messages::MANDATORY_MISSING)
                }
            }
            "check_eligibility" => self.check_eligibility(user_id, chain),
            "balance" => Reply::text(messages::balance(self.store.balance(user_id))),
            "terms" => {
                let days = self
                    .store
                    .config_u64("vesting_period_days")
                    .unwrap_or(30);
                Reply::text(messages::terms(days))
            }
            "agree_terms" => {
                if let Ok(user) = self.store.user_mut(user_id) {
                    user.agreed_terms = true;
                }
                Reply::text("Terms agreed! Proceed with other actions.")
            }
            "kyc_start" => {
                if self.store.kyc_status(user_id) == KycStatus::Verified {
                    Reply::text("Your KYC is already verified!")
                } else {
                    self.set_pending(user_id, PendingInput::Kyc(kyc::KycWizard::new()));
                    Reply::text(messages::KYC_START)
                }
            }
            "kyc_status" => Reply::text(messages::kyc_status(self.store.kyc_status(user_id))),
            "submit_wallet" => {
                self.set_pending(user_id, PendingInput::AwaitWallet(None));
                Reply::text(messages::USAGE)
            }
            "daily_tasks" => Reply::text(messages::daily_tasks(&self.store)),
            "refer" => {
                let link = self
                    .store
                    .user(user_id)
                    .map(|u| u.referral_link.clone())
                    .unwrap_or_else(|| {
                        referral::referral_link(&self.config.bot_username, user_id)
                    });
                Reply::text(format!(
                    "Your referral link: {link}\nShare this with friends!"
                ))
            }
            "claim_tokens" => self.claim_tokens(user_id, now),
            "leaderboard" => Reply::text(messages::leaderboard(&self.store)),
            _ if data.starts_with("wallet_") => {
                let chain_id = data.strip_prefix("wallet_").and_then(ChainId::parse);
                match chain_id {
                    Some(chain_id) => {
                        self.set_pending(user_id, PendingInput::AwaitWallet(Some(chain_id)));
                        Reply::text(messages::enter_wallet(chain_id))
                    }
                    None => Reply::text("Unknown chain."),
                }
            }
            _ => self.handle_admin_callback(user_id, data, chain, now),
        }
    }

    fn handle_admin_callback(
        &mut self,
        user_id: &str,
        data: &str,
        chain: &mut impl ChainClient,
        now: u64,
    ) -> Reply {
        if !self.is_admin(user_id) {
            return Reply::text(messages::ADMIN_ONLY);
        }
        match data {
            "start_distribution" => self.start_distribution(chain, now),
            "export_data" => {
                let csv = distribution::export_csv(&self.store);
                let mut reply = Reply::text("Data exported!");
                reply.attachment = Some(("airdrop_log.csv".to_string(), csv));
                reply
            }
            "blacklist" => {
                self.set_pending(user_id, PendingInput::AwaitBlacklist);
                Reply::text("Enter wallet to blacklist:")
            }
            "whitelist" => {
                self.set_pending(user_id, PendingInput::AwaitWhitelist);
                Reply::text("Enter wallet to whitelist:")
            }
            "set_config" => {
                self.set_pending(user_id, PendingInput::AwaitConfig);
                Reply::text("Enter config key and value (e.g., total_supply 2000000):")
            }
            "set_campaign" => {
                self.set_pending(user_id, PendingInput::AwaitCampaign);
                Reply::text(messages::CAMPAIGN_PROMPT)
            }
            "edit_campaign" => {
                let listing: Vec<String> = self
                    .store
                    .active_campaigns()
                    .map(|c| format!("edit_campaign_{} - {}", c.id, c.name))
                    .collect();
                if listing.is_empty() {
                    Reply::text("No active campaigns.")
                } else {
                    Reply::text(format!("Select campaign to edit:\n{}", listing.join("\n")))
                }
            }
            "add_daily_task" => {
                self.set_pending(user_id, PendingInput::AwaitTaskAdd);
                Reply::text(
                    "Enter task details (description link mandatory, e.g., \
                     'Watch https://youtube.com/example 0'):",
                )
            }
            "delete_daily_task" => {
                let listing: Vec<String> = tasks::active_tasks(&self.store)
                    .iter()
                    .map(|t| format!("delete_task_{} - {}", t.id, t.description))
                    .collect();
                if listing.is_empty() {
                    Reply::text("No active tasks.")
                } else {
                    Reply::text(format!("Select task to delete:\n{}", listing.join("\n")))
                }
            }
            "approve_tasks" => {
                let listing: Vec<String> = tasks::pending(&self.store)
                    .iter()
                    .map(|c| {
                        format!(
                            "approve_task_{}_{}_{} ({})",
                            c.user_id, c.task_id, c.completion_date, c.username
                        )
                    })
                    .collect();
                if listing.is_empty() {
                    Reply::text("No pending task submissions.")
                } else {
                    Reply::text(format!("Pending task submissions:\n{}", listing.join("\n")))
                }
            }
            "approve_kyc" => {
                let listing: Vec<String> = kyc::pending(&self.store)
                    .iter()
                    .map(|u| {
                        format!(
                            "approve_kyc_{} (TG: {})",
                            u.user_id,
                            u.kyc_telegram_link.as_deref().unwrap_or("?")
                        )
                    })
                    .collect();
                if listing.is_empty() {
                    Reply::text("No pending KYC submissions.")
                } else {
                    Reply::text(format!("Pending KYC submissions:\n{}", listing.join("\n")))
                }
            }
            "approve_referrals" => {
                let listing: Vec<String> = referral::pending(&self.store)
                    .iter()
                    .map(|r| format!("approve_ref_{}_{}", r.referrer_id, r.referee_id))
                    .collect();
                if listing.is_empty() {
                    Reply::text("No pending referral submissions.")
                } else {
                    Reply::text(format!(
                        "Pending referral submissions:\n{}",
                        listing.join("\n")
                    ))
                }
            }
            _ => {
                if let Some(rest) = data.strip_prefix("approve_task_") {
                    return self.decide_task(rest, true);
                }
                if let Some(rest) = data.strip_prefix("reject_task_") {
                    return self.decide_task(rest, false);
                }
                if let Some(target) = data.strip_prefix("approve_kyc_") {
                    return self.decide_kyc(target, true);
                }
                if let Some(target) = data.strip_prefix("reject_kyc_") {
                    return self.decide_kyc(target, false);
                }
                if let Some(rest) = data.strip_prefix("approve_ref_") {
                    return self.decide_referral(rest, true);
                }
                if let Some(rest) = data.strip_prefix("reject_ref_") {
                    return self.decide_referral(rest, false);
                }
                if let Some(id) = data.strip_prefix("edit_campaign_") {
                    return match id.parse() {
                        Ok(id) if self.store.campaign(id).is_ok() => {
                            self.set_pending(user_id, PendingInput::AwaitCampaignEdit(id));
                            Reply::text(messages::CAMPAIGN_PROMPT)
                        }
                        _ => Reply::text("Unknown campaign."),
                    };
                }
                if let Some(id) = data.strip_prefix("delete_task_") {
                    return match id.parse().map_err(|_| ()).and_then(|id| {
                        tasks::deactivate_task(&mut self.store, id)
                            .map(|_| id)
                            .map_err(|_| ())
                    }) {
                        Ok(id) => Reply::text(format!("Task {id} deleted!")),
                        Err(()) => Reply::text("Unknown task."),
                    };
                }
                Reply::text("Unknown action.")
            }
        }
    }

    /// Free-text handler, routed by the user's pending-input state. With no
    /// pending state, text is interpreted as a daily-task proof submission.
    pub fn handle_text(
        &mut self,
        user_id: &str,
        text: &str,
        chain: &mut impl ChainClient,
        now: u64,
    ) -> Reply {
        let text = text.trim();
        match self.take_pending(user_id) {
            PendingInput::Kyc(mut wizard) => match wizard.advance(text) {
                Ok(kyc::KycProgress::NeedXLink) => {
                    let reply = Reply::text(messages::kyc_telegram_received(text));
                    self.set_pending(user_id, PendingInput::Kyc(wizard));
                    reply
                }
                Ok(kyc::KycProgress::NeedWallet) => {
                    let reply = Reply::text(messages::kyc_x_received(text));
                    self.set_pending(user_id, PendingInput::Kyc(wizard));
                    reply
                }
                Ok(kyc::KycProgress::Complete(record)) => {
                    if let Err(err) = kyc::submit(&mut self.store, user_id, &record, now) {
                        return Reply::text(err.to_string());
                    }
                    let mut reply = Reply::text(messages::kyc_complete(&record));
                    if let Some(admin) = self.config.admin_id.clone() {
                        reply = reply.with_notice(
                            &admin,
                            messages::kyc_notification(user_id, &record, now),
                        );
                    }
                    reply
                }
                Err(err) => {
                    // stay on the same step
                    let text = match err {
                        kyc::KycError::InvalidTelegramLink => messages::KYC_TELEGRAM_INVALID,
                        kyc::KycError::InvalidXLink => messages::KYC_X_INVALID,
                        _ => messages::KYC_WALLET_INVALID,
                    };
                    self.set_pending(user_id, PendingInput::Kyc(wizard));
                    Reply::text(text)
                }
            },
            PendingInput::AwaitWallet(None) => Reply::text(messages::USAGE),
            PendingInput::AwaitWallet(Some(chain_id)) => {
                self.receive_wallet(user_id, chain_id, text, chain, now)
            }
            PendingInput::AwaitCaptcha => self.receive_captcha(user_id, text, chain),
            PendingInput::AwaitBlacklist => {
                self.store.blacklist.insert(text.to_string());
                Reply::text(format!("{text} blacklisted."))
            }
            PendingInput::AwaitWhitelist => {
                self.store.whitelist.insert(text.to_string());
                Reply::text(format!("{text} whitelisted."))
            }
            PendingInput::AwaitConfig => match text.split_once(char::is_whitespace) {
                Some((key, value)) => {
                    self.store.set_config(key, value.trim());
                    Reply::text(format!("Set {key} = {}", value.trim()))
                }
                None => {
                    self.set_pending(user_id, PendingInput::AwaitConfig);
                    Reply::text("Format: key value")
                }
            },
            PendingInput::AwaitCampaign => match parse_campaign_line(text) {
                Some((name, start, end, tokens)) => {
                    self.store.add_campaign(&name, &start, &end, tokens);
                    Reply::text(messages::campaign_set(&name, &start, &end, tokens))
                }
                None => {
                    self.set_pending(user_id, PendingInput::AwaitCampaign);
                    Reply::text(messages::CAMPAIGN_FORMAT)
                }
            },
            PendingInput::AwaitCampaignEdit(id) => match parse_campaign_line(text) {
                Some((name, start, end, tokens)) => match self.store.campaign_mut(id) {
                    Ok(campaign) => {
                        campaign.name = name.clone();
                        campaign.start_date = start.clone();
                        campaign.end_date = end.clone();
                        campaign.total_tokens = tokens;
                        Reply::text(messages::campaign_edit(&name, &start, &end, tokens))
                    }
                    Err(_) => Reply::text("Unknown campaign."),
                },
                None => {
                    self.set_pending(user_id, PendingInput::AwaitCampaignEdit(id));
                    Reply::text(messages::CAMPAIGN_FORMAT)
                }
            },
            PendingInput::AwaitTaskAdd => {
                let mut parts = text.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(description), Some(link), Some(mandatory)) => {
                        let mandatory = mandatory == "1";
                        tasks::add_task(&mut self.store, description, link, mandatory);
                        Reply::text(format!(
                            "Added daily task: {description} with link {link}"
                        ))
                    }
                    _ => {
                        self.set_pending(user_id, PendingInput::AwaitTaskAdd);
                        Reply::text(
                            "Format: description link mandatory (e.g., \
                             'Watch https://youtube.com/example 0')",
                        )
                    }
                }
            }
            PendingInput::None => self.receive_task_proof(user_id, text, now),
        }
    }

    //---- flows ----//

    fn welcome(&self, user_id: &str) -> Reply {
        let balance = self.store.balance(user_id);
        let link = self
            .store
            .user(user_id)
            .map(|u| u.referral_link.clone())
            .unwrap_or_default();
        Reply::text(messages::welcome(balance, &link))
    }

    fn check_eligibility(&mut self, user_id: &str, chain: &mut impl ChainClient) -> Reply {
        let submission = match self.store.submissions.get(user_id) {
            Some(s) => s.clone(),
            None => return Reply::text("Please submit your wallet first."),
        };
        let min = self
            .store
            .config_amount("min_token_balance")
            .unwrap_or(0);
        let tier = match chain.holdings(submission.chain, &submission.wallet) {
            Ok(holdings) => eligibility::tier_for(submission.chain, &holdings, min).0,
            Err(_) => 0,
        };
        let eligible = tier > 0 && tasks::may_join_airdrop(&self.store, user_id);
        Reply::text(messages::eligibility(eligible))
    }

    fn receive_wallet(
        &mut self,
        user_id: &str,
        chain_id: ChainId,
        wallet: &str,
        chain: &mut impl ChainClient,
        now: u64,
    ) -> Reply {
        match eligibility::submit_wallet(&mut self.store, user_id, chain_id, wallet, &mut self.rng, now)
        {
            Ok(eligibility::SubmitOutcome::CaptchaIssued(value)) => {
                self.set_pending(user_id, PendingInput::AwaitCaptcha);
                Reply::text(messages::captcha(value))
            }
            Ok(eligibility::SubmitOutcome::Whitelisted) => self.verify_wallet(user_id, chain),
            Err(eligibility::SubmitError::InvalidAddress { chain, .. }) => {
                Reply::text(messages::invalid_address(chain))
            }
            Err(eligibility::SubmitError::Blacklisted { .. }) => {
                Reply::text(messages::BLACKLISTED)
            }
            Err(eligibility::SubmitError::AlreadySubmitted { .. }) => {
                Reply::text(messages::ALREADY_SUBMITTED)
            }
            Err(err) => Reply::text(err.to_string()),
        }
    }

    fn receive_captcha(
        &mut self,
        user_id: &str,
        text: &str,
        chain: &mut impl ChainClient,
    ) -> Reply {
        let answer: i64 = match text.parse() {
            Ok(n) => n,
            Err(_) => {
                self.set_pending(user_id, PendingInput::AwaitCaptcha);
                return Reply::text("Please enter a number.");
            }
        };
        match eligibility::answer_captcha(&mut self.store, user_id, answer) {
            Ok(true) => self.verify_wallet(user_id, chain),
            Ok(false) => {
                // drop the pending submission so the user can retry
                self.store.submissions.remove(user_id);
                Reply::text("Wrong answer. Try submitting wallet again.")
            }
            Err(err) => Reply::text(err.to_string()),
        }
    }

    fn verify_wallet(&mut self, user_id: &str, chain: &mut impl ChainClient) -> Reply {
        match eligibility::verify_wallet(&mut self.store, chain, user_id) {
            Ok(eligibility::VerifyOutcome::Verified { tier, .. }) => {
                Reply::text(messages::verified(tier))
            }
            Ok(eligibility::VerifyOutcome::NoAssets) => Reply::text(messages::NO_ASSETS),
            Ok(eligibility::VerifyOutcome::InspectorFailed(reason)) => {
                Reply::text(format!("Verification failed, try again later ({reason})"))
            }
            Err(err) => Reply::text(err.to_string()),
        }
    }

    fn claim_tokens(&mut self, user_id: &str, now: u64) -> Reply {
        match distribution::claim(&mut self.store, user_id, now) {
            Ok(amount) => Reply::text(format!(
                "Successfully claimed {} Momo Coins! Check balance.",
                messages::coins(amount)
            )),
            Err(distribution::DistributionError::StillVesting { vesting_end, .. }) => {
                Reply::text(format!(
                    "Momo Coins are locked until {}.",
                    crate::model::utc_date(vesting_end)
                ))
            }
            Err(distribution::DistributionError::NothingToClaim { .. }) => {
                Reply::text("No claimable Momo Coins found.")
            }
            Err(err) => Reply::text(err.to_string()),
        }
    }

    fn start_distribution(&mut self, chain: &mut impl ChainClient, now: u64) -> Reply {
        let report = match distribution::calculate_airdrop(&mut self.store, 1, now) {
            Ok(report) => report,
            Err(err) => return Reply::text(format!("Distribution not started: {err}")),
        };
        let results = distribution::dispatch_payouts(&mut self.store, chain);
        let mut reply = Reply::text(format!(
            "Airdrop distribution started! {} allocations, {} per tier.",
            report.allocations.len(),
            messages::coins(report.token_per_tier)
        ));
        for result in results {
            let text = match &result.outcome {
                Ok(tx_hash) => messages::sent_tokens(result.amount, &result.wallet, tx_hash),
                Err(error) => messages::failed_tokens(result.amount, &result.wallet, error),
            };
            reply = reply.with_notice(&result.user_id, text);
        }
        reply
    }

    fn decide_task(&mut self, rest: &str, approve: bool) -> Reply {
        // approve_task_<user>_<task>_<date>; the date and task id never
        // contain underscores, the user id may
        let mut parts = rest.rsplitn(3, '_');
        let (date, task_id, target) = match (parts.next(), parts.next(), parts.next()) {
            (Some(date), Some(task), Some(user)) => (date, task, user),
            _ => return Reply::text("Malformed task reference."),
        };
        let task_id: u64 = match task_id.parse() {
            Ok(id) => id,
            Err(_) => return Reply::text("Malformed task reference."),
        };
        if approve {
            match tasks::approve(&mut self.store, target, task_id, date) {
                Ok((description, _reward)) => {
                    Reply::text(format!("Task {task_id} for user {target} approved!"))
                        .with_notice(target, messages::task_approved(&description))
                }
                Err(err) => Reply::text(err.to_string()),
            }
        } else {
            match tasks::reject(&mut self.store, target, task_id, date) {
                Ok(description) => {
                    Reply::text(format!("Task {task_id} for user {target} rejected!"))
                        .with_notice(target, messages::task_rejected(&description))
                }
                Err(err) => Reply::text(err.to_string()),
            }
        }
    }

    fn decide_kyc(&mut self, target: &str, approve: bool) -> Reply {
        let result = if approve {
            kyc::approve(&mut self.store, target)
        } else {
            kyc::reject(&mut self.store, target)
        };
        match result {
            Ok(()) if approve => Reply::text(format!("KYC for user {target} approved!"))
                .with_notice(target, messages::KYC_APPROVED),
            Ok(()) => Reply::text(format!("KYC for user {target} rejected!"))
                .with_notice(target, messages::KYC_REJECTED),
            Err(err) => Reply::text(err.to_string()),
        }
    }

    fn decide_referral(&mut self, rest: &str, approve: bool) -> Reply {
        // approve_ref_<referrer>_<referee>; either id may itself contain
        // underscores, so resolve against the pending queue instead of
        // splitting the reference
        let row = match referral::pending(&self.store)
            .into_iter()
            .find(|r| format!("{}_{}", r.referrer_id, r.referee_id) == rest)
            .cloned()
        {
            Some(row) => row,
            None => return Reply::text("No matching pending referral."),
        };
        let (referrer_id, referee_id) = (row.referrer_id.as_str(), row.referee_id.as_str());
        let referee_name = self
            .store
            .user(referee_id)
            .map(|u| u.username.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        if approve {
            match referral::approve(&mut self.store, referee_id) {
                Ok((paid_referrer, bonus)) => Reply::text(format!(
                    "Referral from {referrer_id} to {referee_id} approved!"
                ))
                .with_notice(&paid_referrer, messages::referral_bonus(&referee_name, bonus))
                .with_notice(referee_id, messages::referral_approved(&referee_name)),
                Err(err) => Reply::text(err.to_string()),
            }
        } else {
            match referral::reject(&mut self.store, referee_id) {
                Ok(_) => Reply::text(format!(
                    "Referral from {referrer_id} to {referee_id} rejected!"
                ))
                .with_notice(referee_id, messages::referral_rejected(&referee_name)),
                Err(err) => Reply::text(err.to_string()),
            }
        }
    }
}

fn parse_campaign_line(text: &str) -> Option<(String, String, String, Amount)> {
    let mut parts = text.split_whitespace();
    let name = parts.next()?.to_string();
    let start = parts.next()?.to_string();
    let end = parts.next()?.to_string();
    let tokens: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((name, start, end, tokens.checked_mul(MOMO_SCALE)?))
}

/// Message catalog (English). Keeps all user-visible strings in one place
/// so transports and tests share the exact wording.
pub mod messages {
    use super::*;
    use crate::model::utc_date;

    pub const MANDATORY_RULES: &str = "Mandatory Airdrop Rules:\n\n\
        - Join @successcrypto2\n- Join @successcryptoboss\n\n\
        Must complete all tasks and press [Continue] to proceed";
    pub const CONFIRM_GROUPS: &str =
        "Please confirm you have joined both groups by pressing below:";
    pub const USAGE: &str = "Select chain (ETH, BSC, SOL, XRP) and enter wallet:";
    pub const BLACKLISTED: &str = "This wallet is blacklisted.";
    pub const NO_ASSETS: &str = "No qualifying assets found.";
    pub const ALREADY_SUBMITTED: &str = "Wallet already submitted.";
    pub const ADMIN_ONLY: &str = "Admin only.";
    pub const REFERRAL_DUPLICATE: &str =
        "This user has already been referred or is a duplicate.";
    pub const JOIN_AIRDROP: &str =
        "Join the airdrop below (mandatory: Join Telegram, Subscribe Telegram Channel, KYC):";
    pub const MANDATORY_MISSING: &str = "Complete mandatory tasks (Join Telegram, Subscribe \
        Telegram Channel) and KYC to join airdrop.";
    pub const KYC_START: &str = "Please provide your Telegram link (e.g., @username or \
        https://t.me/username) to start KYC verification:";
    pub const KYC_TELEGRAM_INVALID: &str = "Invalid Telegram link. Please provide a valid \
        Telegram handle or link (e.g., @username or https://t.me/username):";
    pub const KYC_X_INVALID: &str = "Invalid X link. Please provide a valid X handle or link \
        (e.g., @username or https://x.com/username):";
    pub const KYC_WALLET_INVALID: &str = "Invalid wallet address format. Please submit wallet \
        again (e.g., 'ETH 0x...' or 'XRP r...'):";
    pub const KYC_APPROVED: &str = "Your KYC has been approved!";
    pub const KYC_REJECTED: &str = "Your KYC has been rejected. Please resubmit.";
    pub const CAMPAIGN_PROMPT: &str = "Enter campaign details (name start_date end_date \
        total_tokens, e.g., 'Summer 2025-03-01 2025-03-15 500000'):";
    pub const CAMPAIGN_FORMAT: &str = "Format: name start_date end_date total_tokens \
        (e.g., 'Summer 2025-03-01 2025-03-15 500000')";

    /// Renders minimal units as whole coins with two decimals.
    pub fn coins(amount: Amount) -> String {
        format!("{}.{:02}", amount / MOMO_SCALE, amount % MOMO_SCALE)
    }

    pub fn welcome(balance: Amount, ref_link: &str) -> String {
        format!(
            "Welcome to the Momo Coin Airdrop Bot!\n\n\
             Complete your KYC verification, join the campaign, and refer \
             friends to unlock bonuses.\n\n\
             Balance: {} Momo Coins\nReferral Link: {ref_link}",
            coins(balance)
        )
    }

    pub fn terms(vesting_days: u64) -> String {
        format!(
            "Terms & Conditions:\n- Participate fairly\n- No multiple accounts\n\
             - Tokens vest for {vesting_days} days"
        )
    }

    pub fn captcha(value: u8) -> String {
        format!("Solve: {value} + 5 = ?")
    }

    pub fn verified(tier: u8) -> String {
        format!("Wallet verified! Tier {tier}.")
    }

    pub fn invalid_address(chain: ChainId) -> String {
        format!("Invalid {chain} address (e.g., ETH: 0x..., SOL: SoL..., XRP: r...).")
    }

    pub fn balance(amount: Amount) -> String {
        format!("Your Momo Coin balance: {}", coins(amount))
    }

    pub fn eligibility(eligible: bool) -> String {
        format!(
            "Eligibility: {}",
            if eligible { "Eligible" } else { "Not Eligible" }
        )
    }

    pub fn kyc_status(status: KycStatus) -> String {
        format!("Your KYC status: {status}")
    }

    pub fn kyc_telegram_received(link: &str) -> String {
        format!(
            "Telegram link received: {link}. Now provide your X link \
             (e.g., @username or https://x.com/username):"
        )
    }

    pub fn kyc_x_received(link: &str) -> String {
        format!(
            "X link received: {link}. Now provide your wallet address \
             (e.g., 'ETH 0x...' or 'XRP r...'):"
        )
    }

    pub fn kyc_complete(record: &kyc::KycRecord) -> String {
        format!(
            "KYC submitted successfully! Awaiting admin verification.\n\
             Details:\nTelegram: {}\nX: {}\nWallet: {} ({})",
            record.telegram_link, record.x_link, record.wallet, record.chain
        )
    }

    pub fn kyc_notification(user_id: &str, record: &kyc::KycRecord, now: u64) -> String {
        format!(
            "New KYC submission:\nUser ID: {user_id}\nTelegram: {}\nX: {}\n\
             Wallet: {} ({})\nTime: {}",
            record.telegram_link,
            record.x_link,
            record.wallet,
            record.chain,
            utc_date(now)
        )
    }

    pub fn referral_pending(referee: &str) -> String {
        format!("Referral submitted for {referee}. Awaiting admin approval.")
    }

    pub fn referral_notification(
        referrer_id: &str,
        referee_id: &str,
        referee_name: &str,
        now: u64,
    ) -> String {
        format!(
            "New referral submission:\nReferrer ID: {referrer_id}\n\
             Referee ID: {referee_id}\nReferee Username: {referee_name}\nTime: {}",
            utc_date(now)
        )
    }

    pub fn referral_bonus(referee: &str, bonus: Amount) -> String {
        format!(
            "Congratulations! Your referral for {referee} has been approved! \
             You've earned a {} Momo Coin bonus!",
            coins(bonus)
        )
    }

    pub fn referral_approved(referee: &str) -> String {
        format!("Your referral for {referee} has been approved!")
    }

    pub fn referral_rejected(referee: &str) -> String {
        format!("Your referral for {referee} has been rejected.")
    }

    pub fn task_approved(description: &str) -> String {
        format!("Task '{description}' approved! +10 Momo Coins")
    }

    pub fn task_rejected(description: &str) -> String {
        format!("Task '{description}' rejected.")
    }

    pub fn task_completed(description: &str) -> String {
        format!("Task '{description}' submitted! Awaiting admin approval.")
    }

    pub fn sent_tokens(amount: Amount, wallet: &str, tx_hash: &str) -> String {
        format!("Sent {} tokens to {wallet} (Tx: {tx_hash})", coins(amount))
    }

    pub fn failed_tokens(amount: Amount, wallet: &str, error: &str) -> String {
        format!("Failed to send {} tokens to {wallet}: {error}", coins(amount))
    }

    pub fn enter_wallet(chain: ChainId) -> String {
        format!("Enter your {chain} wallet address (e.g., 0x... or SoL... or r...):")
    }

    pub fn campaign_set(name: &str, start: &str, end: &str, tokens: Amount) -> String {
        format!(
            "Campaign '{name}' set! Start: {start}, End: {end}, Tokens: {}",
            coins(tokens)
        )
    }

    pub fn campaign_edit(name: &str, start: &str, end: &str, tokens: Amount) -> String {
        format!(
            "Campaign '{name}' updated! Start: {start}, End: {end}, Tokens: {}",
            coins(tokens)
        )
    }

    pub fn daily_tasks(store: &CampaignStore) -> String {
        let listing: Vec<String> = crate::tasks::active_tasks(store)
            .iter()
            .map(|t| {
                format!(
                    "ID: {} | {}{}\nLink: {}",
                    t.id,
                    t.description,
                    if t.mandatory { " (Mandatory)" } else { "" },
                    t.task_link
                )
            })
            .collect();
        format!(
            "Daily Tasks\nComplete these tasks and submit your username as proof:\n\n{}\n\n\
             Submission format: enter task ID and username (e.g., '1 @username')",
            listing.join("\n")
        )
    }

    pub fn leaderboard(store: &CampaignStore) -> String {
        let rows = store.leaderboard(10);
        let listing = if rows.is_empty() {
            "No leaders yet.".to_string()
        } else {
            rows.iter()
                .enumerate()
                .map(|(i, (name, balance))| format!("{}. {name} - {} Momo Coins", i + 1, coins(*balance)))
                .collect::<Vec<_>>()
                .join("\n")
        };
        format!("Leaderboard (Top Momo Coin Earners):\n{listing}")
    }
}

impl BotEngine {
    /// Default branch of `handle_text`: `<task_id> <username>` daily-task
    /// proof.
    fn receive_task_proof(&mut self, user_id: &str, text: &str, now: u64) -> Reply {
        let (task_id, username) = match text.split_once(char::is_whitespace) {
            Some((id, username)) => (id, username.trim()),
            None => {
                return Reply::text(
                    "Invalid format. Use: task_id username (e.g., '1 @username')",
                )
            }
        };
        let task_id: u64 = match task_id.parse() {
            Ok(id) => id,
            Err(_) => {
                return Reply::text(
                    "Invalid format. Use: task_id username (e.g., '1 @username')",
                )
            }
        };
        let today = crate::model::utc_date(now);
        match tasks::submit_completion(&mut self.store, user_id, task_id, username, &today) {
            Ok(description) => {
                let mut reply = Reply::text(messages::task_completed(&description));
                if let Some(admin) = self.config.admin_id.clone() {
                    reply = reply.with_notice(
                        &admin,
                        format!(
                            "User {user_id} submitted username '{username}' for task \
                             '{description}' on {today}"
                        ),
                    );
                }
                reply
            }
            Err(tasks::TaskError::UnknownTask { .. }) => {
                Reply::text("Invalid or inactive task ID.")
            }
            Err(tasks::TaskError::AlreadySubmittedToday { .. }) => {
                Reply::text("You've already submitted this task today.")
            }
            Err(err) => Reply::text(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Holdings, InMemoryChain};
    use crate::model::DistributionStatus;

    const ETH_WALLET: &str = "0x00000000000000000000000000000000000000aa";

    fn engine() -> BotEngine {
        let mut config = BotConfig::default();
        config.admin_id = Some("admin".to_string());
        let mut engine = BotEngine::with_rng(
            config,
            CampaignStore::seeded(0),
            StdRng::seed_from_u64(1),
        );
        engine.store.upsert_user("admin", "admin", "l".into());
        engine
    }

    fn chain_with_assets() -> InMemoryChain {
        let mut chain = InMemoryChain::new();
        chain.fund(
            ChainId::Eth,
            ETH_WALLET,
            Holdings {
                token_balance: 500 * MOMO_SCALE,
                nft_count: 4,
                ..Default::default()
            },
        );
        chain
    }

    fn onboard(engine: &mut BotEngine, chain: &mut InMemoryChain, user: &str) {
        engine.handle_start(user, user, None, 0);
        engine.handle_callback(user, "confirm_groups", chain, 0);
    }

    #[test]
    fn start_shows_rules_then_menu() {
        let mut engine = engine();
        let mut chain = InMemoryChain::new();
        let reply = engine.handle_start("u1", "alice", None, 0);
        assert_eq!(reply.text, messages::MANDATORY_RULES);
        engine.handle_callback("u1", "confirm_groups", &mut chain, 0);
        let reply = engine.handle_start("u1", "alice", None, 1);
        assert!(reply.text.contains("Balance: 0.00 Momo Coins"));
        assert!(reply.text.contains("?start=u1"));
    }

    #[test]
    fn deep_link_referral_notifies_referrer_and_admin() {
        let mut engine = engine();
        let mut chain = InMemoryChain::new();
        onboard(&mut engine, &mut chain, "sponsor");
        let reply = engine.handle_start("invitee", "bob", Some("sponsor"), 5);
        let to: Vec<&str> = reply.notices.iter().map(|n| n.to.as_str()).collect();
        assert_eq!(to, ["sponsor", "admin"]);
        assert_eq!(referral::pending(&engine.store).len(), 1);

        // second start through the same link is a duplicate
        let reply = engine.handle_start("invitee", "bob", Some("sponsor"), 6);
        assert!(reply
            .notices
            .iter()
            .any(|n| n.text == messages::REFERRAL_DUPLICATE));
    }

    #[test]
    fn wallet_submission_walks_captcha_then_verifies() {
        let mut engine = engine();
        let mut chain = chain_with_assets();
        onboard(&mut engine, &mut chain, "u1");

        engine.handle_callback("u1", "submit_wallet", &mut chain, 0);
        engine.handle_callback("u1", "wallet_eth", &mut chain, 0);
        let reply = engine.handle_text("u1", ETH_WALLET, &mut chain, 0);
        assert!(reply.text.starts_with("Solve: "));
        let value = engine.store.captchas["u1"].value;

        let reply = engine.handle_text("u1", &(value as i64 + 5).to_string(), &mut chain, 1);
        assert_eq!(reply.text, messages::verified(2));
        assert_eq!(engine.store.eligible["u1"].tier, 2);
    }

    #[test]
    fn wrong_captcha_discards_submission_for_retry() {
        let mut engine = engine();
        let mut chain = chain_with_assets();
        onboard(&mut engine, &mut chain, "u1");

        engine.handle_callback("u1", "submit_wallet", &mut chain, 0);
        engine.handle_callback("u1", "wallet_eth", &mut chain, 0);
        engine.handle_text("u1", ETH_WALLET, &mut chain, 0);
        let reply = engine.handle_text("u1", "999", &mut chain, 1);
        assert!(reply.text.starts_with("Wrong answer"));
        assert!(!engine.store.submissions.contains_key("u1"));

        // the retry goes through cleanly
        engine.handle_callback("u1", "wallet_eth", &mut chain, 2);
        let reply = engine.handle_text("u1", ETH_WALLET, &mut chain, 2);
        assert!(reply.text.starts_with("Solve: "));
    }

    #[test]
    fn admin_actions_are_gated() {
        let mut engine = engine();
        let mut chain = InMemoryChain::new();
        onboard(&mut engine, &mut chain, "u1");
        let reply = engine.handle_callback("u1", "start_distribution", &mut chain, 0);
        assert_eq!(reply.text, messages::ADMIN_ONLY);
        let reply = engine.handle_callback("u1", "export_data", &mut chain, 0);
        assert_eq!(reply.text, messages::ADMIN_ONLY);
    }

    #[test]
    fn full_airdrop_cycle_through_the_menu() {
        let mut engine = engine();
        let mut chain = chain_with_assets();
        onboard(&mut engine, &mut chain, "u1");

        // wallet + captcha + verification
        engine.handle_callback("u1", "wallet_eth", &mut chain, 0);
        engine.handle_text("u1", ETH_WALLET, &mut chain, 0);
        let value = engine.store.captchas["u1"].value;
        engine.handle_text("u1", &(value as i64 + 5).to_string(), &mut chain, 1);

        // distribution by the admin
        let reply = engine.handle_callback("admin", "start_distribution", &mut chain, 100);
        assert!(reply.text.starts_with("Airdrop distribution started!"));
        assert_eq!(reply.notices.len(), 1);
        assert!(reply.notices[0].text.starts_with("Sent "));
        let dist = engine.store.distributions["u1"].clone();
        assert_eq!(dist.status, DistributionStatus::Claimable);

        // claim before and after vesting
        let reply = engine.handle_callback("u1", "claim_tokens", &mut chain, dist.vesting_end - 1);
        assert!(reply.text.starts_with("Momo Coins are locked until"));
        let reply = engine.handle_callback("u1", "claim_tokens", &mut chain, dist.vesting_end);
        assert!(reply.text.starts_with("Successfully claimed"));
        assert_eq!(engine.store.balance("u1"), dist.amount);

        // export reflects the claimed row
        let reply = engine.handle_callback("admin", "export_data", &mut chain, 0);
        let (name, csv) = reply.attachment.expect("csv attachment");
        assert_eq!(name, "airdrop_log.csv");
        assert!(csv.contains("claimed"));
    }

    #[test]
    fn kyc_wizard_round_trip_with_admin_review() {
        let mut engine = engine();
        let mut chain = InMemoryChain::new();
        onboard(&mut engine, &mut chain, "u1");

        engine.handle_callback("u1", "kyc_start", &mut chain, 0);
        engine.handle_text("u1", "@alice_tg", &mut chain, 0);
        engine.handle_text("u1", "@alice", &mut chain, 0);
        let reply = engine.handle_text("u1", &format!("ETH {ETH_WALLET}"), &mut chain, 0);
        assert!(reply.text.starts_with("KYC submitted successfully!"));
        assert_eq!(reply.notices[0].to, "admin");
        assert_eq!(engine.store.kyc_status("u1"), KycStatus::Submitted);

        let reply = engine.handle_callback("admin", "approve_kyc", &mut chain, 0);
        assert!(reply.text.contains("approve_kyc_u1"));
        let reply = engine.handle_callback("admin", "approve_kyc_u1", &mut chain, 0);
        assert_eq!(reply.notices[0].text, messages::KYC_APPROVED);
        assert_eq!(engine.store.kyc_status("u1"), KycStatus::Verified);
    }

    #[test]
    fn task_proof_flow_and_approval() {
        let mut engine = engine();
        let mut chain = InMemoryChain::new();
        onboard(&mut engine, &mut chain, "u1");

        let reply = engine.handle_text("u1", "4 @alice", &mut chain, 0);
        assert!(reply.text.contains("Join Telegram"));
        let date = crate::model::utc_date(0);
        let reply = engine.handle_callback(
            "admin",
            &format!("approve_task_u1_4_{date}"),
            &mut chain,
            0,
        );
        assert!(reply.text.contains("approved!"));
        assert_eq!(engine.store.balance("u1"), 10 * MOMO_SCALE);
    }

    #[test]
    fn start_press_abandons_pending_input() {
        let mut engine = engine();
        let mut chain = InMemoryChain::new();
        onboard(&mut engine, &mut chain, "u1");

        engine.handle_callback("u1", "kyc_start", &mut chain, 0);
        engine.handle_callback("u1", "start", &mut chain, 0);
        // the abandoned wizard no longer captures free text
        let reply = engine.handle_text("u1", "@alice_tg", &mut chain, 0);
        assert!(reply.text.starts_with("Invalid format"));
        assert_eq!(engine.store.kyc_status("u1"), KycStatus::Pending);
    }

    #[test]
    fn referral_callbacks_handle_underscored_ids() {
        let mut engine = engine();
        let mut chain = InMemoryChain::new();
        onboard(&mut engine, &mut chain, "team_lead");
        engine.handle_start("new_user", "carol", Some("team_lead"), 5);

        let reply = engine.handle_callback("admin", "approve_referrals", &mut chain, 5);
        assert!(reply.text.contains("approve_ref_team_lead_new_user"));
        let reply =
            engine.handle_callback("admin", "approve_ref_team_lead_new_user", &mut chain, 5);
        assert!(reply.text.contains("approved!"));
        assert!(referral::pending(&engine.store).is_empty());
        assert!(engine.store.balance("team_lead") > 0);
    }

    #[test]
    fn campaign_line_rejects_unscalable_budget() {
        assert!(parse_campaign_line("Launch 2026-01-01 2026-02-01 1000").is_some());
        let line = format!("Launch 2026-01-01 2026-02-01 {}", u64::MAX);
        assert!(parse_campaign_line(&line).is_none());
    }

    #[test]
    fn join_airdrop_gate_reports_missing_requirements() {
        let mut engine = engine();
        let mut chain = InMemoryChain::new();
        onboard(&mut engine, &mut chain, "u1");
        let reply = engine.handle_callback("u1", "join_airdrop", &mut chain, 0);
        assert_eq!(reply.text, messages::MANDATORY_MISSING);
    }
}
