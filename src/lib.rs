//! Engine for the Momo Coin airdrop campaign bot.
//!
//! The crate is split into focused modules that the conversation layer and
//! the CLI combine:
//!
//! * [`model`] — core types: chains, users, campaigns, ledger rows.
//! * [`store`] — the single [`store::CampaignStore`] state value and its
//!   digest-checked JSON snapshot persistence.
//! * [`chain`] — inspector/sender traits over the supported chains, with a
//!   deterministic in-memory implementation for the CLI and tests.
//! * [`eligibility`] — wallet submission, the anti-bot captcha, and the
//!   holdings-to-tier mapping.
//! * [`kyc`] — the three-step identity wizard and its approval queue.
//! * [`tasks`] — the daily-task reward ledger and the mandatory-task gate.
//! * [`referral`] — deep-link referrals and referrer bonuses.
//! * [`distribution`] — tiered allocation, payout dispatch, vesting, claim.
//! * [`bot`] — the menu/callback/free-text conversation engine.
//! * [`config`] — deployment configuration (admin, endpoints, file paths).
//!
//! The modules stay transport-agnostic: nothing here knows about a chat
//! platform, so the same engine drives the bundled CLI and can back a real
//! messaging frontend.

pub mod bot;
pub mod chain;
pub mod config;
pub mod distribution;
pub mod eligibility;
pub mod kyc;
pub mod model;
pub mod referral;
pub mod store;
pub mod tasks;

mod error;

pub use error::AirdropError;
