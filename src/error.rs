use thiserror::Error;

/// Canonical error type exposed at the crate surface.
///
/// Each engine module keeps its own focused error enum; this wrapper exists
/// for callers (the CLI, embedding services) that drive several engines and
/// want one `?`-friendly type.
#[derive(Debug, Error)]
pub enum AirdropError {
    /// Store lookup, config, or snapshot persistence failure.
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    /// Wallet submission or captcha failure.
    #[error(transparent)]
    Submit(#[from] crate::eligibility::SubmitError),

    /// Chain inspector/sender failure.
    #[error(transparent)]
    Chain(#[from] crate::chain::ChainError),

    /// Distribution, payout, or claim failure.
    #[error(transparent)]
    Distribution(#[from] crate::distribution::DistributionError),

    /// Referral registration or review failure.
    #[error(transparent)]
    Referral(#[from] crate::referral::ReferralError),

    /// KYC wizard or review failure.
    #[error(transparent)]
    Kyc(#[from] crate::kyc::KycError),

    /// Daily-task ledger failure.
    #[error(transparent)]
    Task(#[from] crate::tasks::TaskError),

    /// Deployment config file failure.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
