//! Chain access seams for the airdrop engine.
//!
//! The engine never talks to an RPC node directly: eligibility checks go
//! through [`ChainInspector`] and payouts through [`ChainSender`]. The
//! bundled [`InMemoryChain`] is a deterministic implementation backed by a
//! JSON fixture, suitable for the CLI and for tests; a production build
//! would plug real chain-client libraries into the same traits.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::{Amount, ChainId, Wallet};

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("no account {wallet} on {chain}")]
    UnknownAccount { chain: ChainId, wallet: Wallet },
    #[error("{chain} rpc failure: {reason}")]
    Rpc { chain: ChainId, reason: String },
    #[error("transfer of {amount} to {wallet} on {chain} rejected: {reason}")]
    TransferRejected {
        chain: ChainId,
        wallet: Wallet,
        amount: Amount,
        reason: String,
    },
    #[error("chain fixture error: {0}")]
    Fixture(String),
}

/// On-chain holdings relevant to tier evaluation, in minimal units.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Holdings {
    pub native_balance: Amount,
    pub token_balance: Amount,
    pub nft_count: u64,
}

pub trait ChainInspector {
    fn holdings(&self, chain: ChainId, wallet: &str) -> Result<Holdings, ChainError>;
}

pub trait ChainSender {
    /// Issues one native/token transfer and returns its transaction hash.
    fn transfer(&mut self, chain: ChainId, to: &str, amount: Amount) -> Result<String, ChainError>;
}

pub trait ChainClient: ChainInspector + ChainSender {}

impl<T: ChainInspector + ChainSender> ChainClient for T {}

/// Deterministic chain stand-in: holdings are seeded into a fixture map,
/// transfers succeed unless the destination is marked as failing, and tx
/// hashes are derived from the transfer parameters.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InMemoryChain {
    accounts: BTreeMap<ChainId, BTreeMap<Wallet, Holdings>>,
    failing: BTreeSet<Wallet>,
    #[serde(default)]
    unreachable: BTreeSet<Wallet>,
    nonce: u64,
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fund(&mut self, chain: ChainId, wallet: &str, holdings: Holdings) {
        self.accounts
            .entry(chain)
            .or_default()
            .insert(wallet.to_string(), holdings);
    }

    /// Marks a wallet so that transfers to it fail. Lets tests and demos
    /// exercise the failed-payout path.
    pub fn mark_failing(&mut self, wallet: &str) {
        self.failing.insert(wallet.to_string());
    }

    /// Marks a wallet so that holdings lookups fail as an RPC outage
    /// rather than an unknown account.
    pub fn mark_unreachable(&mut self, wallet: &str) {
        self.unreachable.insert(wallet.to_string());
    }

    pub fn load(path: &Path) -> Result<Self, ChainError> {
        let bytes =
            std::fs::read(path).map_err(|e| ChainError::Fixture(format!("{}: {e}", path.display())))?;
        serde_json::from_slice(&bytes).map_err(|e| ChainError::Fixture(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), ChainError> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| ChainError::Fixture(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| ChainError::Fixture(format!("{}: {e}", path.display())))
    }

    fn derive_tx_hash(&self, chain: ChainId, to: &str, amount: Amount) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"momo-tx");
        hasher.update(chain.as_str().as_bytes());
        hasher.update(to.as_bytes());
        hasher.update(amount.to_le_bytes());
        hasher.update(self.nonce.to_le_bytes());
        hex::encode(hasher.finalize())
    }
}

impl ChainInspector for InMemoryChain {
    fn holdings(&self, chain: ChainId, wallet: &str) -> Result<Holdings, ChainError> {
        if self.unreachable.contains(wallet) {
            return Err(ChainError::Rpc {
                chain,
                reason: "endpoint unreachable".into(),
            });
        }
        self.accounts
            .get(&chain)
            .and_then(|chain_accounts| chain_accounts.get(wallet))
            .copied()
            .ok_or_else(|| ChainError::UnknownAccount {
                chain,
                wallet: wallet.to_string(),
            })
    }
}

impl ChainSender for InMemoryChain {
    fn transfer(&mut self, chain: ChainId, to: &str, amount: Amount) -> Result<String, ChainError> {
        if self.failing.contains(to) {
            return Err(ChainError::TransferRejected {
                chain,
                wallet: to.to_string(),
                amount,
                reason: "destination rejected the transfer".into(),
            });
        }
        let hash = self.derive_tx_hash(chain, to, amount);
        self.nonce += 1;
        let entry = self
            .accounts
            .entry(chain)
            .or_default()
            .entry(to.to_string())
            .or_default();
        entry.token_balance += amount;
        Ok(hash)
    }
}
