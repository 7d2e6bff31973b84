//! Deployment configuration: admin identity, bot username, file locations,
//! and the per-chain endpoint/sender settings a production chain client
//! would need. Loaded from a JSON file; every field has a default so a
//! missing file means a default deployment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::UserId;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config encoding: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BotConfig {
    pub admin_id: Option<UserId>,
    pub bot_username: String,
    pub state_path: PathBuf,
    pub chain_fixture_path: PathBuf,
    pub rpc: RpcEndpoints,
    pub senders: SenderAddresses,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RpcEndpoints {
    pub eth_rpc_url: String,
    pub bsc_rpc_url: String,
    pub sol_rpc_url: String,
    pub xrp_rpc_url: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SenderAddresses {
    pub eth_sender_address: Option<String>,
    pub xrp_sender_address: Option<String>,
    pub token_contract_address: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            admin_id: None,
            bot_username: "tigerr_airdrop_bot".into(),
            state_path: PathBuf::from("airdrop_state.json"),
            chain_fixture_path: PathBuf::from("chain_fixture.json"),
            rpc: RpcEndpoints::default(),
            senders: SenderAddresses::default(),
        }
    }
}

impl Default for RpcEndpoints {
    fn default() -> Self {
        Self {
            eth_rpc_url: "https://mainnet.infura.io/v3/your-infura-key".into(),
            bsc_rpc_url: "https://bsc-dataseed.binance.org/".into(),
            sol_rpc_url: "https://api.devnet.solana.com".into(),
            xrp_rpc_url: "https://s1.ripple.com:51234/".into(),
        }
    }
}

impl BotConfig {
    /// Loads the config file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_id.as_deref() == Some(user_id)
    }
}
