//! The setup plan: every literal the bootstrap needs, held in one immutable structure.
//!
//! The defaults reproduce the standard bridge test environment (two destination domains,
//! a basic fee on the native asset and on a USDC test asset, a funded fee reserve). A
//! plan can also be loaded from a JSON file with the same shape.
use std::collections::HashSet;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use subxt::utils::AccountId32;

use crate::error::{ConfigParseSnafu, ConfigReadSnafu, Error, InvalidHexSnafu, Result};
use crate::submitter::Durability;

/// One unit of the native token (12 decimals).
pub const NATIVE_UNIT: u128 = 1_000_000_000_000;

/// Default MPC (relayer) address used by the local relayer setup.
pub const DEFAULT_MPC_ADDRESS: &str = "0x1c5541A79AcC662ab2D2647F3B141a3B7Cdb2Ae4";

/// Account that collects bridge fees on the test chain.
pub const DEFAULT_FEE_RESERVE_ACCOUNT: &str = "5ELLU7ibt5ZrNEYRwohtaRBDBa3TzcWwwPELBPSWWd2mbgv3";

/// XCM allows at most eight junctions in an interior location.
const MAX_JUNCTIONS: usize = 8;

/// The complete, ordered description of what the setup submits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetupConfig {
    /// Ethereum-style (20 byte, hex) address of the MPC relayer key.
    pub mpc_address: String,
    /// Destination domains to register, in order.
    pub domains: Vec<DestDomain>,
    /// Fee handler configured for every fee asset on every domain.
    #[serde(default)]
    pub fee_handler: FeeHandlerType,
    /// Fee amount charged by the basic fee handler; unused with any other handler.
    pub basic_fee: u128,
    /// Assets that get a fee configuration, in order.
    pub fee_assets: Vec<FeeAsset>,
    /// Fee reserve account funding.
    pub fee_reserve: FeeReserve,
    /// Whether each step waits for finality or only for block inclusion.
    #[serde(default = "default_wait_for_finalization")]
    pub wait_for_finalization: bool,
    /// Upper bound, in seconds, for a single submission to reach its terminal status.
    #[serde(default)]
    pub tx_timeout_secs: Option<u64>,
}

/// A destination domain known to the bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestDomain {
    /// Bridge domain identifier.
    pub domain_id: u8,
    /// Chain id of the destination network.
    pub chain_id: u64,
}

/// The fee handlers the router can dispatch to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeHandlerType {
    /// Flat fee per asset and domain.
    #[default]
    BasicFeeHandler,
    /// Fee computed by an oracle-backed handler.
    DynamicFeeHandler,
}

impl FeeHandlerType {
    /// Variant name as it appears in the runtime metadata.
    pub fn variant_name(&self) -> &'static str {
        match self {
            FeeHandlerType::BasicFeeHandler => "BasicFeeHandler",
            FeeHandlerType::DynamicFeeHandler => "DynamicFeeHandler",
        }
    }
}

/// An asset that gets fees configured, optionally created on chain first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAsset {
    /// Human readable name, used in logs.
    pub label: String,
    /// XCM location identifying the asset.
    pub location: AssetLocation,
    /// Local asset to create, describe and mint before its fees are set.
    #[serde(default)]
    pub registration: Option<AssetRegistration>,
}

/// A concrete XCM (v1) multilocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLocation {
    /// Number of parent hops.
    pub parents: u8,
    /// Interior junctions; empty means `Here`.
    #[serde(default)]
    pub interior: Vec<Junction>,
}

impl AssetLocation {
    /// The location of the chain's native token.
    pub fn native() -> Self {
        Self {
            parents: 0,
            interior: Vec::new(),
        }
    }
}

/// The junction kinds the test assets use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Junction {
    /// A parachain id.
    Parachain(u32),
    /// An opaque key, written as 0x-prefixed hex in plan files.
    GeneralKey(#[serde(with = "hex_bytes")] Vec<u8>),
}

/// Parameters of a local fungible asset created by the setup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRegistration {
    /// Asset id in the assets pallet.
    pub id: u32,
    /// Minimum balance (existential deposit) of the asset.
    pub min_balance: u128,
    /// Metadata name.
    pub name: String,
    /// Metadata symbol.
    pub symbol: String,
    /// Metadata decimals.
    pub decimals: u8,
    /// Amount minted after creation.
    pub mint_amount: u128,
    /// SS58 recipient of the mint; the signer when absent.
    #[serde(default)]
    pub beneficiary: Option<String>,
}

/// Funding of the fee reserve account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeReserve {
    /// SS58 address of the reserve account.
    pub account: String,
    /// Free balance the account is set to.
    pub balance: u128,
}

fn default_wait_for_finalization() -> bool {
    true
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            mpc_address: DEFAULT_MPC_ADDRESS.to_string(),
            domains: vec![
                DestDomain {
                    domain_id: 1,
                    chain_id: 1,
                },
                DestDomain {
                    domain_id: 2,
                    chain_id: 2,
                },
            ],
            fee_handler: FeeHandlerType::BasicFeeHandler,
            basic_fee: NATIVE_UNIT,
            fee_assets: vec![
                FeeAsset {
                    label: "native".to_string(),
                    location: AssetLocation::native(),
                    registration: None,
                },
                FeeAsset {
                    label: "USDC".to_string(),
                    // General keys of the USDC location in the test runtime: "sygma", "usdc"
                    location: AssetLocation {
                        parents: 1,
                        interior: vec![
                            Junction::Parachain(2004),
                            Junction::GeneralKey(b"sygma".to_vec()),
                            Junction::GeneralKey(b"usdc".to_vec()),
                        ],
                    },
                    registration: Some(AssetRegistration {
                        id: 2000,
                        min_balance: 100,
                        name: "USDC test asset".to_string(),
                        symbol: "USDC".to_string(),
                        decimals: 12,
                        mint_amount: 100 * NATIVE_UNIT,
                        beneficiary: None,
                    }),
                },
            ],
            fee_reserve: FeeReserve {
                account: DEFAULT_FEE_RESERVE_ACCOUNT.to_string(),
                balance: 10_000 * NATIVE_UNIT,
            },
            wait_for_finalization: true,
            tx_timeout_secs: None,
        }
    }
}

impl SetupConfig {
    /// Loads a plan from a JSON file.
    pub fn from_file(path: &str) -> Result<Self> {
        info!("Reading setup plan: {}", path);
        let raw = fs::read_to_string(path).context(ConfigReadSnafu { path })?;
        serde_json::from_str(&raw).context(ConfigParseSnafu)
    }

    /// Replaces the MPC address.
    pub fn with_mpc_address(mut self, mpc_address: impl Into<String>) -> Self {
        self.mpc_address = mpc_address.into();
        self
    }

    /// Replaces the durability every step waits for.
    pub fn with_wait_for_finalization(mut self, wait: bool) -> Self {
        self.wait_for_finalization = wait;
        self
    }

    /// Replaces the per-submission timeout.
    pub fn with_tx_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tx_timeout_secs = timeout.map(|t| t.as_secs());
        self
    }

    /// Durability level requested for every step.
    pub fn durability(&self) -> Durability {
        Durability::from_wait_for_finalization(self.wait_for_finalization)
    }

    /// Per-submission timeout, if any.
    pub fn tx_timeout(&self) -> Option<Duration> {
        self.tx_timeout_secs.map(Duration::from_secs)
    }

    /// The MPC address as raw bytes.
    pub fn mpc_address_bytes(&self) -> Result<[u8; 20]> {
        let bytes = decode_hex("mpc_address", &self.mpc_address)?;
        bytes.try_into().map_err(|bytes: Vec<u8>| Error::InvalidConfig {
            message: format!("mpc_address must be 20 bytes, got {}", bytes.len()),
        })
    }

    /// Checks everything that can be checked without a chain connection.
    pub fn validate(&self) -> Result<()> {
        self.mpc_address_bytes()?;

        if self.domains.is_empty() {
            return Err(Error::InvalidConfig {
                message: "at least one destination domain is required".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for domain in &self.domains {
            if !seen.insert(domain.domain_id) {
                return Err(Error::InvalidConfig {
                    message: format!("domain {} is listed twice", domain.domain_id),
                });
            }
        }

        for asset in &self.fee_assets {
            if asset.location.interior.len() > MAX_JUNCTIONS {
                return Err(Error::InvalidConfig {
                    message: format!(
                        "asset {} has {} junctions, at most {} are allowed",
                        asset.label,
                        asset.location.interior.len(),
                        MAX_JUNCTIONS
                    ),
                });
            }
            if let Some(beneficiary) = asset
                .registration
                .as_ref()
                .and_then(|r| r.beneficiary.as_deref())
            {
                parse_account(beneficiary)?;
            }
        }

        parse_account(&self.fee_reserve.account)?;

        if self.tx_timeout_secs == Some(0) {
            return Err(Error::InvalidConfig {
                message: "tx_timeout_secs must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Decodes an optionally 0x-prefixed hex string.
pub fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value.trim_start_matches("0x")).context(InvalidHexSnafu { field })
}

/// Parses an SS58 address.
pub fn parse_account(address: &str) -> Result<AccountId32> {
    AccountId32::from_str(address).map_err(|e| Error::InvalidAccount {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Serde adapter writing byte strings as 0x-prefixed hex.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Writes `bytes` as a 0x-prefixed hex string.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    /// Reads an optionally 0x-prefixed hex string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        hex::decode(raw.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}
