//! # Bridge test-environment setup
//!
//! Turns a [`SetupConfig`] into the ordered list of privileged calls and submits them one
//! by one, each awaited to the configured durability before the next starts. The order
//! follows the bridge pallets' own validation:
//!
//! 1. MPC address
//! 2. destination domains
//! 3. per fee asset: optional asset creation, metadata and mint, then fee handler and,
//!    for the basic handler, fee for every domain
//! 4. fee reserve balance
//!
//! Afterwards every destination domain is checked to be unpaused. The first failure
//! aborts the run; effects of the steps already submitted stay on chain.
use log::{info, warn};
use subxt::utils::AccountId32;

use crate::calls::{self, Call};
use crate::chain::ChainInterface;
use crate::config::{parse_account, FeeHandlerType, SetupConfig};
use crate::error::{Error, Result};
use crate::submitter::{SubmissionOutcome, Submitter};

/// One submitted setup step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepRecord {
    /// Label of the submitted call.
    pub call: String,
    /// How it ended.
    pub outcome: SubmissionOutcome,
}

/// Everything a completed setup did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SetupReport {
    /// Submitted steps, in order.
    pub steps: Vec<StepRecord>,
    /// Domains verified to be unpaused.
    pub ready_domains: Vec<u8>,
}

/// Builds the ordered call list for `config`, with `signer` as asset admin and default
/// mint recipient.
pub fn plan(config: &SetupConfig, signer: &AccountId32) -> Result<Vec<Call>> {
    config.validate()?;
    let mut steps = vec![calls::set_mpc_address(config.mpc_address_bytes()?)];

    for domain in &config.domains {
        steps.push(calls::register_domain(domain));
    }

    for asset in &config.fee_assets {
        if let Some(registration) = &asset.registration {
            let beneficiary = match &registration.beneficiary {
                Some(address) => parse_account(address)?,
                None => signer.clone(),
            };
            steps.push(calls::create_asset(
                registration.id,
                signer,
                registration.min_balance,
            ));
            steps.push(calls::set_asset_metadata(
                registration.id,
                &registration.name,
                &registration.symbol,
                registration.decimals,
            ));
            steps.push(calls::mint_asset(
                registration.id,
                &beneficiary,
                registration.mint_amount,
            ));
        }

        for domain in &config.domains {
            steps.push(calls::set_fee_handler(
                domain.domain_id,
                &asset.location,
                config.fee_handler,
            ));
            // Only the basic handler takes a flat fee
            if config.fee_handler == FeeHandlerType::BasicFeeHandler {
                steps.push(calls::set_fee(
                    domain.domain_id,
                    &asset.location,
                    config.basic_fee,
                ));
            }
        }
    }

    let reserve = parse_account(&config.fee_reserve.account)?;
    steps.push(calls::set_balance(&reserve, config.fee_reserve.balance));

    Ok(steps)
}

/// Runs the whole setup and verifies the bridge is unpaused for every domain.
pub async fn run<C: ChainInterface>(
    submitter: &mut Submitter<C>,
    config: &SetupConfig,
) -> Result<SetupReport> {
    let steps = plan(config, submitter.account())?;
    let durability = config.durability();
    let mut report = SetupReport::default();

    info!("🔧 Submitting {} setup steps", steps.len());
    for call in &steps {
        let outcome = submitter.submit(call, durability).await?;
        report.steps.push(StepRecord {
            call: call.to_string(),
            outcome,
        });
    }

    for domain in &config.domains {
        if is_bridge_paused(submitter.chain(), domain.domain_id).await? {
            warn!("DestDomainID: {} is paused", domain.domain_id);
            return Err(Error::BridgePaused {
                domain_id: domain.domain_id,
            });
        }
        info!("DestDomainID: {} is ready✅", domain.domain_id);
        report.ready_domains.push(domain.domain_id);
    }

    Ok(report)
}

/// Reads `SygmaBridge.IsPaused` for `domain_id`. A domain without an entry was never
/// paused.
pub async fn is_bridge_paused<C: ChainInterface>(chain: &C, domain_id: u8) -> Result<bool> {
    match chain.query(&calls::bridge_pause_status(domain_id)).await? {
        None => Ok(false),
        Some(value) => value.as_bool().ok_or_else(|| Error::DecodeValue {
            what: format!("SygmaBridge.IsPaused({domain_id})"),
        }),
    }
}
