//! Privileged transaction submitter.
//!
//! Every setup step goes through [`Submitter::submit`]: read the signer's nonce fresh
//! from chain state, sign the call with an immortal era, submit it and follow its status
//! updates until the requested [`Durability`] is reached or the chain rejects it.
use std::time::Duration;

use futures::StreamExt;
use log::{error, info, warn};
use subxt::utils::{AccountId32, H256};
use subxt_signer::sr25519::Keypair;

use crate::calls::Call;
use crate::chain::{ChainInterface, Inclusion, StatusStream, TxLifecycle};
use crate::error::{Error, Result, StatusStreamClosedSnafu};

/// How durable a submission must be before it counts as done.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Durability {
    /// Included in a best block.
    InBlock,
    /// Included in a finalized block.
    Finalized,
}

impl Durability {
    /// Maps a "wait for finalization" flag to a durability level.
    pub fn from_wait_for_finalization(wait: bool) -> Self {
        if wait {
            Durability::Finalized
        } else {
            Durability::InBlock
        }
    }
}

/// Where a successful submission ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Block the extrinsic is in.
    pub block_hash: H256,
    /// Hash of the extrinsic.
    pub extrinsic_hash: H256,
    /// Nonce the extrinsic was signed with.
    pub nonce: u64,
}

/// Terminal success of a submission. Failures are returned as [`Error::Transaction`],
/// [`Error::Timeout`] or [`Error::StatusStreamClosed`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Included in a best block; finality was not awaited.
    Included(Receipt),
    /// Included in a finalized block.
    Finalized(Receipt),
}

impl SubmissionOutcome {
    /// The receipt of either outcome.
    pub fn receipt(&self) -> &Receipt {
        match self {
            SubmissionOutcome::Included(receipt) | SubmissionOutcome::Finalized(receipt) => {
                receipt
            }
        }
    }

    /// Whether the submission reached finality.
    pub fn is_finalized(&self) -> bool {
        matches!(self, SubmissionOutcome::Finalized(_))
    }
}

/// Progress of one submission while its status stream is open.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Phase {
    /// Submitted, not yet in a block.
    Pending,
    /// In a best block, waiting for finality.
    InBlock(Inclusion),
}

/// Result of feeding one status into [`advance`].
#[derive(Clone, Debug, PartialEq, Eq)]
enum Step {
    /// Keep watching in the given phase.
    Continue(Phase),
    /// Terminal success.
    Done(SubmissionOutcome),
}

/// Signs and submits calls for one account, one at a time.
///
/// `submit` takes `&mut self`, so a submitter can never have two submissions for its
/// signer in flight; the nonce read at the start of a submission is therefore never
/// stale relative to another submission from the same identity.
pub struct Submitter<C> {
    /// Node access.
    chain: C,
    /// The cryptographic keypair used to sign transactions.
    signer: Keypair,
    /// Account id of `signer`.
    account: AccountId32,
    /// Upper bound for a single submission to reach a terminal status.
    timeout: Option<Duration>,
}

impl<C: ChainInterface> Submitter<C> {
    /// Creates a submitter that signs with `signer`. No timeout by default.
    pub fn new(chain: C, signer: Keypair) -> Self {
        let account = signer.public_key().to_account_id();
        Self {
            chain,
            signer,
            account,
            timeout: None,
        }
    }

    /// Bounds how long a single submission may wait for its terminal status.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Account id of the signer.
    pub fn account(&self) -> &AccountId32 {
        &self.account
    }

    /// The chain this submitter talks to.
    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Submits `call` and waits until it reaches `durability`.
    ///
    /// The nonce is fetched from chain state at call time, not reserved, which is sound
    /// only because submissions for this signer are strictly sequential. The status
    /// subscription is dropped as soon as a terminal status is seen. Nothing is retried.
    pub async fn submit(
        &mut self,
        call: &Call,
        durability: Durability,
    ) -> Result<SubmissionOutcome> {
        let nonce = self.chain.account_nonce(&self.account).await?;
        let label = call.to_string();
        info!("--- Submitting {} (nonce: {}) ---", label, nonce);

        let mut statuses = self.chain.sign_and_watch(call, &self.signer, nonce).await?;

        let outcome = match self.timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, watch(&mut statuses, &label, durability, nonce))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(Error::Timeout {
                        call: label.clone(),
                        after: limit,
                    }),
                }
            }
            None => watch(&mut statuses, &label, durability, nonce).await,
        };

        // Unsubscribe
        drop(statuses);

        if let Err(err) = &outcome {
            error!("❌ {}", err);
        }
        outcome
    }
}

/// Follows `statuses` until a terminal status.
async fn watch(
    statuses: &mut StatusStream,
    call: &str,
    durability: Durability,
    nonce: u64,
) -> Result<SubmissionOutcome> {
    let mut phase = Phase::Pending;

    while let Some(status) = statuses.next().await {
        match advance(phase, status?, durability, call, nonce)? {
            Step::Continue(next) => phase = next,
            Step::Done(outcome) => return Ok(outcome),
        }
    }

    StatusStreamClosedSnafu { call }.fail()
}

/// The submission state machine: total over every status in every phase.
fn advance(
    phase: Phase,
    status: TxLifecycle,
    durability: Durability,
    call: &str,
    nonce: u64,
) -> Result<Step> {
    match status {
        TxLifecycle::Ready => {
            info!("Current status is Ready");
            Ok(Step::Continue(phase))
        }
        TxLifecycle::Broadcast => {
            info!("Current status is Broadcast");
            Ok(Step::Continue(phase))
        }
        TxLifecycle::Retracted => {
            warn!("⚠️ {} is no longer in the best block, waiting for re-inclusion", call);
            Ok(Step::Continue(Phase::Pending))
        }
        TxLifecycle::InBlock(inclusion) => {
            check_dispatch(&inclusion, call)?;
            info!(
                "📦 Transaction included at blockHash {:?}",
                inclusion.block_hash
            );
            match durability {
                Durability::InBlock => Ok(Step::Done(SubmissionOutcome::Included(receipt(
                    &inclusion, nonce,
                )))),
                Durability::Finalized => {
                    info!("Waiting for finalization...");
                    Ok(Step::Continue(Phase::InBlock(inclusion)))
                }
            }
        }
        TxLifecycle::Finalized(inclusion) => {
            check_dispatch(&inclusion, call)?;
            if let Phase::InBlock(included) = &phase {
                if included.block_hash != inclusion.block_hash {
                    warn!(
                        "⚠️ {} finalized in {:?}, first seen in {:?}",
                        call, inclusion.block_hash, included.block_hash
                    );
                }
            }
            info!(
                "✅ Transaction finalized at blockHash {:?}",
                inclusion.block_hash
            );
            Ok(Step::Done(SubmissionOutcome::Finalized(receipt(
                &inclusion, nonce,
            ))))
        }
        TxLifecycle::Dropped(message) => Err(Error::Transaction {
            call: call.to_string(),
            reason: format!("dropped: {message}"),
        }),
        TxLifecycle::Invalid(message) => Err(Error::Transaction {
            call: call.to_string(),
            reason: format!("invalid: {message}"),
        }),
        TxLifecycle::Error(message) => Err(Error::Transaction {
            call: call.to_string(),
            reason: message,
        }),
    }
}

fn check_dispatch(inclusion: &Inclusion, call: &str) -> Result<()> {
    match &inclusion.dispatch_error {
        Some(reason) => Err(Error::Transaction {
            call: call.to_string(),
            reason: reason.clone(),
        }),
        None => Ok(()),
    }
}

fn receipt(inclusion: &Inclusion, nonce: u64) -> Receipt {
    Receipt {
        block_hash: inclusion.block_hash,
        extrinsic_hash: inclusion.extrinsic_hash,
        nonce,
    }
}
