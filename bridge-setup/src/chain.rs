//! # Chain interface
//!
//! The [`ChainInterface`] trait is everything the submitter and the setup orchestration
//! need from a node: the signer's current nonce, signing and watching an extrinsic, and
//! reading storage. [`SubxtChain`] implements it over a `subxt` client using the dynamic,
//! metadata-driven API.
//!
//! Status updates are normalised into [`TxLifecycle`] so the submitter can match on
//! them exhaustively. Inclusion events also report whether the extrinsic dispatched
//! successfully, which includes the result of a sudo-wrapped inner call.
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use log::{debug, info};
use snafu::ResultExt;
use subxt::backend::legacy::LegacyRpcMethods;
use subxt::backend::rpc::RpcClient;
use subxt::config::polkadot::PolkadotExtrinsicParamsBuilder as Params;
use subxt::dynamic::Value;
use subxt::ext::scale_value::{At, ValueDef};
use subxt::tx::{TxInBlock, TxStatus};
use subxt::utils::{AccountId32, H256};
use subxt::{OnlineClient, PolkadotConfig};
use subxt_signer::sr25519::Keypair;
use url::Url;

use crate::calls::{self, Call, StorageQuery};
use crate::error::{
    ChainConnectionSnafu,
    Error,
    FetchEventsSnafu,
    FetchNonceSnafu,
    Result,
    SignAndSubmitSnafu,
    StorageQuerySnafu,
    WatchStatusSnafu,
};

/// The `API` type represents a connected Substrate client.
pub type API = OnlineClient<PolkadotConfig>;

/// Ordered status updates of one submitted extrinsic.
pub type StatusStream = BoxStream<'static, Result<TxLifecycle>>;

/// A status update of a submitted extrinsic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxLifecycle {
    /// Validated and queued by the node.
    Ready,
    /// Gossiped to peers.
    Broadcast,
    /// Included in a best block.
    InBlock(Inclusion),
    /// The best block containing it was retracted; it may be included again.
    Retracted,
    /// Included in a finalized block.
    Finalized(Inclusion),
    /// Dropped from the pool.
    Dropped(String),
    /// Rejected as invalid.
    Invalid(String),
    /// The node reported an error while tracking the extrinsic.
    Error(String),
}

/// Where an extrinsic landed and how its dispatch went.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inclusion {
    /// Hash of the block containing the extrinsic.
    pub block_hash: H256,
    /// Hash of the extrinsic itself.
    pub extrinsic_hash: H256,
    /// Set when the extrinsic, or the call it dispatched through sudo, failed.
    pub dispatch_error: Option<String>,
}

/// The node operations the setup depends on.
#[async_trait]
pub trait ChainInterface: Send + Sync {
    /// Current nonce of `account` according to the best block.
    async fn account_nonce(&self, account: &AccountId32) -> Result<u64>;

    /// Signs `call` with `nonce` (immortal era), submits it and returns its status updates.
    async fn sign_and_watch(&self, call: &Call, signer: &Keypair, nonce: u64)
        -> Result<StatusStream>;

    /// Reads a storage item at the best block. `None` when the entry is absent.
    async fn query(&self, query: &StorageQuery) -> Result<Option<Value>>;
}

/// [`ChainInterface`] backed by a live `subxt` connection.
///
/// Nonces and storage are read at the best block rather than the finalized one, so a
/// step that was only awaited to block inclusion is visible to the next step.
#[derive(Clone)]
pub struct SubxtChain {
    /// Client used to build, sign and watch extrinsics and to read storage.
    api: API,
    /// Raw RPC methods, used to find the best block.
    rpc: LegacyRpcMethods<PolkadotConfig>,
}

impl SubxtChain {
    /// Connects to the node at `url`, giving up after `timeout`.
    pub async fn connect(url: &Url, timeout: Duration) -> Result<Self> {
        info!("Connecting to Substrate node at: {}", url);

        let connect = async {
            let rpc_client = RpcClient::from_insecure_url(url.as_str()).await?;
            let api = API::from_rpc_client(rpc_client.clone()).await?;
            Ok::<_, subxt::Error>(Self {
                api,
                rpc: LegacyRpcMethods::new(rpc_client),
            })
        };

        let chain = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| Error::ConnectionTimeout {
                url: url.to_string(),
                after: timeout,
            })?
            .context(ChainConnectionSnafu {
                url: url.to_string(),
            })?;

        info!("Substrate client connected");
        Ok(chain)
    }

    /// Hash of the current best block.
    async fn best_block(&self) -> std::result::Result<H256, subxt::Error> {
        self.rpc
            .chain_get_block_hash(None)
            .await?
            .ok_or_else(|| subxt::Error::Other("node reported no best block".to_string()))
    }
}

#[async_trait]
impl ChainInterface for SubxtChain {
    async fn account_nonce(&self, account: &AccountId32) -> Result<u64> {
        let query = calls::system_account(account);
        let address = subxt::dynamic::storage(query.pallet, query.entry, query.keys);

        let best = self.best_block().await.context(FetchNonceSnafu)?;
        let account_info = self
            .api
            .storage()
            .at(best)
            .fetch(&address)
            .await
            .context(FetchNonceSnafu)?;

        // Accounts that never transacted have no entry yet
        let Some(account_info) = account_info else {
            return Ok(0);
        };

        let account_info = account_info
            .to_value()
            .map_err(subxt::Error::from)
            .context(FetchNonceSnafu)?;
        account_info
            .at("nonce")
            .and_then(|nonce| nonce.as_u128())
            .and_then(|nonce| u64::try_from(nonce).ok())
            .ok_or_else(|| Error::DecodeValue {
                what: "System.Account nonce".to_string(),
            })
    }

    async fn sign_and_watch(
        &self,
        call: &Call,
        signer: &Keypair,
        nonce: u64,
    ) -> Result<StatusStream> {
        let label = call.to_string();
        let tx_params = Params::new().nonce(nonce).build();

        let progress = self
            .api
            .tx()
            .sign_and_submit_then_watch(&call.payload(), signer, tx_params)
            .await
            .context(SignAndSubmitSnafu {
                call: label.clone(),
            })?;
        debug!("Submitted {} as {:?}", label, progress.extrinsic_hash());

        let statuses = progress.then(move |status| {
            let label = label.clone();
            async move { lifecycle(status, &label).await }
        });
        Ok(statuses.boxed())
    }

    async fn query(&self, query: &StorageQuery) -> Result<Option<Value>> {
        let address = subxt::dynamic::storage(query.pallet, query.entry, query.keys.clone());
        let context = StorageQuerySnafu {
            pallet: query.pallet,
            entry: query.entry,
        };

        let best = self.best_block().await.context(context)?;
        let value = self
            .api
            .storage()
            .at(best)
            .fetch(&address)
            .await
            .context(context)?;

        value
            .map(|thunk| thunk.to_value().map(|value| value.remove_context()))
            .transpose()
            .map_err(subxt::Error::from)
            .context(context)
    }
}

/// Normalises one `subxt` status update.
async fn lifecycle(
    status: std::result::Result<TxStatus<PolkadotConfig, API>, subxt::Error>,
    call: &str,
) -> Result<TxLifecycle> {
    let status = status.context(WatchStatusSnafu { call })?;

    Ok(match status {
        TxStatus::Validated => TxLifecycle::Ready,
        TxStatus::Broadcasted { num_peers } => {
            debug!("{} broadcasted to {} peers", call, num_peers);
            TxLifecycle::Broadcast
        }
        TxStatus::NoLongerInBestBlock => TxLifecycle::Retracted,
        TxStatus::InBestBlock(details) => TxLifecycle::InBlock(inclusion(&details).await?),
        TxStatus::InFinalizedBlock(details) => TxLifecycle::Finalized(inclusion(&details).await?),
        TxStatus::Dropped { message } => TxLifecycle::Dropped(message),
        TxStatus::Invalid { message } => TxLifecycle::Invalid(message),
        TxStatus::Error { message } => TxLifecycle::Error(message),
    })
}

/// Inspects the events of the including block for the extrinsic's dispatch result.
async fn inclusion(details: &TxInBlock<PolkadotConfig, API>) -> Result<Inclusion> {
    let mut dispatch_error = None;

    match details.wait_for_success().await {
        Ok(events) => {
            for event in events.iter() {
                let event = event.context(FetchEventsSnafu)?;
                if event.pallet_name() == "Sudo" && event.variant_name() == "Sudid" {
                    let fields = event
                        .field_values()
                        .map_err(subxt::Error::from)
                        .context(FetchEventsSnafu)?;
                    dispatch_error = fields.values().find_map(|result| match &result.value {
                        ValueDef::Variant(variant) if variant.name == "Err" => {
                            Some(format!("sudo call failed: {}", result))
                        }
                        _ => None,
                    });
                }
            }
        }
        Err(subxt::Error::Runtime(err)) => dispatch_error = Some(err.to_string()),
        Err(err) => return Err(Error::FetchEvents { source: err }),
    }

    Ok(Inclusion {
        block_hash: details.block_hash(),
        extrinsic_hash: details.extrinsic_hash(),
        dispatch_error,
    })
}
