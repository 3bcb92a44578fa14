//! In-memory [`ChainInterface`] for unit tests.
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use subxt::dynamic::Value;
use subxt::utils::{AccountId32, H256};
use subxt_signer::sr25519::Keypair;

use crate::calls::{self, Call, StorageQuery};
use crate::chain::{ChainInterface, Inclusion, StatusStream, TxLifecycle};
use crate::error::Result;

/// Deterministic block hash for tests.
pub(crate) fn block(n: u64) -> H256 {
    H256::repeat_byte(n as u8)
}

/// A successful inclusion in [`block`]`(n)`.
pub(crate) fn included(n: u64) -> Inclusion {
    Inclusion {
        block_hash: block(n),
        extrinsic_hash: H256::from_low_u64_be(n + 1000),
        dispatch_error: None,
    }
}

/// Statuses one submission will emit.
#[derive(Clone, Debug)]
pub(crate) struct Script {
    statuses: Vec<TxLifecycle>,
    hang: bool,
}

impl Script {
    pub(crate) fn statuses(statuses: Vec<TxLifecycle>) -> Self {
        Self {
            statuses,
            hang: false,
        }
    }

    /// Never end the stream after the scripted statuses.
    pub(crate) fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Ready, broadcast, in block and finalized in the same block.
    fn happy_path(n: u64) -> Self {
        Self::statuses(vec![
            TxLifecycle::Ready,
            TxLifecycle::Broadcast,
            TxLifecycle::InBlock(included(n)),
            TxLifecycle::Finalized(included(n)),
        ])
    }
}

/// A call as seen by the mock node.
#[derive(Clone, Debug)]
pub(crate) struct Submitted {
    pub(crate) call: Call,
    pub(crate) nonce: u64,
}

#[derive(Default)]
struct State {
    /// Next nonce at the best block.
    best_nonce: u64,
    /// Next nonce at the finalized block.
    finalized_nonce: u64,
    scripts: VecDeque<Script>,
    submitted: Vec<Submitted>,
    effects: Vec<String>,
    storage: Vec<(StorageQuery, Value)>,
}

impl State {
    fn write(&mut self, query: StorageQuery, value: Value) {
        self.storage.retain(|(existing, _)| existing != &query);
        self.storage.push((query, value));
    }

    /// Applies the storage writes of a successfully dispatched call. Only the bridge
    /// pause switches touch storage here.
    fn apply(&mut self, call: &Call) {
        let call = call.dispatched();
        let paused = match (call.pallet(), call.name()) {
            ("SygmaBridge", "pause_bridge") => true,
            ("SygmaBridge", "unpause_bridge") => false,
            _ => return,
        };
        if let Some(domain_id) = call.args().first().and_then(Value::as_u128) {
            self.write(calls::bridge_pause_status(domain_id as u8), Value::bool(paused));
        }
    }
}

/// Mock node. Each submission consumes the next pushed [`Script`], or the happy path.
///
/// State changes happen as the statuses are pulled from the stream: the first inclusion
/// advances the best-block nonce and applies the call, a finalized status advances the
/// finalized nonce. [`ChainInterface::account_nonce`] reports the best-block nonce.
pub(crate) struct MockChain {
    state: Arc<Mutex<State>>,
    polled: Arc<AtomicUsize>,
}

impl MockChain {
    pub(crate) fn new(nonce: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                best_nonce: nonce,
                finalized_nonce: nonce,
                ..Default::default()
            })),
            polled: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn push_script(&self, script: Script) {
        self.state.lock().unwrap().scripts.push_back(script);
    }

    pub(crate) fn set_storage(&self, query: StorageQuery, value: Value) {
        self.state.lock().unwrap().write(query, value);
    }

    /// Number of statuses pulled from all streams so far.
    pub(crate) fn polled(&self) -> Arc<AtomicUsize> {
        self.polled.clone()
    }

    pub(crate) fn submitted(&self) -> Vec<Submitted> {
        self.state.lock().unwrap().submitted.clone()
    }

    /// Dispatched calls that were included and succeeded, in order.
    pub(crate) fn effects(&self) -> Vec<String> {
        self.state.lock().unwrap().effects.clone()
    }

    /// Next nonce according to the finalized block.
    pub(crate) fn finalized_nonce(&self) -> u64 {
        self.state.lock().unwrap().finalized_nonce
    }
}

#[async_trait]
impl ChainInterface for MockChain {
    async fn account_nonce(&self, _account: &AccountId32) -> Result<u64> {
        Ok(self.state.lock().unwrap().best_nonce)
    }

    async fn sign_and_watch(
        &self,
        call: &Call,
        _signer: &Keypair,
        nonce: u64,
    ) -> Result<StatusStream> {
        let script = {
            let mut state = self.state.lock().unwrap();
            state.submitted.push(Submitted {
                call: call.clone(),
                nonce,
            });
            state
                .scripts
                .pop_front()
                .unwrap_or_else(|| Script::happy_path(nonce))
        };

        let polled = self.polled.clone();
        let shared = self.state.clone();
        let call = call.clone();
        let mut included = false;
        let mut finalized = false;

        let statuses = stream::iter(script.statuses.into_iter().map(Ok)).inspect(
            move |status: &Result<TxLifecycle>| {
                polled.fetch_add(1, Ordering::SeqCst);
                let (inclusion, is_final) = match status {
                    Ok(TxLifecycle::InBlock(inclusion)) => (inclusion, false),
                    Ok(TxLifecycle::Finalized(inclusion)) => (inclusion, true),
                    _ => return,
                };

                let mut state = shared.lock().unwrap();
                if !included {
                    included = true;
                    state.best_nonce += 1;
                    if inclusion.dispatch_error.is_none() {
                        state.effects.push(call.dispatched().to_string());
                        state.apply(&call);
                    }
                }
                if is_final && !finalized {
                    finalized = true;
                    state.finalized_nonce += 1;
                }
            },
        );

        if script.hang {
            Ok(statuses.chain(stream::pending()).boxed())
        } else {
            Ok(statuses.boxed())
        }
    }

    async fn query(&self, query: &StorageQuery) -> Result<Option<Value>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .storage
            .iter()
            .find(|(existing, _)| existing == query)
            .map(|(_, value)| value.clone()))
    }
}
