//! # Bridge Test Environment Setup
//!
//! This library bootstraps a freshly started chain running the Sygma bridge pallets into a
//! usable test environment, submitting every configuration step through the sudo account.

/// Builders for the dynamic extrinsics and storage queries the setup issues.
pub mod calls;

/// Chain interface.
///
/// The [`chain::ChainInterface`] seam between the setup logic and a live node, and its
/// `subxt` implementation.
pub mod chain;

/// Setup plan module.
///
/// Domains, fee assets, fee amounts and the fee reserve, with defaults for the standard
/// test environment and JSON loading.
pub mod config;

/// Error handling module.
///
/// Defines a custom error type using the `snafu` crate for every failure the setup can hit,
/// from connecting to the node to a paused bridge.
pub mod error;

/// Ordered setup of the bridge and its final readiness check.
pub mod setup;

/// Cryptographic signer module.
///
/// Loads the sudo key from a secret URI or a hex key file.
pub mod signer;

/// Transaction submission module.
///
/// Signs one call at a time with a fresh nonce and follows it to inclusion or finality.
pub mod submitter;

#[cfg(test)]
mod testing;
