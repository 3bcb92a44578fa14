use std::time::Duration;

use snafu::Snafu;

/// Represents errors that can occur while connecting to the chain, loading the setup
/// plan and signer, and submitting the privileged setup transactions.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Error when attempting to connect to the Substrate node.
    #[snafu(display("Error connecting to chain at {url}: {source}"))]
    ChainConnection {
        /// The endpoint we tried to reach.
        url: String,
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },

    /// The node did not accept the connection in time.
    #[snafu(display("Timed out connecting to chain at {url} after {after:?}"))]
    ConnectionTimeout {
        /// The endpoint we tried to reach.
        url: String,
        /// How long we waited.
        after: Duration,
    },

    /// Error when fetching the current nonce for the signing account.
    #[snafu(display("Error fetching account nonce: {source}"))]
    FetchNonce {
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },

    /// Error when signing or handing the extrinsic to the node.
    #[snafu(display("Error submitting {call}: {source}"))]
    SignAndSubmit {
        /// Label of the call that was being submitted.
        call: String,
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },

    /// The status subscription of a submitted extrinsic produced an error.
    #[snafu(display("Error watching status of {call}: {source}"))]
    WatchStatus {
        /// Label of the call being watched.
        call: String,
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },

    /// Error when fetching the events of the block an extrinsic landed in.
    #[snafu(display("Error fetching blockchain events: {source}"))]
    FetchEvents {
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },

    /// Error when reading a storage item.
    #[snafu(display("Error querying {pallet}.{entry}: {source}"))]
    StorageQuery {
        /// Pallet holding the storage item.
        pallet: String,
        /// Storage item name.
        entry: String,
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },

    /// A value read from the chain did not have the expected shape.
    #[snafu(display("Unexpected on-chain value for {what}"))]
    DecodeValue {
        /// What we were trying to decode.
        what: String,
    },

    /// The chain reported the transaction as failed: invalid, dropped, or a
    /// failed dispatch.
    #[snafu(display("Transaction {call} failed: {reason}"))]
    Transaction {
        /// Label of the failed call.
        call: String,
        /// The reason reported by the chain.
        reason: String,
    },

    /// No terminal status was observed within the configured window.
    #[snafu(display("Transaction {call} saw no terminal status within {after:?}"))]
    Timeout {
        /// Label of the call.
        call: String,
        /// The configured window.
        after: Duration,
    },

    /// The status subscription ended before a terminal status was observed.
    #[snafu(display("Status stream for {call} closed before a terminal status"))]
    StatusStreamClosed {
        /// Label of the call.
        call: String,
    },

    /// The signer secret URI could not be parsed.
    #[snafu(display("Invalid secret URI: {source}"))]
    SecretUri {
        /// The underlying parse error.
        source: subxt_signer::SecretUriError,
    },

    /// Error when failing to create a keypair from a secret.
    #[snafu(display("Failed to create keypair: {source}"))]
    Keypair {
        /// The underlying signer error.
        source: subxt_signer::sr25519::Error,
    },

    /// Error when reading a key file from disk.
    #[snafu(display("Failed to read key from file '{}': {}", path, source))]
    KeyFileRead {
        /// The path of the key file that could not be read.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Error when parsing a key file as hex.
    #[snafu(display("Failed to parse key as hex: {}", source))]
    KeyParse {
        /// The underlying hex parsing error.
        source: hex::FromHexError,
    },

    /// Error when the parsed key length is invalid.
    #[snafu(display("Invalid key length: expected 32 bytes, got {}", length))]
    InvalidKeyLength {
        /// The actual length of the provided key.
        length: usize,
    },

    /// Error when reading the setup plan file.
    #[snafu(display("Failed to read setup plan '{}': {}", path, source))]
    ConfigRead {
        /// Path of the plan file.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Error when the setup plan is not valid JSON for the plan schema.
    #[snafu(display("Failed to parse setup plan: {source}"))]
    ConfigParse {
        /// The underlying serde error.
        source: serde_json::Error,
    },

    /// A hex field in the plan could not be decoded.
    #[snafu(display("Invalid hex in {field}: {source}"))]
    InvalidHex {
        /// Name of the offending field.
        field: String,
        /// The underlying hex error.
        source: hex::FromHexError,
    },

    /// An SS58 address in the plan could not be decoded.
    #[snafu(display("Invalid account '{address}': {reason}"))]
    InvalidAccount {
        /// The address as written.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The plan is structurally invalid.
    #[snafu(display("Invalid setup plan: {message}"))]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// A destination domain bridge is still paused after setup.
    #[snafu(display("Bridge for destination domain {domain_id} is paused"))]
    BridgePaused {
        /// The paused domain.
        domain_id: u8,
    },
}

/// Type alias for results that return a `Result<T, Error>`, simplifying error handling.
pub type Result<T, E = Error> = std::result::Result<T, E>;
