use std::str::FromStr;

use hex::FromHex;
use log::info;
use snafu::ResultExt;
use subxt_signer::sr25519::Keypair;
use subxt_signer::SecretUri;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::*;

/// Well-known development sudo account of test chains.
pub const DEFAULT_SUDO_URI: &str = "//Alice";

/// Build an sr25519 keypair from a secret URI such as `//Alice` or a phrase with junctions
pub fn keypair_from_uri(uri: &str) -> Result<Keypair> {
    let uri = SecretUri::from_str(uri).context(SecretUriSnafu)?;
    Keypair::from_uri(&uri).context(KeypairSnafu)
}

/// load a hex encoded sr25519 secret key from a file
pub async fn load_key_file(file_path: &str) -> Result<Keypair> {
    let mut file = File::open(file_path).await.context(KeyFileReadSnafu {
        path: file_path.to_string(),
    })?;

    let mut hex_string = String::new();
    file.read_to_string(&mut hex_string)
        .await
        .context(KeyFileReadSnafu {
            path: file_path.to_string(),
        })?;

    let key_bytes =
        Vec::from_hex(hex_string.trim().trim_start_matches("0x")).context(KeyParseSnafu)?;

    let key_bytes: [u8; 32] = key_bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| Error::InvalidKeyLength {
            length: bytes.len(),
        })?;

    Keypair::from_secret_key(key_bytes).context(KeypairSnafu)
}

/// The sudo signer: a key file when given, the secret URI otherwise.
pub async fn load_signer(uri: &str, key_file: Option<&str>) -> Result<Keypair> {
    let signer = match key_file {
        Some(path) => load_key_file(path).await?,
        None => keypair_from_uri(uri)?,
    };
    info!("Signing as {}", signer.public_key().to_account_id());
    Ok(signer)
}
