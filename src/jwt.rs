use jwt_simple::algorithms::RS256KeyPair;
use jwt_simple::prelude::*;

use crate::errors::SnowflakeResult;

/// Produce the signed bearer token the statement API authenticates with.
///
/// The issuer is `<ACCOUNT>.<USER>.SHA256:<public key fingerprint>` and the
/// subject `<ACCOUNT>.<USER>`; the claims carry issued-at plus the given
/// expiry window in minutes.
pub fn create_token(
    key_pair: &RS256KeyPair,
    mut account_identifier: &str,
    user: &str,
    expires_mins: u64,
) -> SnowflakeResult<String> {
    let mut public_key_fingerprint = key_pair.public_key().sha256_thumbprint();
    // Undo the URL-safe base64 encoding
    public_key_fingerprint = public_key_fingerprint.replace('-', "+").replace('_', "/");
    let padding = public_key_fingerprint.len() % 3;
    for _ in 0..padding {
        public_key_fingerprint.push('=');
    }
    // If there is an account region included, remove it:
    // AAA00000.us-east-1 should become AAA00000
    if let Some(dot) = account_identifier.find('.') {
        account_identifier = &account_identifier[..dot];
    }
    let qualified_username = format!("{account_identifier}.{user}");
    let issuer = format!("{qualified_username}.SHA256:{public_key_fingerprint}");
    let claims = Claims::create(Duration::from_mins(expires_mins))
        .with_issuer(issuer)
        .with_subject(qualified_username);
    log::debug!("token claims: {:?}", claims);
    Ok(key_pair.sign(claims)?)
}
