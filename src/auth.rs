//! Admin authentication.
//!
//! The password check sits behind [`CredentialCheck`] so the credential
//! source can be swapped. Bearer tokens are stateless: `<expiry>.<nonce>.<mac>`
//! where `mac` is HMAC-SHA256 over `<expiry>.<nonce>` with the server secret.
//! Verifying one needs no shared state between requests.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::config::Config;

type HmacSha256 = Hmac<Sha256>;

/// Decides whether a submitted password is the admin password.
pub trait CredentialCheck: Send + Sync + 'static {
    fn check(&self, password: &str) -> bool;
}

/// A single shared admin password. Only a MAC of it under a per-process key
/// is kept, so the comparison runs in constant time.
pub struct SharedPassword {
    mac: HmacSha256,
    tag: Vec<u8>,
}

impl SharedPassword {
    pub fn new(password: &str) -> Self {
        let mut key = [0u8; 32];
        rand::rng().fill_bytes(&mut key);
        let mac = keyed(&key);
        let tag = mac.clone().chain_update(password.as_bytes()).finalize().into_bytes().to_vec();
        Self { mac, tag }
    }
}

impl CredentialCheck for SharedPassword {
    fn check(&self, password: &str) -> bool {
        self.mac.clone().chain_update(password.as_bytes()).verify_slice(&self.tag).is_ok()
    }
}

/// Issues and verifies signed bearer tokens.
pub struct TokenSigner {
    mac: HmacSha256,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self { mac: keyed(secret.as_ref()), ttl }
    }

    pub fn issue(&self) -> String {
        self.issue_at(unix_now())
    }

    fn issue_at(&self, now: u64) -> String {
        let mut nonce = [0u8; 16];
        rand::rng().fill_bytes(&mut nonce);

        let payload = format!("{:x}.{}", now.saturating_add(self.ttl.as_secs()), hex::encode(nonce));
        let tag = self.mac.clone().chain_update(payload.as_bytes()).finalize().into_bytes();
        format!("{payload}.{}", hex::encode(tag))
    }

    pub fn verify(&self, token: &str) -> bool {
        self.verify_at(token, unix_now())
    }

    fn verify_at(&self, token: &str, now: u64) -> bool {
        let Some((payload, tag)) = token.rsplit_once('.') else {
            return false;
        };
        let Some((expiry, _nonce)) = payload.split_once('.') else {
            return false;
        };
        let (Ok(expiry), Ok(tag)) = (u64::from_str_radix(expiry, 16), hex::decode(tag)) else {
            return false;
        };

        self.mac.clone().chain_update(payload.as_bytes()).verify_slice(&tag).is_ok() && now < expiry
    }
}

/// Login and token verification as one collaborator.
pub struct Authenticator {
    credentials: Box<dyn CredentialCheck>,
    tokens: TokenSigner,
}

impl Authenticator {
    pub fn new(credentials: impl CredentialCheck, tokens: TokenSigner) -> Self {
        Self { credentials: Box::new(credentials), tokens }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            SharedPassword::new(&config.admin_password),
            TokenSigner::new(&config.token_secret, config.token_ttl),
        )
    }

    /// A fresh token when `password` is accepted.
    pub fn login(&self, password: &str) -> Option<String> {
        self.credentials.check(password).then(|| self.tokens.issue())
    }

    pub fn verify(&self, token: &str) -> bool {
        self.tokens.verify(token)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// HMAC-SHA256 accepts keys of any length.
fn keyed(key: &[u8]) -> HmacSha256 {
    match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC takes keys of any length"),
    }
}
