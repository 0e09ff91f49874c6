//! Access key / secret key pairs and where they come from.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

pub const ACCESS_KEY_VAR: &str = "HOTCOIN_ACCESS_KEY";
pub const SECRET_KEY_VAR: &str = "HOTCOIN_SECRET_KEY";

/// A HOTCOIN key pair.
///
/// `access_key` travels as `AccessKeyId`; the secret only keys the HMAC and
/// is redacted from `Debug`.
#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    secret_key: SecretString,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: SecretString::from(secret_key.into()),
        }
    }

    /// Raw secret, for the signer.
    pub fn expose_secret(&self) -> &str {
        self.secret_key.expose_secret()
    }

    /// Signing needs both halves; an empty one counts as missing.
    pub fn is_complete(&self) -> bool {
        !self.access_key.is_empty() && !self.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Source of the key pair used by the REST client and the stream session.
pub trait CredentialsProvider: Send + Sync {
    fn get_credentials(&self) -> &Credentials;
}

impl<P: CredentialsProvider + ?Sized> CredentialsProvider for Arc<P> {
    fn get_credentials(&self) -> &Credentials {
        (**self).get_credentials()
    }
}

/// A key pair fixed at construction.
#[derive(Clone)]
pub struct StaticCredentials {
    credentials: Credentials,
}

impl StaticCredentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(access_key, secret_key),
        }
    }
}

impl CredentialsProvider for StaticCredentials {
    fn get_credentials(&self) -> &Credentials {
        &self.credentials
    }
}

/// A key pair read once from the process environment.
///
/// Defaults to [`ACCESS_KEY_VAR`] and [`SECRET_KEY_VAR`]. Unset and empty
/// variables are treated alike.
pub struct EnvCredentials {
    credentials: Credentials,
}

impl EnvCredentials {
    /// # Panics
    ///
    /// If either default variable is unset or empty. See [`Self::try_from_env`].
    pub fn from_env() -> Self {
        Self::from_env_vars(ACCESS_KEY_VAR, SECRET_KEY_VAR)
    }

    /// # Panics
    ///
    /// If either variable is unset or empty. See [`Self::try_from_env_vars`].
    pub fn from_env_vars(key_var: &str, secret_var: &str) -> Self {
        Self::try_from_env_vars(key_var, secret_var)
            .unwrap_or_else(|| panic!("{key_var} and {secret_var} must both be set"))
    }

    pub fn try_from_env() -> Option<Self> {
        Self::try_from_env_vars(ACCESS_KEY_VAR, SECRET_KEY_VAR)
    }

    pub fn try_from_env_vars(key_var: &str, secret_var: &str) -> Option<Self> {
        let credentials = Credentials::new(read_var(key_var)?, read_var(secret_var)?);
        Some(Self { credentials })
    }
}

impl CredentialsProvider for EnvCredentials {
    fn get_credentials(&self) -> &Credentials {
        &self.credentials
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
