use crate::core::errors::UpbitError;
use crate::core::types::QueryParams;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

pub const QUERY_HASH_ALG: &str = "SHA512";

/// Signer trait for request authentication
///
/// Produces the value of the `Authorization` header. Implementations are shared
/// between the REST layer and the private stream, hence `Send + Sync`.
pub trait Signer: Send + Sync {
    /// Build the authorization value for one request.
    ///
    /// # Arguments
    /// * `params` - Request parameters to bind into the token, if any
    fn authorization(&self, params: Option<&QueryParams>) -> Result<String, UpbitError>;
}

/// JWT claims accepted by Upbit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub access_key: String,
    pub nonce: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_hash_alg: Option<String>,
}

/// Hex SHA-512 of a canonical query string.
pub fn query_hash(canonical: &str) -> String {
    hex::encode(Sha512::digest(canonical.as_bytes()))
}

/// HS256 JWT signer for Upbit access/secret key pairs
pub struct JwtSigner {
    access_key: Secret<String>,
    secret_key: Secret<String>,
}

impl std::fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSigner").finish_non_exhaustive()
    }
}

impl JwtSigner {
    /// Create a new JWT signer
    ///
    /// Both keys must be non-empty.
    pub fn new(access_key: Secret<String>, secret_key: Secret<String>) -> Result<Self, UpbitError> {
        if access_key.expose_secret().is_empty() {
            return Err(UpbitError::Auth("access key is empty".to_string()));
        }
        if secret_key.expose_secret().is_empty() {
            return Err(UpbitError::Auth("secret key is empty".to_string()));
        }
        Ok(Self {
            access_key,
            secret_key,
        })
    }

    pub fn from_keys(access_key: &str, secret_key: &str) -> Result<Self, UpbitError> {
        Self::new(
            Secret::new(access_key.to_string()),
            Secret::new(secret_key.to_string()),
        )
    }

    /// Claims for a single request with a fresh nonce.
    pub fn claims(&self, params: Option<&QueryParams>) -> Claims {
        let hash = params
            .filter(|p| !p.is_empty())
            .map(|p| query_hash(&p.encode()));

        Claims {
            access_key: self.access_key.expose_secret().clone(),
            nonce: uuid::Uuid::new_v4().to_string(),
            query_hash_alg: hash.as_ref().map(|_| QUERY_HASH_ALG.to_string()),
            query_hash: hash,
        }
    }

    pub fn sign_claims(&self, claims: &Claims) -> Result<String, UpbitError> {
        let key = EncodingKey::from_secret(self.secret_key.expose_secret().as_bytes());
        encode(&Header::new(Algorithm::HS256), claims, &key)
            .map_err(|e| UpbitError::Auth(format!("Failed to sign JWT: {}", e)))
    }
}

impl Signer for JwtSigner {
    fn authorization(&self, params: Option<&QueryParams>) -> Result<String, UpbitError> {
        let token = self.sign_claims(&self.claims(params))?;
        Ok(format!("Bearer {}", token))
    }
}
