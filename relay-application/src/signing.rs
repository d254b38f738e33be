use anyhow::anyhow;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use relay_domain::ChannelName;

use crate::AppError;

const SEPARATOR: char = ':';

type HmacSha256 = Hmac<Sha256>;

/// Signs channel names for the page layer and verifies them at subscribe
/// time.
///
/// Token layout is `<channel>:<hex hmac-sha256>`, where the MAC covers
/// `<salt>:<channel>`. The salt namespaces these tokens so that a signature
/// issued for another purpose under the same secret never verifies here.
pub struct ChannelSigner {
    secret: Vec<u8>,
    salt: String,
}

impl ChannelSigner {
    pub fn new(secret: &str, salt: &str) -> Result<Self, AppError> {
        if secret.trim().is_empty() {
            return Err(AppError::Internal(anyhow!(
                "signing secret must not be empty"
            )));
        }
        Ok(Self {
            secret: secret.as_bytes().to_vec(),
            salt: salt.to_string(),
        })
    }

    pub fn sign(&self, channel: &ChannelName) -> Result<String, AppError> {
        let mac = self.mac_for(channel.as_str())?;
        let digest = hex::encode(mac.finalize().into_bytes());

        let mut out = String::with_capacity(channel.as_str().len() + 1 + digest.len());
        out.push_str(channel.as_str());
        out.push(SEPARATOR);
        out.push_str(&digest);
        Ok(out)
    }

    /// Returns the channel a token was issued for. Every malformed or
    /// tampered input maps to `InvalidSignature`.
    pub fn verify(&self, token: &str) -> Result<ChannelName, AppError> {
        let (value, signature) = token
            .rsplit_once(SEPARATOR)
            .ok_or(AppError::InvalidSignature)?;
        let expected = hex::decode(signature).map_err(|_| AppError::InvalidSignature)?;
        let mac = self
            .mac_for(value)
            .map_err(|_| AppError::InvalidSignature)?;
        mac.verify_slice(&expected)
            .map_err(|_| AppError::InvalidSignature)?;
        ChannelName::parse(value).map_err(|_| AppError::InvalidSignature)
    }

    fn mac_for(&self, value: &str) -> Result<HmacSha256, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|err| AppError::Internal(anyhow!("hmac init failed: {err}")))?;
        mac.update(self.salt.as_bytes());
        mac.update(&[SEPARATOR as u8]);
        mac.update(value.as_bytes());
        Ok(mac)
    }
}
