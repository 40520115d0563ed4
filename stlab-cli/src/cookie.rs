//! Session cookies: take them apart, mint them, check them.
use serde_json::Value;
use stlab::crypto::{
    decode_unverified, KeyDerivation, SessionSerializer, Signer, TimestampSigner,
};
use time::Duration;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// How cookies are signed. The defaults are Flask's.
#[derive(Debug, Clone)]
pub struct Signing {
    pub secret: String,
    pub salt: String,
    pub key_derivation: KeyDerivation,
    pub legacy_timestamp: bool,
}

impl Signing {
    pub fn new(secret: impl ToString) -> Self {
        Self {
            secret: secret.to_string(),
            salt: stlab::crypto::SESSION_SALT.to_string(),
            key_derivation: KeyDerivation::Hmac,
            legacy_timestamp: false,
        }
    }

    pub fn serializer(&self) -> SessionSerializer {
        let signer = TimestampSigner::new(
            Signer::new(&self.secret)
                .salt(&self.salt)
                .key_derivation(self.key_derivation),
        );

        let signer = if self.legacy_timestamp {
            signer.legacy()
        } else {
            signer
        };

        SessionSerializer::with_signer(signer)
    }
}

/// Everything a cookie says about itself, no secret needed.
pub fn decode(cookie: &str) -> Result<String, Error> {
    let decoded = decode_unverified(cookie)?;

    Ok(format!(
        "payload:    {}\ncompressed: {}\nsigned at:  {}\nsignature:  {}",
        serde_json::to_string_pretty(&decoded.payload)?,
        decoded.compressed,
        decoded.timestamp,
        decoded.signature_hex(),
    ))
}

/// Mint a cookie carrying the payload.
pub fn sign(signing: &Signing, payload: &str) -> Result<String, Error> {
    let payload: Value = serde_json::from_str(payload)?;
    Ok(signing.serializer().dumps(&payload)?)
}

/// Check the cookie's signature and age, returning its payload.
pub fn verify(signing: &Signing, cookie: &str, max_age: Option<i64>) -> Result<Value, Error> {
    let max_age = max_age.map(Duration::seconds);
    Ok(signing.serializer().loads(cookie.trim(), max_age)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sign_then_verify() -> Result<(), Error> {
        let signing = Signing::new("UNSAFE_SECRET");
        let cookie = sign(&signing, r#"{"user": "admin"}"#)?;

        assert_eq!(verify(&signing, &cookie, None)?, json!({"user": "admin"}));
        assert!(verify(&Signing::new("other"), &cookie, None).is_err());
        assert!(decode(&cookie)?.contains("\"user\": \"admin\""));

        Ok(())
    }

    #[test]
    fn test_flask_cookie() -> Result<(), Error> {
        // The payload segment is the same one Flask writes.
        let signing = Signing::new("UNSAFE_SECRET");
        let cookie = signing
            .serializer()
            .dumps_at(&json!({"user": "admin"}), time::OffsetDateTime::UNIX_EPOCH)?;

        assert!(cookie.starts_with("eyJ1c2VyIjoiYWRtaW4ifQ."));
        assert!(verify(&signing, &cookie, None).is_ok());
        assert!(verify(&signing, &cookie, Some(60)).is_err());

        Ok(())
    }

    #[test]
    fn test_bad_payload() {
        assert!(sign(&Signing::new("s"), "not json").is_err());
        assert!(decode("garbage").is_err());
    }
}
