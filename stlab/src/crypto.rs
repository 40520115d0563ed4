//! Signed, timestamped session cookies.
//!
//! Cookies use the itsdangerous format Flask sessions use, `payload.timestamp.signature`,
//! so cookies minted here open in Flask and the other way around.
//!
//! Signing is not encryption. The payload is only base64-encoded JSON and anyone holding the
//! cookie can read it (see [`decode_unverified`]). The signature keeps the payload from being
//! changed, but only as long as the secret key stays secret.
//!
//! ### Example
//!
//! ```
//! use stlab::crypto::SessionSerializer;
//! use serde_json::json;
//!
//! let serializer = SessionSerializer::new("UNSAFE_SECRET");
//! let cookie = serializer.dumps(&json!({"user": "admin"})).unwrap();
//! let session = serializer.loads(&cookie, None).unwrap();
//!
//! assert_eq!(session["user"], "admin");
//! ```
use std::io::{Read, Write};

use base64::{
    alphabet,
    engine::{general_purpose, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::config::get_config;

type HmacSha1 = Hmac<Sha1>;

/// Separator between the cookie parts.
pub const SEPARATOR: char = '.';

/// Salt Flask uses for session cookies.
pub const SESSION_SALT: &str = "cookie-session";

/// Salt itsdangerous uses when none is given.
pub const DEFAULT_SALT: &str = "itsdangerous.Signer";

/// Epoch of itsdangerous 0.x timestamps, 2011-01-01.
pub const LEGACY_EPOCH: i64 = 1_293_840_000;

/// Decodes URL-safe or standard base64, with or without padding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Error, Debug)]
pub enum Error {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("signature \"{0}\" does not match")]
    BadSignature(String),

    #[error("signature expired: {0}")]
    SignatureExpired(String),

    #[error("malformed cookie: {0}")]
    Malformed(&'static str),

    #[error("decompression error: {0}")]
    Decompression(#[from] std::io::Error),

    #[error("invalid key length")]
    Key,
}

/// How the signing key is derived from the secret key and the salt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyDerivation {
    /// `HMAC(secret, salt)`. Flask uses this one.
    #[default]
    Hmac,
    /// `SHA1(salt + "signer" + secret)`.
    DjangoConcat,
    /// `SHA1(salt + secret)`.
    Concat,
    /// The secret key as-is.
    None,
}

impl std::str::FromStr for KeyDerivation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "hmac" => KeyDerivation::Hmac,
            "django-concat" => KeyDerivation::DjangoConcat,
            "concat" => KeyDerivation::Concat,
            "none" => KeyDerivation::None,
            _ => return Err(Error::Malformed("unknown key derivation")),
        })
    }
}

/// Signs and verifies values with HMAC-SHA1.
#[derive(Debug, Clone)]
pub struct Signer {
    secret: Vec<u8>,
    salt: Vec<u8>,
    key_derivation: KeyDerivation,
}

impl Signer {
    /// Create a signer with the default salt and HMAC key derivation.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            salt: DEFAULT_SALT.as_bytes().to_vec(),
            key_derivation: KeyDerivation::default(),
        }
    }

    pub fn salt(mut self, salt: impl AsRef<[u8]>) -> Self {
        self.salt = salt.as_ref().to_vec();
        self
    }

    pub fn key_derivation(mut self, key_derivation: KeyDerivation) -> Self {
        self.key_derivation = key_derivation;
        self
    }

    /// The key signatures are computed with.
    pub fn derive_key(&self) -> Result<Vec<u8>, Error> {
        Ok(match self.key_derivation {
            KeyDerivation::Hmac => {
                let mut mac = HmacSha1::new_from_slice(&self.secret).map_err(|_| Error::Key)?;
                mac.update(&self.salt);
                mac.finalize().into_bytes().to_vec()
            }

            KeyDerivation::DjangoConcat => {
                let mut digest = Sha1::new();
                digest.update(&self.salt);
                digest.update(b"signer");
                digest.update(&self.secret);
                digest.finalize().to_vec()
            }

            KeyDerivation::Concat => {
                let mut digest = Sha1::new();
                digest.update(&self.salt);
                digest.update(&self.secret);
                digest.finalize().to_vec()
            }

            KeyDerivation::None => self.secret.clone(),
        })
    }

    fn mac(&self) -> Result<HmacSha1, Error> {
        HmacSha1::new_from_slice(&self.derive_key()?).map_err(|_| Error::Key)
    }

    /// Raw signature bytes for a value.
    pub fn signature(&self, value: &[u8]) -> Result<Vec<u8>, Error> {
        let mut mac = self.mac()?;
        mac.update(value);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Check the base64-encoded signature of a value, in constant time.
    pub fn verify_signature(&self, value: &[u8], signature: &str) -> bool {
        let signature = match base64_decode_lenient(signature) {
            Ok(signature) => signature,
            Err(_) => return false,
        };

        match self.mac() {
            Ok(mut mac) => {
                mac.update(value);
                mac.verify_slice(&signature).is_ok()
            }
            Err(_) => false,
        }
    }

    /// Append the signature to the value.
    pub fn sign(&self, value: &str) -> Result<String, Error> {
        let signature = base64_encode(&self.signature(value.as_bytes())?);
        Ok(format!("{}{}{}", value, SEPARATOR, signature))
    }

    /// Verify the signature and return the value without it.
    pub fn unsign<'a>(&self, signed: &'a str) -> Result<&'a str, Error> {
        let (value, signature) = signed
            .rsplit_once(SEPARATOR)
            .ok_or(Error::Malformed("no separator"))?;

        if self.verify_signature(value.as_bytes(), signature) {
            Ok(value)
        } else {
            Err(Error::BadSignature(signature.to_string()))
        }
    }
}

/// Signer that also signs the time of signing.
#[derive(Debug, Clone)]
pub struct TimestampSigner {
    signer: Signer,
    epoch: i64,
}

impl TimestampSigner {
    pub fn new(signer: Signer) -> Self {
        Self { signer, epoch: 0 }
    }

    /// Count time from 2011-01-01, like itsdangerous before 1.0.
    pub fn legacy(mut self) -> Self {
        self.epoch = LEGACY_EPOCH;
        self
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Sign the value with the current time.
    pub fn sign(&self, value: &str) -> Result<String, Error> {
        self.sign_at(value, OffsetDateTime::now_utc())
    }

    /// Sign the value as if signed at the given time.
    pub fn sign_at(&self, value: &str, time: OffsetDateTime) -> Result<String, Error> {
        let timestamp = encode_timestamp(time.unix_timestamp() - self.epoch);
        self.signer.sign(&format!("{}{}{}", value, SEPARATOR, timestamp))
    }

    /// Verify the signature and the age of the value. Returns the value and when it was signed.
    pub fn unsign<'a>(
        &self,
        signed: &'a str,
        max_age: Option<Duration>,
    ) -> Result<(&'a str, OffsetDateTime), Error> {
        self.unsign_at(signed, max_age, OffsetDateTime::now_utc())
    }

    /// Same as [`TimestampSigner::unsign`], with "now" provided by the caller.
    pub fn unsign_at<'a>(
        &self,
        signed: &'a str,
        max_age: Option<Duration>,
        now: OffsetDateTime,
    ) -> Result<(&'a str, OffsetDateTime), Error> {
        let value = self.signer.unsign(signed)?;
        let (value, timestamp) = value
            .rsplit_once(SEPARATOR)
            .ok_or(Error::Malformed("timestamp missing"))?;

        let seconds = decode_timestamp(timestamp)? + self.epoch;
        let signed_at = OffsetDateTime::from_unix_timestamp(seconds)
            .map_err(|_| Error::Malformed("timestamp out of range"))?;

        if let Some(max_age) = max_age {
            let age = now - signed_at;

            if age > max_age {
                return Err(Error::SignatureExpired(format!(
                    "age {} > {} seconds",
                    age.whole_seconds(),
                    max_age.whole_seconds()
                )));
            }

            if age.is_negative() {
                return Err(Error::SignatureExpired(format!(
                    "age {} < 0 seconds",
                    age.whole_seconds()
                )));
            }
        }

        Ok((value, signed_at))
    }
}

/// URL-safe timed JSON serializer, the one behind Flask's `session`.
#[derive(Debug, Clone)]
pub struct SessionSerializer {
    signer: TimestampSigner,
}

impl SessionSerializer {
    /// Serializer with Flask's session settings: `cookie-session` salt, HMAC key derivation.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self::with_signer(TimestampSigner::new(
            Signer::new(secret)
                .salt(SESSION_SALT)
                .key_derivation(KeyDerivation::Hmac),
        ))
    }

    /// Serializer using the globally configured secret key.
    pub fn from_config() -> Self {
        Self::new(&get_config().general.secret_key)
    }

    pub fn with_signer(signer: TimestampSigner) -> Self {
        Self { signer }
    }

    pub fn dumps(&self, value: &serde_json::Value) -> Result<String, Error> {
        self.dumps_at(value, OffsetDateTime::now_utc())
    }

    /// Serialize and sign, with a chosen signing time.
    pub fn dumps_at(&self, value: &serde_json::Value, time: OffsetDateTime) -> Result<String, Error> {
        let json = serde_json::to_vec(value)?;
        let compressed = compress(&json)?;

        let payload = if compressed.len() < json.len().saturating_sub(1) {
            format!("{}{}", SEPARATOR, base64_encode(&compressed))
        } else {
            base64_encode(&json)
        };

        self.signer.sign_at(&payload, time)
    }

    /// Verify and deserialize a cookie. `max_age` of `None` accepts any age.
    pub fn loads(&self, cookie: &str, max_age: Option<Duration>) -> Result<serde_json::Value, Error> {
        let (payload, _) = self.signer.unsign(cookie, max_age)?;
        decode_payload(payload)
    }

    /// Verify and deserialize a cookie, returning when it was signed too.
    pub fn loads_with_timestamp(
        &self,
        cookie: &str,
        max_age: Option<Duration>,
    ) -> Result<(serde_json::Value, OffsetDateTime), Error> {
        let (payload, signed_at) = self.signer.unsign(cookie, max_age)?;
        Ok((decode_payload(payload)?, signed_at))
    }
}

/// A session cookie taken apart without checking its signature.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCookie {
    pub payload: serde_json::Value,
    pub compressed: bool,
    pub timestamp: OffsetDateTime,
    pub signature: Vec<u8>,
}

impl DecodedCookie {
    pub fn signature_hex(&self) -> String {
        self.signature.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Read a session cookie. No secret key is needed.
pub fn decode_unverified(cookie: &str) -> Result<DecodedCookie, Error> {
    let cookie = cookie.trim().trim_matches('"');
    let (rest, signature) = cookie
        .rsplit_once(SEPARATOR)
        .ok_or(Error::Malformed("signature missing"))?;
    let (payload, timestamp) = rest
        .rsplit_once(SEPARATOR)
        .ok_or(Error::Malformed("timestamp missing"))?;

    let seconds = decode_timestamp(timestamp)?;
    let timestamp = OffsetDateTime::from_unix_timestamp(seconds)
        .map_err(|_| Error::Malformed("timestamp out of range"))?;

    Ok(DecodedCookie {
        compressed: payload.starts_with(SEPARATOR),
        payload: decode_payload(payload)?,
        timestamp,
        signature: base64_decode_lenient(signature)?,
    })
}

fn decode_payload(payload: &str) -> Result<serde_json::Value, Error> {
    let json = match payload.strip_prefix(SEPARATOR) {
        Some(compressed) => decompress(&base64_decode_lenient(compressed)?)?,
        None => base64_decode_lenient(payload)?,
    };

    Ok(serde_json::from_slice(&json)?)
}

/// URL-safe base64 without padding.
pub fn base64_encode(bytes: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode base64 with or without padding, in either the URL-safe or the standard alphabet.
pub fn base64_decode_lenient(segment: &str) -> Result<Vec<u8>, Error> {
    let segment: String = segment
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();

    Ok(LENIENT.decode(segment)?)
}

/// Show bytes the way Python prints a bytes literal, e.g. `b'{"user":"admin"}\x1a'`.
pub fn bytes_repr(bytes: &[u8]) -> String {
    let mut result = String::from("b'");

    for byte in bytes {
        match byte {
            b'\\' => result.push_str("\\\\"),
            b'\'' => result.push_str("\\'"),
            b'\n' => result.push_str("\\n"),
            b'\r' => result.push_str("\\r"),
            b'\t' => result.push_str("\\t"),
            0x20..=0x7e => result.push(*byte as char),
            _ => result.push_str(&format!("\\x{:02x}", byte)),
        }
    }

    result.push('\'');
    result
}

fn encode_timestamp(seconds: i64) -> String {
    let bytes = seconds.max(0).to_be_bytes();
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    base64_encode(&bytes[start..])
}

fn decode_timestamp(timestamp: &str) -> Result<i64, Error> {
    let bytes = base64_decode_lenient(timestamp)?;

    if bytes.len() > 8 {
        return Err(Error::Malformed("timestamp too long"));
    }

    let mut buf = [0u8; 8];
    buf[8 - bytes.len()..].copy_from_slice(&bytes);
    Ok(i64::from_be_bytes(buf))
}

fn compress(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn test_sign_unsign() {
        let signer = Signer::new("secret-key");
        let signed = signer.sign("hello").unwrap();

        assert!(signed.starts_with("hello."));
        assert_eq!(signer.unsign(&signed).unwrap(), "hello");

        let other = Signer::new("another-key");
        assert!(matches!(other.unsign(&signed), Err(Error::BadSignature(_))));

        let tampered = signed.replacen("hello", "jello", 1);
        assert!(signer.unsign(&tampered).is_err());
    }

    #[test]
    fn test_key_derivation() {
        let secret = "secret";
        let keys = [
            KeyDerivation::Hmac,
            KeyDerivation::DjangoConcat,
            KeyDerivation::Concat,
            KeyDerivation::None,
        ]
        .map(|kd| Signer::new(secret).key_derivation(kd).derive_key().unwrap());

        assert_eq!(keys[0].len(), 20);
        assert_eq!(keys[3], b"secret");

        let mut concat = Sha1::new();
        concat.update(DEFAULT_SALT.as_bytes());
        concat.update(b"secret");
        assert_eq!(keys[2], concat.finalize().to_vec());

        for i in 0..keys.len() {
            for j in i + 1..keys.len() {
                assert_ne!(keys[i], keys[j]);
            }
        }

        assert_eq!("django-concat".parse::<KeyDerivation>().unwrap(), KeyDerivation::DjangoConcat);
    }

    #[test]
    fn test_timestamp() {
        assert_eq!(encode_timestamp(0), "");
        assert_eq!(decode_timestamp("").unwrap(), 0);

        let now = 1_700_000_000;
        let encoded = encode_timestamp(now);
        assert_eq!(base64_decode_lenient(&encoded).unwrap().len(), 4);
        assert_eq!(decode_timestamp(&encoded).unwrap(), now);
    }

    #[test]
    fn test_max_age() {
        let signer = TimestampSigner::new(Signer::new("secret").salt(SESSION_SALT));
        let signed_at = datetime!(2024-01-01 12:00 UTC);
        let signed = signer.sign_at("value", signed_at).unwrap();

        let (value, when) = signer
            .unsign_at(&signed, Some(Duration::days(31)), signed_at + Duration::days(1))
            .unwrap();
        assert_eq!(value, "value");
        assert_eq!(when, signed_at);

        let expired = signer.unsign_at(&signed, Some(Duration::days(31)), signed_at + Duration::days(32));
        assert!(matches!(expired, Err(Error::SignatureExpired(_))));

        let future = signer.unsign_at(&signed, Some(Duration::days(31)), signed_at - Duration::hours(1));
        assert!(matches!(future, Err(Error::SignatureExpired(_))));

        assert!(signer.unsign_at(&signed, None, signed_at + Duration::days(400)).is_ok());
    }

    #[test]
    fn test_legacy_epoch() {
        let signed_at = datetime!(2015-06-01 0:00 UTC);
        let legacy = TimestampSigner::new(Signer::new("secret")).legacy();
        let signed = legacy.sign_at("v", signed_at).unwrap();

        let (_, when) = legacy.unsign_at(&signed, None, signed_at).unwrap();
        assert_eq!(when, signed_at);
    }

    #[test]
    fn test_flask_session_cookie() {
        // Minted by Flask with `SECRET_KEY = "UNSAFE_SECRET"` at 1700000000.
        let flask = "eyJ1c2VyIjoiYWRtaW4ifQ.ZVPxAA.XOyDAAGxOIZTqzo2KU4BFnF9Q1I";
        let signed_at = datetime!(2023-11-14 22:13:20 UTC);
        let serializer = SessionSerializer::new("UNSAFE_SECRET");

        assert_eq!(
            serializer.dumps_at(&json!({"user": "admin"}), signed_at).unwrap(),
            flask
        );

        let (session, when) = serializer.loads_with_timestamp(flask, None).unwrap();
        assert_eq!(session, json!({"user": "admin"}));
        assert_eq!(when, signed_at);

        // Long enough for Flask to compress it.
        let compressed = ".eJyrVsrLL0ktVrJSSqQAKOkolRanFoFMScnNzFOqBQB0Bh9W.ZVPxAA.uuPFGPEJsLqzPClrzvtIcNjP-Ss";
        assert_eq!(
            serializer.loads(compressed, None).unwrap(),
            json!({"notes": "a".repeat(60), "user": "admin"})
        );

        assert!(matches!(
            SessionSerializer::new("guess").loads(flask, None),
            Err(Error::BadSignature(_))
        ));
    }

    #[test]
    fn test_session_roundtrip_and_forgery() {
        let serializer = SessionSerializer::new("UNSAFE_SECRET");
        let cookie = serializer.dumps(&json!({"user": "admin"})).unwrap();

        assert_eq!(cookie.matches('.').count(), 2);
        assert!(cookie.starts_with("eyJ1c2VyIjoiYWRtaW4ifQ."));
        assert_eq!(
            serializer.loads(&cookie, Some(Duration::days(31))).unwrap(),
            json!({"user": "admin"})
        );

        // Wrong key.
        let other = SessionSerializer::new("supersafesecretkey");
        assert!(matches!(other.loads(&cookie, None), Err(Error::BadSignature(_))));

        // A leaked key is all it takes.
        let forged = SessionSerializer::new("UNSAFE_SECRET")
            .dumps(&json!({"user": "superuser"}))
            .unwrap();
        assert_eq!(serializer.loads(&forged, None).unwrap()["user"], "superuser");
    }

    #[test]
    fn test_compressed_payload() {
        let serializer = SessionSerializer::new("secret");
        let value = json!({"data": "a".repeat(500)});
        let cookie = serializer.dumps(&value).unwrap();

        assert!(cookie.starts_with('.'));
        assert_eq!(serializer.loads(&cookie, None).unwrap(), value);

        let decoded = decode_unverified(&cookie).unwrap();
        assert!(decoded.compressed);
        assert_eq!(decoded.payload, value);
    }

    #[test]
    fn test_decode_unverified() {
        let signed_at = datetime!(2024-03-01 8:30 UTC);
        let cookie = SessionSerializer::new("whatever")
            .dumps_at(&json!({"user": "visitor"}), signed_at)
            .unwrap();

        let decoded = decode_unverified(&cookie).unwrap();
        assert_eq!(decoded.payload, json!({"user": "visitor"}));
        assert_eq!(decoded.timestamp, signed_at);
        assert_eq!(decoded.signature.len(), 20);
        assert_eq!(decoded.signature_hex().len(), 40);
        assert!(!decoded.compressed);

        assert!(decode_unverified("not-a-cookie").is_err());
    }

    #[test]
    fn test_sorted_keys() {
        let serializer = SessionSerializer::new("secret");
        let at = datetime!(2024-01-01 0:00 UTC);
        let a = serializer.dumps_at(&json!({"b": 1, "a": 2}), at).unwrap();
        let b = serializer.dumps_at(&json!({"a": 2, "b": 1}), at).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_base64_lenient() {
        assert_eq!(base64_decode_lenient("aGVsbG8").unwrap(), b"hello");
        assert_eq!(base64_decode_lenient("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(base64_decode_lenient("aGVsbG8====").unwrap(), b"hello");
        assert_eq!(base64_decode_lenient("-_8").unwrap(), base64_decode_lenient("+/8").unwrap());
        assert!(base64_decode_lenient("a").is_err());
    }

    #[test]
    fn test_bytes_repr() {
        assert_eq!(bytes_repr(b"{\"user\":\"admin\"}\x01"), "b'{\"user\":\"admin\"}\\x01'");
        assert_eq!(bytes_repr(b"it's"), "b'it\\'s'");
    }
}
