use std::fmt;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::Sha256;

use crate::config::ExportConfig;
use crate::error::{DecodeError, ExportError};
use crate::measurement::MeasurementRecord;

const PAYLOAD_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
// version | iterations (u32 BE) | salt | nonce
const HEADER_LEN: usize = 1 + 4 + SALT_LEN + NONCE_LEN;

/// Upper bound on KDF rounds accepted from a payload header
pub const MAX_KDF_ITERATIONS: u32 = 10_000_000;

/// Opaque, base64-encoded ciphertext of a measurement list
#[derive(Clone, PartialEq, Eq)]
pub struct ExportPayload(String);

impl ExportPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for ExportPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExportPayload")
            .field(&format!("<{} chars>", self.0.len()))
            .finish()
    }
}

impl fmt::Display for ExportPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ExportPayload {
    fn from(payload: String) -> Self {
        Self(payload)
    }
}

/// Canonical text form of a measurement list: compact JSON, fields in declaration
/// order, records in the order given.
pub fn serialize(records: &[MeasurementRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string(records)
}

/// Encrypts measurement lists under a caller-supplied passphrase.
#[derive(Debug, Clone)]
pub struct ExportCodec {
    kdf_iterations: u32,
}

impl Default for ExportCodec {
    fn default() -> Self {
        Self::new(&ExportConfig::default())
    }
}

impl ExportCodec {
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            kdf_iterations: config.kdf_iterations.clamp(1, MAX_KDF_ITERATIONS),
        }
    }

    /// Serialize then encrypt `records`
    pub fn export(&self, records: &[MeasurementRecord], passphrase: &str) -> Result<ExportPayload, ExportError> {
        let plaintext = serialize(records)?;
        self.encrypt(&plaintext, passphrase)
    }

    /// Seal `plaintext` with AES-256-GCM under a key derived from `passphrase`.
    ///
    /// Salt and nonce are fresh per call, so equal inputs give different payloads.
    pub fn encrypt(&self, plaintext: &str, passphrase: &str) -> Result<ExportPayload, ExportError> {
        if passphrase.is_empty() {
            return Err(ExportError::EmptyPassphrase);
        }

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let cipher = cipher_for(passphrase, &salt, self.kdf_iterations);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| ExportError::Encryption)?;

        let mut blob = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        blob.push(PAYLOAD_VERSION);
        blob.extend_from_slice(&self.kdf_iterations.to_be_bytes());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);

        log::debug!("Encrypted {} plaintext bytes into {} byte payload", plaintext.len(), blob.len());
        Ok(ExportPayload(STANDARD.encode(blob)))
    }

    /// Recover the measurement list. Fails on a wrong passphrase or any tampering.
    pub fn decode(&self, payload: &ExportPayload, passphrase: &str) -> Result<Vec<MeasurementRecord>, DecodeError> {
        let plaintext = decrypt(payload.as_str(), passphrase)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

fn cipher_for(passphrase: &str, salt: &[u8], iterations: u32) -> Aes256Gcm {
    let key = pbkdf2::pbkdf2_hmac_array::<Sha256, 32>(passphrase.as_bytes(), salt, iterations);
    Aes256Gcm::new(&key.into())
}

fn decrypt(payload: &str, passphrase: &str) -> Result<Vec<u8>, DecodeError> {
    let blob = STANDARD.decode(payload.trim())?;
    if blob.len() < HEADER_LEN + TAG_LEN {
        return Err(DecodeError::Truncated(blob.len()));
    }

    let (header, ciphertext) = blob.split_at(HEADER_LEN);
    let version = header[0];
    if version != PAYLOAD_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let mut iterations = [0u8; 4];
    iterations.copy_from_slice(&header[1..5]);
    let iterations = u32::from_be_bytes(iterations);
    if iterations == 0 || iterations > MAX_KDF_ITERATIONS {
        return Err(DecodeError::InvalidHeader(format!("KDF iterations {iterations} out of range")));
    }

    let salt = &header[5..5 + SALT_LEN];
    let nonce = Nonce::from_slice(&header[5 + SALT_LEN..]);

    cipher_for(passphrase, salt, iterations)
        .decrypt(nonce, ciphertext)
        .map_err(|_| DecodeError::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::Unit;
    use crate::tools::ToolKind;

    fn fast_codec() -> ExportCodec {
        ExportCodec::new(&ExportConfig {
            kdf_iterations: 8,
            ..ExportConfig::default()
        })
    }

    #[test]
    fn serialization_matches_existing_export_format() {
        let records = [
            MeasurementRecord { kind: ToolKind::Length, value: 5.0, unit: Unit::Millimetres },
            MeasurementRecord { kind: ToolKind::CobbAngle, value: 12.35, unit: Unit::Degrees },
        ];
        assert_eq!(
            serialize(&records).unwrap(),
            r#"[{"type":"Length","value":"5.00","unit":"mm"},{"type":"Cobb Angle","value":"12.35","unit":"degrees"}]"#
        );
    }

    #[test]
    fn payload_header_carries_iterations() {
        let payload = fast_codec().encrypt("[]", "pass").unwrap();
        let blob = STANDARD.decode(payload.as_str()).unwrap();
        assert_eq!(blob[0], PAYLOAD_VERSION);
        assert_eq!(u32::from_be_bytes([blob[1], blob[2], blob[3], blob[4]]), 8);
        assert_eq!(blob.len(), HEADER_LEN + 2 + TAG_LEN);
    }

    #[test]
    fn rejects_unknown_version() {
        let payload = fast_codec().encrypt("[]", "pass").unwrap();
        let mut blob = STANDARD.decode(payload.as_str()).unwrap();
        blob[0] = 9;
        let tampered = ExportPayload(STANDARD.encode(blob));
        assert!(matches!(
            fast_codec().decode(&tampered, "pass"),
            Err(DecodeError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn rejects_zero_iterations_in_header() {
        let payload = fast_codec().encrypt("[]", "pass").unwrap();
        let mut blob = STANDARD.decode(payload.as_str()).unwrap();
        blob[1..5].copy_from_slice(&0u32.to_be_bytes());
        let tampered = ExportPayload(STANDARD.encode(blob));
        assert!(matches!(
            fast_codec().decode(&tampered, "pass"),
            Err(DecodeError::InvalidHeader(_))
        ));
    }
}
