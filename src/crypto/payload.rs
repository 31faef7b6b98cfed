// ABOUTME: Symmetric payload cipher for the relay route request body
// ABOUTME: Derives a key from the shared secret and reverses the client-side encryption
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! Payload cipher for the relay route
//!
//! The web client encrypts the logical request body and ships it as
//! `{ "queryData": "<base64 ciphertext>" }`. The key is derived by hashing
//! the shared secret, and the cipher is AES-256-ECB with PKCS#7 padding to
//! match the client. ECB with no IV is a weakness of the observed wire
//! format, kept for compatibility; the gate itself runs as an explicit
//! decode step inside the relay handler, not as URL-matching middleware.

use aes::Aes256;
use base64::{engine::general_purpose, Engine};
use ecb::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyInit};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::errors::{AppError, AppResult};

type Aes256EcbEnc = ecb::Encryptor<Aes256>;
type Aes256EcbDec = ecb::Decryptor<Aes256>;

/// Symmetric cipher for the relay route payload
#[derive(Clone)]
pub struct PayloadCipher {
    key: [u8; 32],
}

impl PayloadCipher {
    /// Derive the cipher from the shared secret
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let key = Sha256::digest(secret.as_bytes()).into();
        Self { key }
    }

    /// Encrypt a plaintext payload to base64 ciphertext
    ///
    /// The server only decrypts in production; this direction exists for the
    /// client contract and the round-trip tests.
    #[must_use]
    pub fn encrypt(&self, plaintext: &str) -> String {
        let ciphertext = Aes256EcbEnc::new(&self.key.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        general_purpose::STANDARD.encode(ciphertext)
    }

    /// Decrypt base64 ciphertext to plaintext
    ///
    /// # Errors
    ///
    /// Returns a validation error if the ciphertext is not valid base64, the
    /// padding is wrong for the derived key, or the plaintext is not UTF-8.
    /// The ciphertext and key are never echoed back.
    pub fn decrypt(&self, ciphertext: &str) -> AppResult<String> {
        let raw = general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|_| AppError::invalid_payload("Ciphertext is not valid base64"))?;

        let plaintext = Aes256EcbDec::new(&self.key.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&raw)
            .map_err(|_| AppError::invalid_payload("Ciphertext does not match the gateway key"))?;

        String::from_utf8(plaintext)
            .map_err(|_| AppError::invalid_payload("Decrypted payload is not valid UTF-8"))
    }

    /// Decrypt and parse the structured request body
    ///
    /// # Errors
    ///
    /// Returns a validation error if decryption fails or the plaintext does
    /// not parse as the expected JSON shape.
    pub fn decrypt_request<T: DeserializeOwned>(&self, ciphertext: &str) -> AppResult<T> {
        let plaintext = self.decrypt(ciphertext)?;
        serde_json::from_str(&plaintext).map_err(|e| {
            AppError::invalid_payload(format!("Decrypted payload is not a valid request: {e}"))
        })
    }
}

impl std::fmt::Debug for PayloadCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key bytes intentionally omitted
        f.debug_struct("PayloadCipher").finish_non_exhaustive()
    }
}
