// ABOUTME: Cryptography module for the encrypted relay-route payload
// ABOUTME: Centralizes key derivation and payload encryption/decryption
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! Cryptographic utilities for the chat gateway

pub mod payload;

pub use payload::PayloadCipher;
