// ABOUTME: Main library entry point for the chat gateway
// ABOUTME: Relays encrypted chat requests to an upstream completion service
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

#![deny(unsafe_code)]

//! # Chat Gateway
//!
//! A single-purpose streaming gateway that sits between browser clients and
//! an upstream conversational-completion service.
//!
//! ## Features
//!
//! - **Encrypted relay**: `POST /chat-process` accepts an AES-encrypted
//!   envelope and streams the upstream response back as newline-delimited
//!   JSON chunks
//! - **Origin allowlist**: requests from unknown hosts are rejected before
//!   any body processing
//! - **Best-effort sidecars**: exchange persistence and completion
//!   notification never affect the client-visible stream
//! - **User verification**: `POST /verify` checks the shared secret and the
//!   user table, recording unknown users for admin review
//!
//! ## Architecture
//!
//! - **Routes**: HTTP surface, mounted bare and under `/api`
//! - **Upstream**: streaming completion provider abstraction
//! - **Crypto**: request-payload cipher keyed from the shared secret
//! - **Database**: optional SQLite persistence for exchanges and users
//! - **Notifications**: fire-and-forget completion webhook
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chat_gateway::config::environment::ServerConfig;
//! use chat_gateway::errors::AppResult;
//!
//! fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Chat gateway configured with port: HTTP={}", config.http_port);
//!     Ok(())
//! }
//! ```

// ── Public API ──────────────────────────────────────────────────────────
// These modules are used by the binary crate (src/bin/) and integration
// tests (tests/). They must remain `pub` so external consumers can access
// them.

/// Configuration management loaded from the environment
pub mod config;

/// Request-payload encryption and decryption
pub mod crypto;

/// SQLite persistence for exchange records and user verification
pub mod database;

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Structured logging configuration
pub mod logging;

/// HTTP middleware for origin filtering, token auth, rate limiting, and CORS
pub mod middleware;

/// Completion notification sidecar
pub mod notifications;

/// Shared server resources injected into route handlers
pub mod resources;

/// HTTP routes and router assembly
pub mod routes;

/// Upstream completion provider abstraction
pub mod upstream;
