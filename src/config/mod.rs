// ABOUTME: Configuration management module for the chat gateway
// ABOUTME: Re-exports environment-driven server configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chat Gateway Contributors

//! Configuration management

/// Environment-driven server configuration
pub mod environment;

pub use environment::ServerConfig;
