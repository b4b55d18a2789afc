// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for the Numis session coordinator.
//!
//! REST routes expose every [`numis_session::AuthService`] operation; the
//! WebSocket endpoint streams bus events for the topics a client names.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod ws;

pub use auth::AuthConfig;
pub use server::{bind, router, serve, start_server, GatewayState, ServerConfig};
