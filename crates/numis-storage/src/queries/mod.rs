// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed queries over the Numis schema.

pub mod documents;
pub mod messages;
pub mod profiles;
pub mod requests;
