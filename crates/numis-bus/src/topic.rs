// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::str::FromStr;

use numis_core::types::{RequestId, UserId};

/// A named event stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// `request:{id}`: everything that happens to one request and its session.
    Request(RequestId),
    /// `inbox:{user_id}`: events addressed to one participant.
    Inbox(UserId),
    /// `queue:pending`: changes to the set of claimable requests.
    PendingQueue,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Request(id) => write!(f, "request:{id}"),
            Topic::Inbox(user) => write!(f, "inbox:{user}"),
            Topic::PendingQueue => f.write_str("queue:pending"),
        }
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "queue:pending" {
            return Ok(Topic::PendingQueue);
        }
        match s.split_once(':') {
            Some(("request", id)) if !id.is_empty() => Ok(Topic::Request(RequestId::from(id))),
            Some(("inbox", user)) if !user.is_empty() => Ok(Topic::Inbox(UserId::from(user))),
            _ => Err(format!("unknown topic `{s}`")),
        }
    }
}
