// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profile snapshot lookups.
//!
//! The `profiles` table is owned by the surrounding application; the
//! coordinator only reads it. `upsert_profile` exists for seeding.

use chrono::Utc;
use numis_core::types::{Profile, UserId};
use numis_core::NumisError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::timestamps::format_ts;

pub async fn get_profile(db: &Database, user_id: &UserId) -> Result<Option<Profile>, NumisError> {
    let user_id = user_id.as_str().to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Profile>, rusqlite::Error> {
            conn.query_row(
                "SELECT user_id, display_name, avatar_url FROM profiles WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(Profile {
                        user_id: UserId(row.get(0)?),
                        display_name: row.get(1)?,
                        avatar_url: row.get(2)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn upsert_profile(db: &Database, profile: &Profile) -> Result<(), NumisError> {
    let profile = profile.clone();
    let now = format_ts(&Utc::now());
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO profiles (user_id, display_name, avatar_url, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                     display_name = excluded.display_name,
                     avatar_url = excluded.avatar_url,
                     updated_at = excluded.updated_at",
                params![profile.user_id.as_str(), profile.display_name, profile.avatar_url, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
