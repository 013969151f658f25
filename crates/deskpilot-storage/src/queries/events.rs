// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotency ledger for inbound workspace webhooks.
//!
//! Button callbacks and thread replies are retried by the transport;
//! recording `(workspace_thread_key, event_id)` pairs lets the relay make
//! redelivery a no-op.

use chrono::{SecondsFormat, Utc};
use rusqlite::params;

use deskpilot_core::DeskpilotError;

use crate::database::{map_tr_err, Database};

/// Records one inbound workspace event.
///
/// Returns `true` when the event is new, `false` when this
/// `(workspace_thread_key, event_id)` pair was seen before.
pub async fn record_workspace_event(
    db: &Database,
    workspace_thread_key: &str,
    event_id: &str,
) -> Result<bool, DeskpilotError> {
    let thread_key = workspace_thread_key.to_string();
    let event_id = event_id.to_string();
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO workspace_events \
                 (workspace_thread_key, event_id, received_at) VALUES (?1, ?2, ?3)",
                params![thread_key, event_id, now],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_tr_err)
}
