// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session row operations.
//!
//! Every operation here runs as a single closure on the serialized
//! connection thread, which makes read-modify-write sequences (history
//! append, CAS transition) atomic with respect to each other. The partial
//! unique index on active `user_key` backstops the one-active-session
//! invariant across processes.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension};

use deskpilot_core::types::{
    Session, SessionCounts, SessionMessage, SessionState, SlotOffer, UserKey,
};
use deskpilot_core::DeskpilotError;

use crate::database::{map_tr_err, Database};

const SESSION_COLUMNS: &str = "session_id, user_key, channel_key, workspace_thread_key, \
     state, assigned_agent, ai_disabled, escalated_at, claimed_at, closed_at, \
     escalation_reason, history, pending_slots, created_at, updated_at";

const ACTIVE_STATES: &str = "('active_ai', 'escalated_unclaimed', 'escalated_claimed')";

/// Fields written alongside a state transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionFields {
    pub assigned_agent: Option<String>,
    pub workspace_thread_key: Option<String>,
    pub escalation_reason: Option<String>,
}

/// Outcome of a compare-and-set transition attempt.
enum TransitionOutcome {
    Applied(Box<Session>),
    Stale { actual: SessionState },
    NotFound,
}

fn fmt_ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| conv_err(idx, e))
}

fn conv_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn other_err(msg: impl Into<String>) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Other(msg.into().into())
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    let user_key: String = row.get(1)?;
    let state: String = row.get(4)?;
    let escalated_at: Option<String> = row.get(7)?;
    let claimed_at: Option<String> = row.get(8)?;
    let closed_at: Option<String> = row.get(9)?;
    let history: String = row.get(11)?;
    let pending_slots: String = row.get(12)?;
    let created_at: String = row.get(13)?;
    let updated_at: String = row.get(14)?;

    Ok(Session {
        session_id: row.get(0)?,
        user_key: UserKey::from_storage_key(&user_key).map_err(|e| conv_err(1, e))?,
        channel_key: row.get(2)?,
        workspace_thread_key: row.get(3)?,
        state: state.parse::<SessionState>().map_err(|e| conv_err(4, e))?,
        assigned_agent: row.get(5)?,
        ai_disabled: row.get::<_, i64>(6)? != 0,
        escalated_at: escalated_at.as_deref().map(|s| parse_ts(7, s)).transpose()?,
        claimed_at: claimed_at.as_deref().map(|s| parse_ts(8, s)).transpose()?,
        closed_at: closed_at.as_deref().map(|s| parse_ts(9, s)).transpose()?,
        escalation_reason: row.get(10)?,
        history: serde_json::from_str(&history).map_err(|e| conv_err(11, e))?,
        pending_slots: serde_json::from_str(&pending_slots).map_err(|e| conv_err(12, e))?,
        created_at: parse_ts(13, &created_at)?,
        updated_at: parse_ts(14, &updated_at)?,
    })
}

fn select_by_id(
    conn: &rusqlite::Connection,
    session_id: &str,
) -> rusqlite::Result<Option<Session>> {
    conn.query_row(
        &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = ?1"),
        params![session_id],
        row_to_session,
    )
    .optional()
}

fn select_active_for_user(
    conn: &rusqlite::Connection,
    user_key: &str,
) -> rusqlite::Result<Option<Session>> {
    conn.query_row(
        &format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE user_key = ?1 AND state IN {ACTIVE_STATES}"
        ),
        params![user_key],
        row_to_session,
    )
    .optional()
}

/// Returns the unique active session for the user, creating one in
/// `ActiveAi` when none exists. On a cross-process race the partial unique
/// index picks the single winner and the loser re-reads it.
pub async fn find_or_create_active(
    db: &Database,
    user_key: &UserKey,
    channel_key: &str,
) -> Result<Session, DeskpilotError> {
    let key = user_key.storage_key();
    let channel_key = channel_key.to_string();
    let session_id = uuid::Uuid::new_v4().to_string();
    let now = fmt_ts(Utc::now());

    db.connection()
        .call(move |conn| {
            if let Some(session) = select_active_for_user(conn, &key)? {
                return Ok(session);
            }

            let inserted = conn.execute(
                "INSERT INTO sessions \
                 (session_id, user_key, channel_key, state, ai_disabled, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, 'active_ai', 0, ?4, ?4)",
                params![session_id, key, channel_key, now],
            );
            match inserted {
                Ok(_) => {}
                // Another writer won the unique-index race; fall through
                // and return its row.
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation => {}
                Err(e) => return Err(e.into()),
            }

            select_active_for_user(conn, &key)?
                .ok_or_else(|| other_err("active session vanished after insert"))
        })
        .await
        .map_err(map_tr_err)
}

/// Appends one message to the session history. History is append-only;
/// this is the only write path into it.
pub async fn append_message(
    db: &Database,
    session_id: &str,
    message: SessionMessage,
) -> Result<Session, DeskpilotError> {
    let session_id = session_id.to_string();
    let now = fmt_ts(Utc::now());

    db.connection()
        .call(move |conn| {
            let Some(mut session) = select_by_id(conn, &session_id)? else {
                return Err(other_err(format!("session not found: {session_id}")));
            };
            session.history.push(message);
            let history = serde_json::to_string(&session.history)
                .map_err(|e| conv_err(11, e))?;
            conn.execute(
                "UPDATE sessions SET history = ?1, updated_at = ?2 WHERE session_id = ?3",
                params![history, now, session_id],
            )?;
            session.updated_at = parse_ts(14, &now)?;
            Ok(session)
        })
        .await
        .map_err(map_tr_err)
}

/// Appends an AI reply only while the session is still `ActiveAi`.
///
/// The guard runs on the serialized writer, so a claim or close that raced
/// the generation wins and the reply is dropped. Returns `None` when
/// dropped.
pub async fn append_ai_message(
    db: &Database,
    session_id: &str,
    message: SessionMessage,
) -> Result<Option<Session>, DeskpilotError> {
    let session_id = session_id.to_string();
    let now = fmt_ts(Utc::now());

    db.connection()
        .call(move |conn| {
            let Some(mut session) = select_by_id(conn, &session_id)? else {
                return Err(other_err(format!("session not found: {session_id}")));
            };
            if session.state != SessionState::ActiveAi {
                return Ok(None);
            }
            session.history.push(message);
            let history = serde_json::to_string(&session.history)
                .map_err(|e| conv_err(11, e))?;
            let changed = conn.execute(
                "UPDATE sessions SET history = ?1, updated_at = ?2 \
                 WHERE session_id = ?3 AND state = 'active_ai'",
                params![history, now, session_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            session.updated_at = parse_ts(14, &now)?;
            Ok(Some(session))
        })
        .await
        .map_err(map_tr_err)
}

/// Compare-and-set state transition.
///
/// Fails with [`DeskpilotError::Stale`] when the current state is not
/// `from` (the claim-race loser path). Timestamps for the target state are
/// stamped here; `fields` are merged without clearing existing values.
pub async fn transition(
    db: &Database,
    session_id: &str,
    from: SessionState,
    to: SessionState,
    fields: TransitionFields,
) -> Result<Session, DeskpilotError> {
    if !from.can_transition_to(to) {
        return Err(DeskpilotError::Internal(format!(
            "illegal transition {from} -> {to}"
        )));
    }

    let session_id = session_id.to_string();
    let now = fmt_ts(Utc::now());
    let escalated_at = (to == SessionState::EscalatedUnclaimed).then(|| now.clone());
    let claimed_at = (to == SessionState::EscalatedClaimed).then(|| now.clone());
    let closed_at = (to == SessionState::Closed).then(|| now.clone());
    let ai_disabled = to.ai_disabled() as i64;

    let outcome = db
        .connection()
        .call(move |conn| {
            let Some(session) = select_by_id(conn, &session_id)? else {
                return Ok(TransitionOutcome::NotFound);
            };
            if session.state != from {
                return Ok(TransitionOutcome::Stale {
                    actual: session.state,
                });
            }

            // State repeated in the WHERE clause: the SELECT above and this
            // UPDATE run on the same serialized thread, but the guard keeps
            // the operation a true CAS even if that ever changes.
            let changed = conn.execute(
                "UPDATE sessions SET \
                     state = ?1, \
                     ai_disabled = ?2, \
                     assigned_agent = COALESCE(?3, assigned_agent), \
                     workspace_thread_key = COALESCE(?4, workspace_thread_key), \
                     escalation_reason = COALESCE(?5, escalation_reason), \
                     escalated_at = COALESCE(?6, escalated_at), \
                     claimed_at = COALESCE(?7, claimed_at), \
                     closed_at = COALESCE(?8, closed_at), \
                     updated_at = ?9 \
                 WHERE session_id = ?10 AND state = ?11",
                params![
                    to.to_string(),
                    ai_disabled,
                    fields.assigned_agent,
                    fields.workspace_thread_key,
                    fields.escalation_reason,
                    escalated_at,
                    claimed_at,
                    closed_at,
                    now,
                    session_id,
                    from.to_string(),
                ],
            )?;
            if changed == 0 {
                let actual = select_by_id(conn, &session_id)?
                    .map(|s| s.state)
                    .unwrap_or(from);
                return Ok(TransitionOutcome::Stale { actual });
            }

            let updated = select_by_id(conn, &session_id)?
                .ok_or_else(|| other_err("session vanished mid-transition"))?;
            Ok(TransitionOutcome::Applied(Box::new(updated)))
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        TransitionOutcome::Applied(session) => Ok(*session),
        TransitionOutcome::Stale { actual } => Err(DeskpilotError::Stale {
            expected: from,
            actual,
        }),
        TransitionOutcome::NotFound => Err(DeskpilotError::Internal(
            "session not found for transition".to_string(),
        )),
    }
}

/// Attaches scheduling offers to the session.
pub async fn set_pending_slots(
    db: &Database,
    session_id: &str,
    offers: &[SlotOffer],
) -> Result<Session, DeskpilotError> {
    let session_id = session_id.to_string();
    let json = serde_json::to_string(offers).map_err(|e| DeskpilotError::Storage {
        source: Box::new(e),
    })?;
    let now = fmt_ts(Utc::now());

    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sessions SET pending_slots = ?1, updated_at = ?2 WHERE session_id = ?3",
                params![json, now, session_id],
            )?;
            select_by_id(conn, &session_id)?
                .ok_or_else(|| other_err(format!("session not found: {session_id}")))
        })
        .await
        .map_err(map_tr_err)
}

/// Empties the session's pending offers (slot consumption).
pub async fn clear_pending_slots(
    db: &Database,
    session_id: &str,
) -> Result<Session, DeskpilotError> {
    set_pending_slots(db, session_id, &[]).await
}

/// Fetches a session by id.
pub async fn get(db: &Database, session_id: &str) -> Result<Option<Session>, DeskpilotError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| Ok(select_by_id(conn, &session_id)?))
        .await
        .map_err(map_tr_err)
}

/// Fetches the session mirrored into the given workspace thread.
pub async fn get_by_workspace_thread(
    db: &Database,
    workspace_thread_key: &str,
) -> Result<Option<Session>, DeskpilotError> {
    let key = workspace_thread_key.to_string();
    db.connection()
        .call(move |conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {SESSION_COLUMNS} FROM sessions \
                         WHERE workspace_thread_key = ?1 \
                         ORDER BY updated_at DESC LIMIT 1"
                    ),
                    params![key],
                    row_to_session,
                )
                .optional()?)
        })
        .await
        .map_err(map_tr_err)
}

/// Per-state counts for observability.
pub async fn stats(db: &Database) -> Result<SessionCounts, DeskpilotError> {
    db.connection()
        .call(|conn| {
            let mut counts = SessionCounts::default();
            let mut stmt =
                conn.prepare("SELECT state, COUNT(*) FROM sessions GROUP BY state")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
            })?;
            for row in rows {
                let (state, count) = row?;
                match state.as_str() {
                    "active_ai" => counts.active_ai = count,
                    "escalated_unclaimed" => counts.escalated_unclaimed = count,
                    "escalated_claimed" => counts.escalated_claimed = count,
                    "closed" => counts.closed = count,
                    _ => {}
                }
            }
            counts.total_messages = conn.query_row(
                "SELECT COALESCE(SUM(json_array_length(history)), 0) FROM sessions",
                [],
                |row| row.get(0),
            )?;
            Ok(counts)
        })
        .await
        .map_err(map_tr_err)
}
