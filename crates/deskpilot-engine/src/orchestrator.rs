// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-message orchestration pipeline.
//!
//! One inbound user event flows: resolve session -> append -> (if the AI
//! is authoritative) classify -> abuse gate -> slot-selection gate ->
//! scheduling gate -> information gate -> escalation gate. Sessions where
//! a human is authoritative hand straight to the relay.
//!
//! Each turn runs under a cancellation token (a newer message from the
//! same user cancels the in-flight generation before it appends) and an
//! end-to-end deadline, with per-step timeouts from configuration.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use deskpilot_answerer::{AnswerCategory, RetrievalAnswerer};
use deskpilot_classifier::{patterns, Classification, IntentClassifier};
use deskpilot_config::model::{
    ConfidenceConfig, DeskpilotConfig, EscalationConfig, LexiconConfig, TimeoutConfig,
};
use deskpilot_core::types::{ActionButton, SessionMessage, SlotOffer};
use deskpilot_core::{
    DeskpilotError, Intent, Session, SessionState, UserEvent, UserSurface, WorkspaceTransport,
};
use deskpilot_scheduling::{Attendee, BookingExecutor, SlotProvider};
use deskpilot_storage::{SessionStore, TransitionFields};
use deskpilot_workspace::EscalationBuilder;
use tracing::{info, warn};

use crate::backoff::retry_transient;
use crate::cancel::CancelRegistry;
use crate::relay::RelayHub;

pub const SPECIALIST_ACK: &str = "A specialist will be with you shortly.";
pub const STORE_TROUBLE_REPLY: &str =
    "I'm having trouble right now, please try again in a moment.";
pub const DE_ESCALATION_REPLY: &str = "I'm sorry you're having a frustrating experience. \
     I want to help -- could you tell me a bit more about what's going wrong?";
pub const ESCALATION_FAILED_REPLY: &str = "We couldn't reach a specialist right now. \
     Please try again in a few minutes or email support@deskpilot.example.";
pub const SCHEDULING_UNAVAILABLE_REPLY: &str =
    "Scheduling is temporarily unavailable right now.";
pub const NO_SLOTS_REPLY: &str =
    "I couldn't find any open demo slots in the next few business days.";

/// AI turns handed to the answerer as already-delivered context.
const RECENT_AI_CONTEXT_TURNS: usize = 10;

/// Configuration slice the orchestrator reads.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub lexicons: LexiconConfig,
    pub confidence: ConfidenceConfig,
    pub escalation: EscalationConfig,
    pub timeouts: TimeoutConfig,
}

impl OrchestratorConfig {
    pub fn from_config(config: &DeskpilotConfig) -> Self {
        Self {
            lexicons: config.lexicons.clone(),
            confidence: config.confidence.clone(),
            escalation: config.escalation.clone(),
            timeouts: config.timeouts.clone(),
        }
    }
}

/// Composes the components into the per-message pipeline.
pub struct Orchestrator {
    store: SessionStore,
    classifier: IntentClassifier,
    answerer: RetrievalAnswerer,
    slots: SlotProvider,
    booking: BookingExecutor,
    relay: Arc<RelayHub>,
    workspace: Arc<dyn WorkspaceTransport>,
    surface: Arc<dyn UserSurface>,
    tickets: EscalationBuilder,
    cancel: CancelRegistry,
    config: OrchestratorConfig,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: SessionStore,
        classifier: IntentClassifier,
        answerer: RetrievalAnswerer,
        slots: SlotProvider,
        booking: BookingExecutor,
        relay: Arc<RelayHub>,
        workspace: Arc<dyn WorkspaceTransport>,
        surface: Arc<dyn UserSurface>,
        tickets: EscalationBuilder,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            classifier,
            answerer,
            slots,
            booking,
            relay,
            workspace,
            surface,
            tickets,
            cancel: CancelRegistry::new(),
            config,
        }
    }

    /// Processes one canonical user event end to end.
    pub async fn handle_user_event(&self, event: UserEvent) -> Result<(), DeskpilotError> {
        let session = match self
            .store
            .find_or_create_active(&event.user_key, &event.channel_key)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "session store unavailable for inbound message");
                let _ = self
                    .surface
                    .send_text(&event.channel_key, STORE_TROUBLE_REPLY)
                    .await;
                return Err(e);
            }
        };

        // Human-authoritative (or pending-human) sessions bypass the AI
        // entirely: append and mirror into the ticket thread.
        if session.state != SessionState::ActiveAi {
            let message = SessionMessage::user(event.text.as_str(), event.user_key.surface, event.at);
            let session = self.store.append_message(&session.session_id, message).await?;
            return self.relay.mirror_user_message(&session, &event.text).await;
        }

        let guard = self.cancel.begin(&session.session_id);

        let classification = match tokio::time::timeout(
            Duration::from_secs(self.config.timeouts.llm_secs),
            self.classifier
                .classify(&event.text, !session.pending_slots.is_empty()),
        )
        .await
        {
            Ok(classification) => classification,
            Err(_) => {
                warn!("classifier timed out, falling back to the pattern pass");
                patterns::classify(
                    &event.text,
                    !session.pending_slots.is_empty(),
                    &self.config.lexicons,
                )
            }
        };

        let message = SessionMessage::user(event.text.as_str(), event.user_key.surface, event.at)
            .with_intent(classification.intent);
        let session = self.store.append_message(&session.session_id, message).await?;

        info!(
            session_id = %session.session_id,
            intent = %classification.intent,
            confidence = classification.confidence,
            "user turn classified"
        );

        let deadline = Duration::from_secs(self.config.timeouts.turn_secs);
        let outcome = tokio::select! {
            _ = guard.token.cancelled() => {
                info!(
                    session_id = %session.session_id,
                    "turn cancelled by a newer message; partial output discarded"
                );
                Ok(())
            }
            gated = tokio::time::timeout(deadline, self.run_gates(&event, &session, &classification)) => {
                match gated {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(session_id = %session.session_id, "turn deadline exceeded");
                        self.surface
                            .send_text(&event.channel_key, STORE_TROUBLE_REPLY)
                            .await
                    }
                }
            }
        };
        self.cancel.finish(&guard);
        outcome
    }

    async fn run_gates(
        &self,
        event: &UserEvent,
        session: &Session,
        classification: &Classification,
    ) -> Result<(), DeskpilotError> {
        match classification.intent {
            Intent::Abusive => self.abuse_gate(session).await,
            Intent::SlotSelection { index } => self.slot_gate(event, session, index).await,
            Intent::Scheduling => self.scheduling_gate(session).await,
            _ => {
                if classification.human_request {
                    return self.escalate(session, "user asked for a human").await;
                }
                if classification.urgent {
                    return self.escalate(session, "urgent request").await;
                }
                // Enterprise-tier pricing: a stated team size at or above
                // the threshold escalates before answering; an unstated
                // size is capped at med_conf_cap in the information gate.
                let mut cap_enterprise = false;
                if classification.enterprise_pricing {
                    match parse_seat_count(&event.text) {
                        Some(seats)
                            if seats >= self.config.escalation.enterprise_seat_threshold =>
                        {
                            return self
                                .escalate(session, "enterprise pricing inquiry")
                                .await;
                        }
                        Some(_) => {}
                        None => cap_enterprise = true,
                    }
                }
                self.information_gate(event, session, cap_enterprise).await
            }
        }
    }

    /// First abusive message de-escalates; a second inside the window
    /// hands the conversation to a human.
    async fn abuse_gate(&self, session: &Session) -> Result<(), DeskpilotError> {
        let in_window = session
            .abusive_count_in_window(self.config.escalation.abuse_window_turns);
        if in_window >= 2 {
            return self.escalate(session, "repeated abusive messages").await;
        }
        self.reply_ai(session, DE_ESCALATION_REPLY, |m| {
            m.with_intent(Intent::Abusive)
        })
        .await
    }

    async fn slot_gate(
        &self,
        event: &UserEvent,
        session: &Session,
        index: u32,
    ) -> Result<(), DeskpilotError> {
        let Some(offer) = session.pending_slot(index).cloned() else {
            let listing = self.format_offers(&session.pending_slots)?;
            let text = format!(
                "That option isn't on the list. Please pick one of:\n{listing}"
            );
            return self.reply_ai(session, &text, |m| m).await;
        };

        let attendee = Attendee {
            name: Some(event.user_key.external_user_id.clone()),
            email: None,
        };
        let booked = tokio::time::timeout(
            Duration::from_secs(self.config.timeouts.calendar_secs),
            self.booking.book(&offer, &attendee),
        )
        .await
        .unwrap_or(Err(DeskpilotError::Timeout {
            duration: Duration::from_secs(self.config.timeouts.calendar_secs),
        }));

        match booked {
            Ok(booked) => {
                self.store.clear_pending_slots(&session.session_id).await?;
                let described = self.slots.describe(&offer)?;
                let text = format!(
                    "You're booked! {described}. A calendar invite is on its way."
                );
                info!(
                    session_id = %session.session_id,
                    event_id = %booked.event_id,
                    "booking confirmed"
                );
                self.reply_ai(session, &text, |m| {
                    m.with_intent(Intent::SlotSelection { index })
                })
                .await
            }
            Err(DeskpilotError::SlotTaken { offer_index }) => {
                let remaining: Vec<SlotOffer> = session
                    .pending_slots
                    .iter()
                    .filter(|o| o.offer_index != offer_index)
                    .cloned()
                    .collect();
                self.store
                    .set_pending_slots(&session.session_id, &remaining)
                    .await?;
                if remaining.is_empty() {
                    let text = "That slot was just taken, and nothing else remains \
                                from the last list. Let me look for fresh times.";
                    self.reply_ai(session, text, |m| m).await?;
                    return self.scheduling_gate(session).await;
                }
                let listing = self.format_offers(&remaining)?;
                let text = format!(
                    "Sorry -- that slot was just taken. These are still open:\n{listing}"
                );
                self.reply_ai(session, &text, |m| m).await
            }
            Err(e) => {
                // A user's intent to book is never dropped silently.
                warn!(error = %e, "booking failed, escalating");
                self.escalate(session, "booking failed after slot selection")
                    .await
            }
        }
    }

    async fn scheduling_gate(&self, session: &Session) -> Result<(), DeskpilotError> {
        let offers = tokio::time::timeout(
            Duration::from_secs(self.config.timeouts.calendar_secs),
            self.slots.available_slots(Utc::now()),
        )
        .await
        .unwrap_or(Err(DeskpilotError::Timeout {
            duration: Duration::from_secs(self.config.timeouts.calendar_secs),
        }));

        let offers = match offers {
            Ok(offers) if offers.is_empty() => {
                self.reply_ai(session, NO_SLOTS_REPLY, |m| m).await?;
                return self.escalate(session, "no bookable slots available").await;
            }
            Ok(offers) => offers,
            Err(e) => {
                warn!(error = %e, "slot provider unavailable");
                self.reply_ai(session, SCHEDULING_UNAVAILABLE_REPLY, |m| m).await?;
                return self.escalate(session, "slot provider unavailable").await;
            }
        };

        self.store
            .set_pending_slots(&session.session_id, &offers)
            .await?;
        let listing = self.format_offers(&offers)?;
        let text = format!(
            "Here are the next available demo slots:\n{listing}\nReply with a number to book one."
        );

        let message = SessionMessage::ai(&text, Utc::now()).with_intent(Intent::Scheduling);
        if self
            .store
            .append_ai_message(&session.session_id, message)
            .await?
            .is_none()
        {
            info!(session_id = %session.session_id, "offer reply dropped, AI no longer authoritative");
            return Ok(());
        }
        let actions: Vec<ActionButton> = offers
            .iter()
            .map(|offer| ActionButton {
                label: format!("Option {}", offer.offer_index),
                payload: offer.offer_index.to_string(),
            })
            .collect();
        self.surface
            .send_actions(&session.channel_key, &text, &actions)
            .await
    }

    /// `cap_enterprise` caps effective confidence at `med_conf_cap`,
    /// which sits below every answer threshold and so forces escalation
    /// for enterprise-tier pricing questions with no stated team size.
    async fn information_gate(
        &self,
        event: &UserEvent,
        session: &Session,
        cap_enterprise: bool,
    ) -> Result<(), DeskpilotError> {
        let recent = session.recent_ai_texts(RECENT_AI_CONTEXT_TURNS);
        let step_timeout =
            Duration::from_secs(self.config.timeouts.llm_secs + self.config.timeouts.vector_secs);

        let answerer = &self.answerer;
        let question = event.text.as_str();
        let recent_slice: &[&str] = &recent;
        let answer = retry_transient(2, move || async move {
            match tokio::time::timeout(step_timeout, answerer.answer(question, recent_slice)).await
            {
                Ok(result) => result,
                Err(_) => Err(DeskpilotError::Timeout {
                    duration: step_timeout,
                }),
            }
        })
        .await;

        let answer = match answer {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "answering failed, escalating");
                return self.escalate(session, "answer generation failed").await;
            }
        };

        let effective = if cap_enterprise {
            answer.confidence.min(self.config.confidence.med_conf_cap)
        } else {
            answer.confidence
        };
        let threshold = match answer.category {
            AnswerCategory::Compliance => self.config.confidence.high_conf_compliance,
            _ => self.config.confidence.high_conf_general,
        };

        if answer.supported && effective >= threshold {
            let text = answer.text.clone();
            return self
                .reply_ai(session, &text, move |m| {
                    m.with_confidence(effective)
                        .with_citations(answer.citations)
                        .with_intent(Intent::Information)
                })
                .await;
        }

        info!(
            session_id = %session.session_id,
            confidence = answer.confidence,
            effective,
            threshold,
            "answer below threshold, escalating"
        );
        self.escalate(
            session,
            &format!("low retrieval confidence ({effective:.2})"),
        )
        .await
    }

    /// Posts the ticket, then transitions the session. If the workspace
    /// post exhausts its retries the session stays `ActiveAi` so the next
    /// attempt can retry.
    async fn escalate(&self, session: &Session, reason: &str) -> Result<(), DeskpilotError> {
        let fresh = self
            .store
            .get(&session.session_id)
            .await?
            .unwrap_or_else(|| session.clone());
        let card = self.tickets.open_card(&fresh, reason);

        let posted = tokio::time::timeout(
            Duration::from_secs(self.config.timeouts.workspace_secs),
            self.workspace.post_ticket(&card),
        )
        .await
        .unwrap_or(Err(DeskpilotError::Timeout {
            duration: Duration::from_secs(self.config.timeouts.workspace_secs),
        }));

        let thread_key = match posted {
            Ok(thread_key) => thread_key,
            Err(e) => {
                warn!(error = %e, reason, "workspace post failed, session stays AI-handled");
                return self
                    .surface
                    .send_text(&fresh.channel_key, ESCALATION_FAILED_REPLY)
                    .await;
            }
        };

        match self
            .store
            .transition(
                &fresh.session_id,
                SessionState::ActiveAi,
                SessionState::EscalatedUnclaimed,
                TransitionFields {
                    workspace_thread_key: Some(thread_key.clone()),
                    escalation_reason: Some(reason.to_string()),
                    ..Default::default()
                },
            )
            .await
        {
            Ok(escalated) => {
                info!(
                    session_id = %escalated.session_id,
                    thread_key = %thread_key,
                    reason,
                    "session escalated"
                );
                self.relay.system_line(&escalated, SPECIALIST_ACK).await
            }
            Err(DeskpilotError::Stale { actual, .. }) => {
                info!(
                    session_id = %fresh.session_id,
                    actual = %actual,
                    "escalation raced with another transition"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Appends an AI reply (guarded on authority) and delivers it. A drop
    /// because the session escalated mid-generation is an audit event,
    /// not an error.
    async fn reply_ai(
        &self,
        session: &Session,
        text: &str,
        decorate: impl FnOnce(SessionMessage) -> SessionMessage,
    ) -> Result<(), DeskpilotError> {
        let message = decorate(SessionMessage::ai(text, Utc::now()));
        if self
            .store
            .append_ai_message(&session.session_id, message)
            .await?
            .is_none()
        {
            info!(
                session_id = %session.session_id,
                "AI reply dropped, session no longer AI-authoritative"
            );
            return Ok(());
        }
        self.surface.send_text(&session.channel_key, text).await
    }

    fn format_offers(&self, offers: &[SlotOffer]) -> Result<String, DeskpilotError> {
        let mut lines = Vec::with_capacity(offers.len());
        for offer in offers {
            lines.push(format!(
                "{}) {}",
                offer.offer_index,
                self.slots.describe(offer)?
            ));
        }
        Ok(lines.join("\n"))
    }
}

/// Extracts a seat/user count from phrasing like "for 500 seats".
fn parse_seat_count(text: &str) -> Option<u32> {
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    for pair in words.windows(2) {
        if let Ok(count) = pair[0].parse::<u32>() {
            let next = pair[1].to_lowercase();
            if ["seat", "user", "employee", "license", "people", "person"]
                .iter()
                .any(|unit| next.starts_with(unit))
            {
                return Some(count);
            }
        }
    }
    None
}
