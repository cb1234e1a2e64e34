//! Persisted per-session state.
//!
//! One `Session` record lives in the cache under `ussd:{session_id}` for as
//! long as the caller keeps interacting (TTL refreshed on every write).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::customer::Customer;

/// Lifecycle status of a stored session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Mid-flow, awaiting the next input.
    Active,
    /// The last reply ended the session. A later request for the same id
    /// starts over.
    Ended,
}

/// Text withheld by pagination, resumed with the continuation trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPage {
    /// Language the remainder was rendered in.
    pub language: String,
    /// Remaining text, not yet shown.
    pub text: String,
    /// Whether the reply this text belongs to ends the session.
    pub ends_session: bool,
}

/// The conversational state of one caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub msisdn: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub language: String,
    pub network_operator: String,
    pub current_step_id: String,
    pub last_input: Option<String>,
    pub last_response: Option<String>,
    pub pending_continuation: Option<PendingPage>,
    /// Previously visited steps, most recent last.
    #[serde(default)]
    pub history: Vec<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Start a session positioned on `initial_step`.
    pub fn new(
        session_id: impl Into<String>,
        msisdn: impl Into<String>,
        network_operator: impl Into<String>,
        language: impl Into<String>,
        initial_step: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            msisdn: msisdn.into(),
            customer_id: None,
            customer_name: None,
            language: language.into(),
            network_operator: network_operator.into(),
            current_step_id: initial_step.into(),
            last_input: None,
            last_response: None,
            pending_continuation: None,
            history: Vec::new(),
            status: SessionStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach an identified customer. Overrides the language when the
    /// customer has a stored locale.
    pub fn with_customer(mut self, customer: &Customer) -> Self {
        self.customer_id = Some(customer.id.clone());
        self.customer_name = Some(customer.display_name.clone());
        if let Some(locale) = customer.locale.as_deref().filter(|l| !l.is_empty()) {
            self.language = locale.to_string();
        }
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Take the pending continuation if it was rendered in the session's
    /// current language. Continuations in any other language are dropped.
    pub fn take_continuation(&mut self) -> Option<PendingPage> {
        let pending = self.pending_continuation.take()?;
        if pending.language == self.language && !pending.text.is_empty() {
            Some(pending)
        } else {
            None
        }
    }

    /// Whether a non-empty continuation exists for the current language.
    pub fn has_continuation(&self) -> bool {
        self.pending_continuation
            .as_ref()
            .is_some_and(|p| p.language == self.language && !p.text.is_empty())
    }

    /// Move to `next_step`, remembering the current one for back navigation.
    ///
    /// History is bounded to `max_history` entries (oldest dropped first).
    pub fn advance_to(&mut self, next_step: &str, max_history: usize) {
        if self.current_step_id != next_step && max_history > 0 {
            self.history.push(std::mem::take(&mut self.current_step_id));
            if self.history.len() > max_history {
                let excess = self.history.len() - max_history;
                self.history.drain(..excess);
            }
        }
        self.current_step_id = next_step.to_string();
    }

    /// Return to the previously visited step, if any.
    pub fn go_back(&mut self) -> Option<&str> {
        let previous = self.history.pop()?;
        self.current_step_id = previous;
        Some(&self.current_step_id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
