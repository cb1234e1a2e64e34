//! Gateway wire types.
//!
//! The gateway sends one `UssdRequest` per keystroke and expects a
//! `UssdReply` whose `continuation` is exactly `"FC"` (keep the session open)
//! or `"FB"` (end it).

use serde::{Deserialize, Serialize};

use crate::error::UssdError;

/// One inbound keystroke forwarded by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UssdRequest {
    /// Caller phone number.
    pub msisdn: String,
    /// Raw text typed by the caller (empty on the opening request).
    pub input: String,
    /// Gateway session identifier.
    pub session_id: String,
    /// Mobile network operator code.
    pub network_code: String,
    /// Whether the gateway considers this the first request of a session.
    pub new_request: bool,
}

impl UssdRequest {
    /// Reject requests with blank identifying fields.
    ///
    /// `input` may legitimately be empty (opening request), the others may not.
    pub fn validate(&self) -> Result<(), UssdError> {
        let required = [
            ("msisdn", &self.msisdn),
            ("sessionId", &self.session_id),
            ("networkCode", &self.network_code),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(UssdError::Validation(format!("{field} is required")));
            }
        }
        Ok(())
    }
}

/// Whether the gateway should keep the session open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContinuationFlag {
    /// Await further input.
    #[serde(rename = "FC")]
    Continue,
    /// Terminate the session.
    #[serde(rename = "FB")]
    End,
}

impl ContinuationFlag {
    pub fn from_ended(ended: bool) -> Self {
        if ended {
            ContinuationFlag::End
        } else {
            ContinuationFlag::Continue
        }
    }

    pub fn is_end(self) -> bool {
        self == ContinuationFlag::End
    }
}

/// Reply returned to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UssdReply {
    pub message: String,
    pub continuation: ContinuationFlag,
}

impl UssdReply {
    pub fn new(message: impl Into<String>, ended: bool) -> Self {
        Self {
            message: message.into(),
            continuation: ContinuationFlag::from_ended(ended),
        }
    }

    pub fn is_ended(&self) -> bool {
        self.continuation.is_end()
    }
}
