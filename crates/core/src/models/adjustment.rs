//! Manual point adjustment models for `POST /loyalty/profiles/{id}/adjust/`

use crate::types::ProfileId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A reason-annotated change to a profile's point balance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentRequest {
    /// Target profile (goes into the URL, not the body)
    pub id: ProfileId,
    /// Signed point change
    pub delta: i64,
    /// Mandatory justification
    pub reason: String,
    /// Optional external reference (ticket, order number, ...)
    pub reference: Option<String>,
}

impl AdjustmentRequest {
    pub fn new(id: impl Into<ProfileId>, delta: i64, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            delta,
            reason: reason.into(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Endpoint path for this adjustment
    pub fn path(&self) -> String {
        format!("/loyalty/profiles/{}/adjust/", self.id)
    }

    /// Request body sent to the backend
    pub fn body(&self) -> AdjustmentBody<'_> {
        AdjustmentBody {
            delta: self.delta,
            reason: &self.reason,
            reference: self.reference.as_deref(),
        }
    }
}

/// JSON body of an adjustment.
///
/// An absent `reference` is omitted from the body; an empty string is sent
/// as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdjustmentBody<'a> {
    pub delta: i64,
    pub reason: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<&'a str>,
}

/// Backend's answer to an adjustment (adjusted profile or a confirmation record)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdjustmentResponse(pub Value);

impl AdjustmentResponse {
    /// Interpret the payload as an adjusted profile, if it has that shape
    pub fn as_profile(&self) -> Option<crate::Profile> {
        serde_json::from_value(self.0.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_uses_profile_id() {
        let req = AdjustmentRequest::new(5, 10, "bonus");
        assert_eq!(req.path(), "/loyalty/profiles/5/adjust/");
    }

    #[test]
    fn test_missing_reference_is_omitted() {
        let req = AdjustmentRequest::new(5, 10, "bonus");
        let body = serde_json::to_value(req.body()).unwrap();
        assert_eq!(body, json!({"delta": 10, "reason": "bonus"}));
    }

    #[test]
    fn test_empty_reference_is_sent_verbatim() {
        let req = AdjustmentRequest::new(7, -25, "correction").with_reference("");
        let body = serde_json::to_value(req.body()).unwrap();
        assert_eq!(body, json!({"delta": -25, "reason": "correction", "reference": ""}));
    }

    #[test]
    fn test_response_as_profile() {
        let resp = AdjustmentResponse(json!({"id": 5, "points": 110, "tier": "gold"}));
        let profile = resp.as_profile().unwrap();
        assert_eq!(profile.points, Some(110));
        assert_eq!(profile.field("tier"), Some(&json!("gold")));
    }
}
