use serde::Serialize;

use super::RecipientAddress;

/// Outcome of the single attempt made for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendResult {
    pub email: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendResult {
    pub fn succeeded(recipient: &RecipientAddress) -> Self {
        Self {
            email: recipient.as_ref().to_owned(),
            success: true,
            error: None,
        }
    }

    pub fn failed(recipient: &RecipientAddress, error: impl Into<String>) -> Self {
        Self {
            email: recipient.as_ref().to_owned(),
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub percent_succeeded: u8,
}

/// The ordered results of one dispatch run.
#[derive(Debug, Clone, Default)]
pub struct DispatchRun {
    results: Vec<SendResult>,
    // The recipient whose send has started but not yet reported back.
    in_flight: Option<RecipientAddress>,
}

impl DispatchRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, recipient: &RecipientAddress) {
        self.in_flight = Some(recipient.clone());
    }

    pub fn record(&mut self, result: SendResult) {
        self.in_flight = None;
        self.results.push(result);
    }

    /// Closes a run that was cut short. A send that was still in progress
    /// is recorded as failed, although the server may have accepted it.
    pub fn interrupt(&mut self, reason: &str) {
        if let Some(recipient) = self.in_flight.take() {
            self.results.push(SendResult::failed(
                &recipient,
                format!("outcome unknown, {} while the message was being sent", reason),
            ));
        }
    }

    pub fn results(&self) -> &[SendResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<SendResult> {
        self.results
    }

    pub fn stats(&self) -> DispatchStats {
        let total = self.results.len();
        let succeeded = self.results.iter().filter(|r| r.success).count();
        let percent_succeeded = if total == 0 {
            0
        } else {
            ((succeeded as f64 / total as f64) * 100.0).round() as u8
        };

        DispatchStats {
            total,
            succeeded,
            failed: total - succeeded,
            percent_succeeded,
        }
    }
}
