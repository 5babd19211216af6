//! HTTP client for the telephony bridge.

use async_trait::async_trait;
use serde::Serialize;

use dialout_calls::{InstructionType, ScheduledCall};

/// Wire payload for `POST {base}/outbound/call`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundCallRequest {
    pub target_phone: String,
    pub call_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_instruction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction_type: Option<InstructionType>,
    pub use_default_template: bool,
}

impl OutboundCallRequest {
    pub fn from_call(call: &ScheduledCall) -> Self {
        Self {
            target_phone: call.target_phone.to_string(),
            call_id: call.id.to_string(),
            ai_mode: call.payload.ai_mode.clone(),
            custom_prompt: call.payload.custom_prompt.clone(),
            call_instruction: call.payload.call_instruction.clone(),
            instruction_type: call.payload.instruction_type,
            use_default_template: call.payload.use_default_template,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BridgeError {
    #[error("bridge unreachable: {0}")]
    Transport(String),
    #[error("bridge rejected the call: HTTP {0}")]
    Status(u16),
}

/// Seam between the dispatcher and the bridge transport.
#[async_trait]
pub trait BridgeClient: Send + Sync {
    async fn start_call(
        &self,
        base_url: &str,
        service_token: &str,
        request: &OutboundCallRequest,
    ) -> Result<(), BridgeError>;
}

/// reqwest-backed bridge client.
#[derive(Debug, Clone, Default)]
pub struct HttpBridgeClient {
    http: reqwest::Client,
}

impl HttpBridgeClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BridgeClient for HttpBridgeClient {
    async fn start_call(
        &self,
        base_url: &str,
        service_token: &str,
        request: &OutboundCallRequest,
    ) -> Result<(), BridgeError> {
        let url = format!("{}/outbound/call", base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(service_token)
            .json(request)
            .send()
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Status(status.as_u16()));
        }
        Ok(())
    }
}
