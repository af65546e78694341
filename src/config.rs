//! Session configuration: role, identities, and the venue-specific logon
//! parameters, assembled through a builder and validated at `build()` time.

use serde::{Deserialize, Serialize};

use crate::error::{FixConnectorError, Result};

/// Which of the venue's two endpoint roles a session speaks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    OrderEntry,
    MarketData,
}

impl Role {
    pub fn default_sender_comp_id(self) -> &'static str {
        match self {
            Role::OrderEntry => "BOETRADE",
            Role::MarketData => "BMDWATCH",
        }
    }
}

/// Target company identifier is fixed by the venue for every session.
pub const TARGET_COMP_ID: &str = "SPOT";

/// FIX message handling mode carried in Logon (tag 25035).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageHandling {
    Unordered = 1,
    Sequenced = 2,
}

/// Response verbosity for Order Entry sessions (tag 25036).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseMode {
    Everything = 0,
    OnlyAcks = 1,
    OnlyFinalStates = 2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub role: Role,
    pub sender_comp_id: String,
    pub target_comp_id: String,
    pub api_key: String,
    pub endpoint: String,
    pub heart_bt_int: u32,
    pub message_handling: MessageHandling,
    pub response_mode: Option<ResponseMode>,
    pub drop_copy_flag: Option<char>,
    pub recv_window: Option<u32>,
    pub restart_enabled: bool,
}

impl SessionConfig {
    pub fn builder(role: Role) -> SessionConfigBuilder {
        SessionConfigBuilder::new(role)
    }
}

#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    role: Option<Role>,
    sender_comp_id: Option<String>,
    target_comp_id: Option<String>,
    api_key: Option<String>,
    endpoint: Option<String>,
    heart_bt_int: Option<u32>,
    message_handling: Option<MessageHandling>,
    response_mode: Option<ResponseMode>,
    drop_copy_flag: Option<char>,
    recv_window: Option<u32>,
    restart_enabled: Option<bool>,
}

impl SessionConfigBuilder {
    pub fn new(role: Role) -> Self {
        Self {
            role: Some(role),
            ..Default::default()
        }
    }

    pub fn sender_comp_id(mut self, v: impl Into<String>) -> Self {
        self.sender_comp_id = Some(v.into());
        self
    }

    pub fn api_key(mut self, v: impl Into<String>) -> Self {
        self.api_key = Some(v.into());
        self
    }

    pub fn endpoint(mut self, v: impl Into<String>) -> Self {
        self.endpoint = Some(v.into());
        self
    }

    pub fn heart_bt_int(mut self, v: u32) -> Self {
        self.heart_bt_int = Some(v);
        self
    }

    pub fn message_handling(mut self, v: MessageHandling) -> Self {
        self.message_handling = Some(v);
        self
    }

    pub fn response_mode(mut self, v: ResponseMode) -> Self {
        self.response_mode = Some(v);
        self
    }

    pub fn drop_copy_flag(mut self, v: char) -> Self {
        self.drop_copy_flag = Some(v);
        self
    }

    pub fn recv_window(mut self, v: u32) -> Self {
        self.recv_window = Some(v);
        self
    }

    pub fn restart_enabled(mut self, v: bool) -> Self {
        self.restart_enabled = Some(v);
        self
    }

    pub fn build(self) -> Result<SessionConfig> {
        let role = self
            .role
            .ok_or_else(|| FixConnectorError::InvalidConfig("role missing".into()))?;
        let sender_comp_id = self
            .sender_comp_id
            .unwrap_or_else(|| role.default_sender_comp_id().to_string());
        let api_key = self
            .api_key
            .ok_or_else(|| FixConnectorError::InvalidConfig("api_key missing".into()))?;
        let endpoint = self
            .endpoint
            .ok_or_else(|| FixConnectorError::InvalidConfig("endpoint missing".into()))?;

        Ok(SessionConfig {
            role,
            sender_comp_id,
            target_comp_id: self
                .target_comp_id
                .unwrap_or_else(|| TARGET_COMP_ID.to_string()),
            api_key,
            endpoint,
            heart_bt_int: self.heart_bt_int.unwrap_or(30),
            message_handling: self.message_handling.unwrap_or(MessageHandling::Sequenced),
            response_mode: self.response_mode,
            drop_copy_flag: self.drop_copy_flag,
            recv_window: self.recv_window,
            restart_enabled: self.restart_enabled.unwrap_or(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_entry_defaults_sender_comp_id() {
        let cfg = SessionConfig::builder(Role::OrderEntry)
            .api_key("k")
            .endpoint("tcp+tls://h:1")
            .build()
            .unwrap();
        assert_eq!(cfg.sender_comp_id, "BOETRADE");
        assert_eq!(cfg.target_comp_id, "SPOT");
        assert_eq!(cfg.heart_bt_int, 30);
    }

    #[test]
    fn missing_api_key_is_invalid_config() {
        let err = SessionConfig::builder(Role::MarketData)
            .endpoint("tcp+tls://h:1")
            .build()
            .unwrap_err();
        assert!(matches!(err, FixConnectorError::InvalidConfig(_)));
    }
}
