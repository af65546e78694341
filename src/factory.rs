//! Convenience constructors that preset session parameters per venue role
//! and return an already connected, logged-on session.

use std::sync::Arc;

use crate::config::{MessageHandling, ResponseMode, Role, SessionConfig};
use crate::error::Result;
use crate::session::Session;
use crate::signing::SigningCredential;

/// Connects and logs on an Order Entry session: `SenderCompID=BOETRADE`,
/// `message_handling=2`, `response_mode=1`, `drop_copy_flag=N` by default.
pub async fn create_order_entry_session(
    api_key: impl Into<String>,
    private_key_pem: &str,
    endpoint: impl Into<String>,
) -> Result<Arc<Session>> {
    let credential = SigningCredential::from_pem(private_key_pem)?;
    let config = SessionConfig::builder(Role::OrderEntry)
        .api_key(api_key)
        .endpoint(endpoint)
        .heart_bt_int(30)
        .message_handling(MessageHandling::Sequenced)
        .response_mode(ResponseMode::OnlyAcks)
        .drop_copy_flag('N')
        .build()?;
    Session::connect(config, credential).await
}

/// Connects and logs on a Market Data session: `SenderCompID=BMDWATCH`,
/// `message_handling=2` by default, optionally carrying `recv_window`.
pub async fn create_market_data_session(
    api_key: impl Into<String>,
    private_key_pem: &str,
    endpoint: impl Into<String>,
    recv_window: Option<u32>,
) -> Result<Arc<Session>> {
    let credential = SigningCredential::from_pem(private_key_pem)?;
    let mut builder = SessionConfig::builder(Role::MarketData)
        .api_key(api_key)
        .endpoint(endpoint)
        .heart_bt_int(30)
        .message_handling(MessageHandling::Sequenced);
    if let Some(window) = recv_window {
        builder = builder.recv_window(window);
    }
    Session::connect(builder.build()?, credential).await
}
