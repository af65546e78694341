//! The session engine: connection lifecycle, the logon handshake, the
//! receive loop, and the restart scheduler.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::config::{Role, SessionConfig};
use crate::constants::{msg_types, tags};
use crate::error::{FixConnectorError, Result};
use crate::message::FixMessage;
use crate::signing::{LogonSignaturePayload, SigningCredential};
use crate::time::now_sending_time;
use crate::transport::{Endpoint, TlsTransport, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    LoggedOn,
    LoggingOut,
    Closed,
}

struct SessionCore {
    state: SessionState,
    transport: Option<Box<dyn Transport>>,
    recv_buf: BytesMut,
    out_seq: u64,
    sent_messages: Vec<FixMessage>,
    last_sent: tokio::time::Instant,
}

#[derive(Default)]
struct RestartState {
    scheduled: bool,
    timer: Option<JoinHandle<()>>,
}

/// A live FIX session against one venue endpoint role.
///
/// Always handed out as `Arc<Session>`: the background receive task and the
/// restart scheduler both hold a clone so they can call back into the
/// session (e.g. to answer a TestRequest or to cut over during a restart).
pub struct Session {
    config: SessionConfig,
    credential: SigningCredential,
    core: Arc<Mutex<SessionCore>>,
    inbound_tx: mpsc::UnboundedSender<FixMessage>,
    inbound_rx: Mutex<mpsc::UnboundedReceiver<FixMessage>>,
    inbound_len: AtomicUsize,
    receive_task: Mutex<Option<JoinHandle<()>>>,
    restart: Mutex<RestartState>,
}

impl Session {
    /// Opens a TLS connection to `config.endpoint`, performs the logon
    /// handshake, and starts the background receive task.
    pub async fn connect(config: SessionConfig, credential: SigningCredential) -> Result<Arc<Self>> {
        let endpoint = Endpoint::parse(&config.endpoint)?;
        let transport = TlsTransport::connect(&endpoint).await?;
        Self::connect_with_transport(config, credential, Box::new(transport)).await
    }

    /// Same as [`Session::connect`] but over a caller-supplied transport.
    /// Used by tests to drive the engine over a plain TCP loopback instead
    /// of a real TLS endpoint.
    pub async fn connect_with_transport(
        config: SessionConfig,
        credential: SigningCredential,
        transport: Box<dyn Transport>,
    ) -> Result<Arc<Self>> {
        let mut core = SessionCore {
            state: SessionState::Connecting,
            transport: Some(transport),
            recv_buf: BytesMut::new(),
            out_seq: 1,
            sent_messages: Vec::new(),
            last_sent: tokio::time::Instant::now(),
        };

        Self::perform_logon(&mut core, &config, &credential).await?;
        core.state = SessionState::LoggedOn;

        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(Session {
            config,
            credential,
            core: Arc::new(Mutex::new(core)),
            inbound_tx: tx,
            inbound_rx: Mutex::new(rx),
            inbound_len: AtomicUsize::new(0),
            receive_task: Mutex::new(None),
            restart: Mutex::new(RestartState::default()),
        });

        let task_session = Arc::clone(&session);
        let handle = tokio::spawn(async move {
            task_session.run_receive_loop().await;
        });
        *session.receive_task.lock().await = Some(handle);

        Ok(session)
    }

    /// Builds, signs, and sends the Logon message, then blocks until the
    /// server's Logon reply arrives (or the handshake is rejected).
    async fn perform_logon(
        core: &mut SessionCore,
        config: &SessionConfig,
        credential: &SigningCredential,
    ) -> Result<()> {
        let seq = core.out_seq;
        let sending_time = now_sending_time();

        let mut msg = FixMessage::with_basic_header(msg_types::LOGON);
        msg.append_pair(tags::SENDER_COMP_ID, config.sender_comp_id.clone());
        msg.append_pair(tags::TARGET_COMP_ID, config.target_comp_id.clone());
        msg.append_pair(tags::MSG_SEQ_NUM, seq.to_string());
        msg.append_pair(tags::SENDING_TIME, sending_time.clone());
        if let Some(recv_window) = config.recv_window {
            msg.append_pair(tags::RECV_WINDOW, recv_window.to_string());
        }
        msg.append_pair(tags::ENCRYPT_METHOD, "0");
        msg.append_pair(tags::HEART_BT_INT, config.heart_bt_int.to_string());

        let payload = LogonSignaturePayload {
            msg_type: msg_types::LOGON,
            sender_comp_id: &config.sender_comp_id,
            target_comp_id: &config.target_comp_id,
            msg_seq_num: seq,
            sending_time: &sending_time,
        };
        let signature = credential.sign_logon(&payload);
        msg.append_pair(tags::RAW_DATA_LENGTH, signature.len().to_string());
        msg.append_pair(tags::RAW_DATA, signature);

        msg.append_pair(tags::RESET_SEQ_NUM_FLAG, "Y");
        msg.append_pair(tags::USERNAME, config.api_key.clone());
        msg.append_pair(
            tags::MESSAGE_HANDLING,
            (config.message_handling as u32).to_string(),
        );

        if config.role == Role::OrderEntry {
            if let Some(response_mode) = config.response_mode {
                msg.append_pair(tags::RESPONSE_MODE, (response_mode as u32).to_string());
            }
            if let Some(flag) = config.drop_copy_flag {
                msg.append_pair(tags::DROP_COPY_FLAG, flag.to_string());
            }
        }

        let bytes = msg.encode()?;
        {
            let transport = core
                .transport
                .as_mut()
                .ok_or(FixConnectorError::NotConnected)?;
            transport.send_all(&bytes).await?;
        }
        core.sent_messages.push(msg);
        core.out_seq += 1;
        core.last_sent = tokio::time::Instant::now();

        Self::await_logon_reply(core).await
    }

    async fn await_logon_reply(core: &mut SessionCore) -> Result<()> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            match FixMessage::decode(&core.recv_buf)? {
                Some((reply, consumed)) => {
                    core.recv_buf.advance(consumed);
                    match reply.msg_type() {
                        Some(t) if t == msg_types::LOGON => return Ok(()),
                        Some(t) if t == msg_types::REJECT || t == msg_types::LOGOUT => {
                            let text = reply.get_str(tags::TEXT, 1).unwrap_or("no reason given");
                            return Err(FixConnectorError::LogonRejected(text.to_string()));
                        }
                        _ => continue,
                    }
                }
                None => {
                    let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                    if remaining.is_zero() {
                        return Err(FixConnectorError::LogonRejected(
                            "timed out waiting for logon reply".into(),
                        ));
                    }
                    let transport = core
                        .transport
                        .as_mut()
                        .ok_or(FixConnectorError::NotConnected)?;
                    let chunk = tokio::time::timeout(remaining, transport.recv(4096))
                        .await
                        .map_err(|_| {
                            FixConnectorError::LogonRejected(
                                "timed out waiting for logon reply".into(),
                            )
                        })??;
                    if chunk.is_empty() {
                        return Err(FixConnectorError::TransportFailure(
                            "connection closed during logon".into(),
                        ));
                    }
                    core.recv_buf.extend_from_slice(&chunk);
                }
            }
        }
    }

    /// Returns a new message with BeginString, a placeholder BodyLength, and
    /// MsgType populated.
    pub fn create_fix_message_with_basic_header(&self, msg_type: &str) -> FixMessage {
        FixMessage::with_basic_header(msg_type)
    }

    /// Stamps identity/sequencing fields, finalizes the frame, and writes it
    /// to the transport. Returns the stamped message as sent.
    pub async fn send_message(&self, mut msg: FixMessage) -> Result<FixMessage> {
        let mut core = self.core.lock().await;
        if core.state != SessionState::LoggedOn {
            return Err(FixConnectorError::NotConnected);
        }
        let seq = core.out_seq;
        msg.append_pair(tags::SENDER_COMP_ID, self.config.sender_comp_id.clone());
        msg.append_pair(tags::TARGET_COMP_ID, self.config.target_comp_id.clone());
        msg.append_pair(tags::MSG_SEQ_NUM, seq.to_string());
        msg.append_pair(tags::SENDING_TIME, now_sending_time());

        let bytes = msg.encode()?;
        let transport = core
            .transport
            .as_mut()
            .ok_or(FixConnectorError::NotConnected)?;
        transport.send_all(&bytes).await?;
        core.out_seq += 1;
        core.sent_messages.push(msg.clone());
        core.last_sent = tokio::time::Instant::now();

        tracing::info!(msg_type = msg.msg_type(), seq, "sent message");
        Ok(msg)
    }

    /// Drains the inbound queue, returning every message up to and
    /// including the first whose MsgType is in `types` (and, if
    /// `cl_ord_id` is set, whose ClOrdID matches). Returns whatever has
    /// been drained so far if `timeout_seconds` elapses first.
    pub async fn retrieve_messages_until(
        &self,
        types: &[&str],
        cl_ord_id: Option<&str>,
        timeout_seconds: u64,
    ) -> Vec<FixMessage> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(timeout_seconds);
        let mut drained = Vec::new();
        let mut rx = self.inbound_rx.lock().await;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return drained;
            }
            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Some(msg)) => {
                    self.inbound_len.fetch_sub(1, Ordering::SeqCst);
                    let type_matches = msg.msg_type().map(|t| types.contains(&t)).unwrap_or(false);
                    let cl_ord_matches = match cl_ord_id {
                        Some(id) => msg.get_str(tags::CL_ORD_ID, 1) == Some(id),
                        None => true,
                    };
                    let is_stop = type_matches && cl_ord_matches;
                    drained.push(msg);
                    if is_stop {
                        return drained;
                    }
                }
                Ok(None) | Err(_) => return drained,
            }
        }
    }

    /// Drains and returns every message currently queued, without blocking.
    pub async fn get_all_new_messages_received(&self) -> Vec<FixMessage> {
        let mut rx = self.inbound_rx.lock().await;
        let mut drained = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            self.inbound_len.fetch_sub(1, Ordering::SeqCst);
            drained.push(msg);
        }
        drained
    }

    /// Sends Logout and transitions to LOGGING_OUT. The receive loop
    /// transitions to CLOSED once the server's Logout reply arrives.
    pub async fn logout(&self) -> Result<()> {
        let msg = self.create_fix_message_with_basic_header(msg_types::LOGOUT);
        self.send_message(msg).await?;
        self.core.lock().await.state = SessionState::LoggingOut;
        Ok(())
    }

    /// Stops the receive task and any pending restart timer, and closes the
    /// transport. Calling this a second time is a no-op.
    pub async fn disconnect(&self) {
        {
            let mut core = self.core.lock().await;
            if core.state == SessionState::Closed {
                return;
            }
            core.state = SessionState::Closed;
            core.transport = None;
        }
        if let Some(handle) = self.receive_task.lock().await.take() {
            handle.abort();
        }
        if let Some(timer) = self.restart.lock().await.timer.take() {
            timer.abort();
        }
    }

    async fn run_receive_loop(self: Arc<Self>) {
        loop {
            match self.read_and_classify_once().await {
                Ok(true) => continue,
                Ok(false) => break,
                Err(e) => {
                    tracing::error!(error = %e, "receive loop terminated");
                    let mut core = self.core.lock().await;
                    core.state = SessionState::Closed;
                    core.transport = None;
                    break;
                }
            }
        }
    }

    /// Reads one chunk, decodes every complete frame it yields, and
    /// dispatches each to [`Session::classify_and_handle`]. Returns `Ok(true)`
    /// to keep looping, `Ok(false)` once the session has closed.
    async fn read_and_classify_once(self: &Arc<Self>) -> Result<bool> {
        let heartbeat_interval = Duration::from_secs(self.config.heart_bt_int.max(1) as u64);

        let recv_result = {
            let mut core = self.core.lock().await;
            if core.state == SessionState::Closed {
                return Ok(false);
            }
            let remaining = heartbeat_interval.saturating_sub(core.last_sent.elapsed());
            let transport = match core.transport.as_mut() {
                Some(t) => t,
                None => return Ok(false),
            };
            tokio::time::timeout(remaining, transport.recv(4096)).await
        };

        let chunk = match recv_result {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return Err(e),
            Err(_elapsed) => {
                self.emit_heartbeat(None).await?;
                return Ok(true);
            }
        };

        if chunk.is_empty() {
            let mut core = self.core.lock().await;
            core.state = SessionState::Closed;
            core.transport = None;
            return Ok(false);
        }

        let messages = {
            let mut core = self.core.lock().await;
            core.recv_buf.extend_from_slice(&chunk);
            let mut out = Vec::new();
            loop {
                match FixMessage::decode(&core.recv_buf) {
                    Ok(Some((msg, consumed))) => {
                        core.recv_buf.advance(consumed);
                        out.push(msg);
                    }
                    Ok(None) => break,
                    Err(e @ FixConnectorError::ChecksumMismatch { .. })
                    | Err(e @ FixConnectorError::MalformedMessage(_)) => {
                        tracing::warn!(error = %e, "dropping corrupt frame");
                        core.recv_buf.clear();
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
            out
        };

        for msg in messages {
            self.classify_and_handle(msg).await?;
        }
        Ok(true)
    }

    /// Pushes a message onto the inbound queue and tracks its length for
    /// [`Session::inbound_queue_len`].
    fn enqueue(&self, msg: FixMessage) {
        if self.inbound_tx.send(msg).is_ok() {
            self.inbound_len.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Current connection state.
    pub async fn state(&self) -> SessionState {
        self.core.lock().await.state
    }

    /// Number of messages currently queued for [`Session::get_all_new_messages_received`]
    /// or [`Session::retrieve_messages_until`] to drain.
    pub fn inbound_queue_len(&self) -> usize {
        self.inbound_len.load(Ordering::SeqCst)
    }

    /// Snapshot of every message sent so far on this session, for diagnostics.
    pub async fn sent_messages(&self) -> Vec<FixMessage> {
        self.core.lock().await.sent_messages.clone()
    }

    async fn emit_heartbeat(&self, test_req_id: Option<&str>) -> Result<()> {
        let mut msg = self.create_fix_message_with_basic_header(msg_types::HEARTBEAT);
        if let Some(id) = test_req_id {
            msg.append_pair(tags::TEST_REQ_ID, id.to_string());
        }
        self.send_message(msg).await.map(|_| ())
    }

    async fn classify_and_handle(self: &Arc<Self>, msg: FixMessage) -> Result<()> {
        let msg_type = msg.msg_type().unwrap_or("").to_string();
        tracing::info!(
            msg_type = %msg_type,
            sender = msg.get_str(tags::SENDER_COMP_ID, 1).unwrap_or(""),
            seq = msg.get_str(tags::MSG_SEQ_NUM, 1).unwrap_or(""),
            "received message"
        );

        match msg_type.as_str() {
            t if t == msg_types::HEARTBEAT => {}
            t if t == msg_types::TEST_REQUEST => {
                let test_req_id = msg.get_str(tags::TEST_REQ_ID, 1).map(str::to_string);
                self.emit_heartbeat(test_req_id.as_deref()).await?;
            }
            t if t == msg_types::RESEND_REQUEST => {
                tracing::warn!("resend request received; gap recovery is not implemented");
            }
            t if t == msg_types::LOGON => {
                self.core.lock().await.state = SessionState::LoggedOn;
                self.enqueue(msg);
            }
            t if t == msg_types::LOGOUT => {
                let was_logging_out = self.core.lock().await.state == SessionState::LoggingOut;
                self.enqueue(msg);
                if was_logging_out {
                    let mut core = self.core.lock().await;
                    core.state = SessionState::Closed;
                    core.transport = None;
                } else if !self.config.restart_enabled {
                    tracing::warn!("unsolicited logout received, disconnecting");
                    self.disconnect().await;
                }
            }
            t if t == msg_types::NEWS => {
                let text = msg
                    .get_str(tags::TEXT, 1)
                    .or_else(|| msg.get_str(tags::HEADLINE, 1))
                    .unwrap_or("")
                    .to_string();
                tracing::info!(%text, "news received");
                if self.config.restart_enabled {
                    self.arm_restart();
                }
                self.enqueue(msg);
            }
            _ => {
                self.enqueue(msg);
            }
        }
        Ok(())
    }

    /// Arms the 10-minute restart timer the first time it is called;
    /// subsequent calls while one is already scheduled are no-ops.
    fn arm_restart(self: &Arc<Self>) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let mut restart = session.restart.lock().await;
            if restart.scheduled {
                return;
            }
            restart.scheduled = true;
            let when = tokio::time::Instant::now() + Duration::from_secs(10 * 60);
            let timer_session = Arc::clone(&session);
            let handle = tokio::spawn(async move {
                tokio::time::sleep_until(when).await;
                if let Err(e) = timer_session.reconnect().await {
                    tracing::error!(error = %e, "scheduled restart failed");
                }
                let mut restart = timer_session.restart.lock().await;
                restart.scheduled = false;
                restart.timer = None;
            });
            restart.timer = Some(handle);
        });
    }

    /// Creates a successor session with identical parameters, logs it on
    /// over a real TLS connection, then cuts over to it.
    async fn reconnect(self: &Arc<Self>) -> Result<()> {
        tracing::info!("reconnecting session for scheduled restart");
        let successor = Session::connect(self.config.clone(), self.credential.clone()).await?;
        self.cutover_to(successor).await
    }

    /// Adopts `successor`'s MsgSeqNum, transport, inbound queue, and
    /// sent-message list, then tears the successor down. The old transport
    /// is dropped only after cutover.
    async fn cutover_to(self: &Arc<Self>, successor: Arc<Session>) -> Result<()> {
        let (successor_transport, successor_seq, successor_sent) = {
            let mut successor_core = successor.core.lock().await;
            (
                successor_core.transport.take(),
                successor_core.out_seq,
                std::mem::take(&mut successor_core.sent_messages),
            )
        };

        for msg in successor.get_all_new_messages_received().await {
            self.enqueue(msg);
        }

        let old_transport = {
            let mut core = self.core.lock().await;
            let old = core.transport.take();
            core.transport = successor_transport;
            core.out_seq = successor_seq;
            core.sent_messages.extend(successor_sent);
            core.state = SessionState::LoggedOn;
            old
        };
        drop(old_transport);

        successor.disconnect().await;
        Ok(())
    }

    /// Test-only entry point for exercising cutover without a real TLS
    /// endpoint: builds the successor over a caller-supplied transport
    /// instead of dialing `config.endpoint`.
    #[cfg(test)]
    async fn reconnect_with_transport(
        self: &Arc<Self>,
        transport: Box<dyn Transport>,
    ) -> Result<()> {
        let successor =
            Session::connect_with_transport(self.config.clone(), self.credential.clone(), transport)
                .await?;
        self.cutover_to(successor).await
    }
}
