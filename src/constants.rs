//! FIX tag numbers and message-type codes used by the session engine.
//!
//! This module intentionally does not map these codes to human-readable
//! labels (e.g. side "1" -> "BUY"); that translation is a caller concern.

pub mod tags {
    pub const BEGIN_STRING: u32 = 8;
    pub const BODY_LENGTH: u32 = 9;
    pub const CHECK_SUM: u32 = 10;
    pub const CL_ORD_ID: u32 = 11;
    pub const CUM_QTY: u32 = 14;
    pub const CURRENCY: u32 = 15;
    pub const BEGIN_SEQ_NO: u32 = 7;
    pub const END_SEQ_NO: u32 = 16;
    pub const LAST_QTY: u32 = 32;
    pub const MSG_SEQ_NUM: u32 = 34;
    pub const MSG_TYPE: u32 = 35;
    pub const NEW_SEQ_NO: u32 = 36;
    pub const ORDER_ID: u32 = 37;
    pub const ORDER_QTY: u32 = 38;
    pub const ORD_STATUS: u32 = 39;
    pub const ORD_TYPE: u32 = 40;
    pub const PRICE: u32 = 44;
    pub const SENDER_COMP_ID: u32 = 49;
    pub const SENDING_TIME: u32 = 52;
    pub const SIDE: u32 = 54;
    pub const SYMBOL: u32 = 55;
    pub const TARGET_COMP_ID: u32 = 56;
    pub const TEXT: u32 = 58;
    pub const TIME_IN_FORCE: u32 = 59;
    pub const TRANSACT_TIME: u32 = 60;
    pub const NO_ORDERS: u32 = 73;
    pub const ORD_REJ_REASON: u32 = 103;
    pub const RAW_DATA_LENGTH: u32 = 95;
    pub const RAW_DATA: u32 = 96;
    pub const ENCRYPT_METHOD: u32 = 98;
    pub const HEART_BT_INT: u32 = 108;
    pub const TEST_REQ_ID: u32 = 112;
    pub const GAP_FILL_FLAG: u32 = 123;
    pub const RESET_SEQ_NUM_FLAG: u32 = 141;
    pub const NO_SYMBOLS: u32 = 146;
    pub const HEADLINE: u32 = 148;
    pub const EXEC_TYPE: u32 = 150;
    pub const LEAVES_QTY: u32 = 151;
    pub const MD_REQ_ID: u32 = 262;
    pub const SUBSCRIPTION_REQUEST_TYPE: u32 = 263;
    pub const MARKET_DEPTH: u32 = 264;
    pub const AGGREGATED_BOOK: u32 = 266;
    pub const NO_MD_ENTRY_TYPES: u32 = 267;
    pub const NO_MD_ENTRIES: u32 = 268;
    pub const MD_ENTRY_TYPE: u32 = 269;
    pub const MD_ENTRY_PX: u32 = 270;
    pub const MD_ENTRY_SIZE: u32 = 271;
    pub const MD_UPDATE_ACTION: u32 = 279;
    pub const INSTRUMENT_REQ_ID: u32 = 320;
    pub const LIST_STATUS_TYPE: u32 = 429;
    pub const LIST_ORDER_STATUS: u32 = 431;
    pub const USERNAME: u32 = 553;
    pub const INSTRUMENT_LIST_REQUEST_TYPE: u32 = 559;
    pub const CONTINGENCY_TYPE: u32 = 1385;
    pub const LIMIT_TYPE: u32 = 6136;

    // Venue-specific (Binance spot FIX API)
    pub const RECV_WINDOW: u32 = 25000;
    pub const SELF_TRADE_PREVENTION_MODE: u32 = 25001;
    pub const CL_LIST_ID: u32 = 25014;
    pub const ERROR_CODE: u32 = 25016;
    pub const CUM_QUOTE_QTY: u32 = 25017;
    pub const MESSAGE_HANDLING: u32 = 25035;
    pub const RESPONSE_MODE: u32 = 25036;
    pub const FIRST_BOOK_ID: u32 = 25043;
    pub const LAST_BOOK_ID: u32 = 25044;
    pub const DROP_COPY_FLAG: u32 = 9406;
}

pub mod msg_types {
    pub const HEARTBEAT: &str = "0";
    pub const TEST_REQUEST: &str = "1";
    pub const RESEND_REQUEST: &str = "2";
    pub const REJECT: &str = "3";
    pub const SEQUENCE_RESET: &str = "4";
    pub const LOGOUT: &str = "5";
    pub const LOGON: &str = "A";
    pub const NEWS: &str = "B";
}

/// BeginString carried by every frame; this connector only ever speaks FIX 4.4.
pub const BEGIN_STRING: &str = "FIX.4.4";

/// Length in bytes of the trailer `"10=NNN\x01"`.
pub const TRAILER_LEN: usize = 7;
