//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (JSON over length-prefixed frames)
//!
//! ### Frame Format
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │         Payload             │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - `write`:  keys + values (+ `hold_lock`, `report_skipped`)
//! - `read`:   keys
//! - `lock`:   keys + mode (default `read`)
//! - `unlock`: keys
//!
//! ### Response
//! - `{"success": true}` with `values` for reads
//! - `{"success": false, "error": "..."}` on any failure

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType, Request};
pub use response::Response;
pub use codec::{
    encode_frame, encode_command, decode_command, encode_response, decode_response,
    read_frame, write_frame, write_command, read_response, write_response,
    HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
