//! Dispatcher Module
//!
//! Turns one decoded command into a session call and a response.
//!
//! | command  | success payload                  | failure                |
//! |----------|----------------------------------|------------------------|
//! | `write`  | `{success:true}` (+ `skipped`)   | `ArityMismatch`        |
//! | `read`   | `{success:true, values:{...}}`   | `NotFound` (empty map) |
//! | `lock`   | `{success:true}`                 | -                      |
//! | `unlock` | `{success:true}`                 | -                      |
//!
//! The dispatcher owns no state; everything lives in the `Session` and the
//! shared `Store` behind it.

use crate::error::{KvError, Result};
use crate::protocol::{decode_command, encode_response, Command, Response};
use crate::session::Session;

/// Returned when even a failure response cannot be serialized
const FALLBACK_RESPONSE: &[u8] = br#"{"success":false,"error":"Internal error"}"#;

/// Execute a command against a session
pub fn dispatch(session: &mut Session, command: Command) -> Result<Response> {
    match command {
        Command::Write {
            keys,
            values,
            hold_lock,
            report_skipped,
        } => {
            let outcome = session.write(&keys, &values, hold_lock)?;
            if report_skipped {
                Ok(Response::with_skipped(outcome.skipped))
            } else {
                Ok(Response::ok())
            }
        }
        Command::Read { keys } => {
            let values = session.read(&keys);
            if values.is_empty() {
                return Err(KvError::NotFound);
            }
            Ok(Response::with_values(values))
        }
        Command::Lock { keys, mode } => {
            session.lock(&keys, mode);
            Ok(Response::ok())
        }
        Command::Unlock { keys } => {
            session.unlock(&keys);
            Ok(Response::ok())
        }
    }
}

/// Handle one raw message and produce the raw reply
///
/// This is the per-message error boundary: every failure, from malformed
/// JSON to an unknown command, becomes `{success:false, error}` and the
/// caller keeps serving the connection.
pub fn handle_message(session: &mut Session, raw: &[u8]) -> Vec<u8> {
    let response = match decode_command(raw).and_then(|command| {
        tracing::trace!("Session {} executing {:?}", session.id(), command.command_type());
        dispatch(session, command)
    }) {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Session {} request failed: {}", session.id(), e);
            Response::error(&e.to_string())
        }
    };

    encode_response(&response).unwrap_or_else(|e| {
        tracing::warn!("Failed to encode response for {}: {}", session.id(), e);
        FALLBACK_RESPONSE.to_vec()
    })
}
