use serde::Serialize;

use super::error::err;
use super::types::{AppState, Request};
use crate::store;

/// Admin gate for mutating methods. Returns the ready error response when the
/// session has not authenticated, None when the call may proceed.
pub fn require_admin(state: &AppState, req: &Request) -> Option<serde_json::Value> {
    if state.admin {
        None
    } else {
        Some(err(&req.id, "not_authorized", "admin login required", None))
    }
}

pub fn param_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

pub fn param_u32(req: &Request, key: &str) -> Option<u32> {
    req.params
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
}

/// An array of strings, or None when the key is missing or any element is
/// not a string. Callers treat None as bad_params.
pub fn param_str_list(req: &Request, key: &str) -> Option<Vec<String>> {
    let arr = req.params.get(key)?.as_array()?;
    let mut out = Vec::with_capacity(arr.len());
    for v in arr {
        out.push(v.as_str()?.to_string());
    }
    Some(out)
}

/// An array of non-negative integers, with the same contract as
/// `param_str_list`.
pub fn param_u32_list(req: &Request, key: &str) -> Option<Vec<u32>> {
    let arr = req.params.get(key)?.as_array()?;
    let mut out = Vec::with_capacity(arr.len());
    for v in arr {
        out.push(v.as_u64().and_then(|n| u32::try_from(n).ok())?);
    }
    Some(out)
}

/// Writes one collection back after a successful mutation. Returns the ready
/// error response if the write fails, None on success.
pub fn persist<T: Serialize>(
    conn: &rusqlite::Connection,
    req: &Request,
    key: &str,
    items: &[T],
) -> Option<serde_json::Value> {
    match store::save_collection(conn, key, items) {
        Ok(()) => None,
        Err(e) => Some(err(&req.id, "db_save_failed", e.to_string(), None)),
    }
}
