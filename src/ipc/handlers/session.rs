use crate::ipc::error::{err, ok};
use crate::ipc::helpers::param_str;
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;

fn handle_admin_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let (Some(login), Some(password)) = (param_str(req, "login"), param_str(req, "password"))
    else {
        return err(&req.id, "bad_params", "missing login or password", None);
    };

    let stored_login = match store::setting_get(conn, store::SETTING_ADMIN_LOGIN) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let stored_digest = match store::setting_get(conn, store::SETTING_ADMIN_PASSWORD_SHA256) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    // Only the digest of the presented password is ever compared; the stored
    // credential never leaves the settings table.
    let matches = stored_login.as_deref() == Some(login)
        && stored_digest.as_deref() == Some(store::password_sha256(password).as_str());
    if !matches {
        return err(
            &req.id,
            "invalid_credentials",
            "login or password is incorrect",
            None,
        );
    }

    state.admin = true;
    ok(&req.id, json!({ "admin": true }))
}

fn handle_admin_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.admin = false;
    ok(&req.id, json!({ "admin": false }))
}

fn handle_admin_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "admin": state.admin }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "admin.login" => Some(handle_admin_login(state, req)),
        "admin.logout" => Some(handle_admin_logout(state, req)),
        "admin.status" => Some(handle_admin_status(state, req)),
        _ => None,
    }
}
