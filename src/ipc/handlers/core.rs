use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let conn = match store::open_store(&path) {
        Ok(conn) => conn,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
    };
    let outcome = match store::load_collections(&conn) {
        Ok(outcome) => outcome,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
    };
    let stored_room = match store::setting_get(&conn, store::SETTING_CURRENT_ROOM) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    // The stored preference may point at a room deleted since it was saved;
    // fall back to the first room, or none for an empty workspace.
    let current_room_id = stored_room
        .filter(|id| outcome.data.rooms.iter().any(|r| r.id == *id))
        .or_else(|| outcome.data.rooms.first().map(|r| r.id.clone()));

    state.workspace = Some(path.clone());
    state.db = Some(conn);
    state.data = outcome.data;
    state.current_room_id = current_room_id.clone();
    // Switching workspaces never carries a session over.
    state.admin = false;

    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "laptopsMigrated": outcome.laptops_migrated,
            "defaultGroupSeeded": outcome.default_group_seeded,
            "currentRoomId": current_room_id,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
