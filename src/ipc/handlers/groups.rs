use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{param_str, persist, require_admin};
use crate::ipc::types::{AppState, Request};
use crate::model::Group;
use crate::store;
use serde_json::json;
use uuid::Uuid;

fn handle_groups_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let groups: Vec<serde_json::Value> = state
        .data
        .groups
        .iter()
        .map(|g| {
            let student_count = state
                .data
                .students
                .iter()
                .filter(|s| s.group_id == g.id)
                .count();
            json!({
                "id": g.id,
                "name": g.name,
                "studentCount": student_count,
            })
        })
        .collect();

    ok(&req.id, json!({ "groups": groups }))
}

fn handle_groups_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let name = match param_str(req, "name") {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }

    let group = Group {
        id: Uuid::new_v4().to_string(),
        name,
    };
    let group_id = group.id.clone();
    state.data.groups.push(group);

    if let Some(resp) = persist(conn, req, store::KEY_GROUPS, &state.data.groups) {
        return resp;
    }

    ok(&req.id, json!({ "groupId": group_id }))
}

fn handle_groups_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let Some(group_id) = param_str(req, "groupId") else {
        return err(&req.id, "bad_params", "missing groupId", None);
    };
    let name = match param_str(req, "name") {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }
    let Some(idx) = state.data.groups.iter().position(|g| g.id == group_id) else {
        return err(&req.id, "not_found", "group not found", None);
    };

    state.data.groups[idx].name = name;
    if let Some(resp) = persist(conn, req, store::KEY_GROUPS, &state.data.groups) {
        return resp;
    }

    ok(&req.id, json!({ "groupId": group_id }))
}

fn handle_groups_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let Some(group_id) = param_str(req, "groupId") else {
        return err(&req.id, "bad_params", "missing groupId", None);
    };
    let Some(idx) = state.data.groups.iter().position(|g| g.id == group_id) else {
        return err(&req.id, "not_found", "group not found", None);
    };

    let member_count = state
        .data
        .students
        .iter()
        .filter(|s| s.group_id == group_id)
        .count();
    if member_count > 0 {
        return err(
            &req.id,
            "group_not_empty",
            "move or delete the group's students first",
            Some(json!({ "studentCount": member_count })),
        );
    }
    // A workspace always keeps at least one group so new students have
    // somewhere to go.
    if state.data.groups.len() == 1 {
        return err(
            &req.id,
            "last_group",
            "the last remaining group cannot be deleted",
            None,
        );
    }

    state.data.groups.remove(idx);
    // Rooms listing the group as active drop the reference.
    let mut rooms_touched = 0;
    for room in state.data.rooms.iter_mut() {
        let before = room.active_group_ids.len();
        room.active_group_ids.retain(|id| id != group_id);
        if room.active_group_ids.len() != before {
            rooms_touched += 1;
        }
    }

    if let Some(resp) = persist(conn, req, store::KEY_GROUPS, &state.data.groups) {
        return resp;
    }
    if rooms_touched > 0 {
        if let Some(resp) = persist(conn, req, store::KEY_ROOMS, &state.data.rooms) {
            return resp;
        }
    }

    ok(
        &req.id,
        json!({ "ok": true, "roomsTouched": rooms_touched }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "groups.list" => Some(handle_groups_list(state, req)),
        "groups.create" => Some(handle_groups_create(state, req)),
        "groups.update" => Some(handle_groups_update(state, req)),
        "groups.delete" => Some(handle_groups_delete(state, req)),
        _ => None,
    }
}
