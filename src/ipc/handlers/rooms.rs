use crate::directory;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{param_str, param_str_list, param_u32, param_u32_list, persist, require_admin};
use crate::ipc::types::{AppState, Request};
use crate::layout;
use crate::model::{Group, Room};
use crate::placement;
use crate::store;
use serde_json::json;
use uuid::Uuid;

const MAX_ROWS: u32 = 10;
const MAX_COLS: u32 = 10;

fn check_grid_bounds(req: &Request, rows: u32, cols: u32) -> Option<serde_json::Value> {
    if rows < 1 || rows > MAX_ROWS {
        return Some(err(
            &req.id,
            "bad_params",
            format!("rows must be between 1 and {}", MAX_ROWS),
            None,
        ));
    }
    if cols < 1 || cols > MAX_COLS {
        return Some(err(
            &req.id,
            "bad_params",
            format!("cols must be between 1 and {}", MAX_COLS),
            None,
        ));
    }
    None
}

/// Optional corridor marker param: absent is a valid "keep/none", anything
/// present must be an array of non-negative integers.
fn marker_list_param(req: &Request, key: &str) -> Result<Option<Vec<u32>>, serde_json::Value> {
    if req.params.get(key).is_none() {
        return Ok(None);
    }
    match param_u32_list(req, key) {
        Some(list) => Ok(Some(list)),
        None => Err(err(
            &req.id,
            "bad_params",
            format!("{} must be an array of non-negative integers", key),
            None,
        )),
    }
}

/// Deduplicates in given order and rejects ids that resolve to no group.
fn validate_group_ids(
    req: &Request,
    groups: &[Group],
    ids: &[String],
) -> Result<Vec<String>, serde_json::Value> {
    let mut unknown: Vec<&str> = Vec::new();
    let mut out: Vec<String> = Vec::new();
    for id in ids {
        if directory::group_by_id(groups, id).is_none() {
            unknown.push(id);
        } else if !out.iter().any(|have| have == id) {
            out.push(id.clone());
        }
    }
    if !unknown.is_empty() {
        return Err(err(
            &req.id,
            "not_found",
            "unknown group ids",
            Some(json!({ "unknownGroupIds": unknown })),
        ));
    }
    Ok(out)
}

fn handle_rooms_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let rooms: Vec<serde_json::Value> = state
        .data
        .rooms
        .iter()
        .map(|room| {
            let laptop_count = state
                .data
                .laptops
                .iter()
                .filter(|l| l.room_id == room.id)
                .count();
            let active_groups: Vec<serde_json::Value> = directory::groups_for_room(&state.data, room)
                .iter()
                .map(|g| json!({ "id": g.id, "name": g.name }))
                .collect();
            json!({
                "id": room.id,
                "name": room.name,
                "rows": room.rows,
                "cols": room.cols,
                "corridorsAfterRows": room.corridors_after_rows,
                "corridorsAfterCols": room.corridors_after_cols,
                "activeGroupIds": room.active_group_ids,
                "activeGroups": active_groups,
                "deskCount": room.desk_count(),
                "laptopCount": laptop_count,
            })
        })
        .collect();

    ok(&req.id, json!({ "rooms": rooms }))
}

fn handle_rooms_create(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let (Some(rows), Some(cols)) = (param_u32(req, "rows"), param_u32(req, "cols")) else {
        return err(&req.id, "bad_params", "missing rows or cols", None);
    };
    if let Some(resp) = check_grid_bounds(req, rows, cols) {
        return resp;
    }

    let corridor_rows = match marker_list_param(req, "corridorsAfterRows") {
        Ok(v) => v.unwrap_or_default(),
        Err(resp) => return resp,
    };
    let corridor_cols = match marker_list_param(req, "corridorsAfterCols") {
        Ok(v) => v.unwrap_or_default(),
        Err(resp) => return resp,
    };
    let active_group_ids = if req.params.get("activeGroupIds").is_some() {
        let Some(ids) = param_str_list(req, "activeGroupIds") else {
            return err(
                &req.id,
                "bad_params",
                "activeGroupIds must be an array of strings",
                None,
            );
        };
        match validate_group_ids(req, &state.data.groups, &ids) {
            Ok(v) => v,
            Err(resp) => return resp,
        }
    } else {
        Vec::new()
    };

    let room = Room {
        id: Uuid::new_v4().to_string(),
        name,
        rows,
        cols,
        corridors_after_rows: layout::interior_markers(&corridor_rows, rows),
        corridors_after_cols: layout::interior_markers(&corridor_cols, cols),
        active_group_ids,
    };
    let room_id = room.id.clone();
    let desk_count = room.desk_count();
    state.data.rooms.push(room);

    if let Some(resp) = persist(conn, req, store::KEY_ROOMS, &state.data.rooms) {
        return resp;
    }

    // First room of a workspace becomes the current one.
    if state.current_room_id.is_none() {
        if let Err(e) = store::setting_set(conn, store::SETTING_CURRENT_ROOM, &room_id) {
            return err(&req.id, "db_save_failed", e.to_string(), None);
        }
        state.current_room_id = Some(room_id.clone());
    }

    ok(
        &req.id,
        json!({ "roomId": room_id, "deskCount": desk_count }),
    )
}

fn handle_rooms_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let Some(room_id) = param_str(req, "roomId") else {
        return err(&req.id, "bad_params", "missing roomId", None);
    };
    let Some(idx) = state.data.rooms.iter().position(|r| r.id == room_id) else {
        return err(&req.id, "not_found", "room not found", None);
    };

    // Every change is validated before anything is applied.
    let new_name = match req.params.get("name") {
        None => None,
        Some(v) => match v.as_str().map(|s| s.trim()) {
            Some(t) if !t.is_empty() => Some(t.to_string()),
            _ => return err(&req.id, "bad_params", "name must not be empty", None),
        },
    };
    let new_rows = if req.params.get("rows").is_some() {
        match param_u32(req, "rows") {
            Some(v) => Some(v),
            None => return err(&req.id, "bad_params", "rows must be a non-negative integer", None),
        }
    } else {
        None
    };
    let new_cols = if req.params.get("cols").is_some() {
        match param_u32(req, "cols") {
            Some(v) => Some(v),
            None => return err(&req.id, "bad_params", "cols must be a non-negative integer", None),
        }
    } else {
        None
    };
    let rows = new_rows.unwrap_or(state.data.rooms[idx].rows);
    let cols = new_cols.unwrap_or(state.data.rooms[idx].cols);
    if let Some(resp) = check_grid_bounds(req, rows, cols) {
        return resp;
    }

    let corridor_rows = match marker_list_param(req, "corridorsAfterRows") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let corridor_cols = match marker_list_param(req, "corridorsAfterCols") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let new_active = if req.params.get("activeGroupIds").is_some() {
        let Some(ids) = param_str_list(req, "activeGroupIds") else {
            return err(
                &req.id,
                "bad_params",
                "activeGroupIds must be an array of strings",
                None,
            );
        };
        match validate_group_ids(req, &state.data.groups, &ids) {
            Ok(v) => Some(v),
            Err(resp) => return resp,
        }
    } else {
        None
    };

    {
        let room = &mut state.data.rooms[idx];
        if let Some(name) = new_name {
            room.name = name;
        }
        room.rows = rows;
        room.cols = cols;
        // Stored markers are re-filtered against the final dimensions, so
        // shrinking a room silently drops markers that fell outside it.
        let raw_rows = corridor_rows.unwrap_or_else(|| room.corridors_after_rows.clone());
        let raw_cols = corridor_cols.unwrap_or_else(|| room.corridors_after_cols.clone());
        room.corridors_after_rows = layout::interior_markers(&raw_rows, rows);
        room.corridors_after_cols = layout::interior_markers(&raw_cols, cols);
        if let Some(ids) = new_active {
            room.active_group_ids = ids;
        }
    }

    let desk_count = state.data.rooms[idx].desk_count();
    let owned_room_id = state.data.rooms[idx].id.clone();
    // Desks keep their ids across a resize; placements past the new desk
    // count are detached in the same call so no laptop points nowhere.
    let detached =
        placement::repair_after_resize(&mut state.data.laptops, &owned_room_id, desk_count);

    if let Some(resp) = persist(conn, req, store::KEY_ROOMS, &state.data.rooms) {
        return resp;
    }
    if detached > 0 {
        if let Some(resp) = persist(conn, req, store::KEY_LAPTOPS, &state.data.laptops) {
            return resp;
        }
    }

    ok(
        &req.id,
        json!({
            "roomId": owned_room_id,
            "deskCount": desk_count,
            "detachedLaptops": detached,
        }),
    )
}

fn handle_rooms_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let Some(room_id) = param_str(req, "roomId") else {
        return err(&req.id, "bad_params", "missing roomId", None);
    };
    let Some(idx) = state.data.rooms.iter().position(|r| r.id == room_id) else {
        return err(&req.id, "not_found", "room not found", None);
    };

    state.data.rooms.remove(idx);
    // Laptops live and die with their room.
    let before = state.data.laptops.len();
    state.data.laptops.retain(|l| l.room_id != room_id);
    let removed_laptops = before - state.data.laptops.len();

    let mut current_changed = false;
    if state.current_room_id.as_deref() == Some(room_id) {
        state.current_room_id = state.data.rooms.first().map(|r| r.id.clone());
        current_changed = true;
    }

    if let Some(resp) = persist(conn, req, store::KEY_ROOMS, &state.data.rooms) {
        return resp;
    }
    if removed_laptops > 0 {
        if let Some(resp) = persist(conn, req, store::KEY_LAPTOPS, &state.data.laptops) {
            return resp;
        }
    }
    if current_changed {
        let saved = match &state.current_room_id {
            Some(id) => store::setting_set(conn, store::SETTING_CURRENT_ROOM, id),
            None => store::setting_delete(conn, store::SETTING_CURRENT_ROOM),
        };
        if let Err(e) = saved {
            return err(&req.id, "db_save_failed", e.to_string(), None);
        }
    }

    ok(
        &req.id,
        json!({
            "ok": true,
            "removedLaptops": removed_laptops,
            "currentRoomId": state.current_room_id,
        }),
    )
}

fn handle_rooms_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(room_id) = param_str(req, "roomId") else {
        return err(&req.id, "bad_params", "missing roomId", None);
    };
    if directory::room_by_id(&state.data.rooms, room_id).is_none() {
        return err(&req.id, "not_found", "room not found", None);
    }

    if let Err(e) = store::setting_set(conn, store::SETTING_CURRENT_ROOM, room_id) {
        return err(&req.id, "db_save_failed", e.to_string(), None);
    }
    state.current_room_id = Some(room_id.to_string());

    ok(&req.id, json!({ "currentRoomId": room_id }))
}

fn handle_rooms_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "currentRoomId": state.current_room_id }))
}

fn handle_rooms_layout(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let Some(room_id) = param_str(req, "roomId") else {
        return err(&req.id, "bad_params", "missing roomId", None);
    };
    let Some(room) = directory::room_by_id(&state.data.rooms, room_id) else {
        return err(&req.id, "not_found", "room not found", None);
    };

    let layout = layout::compose(
        room.rows,
        room.cols,
        &room.corridors_after_rows,
        &room.corridors_after_cols,
    );
    ok(
        &req.id,
        json!({
            "roomId": room.id,
            "deskCount": room.desk_count(),
            "visualCols": layout.visual_cols,
            "cells": layout.cells,
        }),
    )
}

fn handle_rooms_set_active_groups(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let Some(room_id) = param_str(req, "roomId") else {
        return err(&req.id, "bad_params", "missing roomId", None);
    };
    let Some(ids) = param_str_list(req, "groupIds") else {
        return err(
            &req.id,
            "bad_params",
            "groupIds must be an array of strings",
            None,
        );
    };
    let Some(idx) = state.data.rooms.iter().position(|r| r.id == room_id) else {
        return err(&req.id, "not_found", "room not found", None);
    };
    let ids = match validate_group_ids(req, &state.data.groups, &ids) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    state.data.rooms[idx].active_group_ids = ids;
    if let Some(resp) = persist(conn, req, store::KEY_ROOMS, &state.data.rooms) {
        return resp;
    }

    ok(
        &req.id,
        json!({
            "roomId": room_id,
            "activeGroupIds": state.data.rooms[idx].active_group_ids,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "rooms.list" => Some(handle_rooms_list(state, req)),
        "rooms.create" => Some(handle_rooms_create(state, req)),
        "rooms.update" => Some(handle_rooms_update(state, req)),
        "rooms.delete" => Some(handle_rooms_delete(state, req)),
        "rooms.select" => Some(handle_rooms_select(state, req)),
        "rooms.current" => Some(handle_rooms_current(state, req)),
        "rooms.layout" => Some(handle_rooms_layout(state, req)),
        "rooms.setActiveGroups" => Some(handle_rooms_set_active_groups(state, req)),
        _ => None,
    }
}
