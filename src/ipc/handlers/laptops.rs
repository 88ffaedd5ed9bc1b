use crate::directory;
use crate::ipc::error::{err, fail, ok};
use crate::ipc::helpers::{param_str, param_u32, persist, require_admin};
use crate::ipc::types::{AppState, Request};
use crate::model::Laptop;
use crate::placement;
use crate::store;
use serde_json::json;
use uuid::Uuid;

fn laptop_json(state: &AppState, laptop: &Laptop) -> serde_json::Value {
    let room_name = directory::room_of_laptop(&state.data, laptop).map(|r| r.name.clone());
    let students: Vec<serde_json::Value> = laptop
        .student_ids
        .iter()
        .filter_map(|id| directory::student_by_id(&state.data.students, id))
        .map(|s| {
            let group_name = directory::group_of_student(&state.data, s).map(|g| g.name.clone());
            json!({ "id": s.id, "name": s.name, "groupName": group_name })
        })
        .collect();
    json!({
        "id": laptop.id,
        "roomId": laptop.room_id,
        "roomName": room_name,
        "login": laptop.login,
        "password": laptop.password,
        "locationId": laptop.location_id,
        "studentIds": laptop.student_ids,
        "students": students,
        "notes": laptop.notes,
    })
}

fn handle_laptops_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let room_filter = param_str(req, "roomId").map(|s| s.to_string());
    let search = param_str(req, "search").unwrap_or("").to_lowercase();

    let laptops: Vec<serde_json::Value> = state
        .data
        .laptops
        .iter()
        .filter(|l| room_filter.as_deref().map(|r| l.room_id == r).unwrap_or(true))
        .filter(|l| search.is_empty() || l.login.to_lowercase().contains(&search))
        .map(|l| laptop_json(state, l))
        .collect();

    ok(&req.id, json!({ "laptops": laptops }))
}

fn handle_laptops_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let Some(room_id) = param_str(req, "roomId") else {
        return err(&req.id, "bad_params", "missing roomId", None);
    };
    let Some(room) = directory::room_by_id(&state.data.rooms, room_id) else {
        return err(&req.id, "not_found", "room not found", None);
    };
    let desk_count = room.desk_count();

    let login = match param_str(req, "login") {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing login", None),
    };
    if login.is_empty() {
        return err(&req.id, "bad_params", "login must not be empty", None);
    }
    let password = param_str(req, "password")
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty());
    let notes = param_str(req, "notes")
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty());

    let location_id = if req.params.get("deskId").is_some() {
        let Some(desk_id) = param_u32(req, "deskId") else {
            return err(&req.id, "bad_params", "deskId must be a positive integer", None);
        };
        if desk_id < 1 || desk_id > desk_count {
            return err(
                &req.id,
                "not_found",
                format!("desk {} does not exist in this room", desk_id),
                Some(json!({ "deskCount": desk_count })),
            );
        }
        // A new laptop cannot evict what is already on the desk.
        let occupant = state
            .data
            .laptops
            .iter()
            .find(|l| l.room_id == room_id && l.location_id == Some(desk_id));
        if let Some(other) = occupant {
            return err(
                &req.id,
                "bad_params",
                format!("desk {} is already occupied", desk_id),
                Some(json!({ "occupiedBy": other.id })),
            );
        }
        Some(desk_id)
    } else {
        None
    };

    let laptop = Laptop {
        id: Uuid::new_v4().to_string(),
        room_id: room_id.to_string(),
        login,
        password,
        location_id,
        student_ids: Vec::new(),
        notes,
    };
    let laptop_id = laptop.id.clone();
    state.data.laptops.push(laptop);

    if let Some(resp) = persist(conn, req, store::KEY_LAPTOPS, &state.data.laptops) {
        return resp;
    }

    ok(
        &req.id,
        json!({ "laptopId": laptop_id, "roomId": room_id, "locationId": location_id }),
    )
}

fn handle_laptops_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let Some(laptop_id) = param_str(req, "laptopId") else {
        return err(&req.id, "bad_params", "missing laptopId", None);
    };
    let Some(idx) = state.data.laptops.iter().position(|l| l.id == laptop_id) else {
        return err(&req.id, "not_found", "laptop not found", None);
    };

    let new_login = match req.params.get("login") {
        None => None,
        Some(v) => match v.as_str().map(|s| s.trim()) {
            Some(t) if !t.is_empty() => Some(t.to_string()),
            _ => return err(&req.id, "bad_params", "login must not be empty", None),
        },
    };
    // Password is tri-state: absent keeps the stored one, empty or null
    // clears it, anything else replaces it.
    let new_password = match req.params.get("password") {
        None => None,
        Some(serde_json::Value::Null) => Some(None),
        Some(serde_json::Value::String(s)) if s.is_empty() => Some(None),
        Some(serde_json::Value::String(s)) => Some(Some(s.clone())),
        Some(_) => return err(&req.id, "bad_params", "password must be a string", None),
    };
    let new_notes = match req.params.get("notes") {
        None => None,
        Some(serde_json::Value::Null) => Some(None),
        Some(serde_json::Value::String(s)) if s.is_empty() => Some(None),
        Some(serde_json::Value::String(s)) => Some(Some(s.clone())),
        Some(_) => return err(&req.id, "bad_params", "notes must be a string", None),
    };

    let laptop = &mut state.data.laptops[idx];
    if let Some(login) = new_login {
        laptop.login = login;
    }
    if let Some(password) = new_password {
        laptop.password = password;
    }
    if let Some(notes) = new_notes {
        laptop.notes = notes;
    }

    if let Some(resp) = persist(conn, req, store::KEY_LAPTOPS, &state.data.laptops) {
        return resp;
    }

    ok(&req.id, json!({ "laptopId": laptop_id }))
}

fn handle_laptops_update_notes(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let Some(laptop_id) = param_str(req, "laptopId") else {
        return err(&req.id, "bad_params", "missing laptopId", None);
    };
    let Some(notes) = param_str(req, "notes") else {
        return err(&req.id, "bad_params", "missing notes", None);
    };
    let Some(idx) = state.data.laptops.iter().position(|l| l.id == laptop_id) else {
        return err(&req.id, "not_found", "laptop not found", None);
    };

    state.data.laptops[idx].notes = if notes.is_empty() {
        None
    } else {
        Some(notes.to_string())
    };

    if let Some(resp) = persist(conn, req, store::KEY_LAPTOPS, &state.data.laptops) {
        return resp;
    }

    ok(&req.id, json!({ "laptopId": laptop_id }))
}

fn handle_laptops_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let Some(laptop_id) = param_str(req, "laptopId") else {
        return err(&req.id, "bad_params", "missing laptopId", None);
    };
    let Some(idx) = state.data.laptops.iter().position(|l| l.id == laptop_id) else {
        return err(&req.id, "not_found", "laptop not found", None);
    };

    state.data.laptops.remove(idx);
    if let Some(resp) = persist(conn, req, store::KEY_LAPTOPS, &state.data.laptops) {
        return resp;
    }

    ok(&req.id, json!({ "ok": true }))
}

fn handle_laptops_place(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let (Some(room_id), Some(laptop_id)) = (param_str(req, "roomId"), param_str(req, "laptopId"))
    else {
        return err(&req.id, "bad_params", "missing roomId or laptopId", None);
    };
    let Some(desk_id) = param_u32(req, "deskId") else {
        return err(&req.id, "bad_params", "missing deskId", None);
    };
    let Some(room) = directory::room_by_id(&state.data.rooms, room_id) else {
        return err(&req.id, "not_found", "room not found", None);
    };

    let outcome = match placement::place_on_desk(&mut state.data.laptops, room, laptop_id, desk_id)
    {
        Ok(outcome) => outcome,
        Err(e) => return fail(&req.id, e),
    };

    if let Some(resp) = persist(conn, req, store::KEY_LAPTOPS, &state.data.laptops) {
        return resp;
    }

    ok(
        &req.id,
        json!({
            "laptopId": laptop_id,
            "roomId": room_id,
            "locationId": desk_id,
            "previousLocation": outcome.previous_location,
            "swappedWith": outcome.swapped_with,
        }),
    )
}

fn handle_laptops_detach(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let Some(laptop_id) = param_str(req, "laptopId") else {
        return err(&req.id, "bad_params", "missing laptopId", None);
    };
    if let Err(e) = placement::detach_from_desk(&mut state.data.laptops, laptop_id) {
        return fail(&req.id, e);
    }

    if let Some(resp) = persist(conn, req, store::KEY_LAPTOPS, &state.data.laptops) {
        return resp;
    }

    ok(
        &req.id,
        json!({ "laptopId": laptop_id, "locationId": serde_json::Value::Null }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "laptops.list" => Some(handle_laptops_list(state, req)),
        "laptops.create" => Some(handle_laptops_create(state, req)),
        "laptops.update" => Some(handle_laptops_update(state, req)),
        "laptops.updateNotes" => Some(handle_laptops_update_notes(state, req)),
        "laptops.delete" => Some(handle_laptops_delete(state, req)),
        "laptops.place" => Some(handle_laptops_place(state, req)),
        "laptops.detach" => Some(handle_laptops_detach(state, req)),
        _ => None,
    }
}
