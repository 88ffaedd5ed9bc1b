use crate::assign;
use crate::directory;
use crate::ipc::error::{err, fail, ok};
use crate::ipc::helpers::{param_str, param_str_list, persist, require_admin};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;

fn current_ids(state: &AppState, laptop_id: &str) -> Vec<String> {
    directory::laptop_by_id(&state.data.laptops, laptop_id)
        .map(|l| l.student_ids.clone())
        .unwrap_or_default()
}

fn handle_assignments_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let Some(laptop_id) = param_str(req, "laptopId") else {
        return err(&req.id, "bad_params", "missing laptopId", None);
    };
    let Some(student_ids) = param_str_list(req, "studentIds") else {
        return err(
            &req.id,
            "bad_params",
            "studentIds must be an array of strings",
            None,
        );
    };
    if directory::laptop_by_id(&state.data.laptops, laptop_id).is_none() {
        return err(&req.id, "not_found", "laptop not found", None);
    }

    // The whole list is checked before anything changes; one bad id rejects
    // the request outright.
    let unknown: Vec<&String> = student_ids
        .iter()
        .filter(|id| directory::student_by_id(&state.data.students, id).is_none())
        .collect();
    if !unknown.is_empty() {
        return err(
            &req.id,
            "not_found",
            "unknown student ids",
            Some(json!({ "unknownStudentIds": unknown })),
        );
    }

    if let Err(e) = assign::set_assigned_students(&mut state.data.laptops, laptop_id, &student_ids)
    {
        return fail(&req.id, e);
    }

    if let Some(resp) = persist(conn, req, store::KEY_LAPTOPS, &state.data.laptops) {
        return resp;
    }

    ok(
        &req.id,
        json!({ "laptopId": laptop_id, "studentIds": current_ids(state, laptop_id) }),
    )
}

fn handle_assignments_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let Some(laptop_id) = param_str(req, "laptopId") else {
        return err(&req.id, "bad_params", "missing laptopId", None);
    };
    if let Err(e) = assign::unassign_all(&mut state.data.laptops, laptop_id) {
        return fail(&req.id, e);
    }

    if let Some(resp) = persist(conn, req, store::KEY_LAPTOPS, &state.data.laptops) {
        return resp;
    }

    ok(
        &req.id,
        json!({ "laptopId": laptop_id, "studentIds": [] }),
    )
}

fn handle_assignments_remove_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let (Some(laptop_id), Some(student_id)) =
        (param_str(req, "laptopId"), param_str(req, "studentId"))
    else {
        return err(&req.id, "bad_params", "missing laptopId or studentId", None);
    };
    if let Err(e) = assign::unassign_one(&mut state.data.laptops, laptop_id, student_id) {
        return fail(&req.id, e);
    }

    if let Some(resp) = persist(conn, req, store::KEY_LAPTOPS, &state.data.laptops) {
        return resp;
    }

    ok(
        &req.id,
        json!({ "laptopId": laptop_id, "studentIds": current_ids(state, laptop_id) }),
    )
}

fn handle_assignments_candidates(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let Some(group_id) = param_str(req, "groupId") else {
        return err(&req.id, "bad_params", "missing groupId", None);
    };
    if directory::group_by_id(&state.data.groups, group_id).is_none() {
        return err(&req.id, "not_found", "group not found", None);
    }
    let search = param_str(req, "search").unwrap_or("");

    let candidates: Vec<serde_json::Value> =
        assign::candidate_students(&state.data.students, group_id, search)
            .map(|s| json!({ "id": s.id, "name": s.name, "groupId": s.group_id }))
            .collect();

    ok(&req.id, json!({ "candidates": candidates }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.set" => Some(handle_assignments_set(state, req)),
        "assignments.clear" => Some(handle_assignments_clear(state, req)),
        "assignments.removeStudent" => Some(handle_assignments_remove_student(state, req)),
        "assignments.candidates" => Some(handle_assignments_candidates(state, req)),
        _ => None,
    }
}
