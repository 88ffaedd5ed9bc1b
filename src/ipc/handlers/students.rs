use crate::assign;
use crate::directory;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{param_str, persist, require_admin};
use crate::ipc::types::{AppState, Request};
use crate::model::Student;
use crate::store;
use serde_json::json;
use uuid::Uuid;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let group_filter = param_str(req, "groupId").map(|s| s.to_string());
    let search = param_str(req, "search").unwrap_or("").to_lowercase();

    let students: Vec<serde_json::Value> = state
        .data
        .students
        .iter()
        .filter(|s| group_filter.as_deref().map(|g| s.group_id == g).unwrap_or(true))
        .filter(|s| search.is_empty() || s.name.to_lowercase().contains(&search))
        .map(|s| {
            let group_name =
                directory::group_of_student(&state.data, s).map(|g| g.name.clone());
            let laptops: Vec<serde_json::Value> = state
                .data
                .laptops
                .iter()
                .filter(|l| l.student_ids.iter().any(|id| id == &s.id))
                .map(|l| json!({ "id": l.id, "login": l.login }))
                .collect();
            json!({
                "id": s.id,
                "name": s.name,
                "groupId": s.group_id,
                "groupName": group_name,
                "laptops": laptops,
            })
        })
        .collect();

    ok(&req.id, json!({ "students": students }))
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let Some(group_id) = param_str(req, "groupId") else {
        return err(&req.id, "bad_params", "missing groupId", None);
    };
    if directory::group_by_id(&state.data.groups, group_id).is_none() {
        return err(&req.id, "not_found", "group not found", None);
    }

    let student = Student {
        id: Uuid::new_v4().to_string(),
        name,
        group_id: group_id.to_string(),
    };
    let student_id = student.id.clone();
    state.data.students.push(student);

    if let Some(resp) = persist(conn, req, store::KEY_STUDENTS, &state.data.students) {
        return resp;
    }

    ok(
        &req.id,
        json!({ "studentId": student_id, "groupId": group_id }),
    )
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let Some(student_id) = param_str(req, "studentId") else {
        return err(&req.id, "bad_params", "missing studentId", None);
    };
    let Some(idx) = state.data.students.iter().position(|s| s.id == student_id) else {
        return err(&req.id, "not_found", "student not found", None);
    };

    let new_name = match req.params.get("name") {
        None => None,
        Some(v) => match v.as_str().map(|s| s.trim()) {
            Some(t) if !t.is_empty() => Some(t.to_string()),
            _ => return err(&req.id, "bad_params", "name must not be empty", None),
        },
    };
    let new_group = match param_str(req, "groupId") {
        None => None,
        Some(gid) => {
            if directory::group_by_id(&state.data.groups, gid).is_none() {
                return err(&req.id, "not_found", "group not found", None);
            }
            Some(gid.to_string())
        }
    };

    let student = &mut state.data.students[idx];
    if let Some(name) = new_name {
        student.name = name;
    }
    if let Some(group_id) = new_group {
        student.group_id = group_id;
    }

    if let Some(resp) = persist(conn, req, store::KEY_STUDENTS, &state.data.students) {
        return resp;
    }

    ok(&req.id, json!({ "studentId": student_id }))
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let Some(student_id) = param_str(req, "studentId") else {
        return err(&req.id, "bad_params", "missing studentId", None);
    };
    let Some(idx) = state.data.students.iter().position(|s| s.id == student_id) else {
        return err(&req.id, "not_found", "student not found", None);
    };

    state.data.students.remove(idx);
    // Deleting a student also frees every laptop they were assigned to.
    let unassigned_from = assign::remove_student_everywhere(&mut state.data.laptops, student_id);

    if let Some(resp) = persist(conn, req, store::KEY_STUDENTS, &state.data.students) {
        return resp;
    }
    if unassigned_from > 0 {
        if let Some(resp) = persist(conn, req, store::KEY_LAPTOPS, &state.data.laptops) {
            return resp;
        }
    }

    ok(
        &req.id,
        json!({ "ok": true, "unassignedFrom": unassigned_from }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
