use crate::backup;
use crate::directory;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{param_str, require_admin};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;
use std::path::PathBuf;

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn handle_backup_export_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing outPath", None),
    };
    let workspace_path = req
        .params
        .get("workspacePath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .or_else(|| state.workspace.clone());
    let Some(workspace_path) = workspace_path else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    if let Some(conn) = state.db.as_ref() {
        let _ = conn.execute_batch("PRAGMA wal_checkpoint(FULL)");
    }

    let out = PathBuf::from(&out_path);
    let export = match backup::export_workspace_bundle(&workspace_path, &out) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": out_path })),
            )
        }
    };

    ok(
        &req.id,
        json!({
            "ok": true,
            "path": out_path,
            "bundleFormat": export.bundle_format,
            "entryCount": export.entry_count,
            "dbSha256": export.db_sha256,
        }),
    )
}

fn handle_backup_import_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(resp) = require_admin(state, req) {
        return resp;
    }

    let in_path = match req.params.get("inPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing inPath", None),
    };
    let workspace_path = req
        .params
        .get("workspacePath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .or_else(|| state.workspace.clone());
    let Some(workspace_path) = workspace_path else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": in_path })),
        );
    }
    if let Err(e) = std::fs::create_dir_all(&workspace_path) {
        return err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": workspace_path.to_string_lossy() })),
        );
    }

    // Drop the open handle before the database file is replaced.
    state.db = None;

    let import = match backup::import_workspace_bundle(&src, &workspace_path) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": src.to_string_lossy() })),
            )
        }
    };

    let conn = match store::open_store(&workspace_path) {
        Ok(conn) => conn,
        Err(e) => return err(&req.id, "db_open_failed", e.to_string(), None),
    };
    let outcome = match store::load_collections(&conn) {
        Ok(outcome) => outcome,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
    };
    let stored_room = match store::setting_get(&conn, store::SETTING_CURRENT_ROOM) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    state.workspace = Some(workspace_path.clone());
    state.db = Some(conn);
    state.current_room_id = stored_room
        .filter(|id| outcome.data.rooms.iter().any(|r| r.id == *id))
        .or_else(|| outcome.data.rooms.first().map(|r| r.id.clone()));
    state.data = outcome.data;

    ok(
        &req.id,
        json!({
            "ok": true,
            "workspacePath": workspace_path.to_string_lossy(),
            "bundleFormatDetected": import.bundle_format_detected,
            "laptopsMigrated": outcome.laptops_migrated,
        }),
    )
}

fn handle_exchange_export_room_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(room_id) = param_str(req, "roomId") else {
        return err(&req.id, "bad_params", "missing roomId", None);
    };
    let out_path = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing outPath", None),
    };
    let Some(room) = directory::room_by_id(&state.data.rooms, room_id) else {
        return err(&req.id, "not_found", "room not found", None);
    };

    // Placed laptops come first in desk order; the loose ones follow sorted
    // by login so the sheet prints stably.
    let mut laptops: Vec<_> = state
        .data
        .laptops
        .iter()
        .filter(|l| l.room_id == room.id)
        .collect();
    laptops.sort_by(|a, b| match (a.location_id, b.location_id) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.login.cmp(&b.login),
    });

    let mut csv = String::from("desk,login,students,notes\n");
    let rows_exported = laptops.len();
    for laptop in laptops {
        let desk = laptop
            .location_id
            .map(|d| d.to_string())
            .unwrap_or_default();
        let students = laptop
            .student_ids
            .iter()
            .filter_map(|id| directory::student_by_id(&state.data.students, id))
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        csv.push_str(&format!(
            "{},{},{},{}\n",
            desk,
            csv_quote(&laptop.login),
            csv_quote(&students),
            csv_quote(laptop.notes.as_deref().unwrap_or(""))
        ));
    }

    let out = PathBuf::from(&out_path);
    if let Some(parent) = out.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": out_path })),
            );
        }
    }
    if let Err(e) = std::fs::write(&out, csv) {
        return err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": out_path })),
        );
    }

    ok(
        &req.id,
        json!({
            "ok": true,
            "roomId": room.id,
            "rowsExported": rows_exported,
            "path": out_path,
            "generatedAt": chrono::Utc::now().to_rfc3339(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_backup_export_workspace_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_backup_import_workspace_bundle(state, req)),
        "exchange.exportRoomCsv" => Some(handle_exchange_export_room_csv(state, req)),
        _ => None,
    }
}
