use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::migrate;
use crate::model::{Collections, Group, Laptop, Room, Student, DEFAULT_GROUP_ID, DEFAULT_GROUP_NAME};

pub const STORE_FILE: &str = "classnav.sqlite3";

pub const KEY_ROOMS: &str = "rooms";
pub const KEY_LAPTOPS: &str = "laptops";
pub const KEY_STUDENTS: &str = "students";
pub const KEY_GROUPS: &str = "groups";

pub const SETTING_CURRENT_ROOM: &str = "currentRoomId";
pub const SETTING_ADMIN_LOGIN: &str = "adminLogin";
pub const SETTING_ADMIN_PASSWORD_SHA256: &str = "adminPasswordSha256";

pub const DEFAULT_ADMIN_LOGIN: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "password";

/// Opens (creating if needed) the workspace store. Collections are stored as
/// whole JSON array documents keyed by collection name; settings are plain
/// key/value strings. A fresh workspace gets the default admin credential so
/// login works before anyone has configured anything.
pub fn open_store(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(STORE_FILE);
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS collections(
            key TEXT PRIMARY KEY,
            doc TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    if setting_get(&conn, SETTING_ADMIN_LOGIN)?.is_none() {
        setting_set(&conn, SETTING_ADMIN_LOGIN, DEFAULT_ADMIN_LOGIN)?;
        setting_set(
            &conn,
            SETTING_ADMIN_PASSWORD_SHA256,
            &password_sha256(DEFAULT_ADMIN_PASSWORD),
        )?;
    }

    Ok(conn)
}

pub struct LoadOutcome {
    pub data: Collections,
    pub laptops_migrated: bool,
    pub default_group_seeded: bool,
}

/// Loads every collection into memory. Laptop documents pass through the
/// schema migrator raw, before typed decoding, so legacy single-student
/// records load instead of failing; a migrated document is written back once
/// here. A workspace with no groups gets the default group seeded, keeping
/// student creation possible from the first request.
pub fn load_collections(conn: &Connection) -> anyhow::Result<LoadOutcome> {
    let rooms: Vec<Room> = read_typed(conn, KEY_ROOMS)?;
    let students: Vec<Student> = read_typed(conn, KEY_STUDENTS)?;
    let mut groups: Vec<Group> = read_typed(conn, KEY_GROUPS)?;

    let records: Vec<Value> = match read_doc(conn, KEY_LAPTOPS)? {
        None => Vec::new(),
        Some(Value::Array(records)) => records,
        Some(_) => anyhow::bail!("laptops document is not an array"),
    };
    let (records, laptops_migrated) = migrate::migrate_laptop_records(records);
    if laptops_migrated {
        write_doc(conn, KEY_LAPTOPS, &Value::Array(records.clone()))?;
    }
    let laptops: Vec<Laptop> = serde_json::from_value(Value::Array(records))
        .context("laptops document failed to decode after migration")?;

    let default_group_seeded = groups.is_empty();
    if default_group_seeded {
        groups.push(Group {
            id: DEFAULT_GROUP_ID.to_string(),
            name: DEFAULT_GROUP_NAME.to_string(),
        });
        save_collection(conn, KEY_GROUPS, &groups)?;
    }

    Ok(LoadOutcome {
        data: Collections {
            rooms,
            laptops,
            students,
            groups,
        },
        laptops_migrated,
        default_group_seeded,
    })
}

pub fn save_collection<T: Serialize>(
    conn: &Connection,
    key: &str,
    items: &[T],
) -> anyhow::Result<()> {
    let doc = serde_json::to_value(items)?;
    write_doc(conn, key, &doc)
}

pub fn setting_get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM settings WHERE key = ?", [key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

pub fn setting_set(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings(key, value) VALUES(?, ?)",
        (key, value),
    )?;
    Ok(())
}

pub fn setting_delete(conn: &Connection, key: &str) -> anyhow::Result<()> {
    conn.execute("DELETE FROM settings WHERE key = ?", [key])?;
    Ok(())
}

pub fn password_sha256(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn read_typed<T: serde::de::DeserializeOwned>(conn: &Connection, key: &str) -> anyhow::Result<Vec<T>> {
    match read_doc(conn, key)? {
        None => Ok(Vec::new()),
        Some(doc) => serde_json::from_value(doc)
            .with_context(|| format!("{} document failed to decode", key)),
    }
}

fn read_doc(conn: &Connection, key: &str) -> anyhow::Result<Option<Value>> {
    let text: Option<String> = conn
        .query_row("SELECT doc FROM collections WHERE key = ?", [key], |row| {
            row.get(0)
        })
        .optional()?;
    match text {
        None => Ok(None),
        Some(text) => {
            let doc = serde_json::from_str(&text)
                .with_context(|| format!("{} document is invalid JSON", key))?;
            Ok(Some(doc))
        }
    }
}

fn write_doc(conn: &Connection, key: &str, doc: &Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO collections(key, doc) VALUES(?, ?)",
        (key, serde_json::to_string(doc)?),
    )?;
    Ok(())
}
