use serde::{Deserialize, Serialize};

/// Id of the group every workspace starts with; ungrouped students land here.
pub const DEFAULT_GROUP_ID: &str = "group-default";
pub const DEFAULT_GROUP_NAME: &str = "Ungrouped";

/// A classroom with a fixed desk grid. Corridor markers are 1-indexed and
/// strictly interior; they are stored sorted and deduplicated. Corridors are
/// rendering-only separators and never consume a desk slot, so the desk count
/// is always `rows * cols`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    pub rows: u32,
    pub cols: u32,
    #[serde(default)]
    pub corridors_after_rows: Vec<u32>,
    #[serde(default)]
    pub corridors_after_cols: Vec<u32>,
    #[serde(default)]
    pub active_group_ids: Vec<String>,
}

impl Room {
    pub fn desk_count(&self) -> u32 {
        self.rows * self.cols
    }
}

/// A laptop lives in exactly one room for its whole life; only its desk
/// placement and student assignments change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Laptop {
    pub id: String,
    pub room_id: String,
    pub login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub location_id: Option<u32>,
    #[serde(default)]
    pub student_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub group_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
}

/// All persisted collections, held in memory by the daemon and passed
/// explicitly into engine operations. Vec order is insertion order and is the
/// order list methods return; every relation between records is by id.
#[derive(Debug, Clone, Default)]
pub struct Collections {
    pub rooms: Vec<Room>,
    pub laptops: Vec<Laptop>,
    pub students: Vec<Student>,
    pub groups: Vec<Group>,
}

/// Typed failure for engine operations. Shaped like the wire error envelope
/// so handlers can pass it through without reshaping.
#[derive(Debug, Clone, Serialize)]
pub struct OpError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl OpError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        code: &str,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn not_found(what: &str) -> Self {
        Self::new("not_found", format!("{} not found", what))
    }
}
