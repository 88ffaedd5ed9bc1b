use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::model::Collections;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything the daemon holds between requests. Collections are the working
/// copy of the store; handlers mutate them in memory and write the affected
/// collection back after each successful mutation.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub data: Collections,
    pub current_room_id: Option<String>,
    pub admin: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            data: Collections::default(),
            current_room_id: None,
            admin: false,
        }
    }
}
