//! Blank entries for the nested groups of notices and summons.

use crate::resources::Resource;
use chrono::Local;
use serde_json::{json, Value};

pub fn noticee() -> Value {
    json!({
        "name": "",
        "gstin": "",
        "address": "",
        "amounts": [],
    })
}

pub fn amount_line() -> Value {
    json!({
        "period_from": null,
        "period_to": null,
        "tax": 0,
        "interest": 0,
        "penalty": 0,
    })
}

pub fn summons_person() -> Value {
    json!({
        "name": "",
        "designation": "",
        "statements": [],
    })
}

/// A statement recorded today.
pub fn statement() -> Value {
    json!({
        "date": Local::now().date_naive().to_string(),
        "place": "",
        "documents": [],
    })
}

pub fn document() -> Value {
    json!({
        "description": "",
        "pages": 0,
    })
}

/// Starting point for a new record of `resource`.
pub fn blank_record(resource: Resource) -> Value {
    match resource {
        Resource::ShowCauseNotice => json!({ "noticees": [] }),
        Resource::Summons => json!({ "persons": [] }),
        _ => json!({}),
    }
}
