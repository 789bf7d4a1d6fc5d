//! Input normalization for backend payloads.
//!
//! The backend is inconsistent about field names (Spanish and English keys,
//! camelCase and snake_case) and about value vocabularies. Every record is
//! normalized exactly once, here, using the precedence tables below; the rest
//! of the crate only sees the typed model.

use crate::domain::model::{
    Assignee, BacklogItem, BugStats, BurndownPoint, ItemStatus, ItemType, Sprint, SprintStatus,
    TeamMember, DEFAULT_STORY_POINTS,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

// 欄位優先順序：第一個可用的值勝出；null、空字串或無法解析的值會跳過
const ID_KEYS: &[&str] = &["id", "_id"];
const SPRINT_NAME_KEYS: &[&str] = &["nombre", "name"];
const GOAL_KEYS: &[&str] = &["objetivo", "goal"];
const START_KEYS: &[&str] = &["fecha_inicio", "startDate", "start_date"];
const END_KEYS: &[&str] = &["fecha_fin", "endDate", "end_date"];
const STATUS_KEYS: &[&str] = &["estado", "status"];
const TITLE_KEYS: &[&str] = &["titulo", "title", "nombre", "name"];
const DESCRIPTION_KEYS: &[&str] = &["descripcion", "description"];
const TYPE_KEYS: &[&str] = &["tipo", "type"];
const POINTS_KEYS: &[&str] = &[
    "puntos_historia",
    "storyPoints",
    "story_points",
    "puntos",
    "points",
];
const ASSIGNEE_KEYS: &[&str] = &["asignado_a", "assignedTo", "assigned_to", "responsable"];
const SPRINT_REF_KEYS: &[&str] = &["sprint_id", "sprintId", "sprint"];
const PERSON_NAME_KEYS: &[&str] = &["nombre", "name", "username"];
const EMAIL_KEYS: &[&str] = &["email", "correo"];
const ROLE_KEYS: &[&str] = &["rol", "role"];

const BURNDOWN_DAY_KEYS: &[&str] = &["day", "dia"];
const BURNDOWN_PLANNED_KEYS: &[&str] = &["planned", "planificado", "ideal"];
const BURNDOWN_ACTUAL_KEYS: &[&str] = &["actual", "real", "remaining"];

const BUG_TOTAL_KEYS: &[&str] = &["total", "total_bugs", "totalBugs"];
const BUG_OPEN_KEYS: &[&str] = &["open", "abiertos", "pendientes", "pending"];
const BUG_IN_PROGRESS_KEYS: &[&str] = &["in_progress", "inProgress", "en_progreso"];
const BUG_RESOLVED_KEYS: &[&str] = &["resolved", "resueltos", "cerrados", "closed", "completados"];

/// 狀態詞彙對照表，未列出的值一律視為 Pending
const ITEM_STATUS_VOCABULARY: &[(&str, ItemStatus)] = &[
    ("completado", ItemStatus::Completed),
    ("completada", ItemStatus::Completed),
    ("completed", ItemStatus::Completed),
    ("done", ItemStatus::Completed),
    ("terminado", ItemStatus::Completed),
    ("finalizado", ItemStatus::Completed),
    ("en_progreso", ItemStatus::InProgress),
    ("in_progress", ItemStatus::InProgress),
    ("progress", ItemStatus::InProgress),
    ("doing", ItemStatus::InProgress),
    ("pendiente", ItemStatus::Pending),
    ("pending", ItemStatus::Pending),
    ("todo", ItemStatus::Pending),
];

const SPRINT_STATUS_VOCABULARY: &[(&str, SprintStatus)] = &[
    ("planificado", SprintStatus::Planned),
    ("planificada", SprintStatus::Planned),
    ("planned", SprintStatus::Planned),
    ("activo", SprintStatus::Active),
    ("activa", SprintStatus::Active),
    ("active", SprintStatus::Active),
    ("en_progreso", SprintStatus::Active),
    ("in_progress", SprintStatus::Active),
    ("completado", SprintStatus::Completed),
    ("completada", SprintStatus::Completed),
    ("completed", SprintStatus::Completed),
    ("finalizado", SprintStatus::Completed),
    ("cerrado", SprintStatus::Completed),
    ("closed", SprintStatus::Completed),
];

const ITEM_TYPE_VOCABULARY: &[(&str, ItemType)] = &[
    ("historia", ItemType::Story),
    ("historia_usuario", ItemType::Story),
    ("story", ItemType::Story),
    ("user_story", ItemType::Story),
    ("tarea", ItemType::Task),
    ("task", ItemType::Task),
    ("bug", ItemType::Bug),
    ("defecto", ItemType::Bug),
    ("defect", ItemType::Bug),
    ("mejora", ItemType::Improvement),
    ("improvement", ItemType::Improvement),
    ("enhancement", ItemType::Improvement),
];

fn first_usable<T>(
    record: &Value,
    keys: &[&str],
    parse: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find_map(parse)
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_field(record: &Value, keys: &[&str]) -> Option<String> {
    first_usable(record, keys, as_text)
}

fn count_value(value: &Value) -> Option<usize> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (number.is_finite() && number >= 0.0).then(|| number.round() as usize)
}

fn count_field(record: &Value, keys: &[&str]) -> Option<usize> {
    first_usable(record, keys, count_value)
}

/// 小寫、去空白，並把空格與連字號統一成底線
fn canonical_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

fn lookup<T: Copy>(table: &[(&str, T)], label: &str) -> Option<T> {
    let label = canonical_label(label);
    table
        .iter()
        .find(|(candidate, _)| *candidate == label)
        .map(|(_, value)| *value)
}

pub fn parse_item_status(label: &str) -> ItemStatus {
    lookup(ITEM_STATUS_VOCABULARY, label).unwrap_or_default()
}

pub fn parse_sprint_status(label: &str) -> SprintStatus {
    lookup(SPRINT_STATUS_VOCABULARY, label).unwrap_or_default()
}

pub fn parse_item_type(label: &str) -> ItemType {
    lookup(ITEM_TYPE_VOCABULARY, label).unwrap_or_default()
}

/// Accepts RFC 3339 timestamps, plain `YYYY-MM-DD` dates (UTC midnight),
/// offset-less `YYYY-MM-DDTHH:MM:SS` timestamps (UTC) and epoch milliseconds.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => {
            let raw = raw.trim();
            if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                return Some(parsed.with_timezone(&Utc));
            }
            if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .map(|naive| naive.and_utc())
        }
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Story points: numbers or numeric strings; anything absent, non-numeric,
/// negative or non-finite becomes [`DEFAULT_STORY_POINTS`].
pub fn parse_story_points(value: Option<&Value>) -> f64 {
    value.and_then(story_points_value).unwrap_or(DEFAULT_STORY_POINTS)
}

fn story_points_value(value: &Value) -> Option<f64> {
    let points = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (points.is_finite() && points >= 0.0).then_some(points)
}

fn fingerprint(value: &Value) -> String {
    // 未啟用 preserve_order，物件鍵已排序
    let mut hasher = DefaultHasher::new();
    value.to_string().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// `null`, `false` and empty strings mean "unassigned". A scalar is taken as
/// the member id.
pub fn normalize_assignee(value: &Value) -> Option<Assignee> {
    match value {
        Value::Object(_) => Some(Assignee {
            id: text_field(value, ID_KEYS),
            name: text_field(value, PERSON_NAME_KEYS),
            email: text_field(value, EMAIL_KEYS),
            role: text_field(value, ROLE_KEYS),
            fingerprint: fingerprint(value),
        }),
        Value::String(_) | Value::Number(_) => as_text(value).map(|id| Assignee {
            id: Some(id),
            fingerprint: fingerprint(value),
            ..Assignee::default()
        }),
        _ => None,
    }
}

pub fn normalize_sprint(record: &Value) -> Sprint {
    Sprint {
        id: text_field(record, ID_KEYS),
        name: text_field(record, SPRINT_NAME_KEYS).unwrap_or_default(),
        goal: text_field(record, GOAL_KEYS),
        start_date: first_usable(record, START_KEYS, parse_date),
        end_date: first_usable(record, END_KEYS, parse_date),
        status: text_field(record, STATUS_KEYS)
            .map(|label| parse_sprint_status(&label))
            .unwrap_or_default(),
    }
}

fn sprint_reference(record: &Value) -> Option<String> {
    first_usable(record, SPRINT_REF_KEYS, |value| match value {
        Value::Object(_) => text_field(value, ID_KEYS),
        other => as_text(other),
    })
}

pub fn normalize_item(record: &Value) -> BacklogItem {
    BacklogItem {
        id: text_field(record, ID_KEYS),
        title: text_field(record, TITLE_KEYS).unwrap_or_default(),
        description: text_field(record, DESCRIPTION_KEYS),
        item_type: text_field(record, TYPE_KEYS)
            .map(|label| parse_item_type(&label))
            .unwrap_or_default(),
        status: text_field(record, STATUS_KEYS)
            .map(|label| parse_item_status(&label))
            .unwrap_or_default(),
        story_points: first_usable(record, POINTS_KEYS, story_points_value)
            .unwrap_or(DEFAULT_STORY_POINTS),
        assigned_to: first_usable(record, ASSIGNEE_KEYS, normalize_assignee),
        sprint_id: sprint_reference(record),
    }
}

pub fn normalize_team_member(record: &Value) -> TeamMember {
    TeamMember {
        id: text_field(record, ID_KEYS),
        name: text_field(record, PERSON_NAME_KEYS),
        email: text_field(record, EMAIL_KEYS),
        role: text_field(record, ROLE_KEYS),
    }
}

/// Backend burndown snapshot. `position` is used as the day when the payload
/// carries none.
pub fn normalize_burndown_point(record: &Value, position: usize) -> BurndownPoint {
    let day = count_field(record, BURNDOWN_DAY_KEYS)
        .map(|day| day as u32)
        .unwrap_or(position as u32 + 1);
    BurndownPoint {
        day,
        planned: count_field(record, BURNDOWN_PLANNED_KEYS).unwrap_or(0) as u64,
        actual: count_field(record, BURNDOWN_ACTUAL_KEYS).unwrap_or(0) as u64,
    }
}

/// Returns `None` when the payload carries none of the known counters.
pub fn normalize_bug_stats(record: &Value) -> Option<BugStats> {
    let open = count_field(record, BUG_OPEN_KEYS);
    let in_progress = count_field(record, BUG_IN_PROGRESS_KEYS);
    let resolved = count_field(record, BUG_RESOLVED_KEYS);
    let total = count_field(record, BUG_TOTAL_KEYS);

    if open.is_none() && in_progress.is_none() && resolved.is_none() && total.is_none() {
        return None;
    }

    let open = open.unwrap_or(0);
    let in_progress = in_progress.unwrap_or(0);
    let resolved = resolved.unwrap_or(0);
    Some(BugStats {
        total: total.unwrap_or(open + in_progress + resolved),
        open,
        in_progress,
        resolved,
    })
}
