use serde_json::Value;

use crate::error::{Result, SimwatchError};

/// API bookkeeping fields stripped from every fetched record before it is
/// diffed or cached. These change on every poll regardless of any real
/// character change and would cause false positives.
const FETCH_DENY_FIELDS: &[&str] = &[
    "connection",
    "achievementPoints",
    "achievement_points",
    "lastModified",
    "_items",
];

/// Fields stripped only for the equality test, never from what gets cached.
const COMPARE_DENY_FIELDS: &[&str] = &["totalHonorableKills"];

/// Profession tiers whose entries carry a `recipes` list (high cardinality,
/// large payload, not informative for diffing).
const PROFESSION_TIERS: &[&str] = &["primary", "secondary"];

/// Fields the rest of the run depends on; their absence is a data-shape
/// error, not something to default.
const REQUIRED_FIELDS: &[&str] = &["items", "professions"];

/// First normalization stage, applied to every record straight off the
/// armory. The result is what gets cached and diffed against.
pub fn scrub_fetched(mut record: Value) -> Result<Value> {
    let obj = record
        .as_object_mut()
        .ok_or_else(|| SimwatchError::DataShape("character record is not an object".to_string()))?;

    for field in REQUIRED_FIELDS {
        if !obj.contains_key(*field) {
            return Err(SimwatchError::DataShape(format!(
                "character record has no '{}' field",
                field
            )));
        }
    }

    for field in FETCH_DENY_FIELDS {
        obj.remove(*field);
    }

    let professions = obj
        .get_mut("professions")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| SimwatchError::DataShape("'professions' is not an object".to_string()))?;
    for tier in PROFESSION_TIERS {
        let entries = professions
            .get_mut(*tier)
            .and_then(Value::as_array_mut)
            .ok_or_else(|| {
                SimwatchError::DataShape(format!("'professions.{}' is not a list", tier))
            })?;
        for entry in entries {
            if let Some(entry) = entry.as_object_mut() {
                entry.remove("recipes");
            }
        }
    }

    Ok(record)
}

/// Second normalization stage, used only for the equality test between the
/// cached and freshly fetched records. Operates on a private copy; the cached
/// value always keeps the full first-stage detail.
///
/// `ignore_professions` drops the professions tree (progress comes from a
/// separate, unreliable endpoint and produces noisy false diffs);
/// `ignore_stats` drops overall stats when the user asked for that.
pub fn strip_for_compare(record: &Value, ignore_professions: bool, ignore_stats: bool) -> Value {
    let mut copy = record.clone();
    if let Some(obj) = copy.as_object_mut() {
        for field in COMPARE_DENY_FIELDS {
            obj.remove(*field);
        }
        if ignore_professions {
            obj.remove("professions");
        }
        if ignore_stats {
            obj.remove("stats");
        }
    }
    copy
}
