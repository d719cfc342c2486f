//! Resource id suffixing, for uploading a copy of a terminology set next to
//! an existing one without id clashes.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::IdRewriteError;

/// Maximum length of a FHIR logical id.
pub const MAX_ID_LENGTH: usize = 64;

/// `{id}_{suffix}`, with `id` trimmed so the result fits in
/// [`MAX_ID_LENGTH`] characters.
pub fn suffix_id(id: &str, suffix: &str) -> Result<String, IdRewriteError> {
    let suffix_len = suffix.chars().count();
    if suffix_len + 1 >= MAX_ID_LENGTH {
        return Err(IdRewriteError::SuffixTooLong(suffix.to_string()));
    }
    let allowed = MAX_ID_LENGTH - suffix_len - 1;
    let trimmed: String = id.chars().take(allowed).collect();
    Ok(format!("{trimmed}_{suffix}"))
}

/// Rewrite the `id` of the resource stored at `path` in place.
///
/// Returns the old and new id, or `None` (file untouched) when the resource
/// has no id.
pub fn rewrite_id_in_file(
    path: &Path,
    suffix: &str,
) -> Result<Option<(String, String)>, IdRewriteError> {
    let text = fs::read_to_string(path)?;
    let mut json: Value = serde_json::from_str(&text)?;
    let obj = json
        .as_object_mut()
        .ok_or_else(|| IdRewriteError::NotAnObject(path.display().to_string()))?;

    let Some(current) = obj.get("id").and_then(|v| v.as_str()).map(str::to_string) else {
        return Ok(None);
    };
    let new_id = suffix_id(&current, suffix)?;
    obj.insert("id".to_string(), Value::String(new_id.clone()));

    fs::write(path, serde_json::to_string_pretty(&json)?)?;
    Ok(Some((current, new_id)))
}
