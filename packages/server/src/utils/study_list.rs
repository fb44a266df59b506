use std::collections::HashSet;

use notes_common::limits::MAX_BATCH_STUDIES;

use crate::error::AppError;

/// Extract the `studies` parameter from a raw query string.
///
/// Each UID is percent-decoded individually after splitting on `,`, so an
/// encoded comma inside a UID never splits it. UIDs are trimmed, blanks are
/// dropped and duplicates collapse onto their first occurrence.
pub fn parse_study_uids(raw_query: Option<&str>) -> Result<Vec<String>, AppError> {
    let value = raw_query
        .into_iter()
        .flat_map(|q| q.split('&'))
        .find_map(|pair| pair.strip_prefix("studies="))
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let mut uids: Vec<String> = Vec::new();
    for part in value.split(',') {
        let part = part.replace('+', " ");
        let decoded = urlencoding::decode(&part)
            .map_err(|e| AppError::Validation(format!("Invalid study UID encoding: {e}")))?;
        let uid = decoded.trim();
        if uid.is_empty() || !seen.insert(uid.to_string()) {
            continue;
        }
        if uids.len() == MAX_BATCH_STUDIES {
            return Err(AppError::Validation(format!(
                "Too many studies requested (max {MAX_BATCH_STUDIES})"
            )));
        }
        uids.push(uid.to_string());
    }

    Ok(uids)
}
