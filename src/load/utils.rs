// src/load/utils.rs

/// 1) Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// 2) Column labels: trim surrounding whitespace, drop embedded CR/LF.
pub fn clean_column_name(raw: &str) -> String {
    raw.trim().chars().filter(|c| *c != '\n' && *c != '\r').collect()
}

/// 3) Price coercion. Anything that is not a finite number is missing.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned = clean_str(raw);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Display name for an uploaded file: the file name with its last extension stripped.
pub fn display_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name);
    match base.rfind('.') {
        Some(idx) if idx > 0 => base[..idx].to_string(),
        _ => base.to_string(),
    }
}
