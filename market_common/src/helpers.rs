/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// The human-facing short form of an identifier: its last 8 characters, upper-cased.
pub fn short_id(id: &str) -> String {
    let chars = id.chars().collect::<Vec<char>>();
    let start = chars.len().saturating_sub(8);
    chars[start..].iter().collect::<String>().to_uppercase()
}
