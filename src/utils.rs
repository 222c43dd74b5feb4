use std::net::IpAddr;

pub fn valid_ip(ip: &str) -> bool {
    ip.parse::<IpAddr>().is_ok()
}

/// Trim a raw input line, returning `None` for blank lines and `#` comments.
pub fn clean_line(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        None
    } else {
        Some(line)
    }
}

/// Cleaned, non-empty lines of a whole text blob.
pub fn clean_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(clean_line)
        .map(str::to_string)
        .collect()
}
