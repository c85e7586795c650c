//! Number formatting for terminal output.

/// Format a count with thousands separators. Example: `131072` -> `"131,072"`.
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format a window size in binary kilotokens. Example: `32768` -> `"32K"`.
pub fn format_window(window: u32) -> String {
    if window >= 1024 && window % 1024 == 0 {
        format!("{}K", window / 1024)
    } else {
        window.to_string()
    }
}
