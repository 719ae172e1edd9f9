//! Content path to human path conversion

/// Strip the content-address `prefix` from `logical` and normalize separators.
///
/// `/cas/<root>/a//b.txt` with prefix `/cas/<root>` becomes `/a/b.txt`; the
/// prefix alone becomes `/`.
pub fn relative_path(logical: &str, prefix: &str) -> String {
    let rest = match logical.strip_prefix(prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => logical,
    };
    collapse_separators(&format!("/{}", rest))
}

/// Collapse runs of `/` into one
pub fn collapse_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        out.push(c);
    }
    out
}
