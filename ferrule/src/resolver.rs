//! Resolution of `${name.path:default}` references against configuration
//! trees.

use crate::Config;

/// Replaces every `${a.b.c:default}` token in `text` by walking the dotted
/// path into `tree`. The first path segment selects a named section; when
/// the path does not resolve, the literal default after the `:` is used
/// instead (empty when absent). Unterminated tokens are left as-is.
///
/// The substitution is idempotent: text without tokens passes through
/// unchanged.
pub fn resolve_references(text: &str, tree: &Config) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let token = &rest[start + 2..];
        match token.find('}') {
            Some(end) => {
                out.push_str(&resolve_token(&token[..end], tree));
                rest = &token[end + 1..];
            }
            None => {
                // No closing brace, keep the remainder literally.
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve_token(token: &str, tree: &Config) -> String {
    let (path, default) = match token.split_once(':') {
        Some((path, default)) => (path, default),
        None => (token, ""),
    };
    tree.lookup(path)
        .and_then(render)
        .unwrap_or_else(|| default.to_owned())
}

fn render(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(v) => Some(v.clone()),
        serde_json::Value::Number(v) => Some(v.to_string()),
        serde_json::Value::Bool(v) => Some(v.to_string()),
        _ => None,
    }
}
