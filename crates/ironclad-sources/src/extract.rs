//! Best-effort field extraction from backend payloads

use serde_json::Value;

/// Walk nested objects along `path`
pub(crate) fn value_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(key))
}

/// String at `path`; numbers and booleans are rendered, null and containers are absent
pub(crate) fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    match value_at(value, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Like `string_at` but blank strings count as absent
pub(crate) fn non_blank_at(value: &Value, path: &[&str]) -> Option<String> {
    string_at(value, path).filter(|s| !s.trim().is_empty())
}

/// Strip a CIDR prefix length (`10.0.0.5/24` -> `10.0.0.5`)
pub(crate) fn strip_prefix_len(address: &str) -> String {
    address
        .split_once('/')
        .map_or(address, |(addr, _)| addr)
        .to_string()
}

/// First tag of the form `<prefix><value>`, returning the value
pub(crate) fn tag_value<'a, I>(tags: I, prefix: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    tags.into_iter()
        .find_map(|tag| tag.strip_prefix(prefix))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_at_nested() {
        let value = json!({"primary_ip": {"address": "10.0.0.5/24"}, "id": 17, "tenant": null});
        assert_eq!(
            string_at(&value, &["primary_ip", "address"]),
            Some("10.0.0.5/24".to_string())
        );
        assert_eq!(string_at(&value, &["id"]), Some("17".to_string()));
        assert_eq!(string_at(&value, &["tenant", "name"]), None);
        assert_eq!(string_at(&value, &["primary_ip"]), None);
        assert_eq!(string_at(&value, &["missing"]), None);
    }

    #[test]
    fn test_non_blank_at() {
        let value = json!({"a": "", "b": "  ", "c": "x"});
        assert_eq!(non_blank_at(&value, &["a"]), None);
        assert_eq!(non_blank_at(&value, &["b"]), None);
        assert_eq!(non_blank_at(&value, &["c"]), Some("x".to_string()));
    }

    #[test]
    fn test_strip_prefix_len() {
        assert_eq!(strip_prefix_len("10.0.0.5/24"), "10.0.0.5");
        assert_eq!(strip_prefix_len("2001:db8::1/64"), "2001:db8::1");
        assert_eq!(strip_prefix_len("10.0.0.5"), "10.0.0.5");
    }

    #[test]
    fn test_tag_value() {
        let tags = ["owner:secops", "env:prod", "env:dev"];
        assert_eq!(tag_value(tags, "env:"), Some("prod".to_string()));
        assert_eq!(tag_value(tags, "site:"), None);
        assert_eq!(tag_value(["env:"], "env:"), None);
    }
}
