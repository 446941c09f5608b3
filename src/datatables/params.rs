//! Bracket-notation parameter nesting
//!
//! The widget sends its request as flat form pairs whose keys encode a tree:
//!
//! ```text
//! columns[0][data]=name&columns[0][search][value]=&order[0][column]=0&order[0][dir]=asc
//! ```
//!
//! `nest_pairs` rebuilds that tree as JSON. Objects whose keys are exactly
//! `0..n` become arrays, so the result has the same shape whether the widget posted a
//! form or a JSON body.

use serde_json::{Map, Value};

/// Split `a[b][c]` into `["a", "b", "c"]`; `a[]` yields an empty (append) segment
///
/// Keys with unbalanced brackets are kept whole.
pub fn split_key(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };
    if open == 0 {
        return vec![key.to_string()];
    }

    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];

    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            return vec![key.to_string()];
        };
        segments.push(stripped[..close].to_string());
        rest = &stripped[close + 1..];
    }

    if !rest.is_empty() {
        return vec![key.to_string()];
    }

    segments
}

/// Nest flat `(key, value)` pairs into a JSON object tree
pub fn nest_pairs<I, K, V>(pairs: I) -> Value
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut root = Map::new();
    for (key, value) in pairs {
        let segments = split_key(key.as_ref());
        insert_path(&mut root, &segments, Value::String(value.into()));
    }
    listify(Value::Object(root))
}

fn insert_path(node: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((head, tail)) = segments.split_first() else {
        return;
    };

    let key = if head.is_empty() {
        node.len().to_string()
    } else {
        head.clone()
    };

    if tail.is_empty() {
        node.insert(key, value);
        return;
    }

    let child = node
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        *child = Value::Object(Map::new());
    }
    if let Value::Object(map) = child {
        insert_path(map, tail, value);
    }
}

/// Turn index-keyed objects (`{"0": .., "1": ..}`) into arrays, recursively
fn listify(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let is_list = !map.is_empty()
                && (0..map.len()).all(|idx| map.contains_key(&idx.to_string()));
            if is_list {
                let mut map = map;
                let items = (0..map.len())
                    .filter_map(|idx| map.remove(&idx.to_string()))
                    .map(listify)
                    .collect();
                Value::Array(items)
            } else {
                Value::Object(map.into_iter().map(|(k, v)| (k, listify(v))).collect())
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(listify).collect()),
        other => other,
    }
}

/// Entries of a list-like value in index order
///
/// Accepts arrays and sparse index-keyed objects; numeric keys sort numerically,
/// other keys follow in map order.
pub fn indexed_entries(value: &Value) -> Vec<(usize, &Value)> {
    match value {
        Value::Array(items) => items.iter().enumerate().collect(),
        Value::Object(map) => {
            let mut numeric: Vec<(usize, &Value)> = Vec::new();
            let mut other: Vec<&Value> = Vec::new();
            for (key, item) in map {
                match key.parse::<usize>() {
                    Ok(idx) => numeric.push((idx, item)),
                    Err(_) => other.push(item),
                }
            }
            numeric.sort_by_key(|(idx, _)| *idx);
            let next = numeric.last().map(|(idx, _)| idx + 1).unwrap_or(0);
            numeric.extend(other.into_iter().enumerate().map(|(i, v)| (next + i, v)));
            numeric
        }
        _ => Vec::new(),
    }
}

/// Loose integer coercion of a scalar parameter
///
/// Strings yield their leading integer (`"12abc"` -> 12, `"abc"` -> 0), floats
/// truncate, booleans map to 0/1. A missing value yields `default`.
pub fn int_param(value: Option<&Value>, default: i64) -> i64 {
    match value {
        None | Some(Value::Null) => default,
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => leading_int(s),
        Some(Value::Bool(b)) => i64::from(*b),
        Some(_) => 0,
    }
}

fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        if c.is_ascii_digit() || (idx == 0 && (c == '-' || c == '+')) {
            end = idx + c.len_utf8();
        } else {
            break;
        }
    }
    s[..end].parse().unwrap_or(0)
}

/// Lenient boolean coercion (`true/1/yes/on` and `false/0/no/off/""`)
pub fn bool_param(value: Option<&Value>, default: bool) -> bool {
    match value {
        None | Some(Value::Null) => default,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(default),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" | "" => false,
            _ => default,
        },
        Some(_) => default,
    }
}

/// Scalar parameter as a non-empty string
pub fn string_param(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("draw"), vec!["draw"]);
        assert_eq!(split_key("search[value]"), vec!["search", "value"]);
        assert_eq!(
            split_key("columns[0][search][regex]"),
            vec!["columns", "0", "search", "regex"]
        );
        assert_eq!(split_key("tags[]"), vec!["tags", ""]);
        assert_eq!(split_key("broken[0"), vec!["broken[0"]);
        assert_eq!(split_key("[0]"), vec!["[0]"]);
        assert_eq!(split_key("a[0]tail"), vec!["a[0]tail"]);
    }

    #[test]
    fn test_nest_datatables_form() {
        let pairs = vec![
            ("draw", "3"),
            ("columns[0][data]", "name"),
            ("columns[0][searchable]", "true"),
            ("columns[1][data]", "email"),
            ("order[0][column]", "1"),
            ("order[0][dir]", "desc"),
            ("search[value]", "ann"),
            ("filter[status]", "active"),
        ];

        let value = nest_pairs(pairs);
        assert_eq!(
            value,
            json!({
                "draw": "3",
                "columns": [
                    {"data": "name", "searchable": "true"},
                    {"data": "email"}
                ],
                "order": [{"column": "1", "dir": "desc"}],
                "search": {"value": "ann"},
                "filter": {"status": "active"}
            })
        );
    }

    #[test]
    fn test_nest_append_segments() {
        let value = nest_pairs(vec![("tags[]", "a"), ("tags[]", "b")]);
        assert_eq!(value, json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn test_sparse_indices_stay_objects() {
        let value = nest_pairs(vec![("columns[2][data]", "x")]);
        assert_eq!(value, json!({"columns": {"2": {"data": "x"}}}));

        let columns = &value["columns"];
        let entries = indexed_entries(columns);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, 2);
    }

    #[test]
    fn test_indexed_entries_sorts_numerically() {
        let value = json!({"10": "b", "2": "a"});
        let entries: Vec<_> = indexed_entries(&value).into_iter().map(|(i, _)| i).collect();
        assert_eq!(entries, vec![2, 10]);
    }

    #[test]
    fn test_int_param() {
        assert_eq!(int_param(None, -1), -1);
        assert_eq!(int_param(Some(&json!(7)), -1), 7);
        assert_eq!(int_param(Some(&json!(7.9)), -1), 7);
        assert_eq!(int_param(Some(&json!("12")), -1), 12);
        assert_eq!(int_param(Some(&json!("-1")), 0), -1);
        assert_eq!(int_param(Some(&json!("12abc")), -1), 12);
        assert_eq!(int_param(Some(&json!("abc")), -1), 0);
        assert_eq!(int_param(Some(&json!(true)), -1), 1);
        assert_eq!(int_param(Some(&json!([1])), -1), 0);
    }

    #[test]
    fn test_bool_param() {
        assert!(bool_param(None, true));
        assert!(bool_param(Some(&json!("true")), false));
        assert!(bool_param(Some(&json!("1")), false));
        assert!(!bool_param(Some(&json!("false")), true));
        assert!(!bool_param(Some(&json!("")), true));
        assert!(!bool_param(Some(&json!(false)), true));
        assert!(bool_param(Some(&json!("maybe")), true));
    }

    #[test]
    fn test_string_param() {
        assert_eq!(string_param(Some(&json!("x"))), Some("x".to_string()));
        assert_eq!(string_param(Some(&json!(""))), None);
        assert_eq!(string_param(Some(&json!(3))), Some("3".to_string()));
        assert_eq!(string_param(Some(&json!(null))), None);
    }
}
