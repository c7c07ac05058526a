use serde_json::{Map, Value};

/// Splits a dotted path such as `user.permissions` into its segments.
pub fn split_path(path: &str) -> Vec<String> {
    path.split('.')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Reads the value at `path`. Numeric segments index into arrays.
pub fn json_get<'a, S: AsRef<str>>(value: &'a Value, path: &[S]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        let segment = segment.as_ref();
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Collects the string items of the array at `path`. A missing path or a
/// non-array value yields an empty list, non-string items are skipped.
pub fn json_get_strings<S: AsRef<str>>(value: Option<&Value>, path: &[S]) -> Vec<String> {
    if path.is_empty() {
        return vec![];
    }
    match value.and_then(|v| json_get(v, path)) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(String::from)
            .collect(),
        _ => vec![],
    }
}

/// Removes the value at `path` and returns it.
pub fn json_unset<S: AsRef<str>>(value: &mut Value, path: &[S]) -> Option<Value> {
    let (last, parents) = path.split_last()?;
    let mut current = value;
    for segment in parents {
        current = current.as_object_mut()?.get_mut(segment.as_ref())?;
    }
    current.as_object_mut()?.remove(last.as_ref())
}

/// Writes `new_value` at `path`, creating intermediate objects as needed.
/// Returns false when a segment runs into a non-object value.
pub fn json_set<S: AsRef<str>>(value: &mut Value, path: &[S], new_value: Value) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };
    let mut current = value;
    for segment in parents {
        let map = match current.as_object_mut() {
            Some(map) => map,
            None => return false,
        };
        current = map
            .entry(segment.as_ref())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    match current.as_object_mut() {
        Some(map) => {
            map.insert(last.as_ref().to_string(), new_value);
            true
        }
        None => false,
    }
}

/// Moves the value of every `old -> new` pair (dotted paths) inside `data`.
/// Pairs whose source is missing are ignored.
pub fn rename_json_fields<'a, I>(mut data: Value, mappings: I) -> Value
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    for (old_name, new_name) in mappings {
        let old_path = split_path(old_name);
        let Some(val) = json_unset(&mut data, &old_path) else {
            continue;
        };
        json_set(&mut data, &split_path(new_name), val);
    }
    data
}
