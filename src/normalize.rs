use serde_json::Value;

/// Bookkeeping keys DAS attaches to every result row.
pub const SERVICE_HEADERS: [&str; 5] = ["das_id", "cache_id", "qhash", "_id", "das"];

/// Drops DAS bookkeeping from a successful response and returns its `data` rows.
///
/// Responses whose `status` is not `ok`, or that carry no `data` array, come back
/// untouched, as does everything when `include_service_headers` is set.
pub fn normalize(document: Value, include_service_headers: bool) -> Value {
    if include_service_headers {
        return document;
    }
    if document.get("status").and_then(Value::as_str) != Some("ok") {
        return document;
    }
    let Value::Object(mut object) = document else {
        return document;
    };
    match object.remove("data") {
        Some(Value::Array(mut rows)) => {
            for row in rows.iter_mut().filter_map(Value::as_object_mut) {
                for key in SERVICE_HEADERS {
                    row.remove(key);
                }
            }
            Value::Array(rows)
        }
        Some(other) => {
            object.insert("data".to_string(), other);
            Value::Object(object)
        }
        None => Value::Object(object),
    }
}
