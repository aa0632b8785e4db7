use serde_json::Value;

/// Structural similarity of two JSON records.
///
/// Objects must have the same key set with every value similar; arrays
/// the same length with similar elements in order. Primitives compare by
/// value. Any kind mismatch, including `null` against non-null, is a
/// difference.
pub fn is_similar(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, left)| y.get(key).is_some_and(|right| is_similar(left, right)))
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(left, right)| is_similar(left, right))
        }
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => x == y,
        _ => false,
    }
}
