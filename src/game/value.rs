use serde::{Deserialize, Serialize};

/// Marker that turns a text event into a number counter, e.g. `"%P%120"`.
pub const COUNTER_MARKER: &str = "%P%";

/// Anything an event can animate between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(f64),
    Vector(Vec<f64>),
    Text(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Scalar(0.0)
    }
}

impl Value {
    /// Missing keyframe values arrive as NaN scalars.
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Scalar(v) if v.is_nan())
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Vector(components) => components.first().copied(),
            Value::Text(_) => None,
        }
    }
}

#[inline(always)]
fn lerp(start: f64, end: f64, progress: f64) -> f64 {
    start + (end - start) * progress
}

#[inline(always)]
fn snap(start: &Value, end: &Value, progress: f64) -> Value {
    if progress >= 1.0 { end.clone() } else { start.clone() }
}

/// Interpolates between two keyframe values at eased `progress`.
pub fn interpolate(start: &Value, end: &Value, progress: f64) -> Value {
    match (start, end) {
        (Value::Scalar(a), Value::Scalar(b)) => Value::Scalar(lerp(*a, *b, progress)),
        (Value::Vector(a), Value::Vector(b)) => {
            if a.len() != b.len() {
                return snap(start, end, progress);
            }
            Value::Vector(a.iter().zip(b).map(|(x, y)| lerp(*x, *y, progress)).collect())
        }
        (Value::Vector(a), Value::Scalar(b)) => {
            Value::Vector(a.iter().map(|x| lerp(*x, *b, progress)).collect())
        }
        (Value::Scalar(a), Value::Vector(b)) => {
            Value::Vector(b.iter().map(|y| lerp(*a, *y, progress)).collect())
        }
        (Value::Text(a), Value::Text(b)) => Value::Text(interpolate_text(a, b, progress)),
        _ => snap(start, end, progress),
    }
}

fn parse_counter(text: &str) -> Option<f64> {
    text.replace(COUNTER_MARKER, "").trim().parse::<f64>().ok()
}

fn interpolate_text(start: &str, end: &str, progress: f64) -> String {
    if start.contains(COUNTER_MARKER) && end.contains(COUNTER_MARKER) {
        if let (Some(a), Some(b)) = (parse_counter(start), parse_counter(end)) {
            let value = lerp(a, b, progress);
            return if a.fract() == 0.0 && b.fract() == 0.0 {
                format!("{}", value.floor() as i64)
            } else {
                format!("{:.3}", value)
            };
        }
    }

    let start_len = start.chars().count();
    let end_len = end.chars().count();
    if start.starts_with(end) {
        // Typewriter erase: shrink from `start` back down to `end`.
        let keep = ((start_len - end_len) as f64 * (1.0 - progress)).floor().max(0.0) as usize;
        return start.chars().take(end_len + keep).collect();
    }
    if end.starts_with(start) {
        let grow = ((end_len - start_len) as f64 * progress).floor().max(0.0) as usize;
        return end.chars().take(start_len + grow).collect();
    }

    if progress >= 1.0 { end.to_string() } else { start.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn scalars_and_vectors_lerp() {
        assert_eq!(interpolate(&Value::Scalar(2.0), &Value::Scalar(6.0), 0.25), Value::Scalar(3.0));
        assert_eq!(
            interpolate(&Value::Vector(vec![0.0, 255.0]), &Value::Vector(vec![100.0, 55.0]), 0.5),
            Value::Vector(vec![50.0, 155.0])
        );
        assert_eq!(
            interpolate(&Value::Vector(vec![0.0, 10.0]), &Value::Scalar(20.0), 0.5),
            Value::Vector(vec![10.0, 15.0])
        );
    }

    #[test]
    fn unequal_vectors_snap() {
        let a = Value::Vector(vec![1.0]);
        let b = Value::Vector(vec![1.0, 2.0]);
        assert_eq!(interpolate(&a, &b, 0.9), a);
        assert_eq!(interpolate(&a, &b, 1.0), b);
    }

    #[test]
    fn typewriter_text_grows_and_shrinks() {
        assert_eq!(interpolate(&text("he"), &text("hello"), 0.0), text("he"));
        assert_eq!(interpolate(&text("he"), &text("hello"), 0.5), text("hel"));
        assert_eq!(interpolate(&text("he"), &text("hello"), 1.0), text("hello"));
        assert_eq!(interpolate(&text("hello"), &text("he"), 0.5), text("hel"));
        assert_eq!(interpolate(&text("hello"), &text("he"), 1.0), text("he"));
    }

    #[test]
    fn typewriter_counts_characters_not_bytes() {
        assert_eq!(interpolate(&text(""), &text("判定線"), 0.7), text("判定"));
    }

    #[test]
    fn unrelated_text_snaps_at_the_end() {
        assert_eq!(interpolate(&text("abc"), &text("xyz"), 0.99), text("abc"));
        assert_eq!(interpolate(&text("abc"), &text("xyz"), 1.0), text("xyz"));
    }

    #[test]
    fn counter_text_interpolates_numbers() {
        assert_eq!(interpolate(&text("%P%0"), &text("%P%100"), 0.255), text("25"));
        assert_eq!(interpolate(&text("%P%0.5"), &text("%P%1"), 0.5), text("0.750"));
    }

    #[test]
    fn mismatched_kinds_snap() {
        assert_eq!(interpolate(&Value::Scalar(1.0), &text("x"), 0.5), Value::Scalar(1.0));
        assert_eq!(interpolate(&Value::Scalar(1.0), &text("x"), 1.0), text("x"));
    }

    #[test]
    fn nan_scalar_marks_a_missing_value() {
        assert!(Value::Scalar(f64::NAN).is_missing());
        assert!(!Value::Scalar(0.0).is_missing());
    }

    #[test]
    fn untagged_json_forms() {
        let values: Vec<Value> = serde_json::from_str(r#"[1.5, [255, 0, 0], "lyric"]"#).unwrap();
        assert_eq!(values, vec![Value::Scalar(1.5), Value::Vector(vec![255.0, 0.0, 0.0]), text("lyric")]);
    }
}
