use serde::Serializer;

// Largest integer an f64 holds exactly (2^53).
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

pub fn secs_to_millis(secs: f64) -> i64 {
    (secs * 1000.0).round() as i64
}

pub fn max_option(current: Option<f64>, candidate: f64) -> Option<f64> {
    match current {
        Some(c) if c >= candidate => Some(c),
        _ => Some(candidate),
    }
}

// Integral scores go out as `500`, not `500.0`, so consumers see what the feed sent.
pub fn serialize_compact<S: Serializer>(val: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if val.fract() == 0.0 && val.abs() < MAX_EXACT_INT {
        serializer.serialize_i64(*val as i64)
    } else {
        serializer.serialize_f64(*val)
    }
}

pub fn serialize_compact_opt<S: Serializer>(val: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match val {
        Some(v) => serialize_compact(v, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Wrap {
        #[serde(serialize_with = "serialize_compact")]
        v: f64,
        #[serde(serialize_with = "serialize_compact_opt")]
        o: Option<f64>,
    }

    #[test]
    fn integral_values_have_no_fraction() {
        let s = serde_json::to_string(&Wrap { v: 500.0, o: None }).unwrap();
        assert_eq!(s, r#"{"v":500,"o":null}"#);
    }

    #[test]
    fn fractional_values_are_kept() {
        let s = serde_json::to_string(&Wrap { v: 12.5, o: Some(3.0) }).unwrap();
        assert_eq!(s, r#"{"v":12.5,"o":3}"#);
    }

    #[test]
    fn millis_conversion_rounds() {
        assert_eq!(secs_to_millis(1000.0), 1_000_000);
        assert_eq!(secs_to_millis(1.2345), 1235);
    }

    #[test]
    fn max_option_keeps_largest() {
        assert_eq!(max_option(None, 3.0), Some(3.0));
        assert_eq!(max_option(Some(5.0), 3.0), Some(5.0));
        assert_eq!(max_option(Some(5.0), 7.0), Some(7.0));
    }
}
