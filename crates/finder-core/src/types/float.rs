//! 무한대/NaN을 허용하는 f64 직렬화.
//!
//! 손실이 없는 결과의 프로핏 팩터는 `+∞`이지만 JSON 숫자는 무한대를 표현하지
//! 못합니다. 무한대는 `"Infinity"`/`"-Infinity"` 문자열로, NaN은 `null`로
//! 주고받습니다.
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct Stats {
//!     #[serde(with = "finder_core::lenient_f64")]
//!     profit_factor: f64,
//! }
//! ```

/// `#[serde(with = "lenient_f64")]` 용 모듈.
pub mod lenient_f64 {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    /// f64 직렬화. 유한하지 않은 값은 문자열 또는 null로 기록합니다.
    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_none()
        } else if *value > 0.0 {
            serializer.serialize_str("Infinity")
        } else {
            serializer.serialize_str("-Infinity")
        }
    }

    /// 숫자, `"Infinity"`/`"-Infinity"`/`"NaN"` 문자열, null을 모두 받습니다.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| D::Error::custom("number is not representable as f64")),
            Value::String(s) => match s.as_str() {
                "Infinity" | "inf" | "+Infinity" => Ok(f64::INFINITY),
                "-Infinity" | "-inf" => Ok(f64::NEG_INFINITY),
                "NaN" => Ok(f64::NAN),
                other => other
                    .parse::<f64>()
                    .map_err(|_| D::Error::custom(format!("invalid float string: {}", other))),
            },
            Value::Null => Ok(f64::NAN),
            other => Err(D::Error::custom(format!(
                "expected number or string, got {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Probe {
        #[serde(with = "super::lenient_f64")]
        value: f64,
    }

    #[test]
    fn test_infinity_survives_json() {
        let json = serde_json::to_string(&Probe {
            value: f64::INFINITY,
        })
        .unwrap();
        assert_eq!(json, r#"{"value":"Infinity"}"#);

        let back: Probe = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value, f64::INFINITY);
    }

    #[test]
    fn test_null_reads_as_nan() {
        let probe: Probe = serde_json::from_str(r#"{"value":null}"#).unwrap();
        assert!(probe.value.is_nan());

        let probe: Probe = serde_json::from_str(r#"{"value":1.25}"#).unwrap();
        assert_eq!(probe.value, 1.25);
    }
}
