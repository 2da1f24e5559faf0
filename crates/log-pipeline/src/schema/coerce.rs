//! 느슨한 타입의 입력값을 스키마 기본 타입으로 변환합니다.
//!
//! 업스트림 포맷은 숫자를 문자열로, 불리언을 `"T"`/`"1"`로 보내는 경우가 많아서
//! 허용되는 확장/축소 변환을 이 모듈에 모아 둡니다. 변환할 수 없으면 `None`을 반환합니다.

use serde_json::Value;

/// 문자열로 변환합니다. 숫자와 불리언은 텍스트 표현을 사용합니다.
pub fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 64비트 정수로 변환합니다.
///
/// 소수부가 없는 실수와 숫자 문자열을 허용합니다.
pub fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| n.as_f64().and_then(integral_f64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral_f64))
        }
        _ => None,
    }
}

/// 실수로 변환합니다. 유한한 값만 허용합니다.
pub fn to_float(value: &Value) -> Option<f64> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

/// 불리언으로 변환합니다.
///
/// 문자열은 `true`/`false`/`t`/`f`/`1`/`0` (대소문자 무시), 숫자는 0과 1만 허용합니다.
pub fn to_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64()? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Some(true),
            "false" | "f" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// JSON 값의 타입 이름 (에러 메시지용)
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 소수부가 없는 유한 실수만 정수로 변환합니다.
pub(crate) fn integral_f64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}
