use crate::process::utils::clean_str;

/// Lenient float coercion: anything that is not a finite number becomes `None`.
pub fn to_float(raw: &str) -> Option<f64> {
    clean_str(raw)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Nullable integer coercion. Integral floats ("3.0", "1e2") are accepted,
/// fractional or out-of-range values are not.
pub fn to_int(raw: &str) -> Option<i64> {
    let s = clean_str(raw)?;
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok().filter(|v| v.is_finite())?;
    if f.fract() != 0.0 || f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return None;
    }
    Some(f as i64)
}
