//! Wear model
//!
//! Pure functions deriving a 0-100 wear score from usage counters and limits,
//! plus the warning and replacement predicates built on top of it.

/// Wear level at which a tool is worn out.
pub const WEAR_LIMIT: f64 = 100.0;

/// Default warning threshold in percent.
pub const DEFAULT_WARNING_THRESHOLD: f64 = 80.0;

/// Ratio of a usage counter against its limit. A limit of zero means unlimited
/// and contributes nothing.
fn usage_ratio(used: f64, limit: f64) -> f64 {
    if limit > 0.0 {
        used.max(0.0) / limit
    } else {
        0.0
    }
}

/// Usage-based wear in percent, clamped to `[0, 100]`.
///
/// `min(100, 100 * max(runtime / max_runtime, distance / max_distance))`
pub fn usage_wear(total_runtime: f64, max_runtime: f64, total_distance: f64, max_distance: f64) -> f64 {
    let ratio = usage_ratio(total_runtime, max_runtime).max(usage_ratio(total_distance, max_distance));
    (ratio * 100.0).clamp(0.0, WEAR_LIMIT)
}

/// Wear in percent derived from measured length loss.
///
/// `max_wear_mm` is the length loss that counts as fully worn.
pub fn probe_wear(length_loss_mm: f64, max_wear_mm: f64) -> f64 {
    if max_wear_mm <= 0.0 {
        return WEAR_LIMIT;
    }
    (length_loss_mm / max_wear_mm * 100.0).clamp(0.0, WEAR_LIMIT)
}

/// True when wear has reached the warning threshold.
pub fn needs_warning(wear_level: f64, warning_threshold: f64) -> bool {
    wear_level >= warning_threshold
}

/// True when the tool is worn out or has been taken out of service.
pub fn needs_replacement(wear_level: f64, is_active: bool) -> bool {
    wear_level >= WEAR_LIMIT || !is_active
}
