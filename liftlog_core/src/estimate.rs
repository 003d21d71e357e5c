//! Per-set strength estimates.
//!
//! One-rep max uses the Brzycki formula, which loses accuracy past 12 reps;
//! above that a linear extrapolation is used instead.

/// Reps above which Brzycki is replaced by the linear extrapolation
const BRZYCKI_MAX_REPS: u32 = 12;

/// Estimate a one-rep max from a single set
///
/// - 1 rep: the weight itself
/// - more than 12 reps: `weight * (1 + reps / 30)`
/// - otherwise: `weight * 36 / (37 - reps)`
///
/// Callers only pass sets with `reps > 0`.
pub fn estimate_one_rm(weight: f64, reps: u32) -> f64 {
    if reps == 1 {
        return weight;
    }
    if reps > BRZYCKI_MAX_REPS {
        return weight * (1.0 + f64::from(reps) / 30.0);
    }
    weight * (36.0 / (37.0 - f64::from(reps)))
}

/// Round to one decimal place, halves rounding up (towards +inf)
pub fn round1(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}
