//! Cohen's kappa for pairwise annotator agreement.

/// Kappa over joint yes/no decisions from two annotators.
///
/// When chance agreement is total the correction divides by zero; that
/// degenerate case returns 1.0 if observed agreement is also total and
/// 0.0 otherwise.
pub fn cohen_kappa(decisions: &[(bool, bool)]) -> f64 {
    if decisions.is_empty() {
        return 0.0;
    }
    let n = decisions.len() as f64;
    let observed = decisions.iter().filter(|(a, b)| a == b).count() as f64 / n;
    let a_yes = decisions.iter().filter(|(a, _)| *a).count() as f64 / n;
    let b_yes = decisions.iter().filter(|(_, b)| *b).count() as f64 / n;
    let expected = a_yes * b_yes + (1.0 - a_yes) * (1.0 - b_yes);
    if (1.0 - expected).abs() < f64::EPSILON {
        return if observed >= 1.0 - f64::EPSILON { 1.0 } else { 0.0 };
    }
    (observed - expected) / (1.0 - expected)
}
