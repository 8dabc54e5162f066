/// Canonical form of a vehicle plate string.
///
/// Plates arrive from forms, uploads, and scanners in inconsistent shapes
/// ("t_290", " T  290 "). Every stored plate and every lookup argument goes
/// through this: uppercase, underscores become spaces, whitespace runs
/// collapse to a single space, ends trimmed.
pub fn normalize_plate(raw: &str) -> String {
    raw.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}
