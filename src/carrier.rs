// src/carrier.rs

/// SCAC codes whose display name overrides whatever the tracking info says.
const KNOWN_CARRIERS: &[(&str, &str)] = &[
    ("EXLA", "Estes Express Lines"),
    ("AACT", "AAA Cooper Transportation"),
    ("CTII", "Central Transport Inc."),
    ("CETR", "Central Transport Inc."),
    ("ABF", "ABF"),
    ("PITD", "PITT Ohio"),
];

/// Canonical carrier name for `scac`, or `fallback` unchanged when the code
/// is not one we know.
pub fn resolve(scac: &str, fallback: &str) -> String {
    let code = scac.trim().to_uppercase();
    KNOWN_CARRIERS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| fallback.to_string())
}
