use super::types::{Criteria, EligibilityVerdict, PatientSummary};

pub const REASON_INCLUSION_MET: &str = "Inclusion met, no exclusions";
pub const REASON_NO_INCLUSION: &str = "No inclusion criteria satisfied";
pub const HARD_EXCLUSION_PREFIX: &str = "Hard exclusion matched: ";

/// Lowercases and trims each entry, dropping entries that end up empty.
pub fn normalize<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items
        .iter()
        .map(|item| item.as_ref().trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

/// A criterion term matches when any normalized patient condition occurs inside it.
#[inline]
fn term_matches(term: &str, conditions: &[String]) -> bool {
    conditions.iter().any(|condition| term.contains(condition.as_str()))
}

/// Returns the first normalized exclusion term hit by `conditions` (already normalized).
pub fn first_exclusion_match(criteria: &Criteria, conditions: &[String]) -> Option<String> {
    normalize(&criteria.exclusion)
        .into_iter()
        .find(|term| term_matches(term, conditions))
}

/// Returns every normalized exclusion term hit by `conditions` (already normalized), in
/// criteria order.
pub fn exclusion_hits(criteria: &Criteria, conditions: &[String]) -> Vec<String> {
    normalize(&criteria.exclusion)
        .into_iter()
        .filter(|term| term_matches(term, conditions))
        .collect()
}

/// Deterministic eligibility decision.
///
/// Exclusions are checked first and the first hit decides; otherwise at least one inclusion
/// term must match. An empty inclusion list is never satisfied.
pub fn evaluate(criteria: &Criteria, patient: &PatientSummary) -> EligibilityVerdict {
    let conditions = normalize(&patient.conditions);

    if let Some(term) = first_exclusion_match(criteria, &conditions) {
        return EligibilityVerdict::ineligible(format!("{HARD_EXCLUSION_PREFIX}{term}"));
    }

    let inclusion_met = normalize(&criteria.inclusion)
        .iter()
        .any(|term| term_matches(term, &conditions));

    if inclusion_met {
        EligibilityVerdict::eligible(REASON_INCLUSION_MET)
    } else {
        EligibilityVerdict::ineligible(REASON_NO_INCLUSION)
    }
}
