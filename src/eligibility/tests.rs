use proptest::prelude::*;
use serde_json::json;

use super::*;

fn summary(conditions: &[&str]) -> PatientSummary {
    PatientSummary {
        conditions: conditions.iter().map(|c| c.to_string()).collect(),
        ..Default::default()
    }
}

#[test]
fn test_inclusion_met_without_exclusion() {
    let criteria = Criteria::new(["asthma"], ["pregnant"]);

    let verdict = evaluate(&criteria, &summary(&["Asthma", "Anxiety"]));

    assert!(verdict.eligible);
    assert_eq!(verdict.reasons, vec!["Inclusion met, no exclusions"]);
    assert_eq!(verdict.confidence, Confidence::High);
}

#[test]
fn test_hard_exclusion_overrides_inclusion() {
    let criteria = Criteria::new(["asthma"], ["pregnant"]);

    let verdict = evaluate(&criteria, &summary(&["Pregnant", "Asthma"]));

    assert!(!verdict.eligible);
    assert_eq!(verdict.reasons, vec!["Hard exclusion matched: pregnant"]);
    assert_eq!(verdict.confidence, Confidence::High);
}

#[test]
fn test_empty_criteria_is_ineligible() {
    let criteria = Criteria::default();

    let verdict = evaluate(&criteria, &summary(&["Asthma"]));

    assert!(!verdict.eligible);
    assert_eq!(verdict.reasons, vec!["No inclusion criteria satisfied"]);
    assert_eq!(verdict.confidence, Confidence::High);
}

#[test]
fn test_empty_criteria_no_conditions_is_ineligible() {
    let verdict = evaluate(&Criteria::default(), &PatientSummary::default());

    assert!(!verdict.eligible);
    assert_eq!(verdict.reasons, vec![REASON_NO_INCLUSION]);
}

#[test]
fn test_condition_must_be_contained_in_term() {
    // "diabetes" is inside the inclusion text; the reverse direction never matches.
    let criteria = Criteria::new(["Adults with Type 2 Diabetes"], Vec::<String>::new());

    assert!(evaluate(&criteria, &summary(&["type 2 diabetes"])).eligible);
    assert!(!evaluate(&criteria, &summary(&["type 2 diabetes mellitus"])).eligible);
}

#[test]
fn test_first_exclusion_wins() {
    let criteria = Criteria::new(["asthma"], ["Severe asthma exacerbation", "asthma in pregnancy"]);

    let verdict = evaluate(&criteria, &summary(&["asthma"]));

    assert_eq!(
        verdict.reasons,
        vec!["Hard exclusion matched: severe asthma exacerbation"]
    );
}

#[test]
fn test_blank_conditions_are_dropped() {
    // A blank condition would otherwise be a substring of every exclusion term.
    let criteria = Criteria::new(["asthma"], ["pregnant"]);

    let verdict = evaluate(&criteria, &summary(&["   ", "", "asthma"]));

    assert!(verdict.eligible);
}

#[test]
fn test_blank_criterion_terms_are_dropped() {
    let criteria = Criteria::new(["  "], ["", "   "]);

    let verdict = evaluate(&criteria, &summary(&["asthma"]));

    assert!(!verdict.eligible);
    assert_eq!(verdict.reasons, vec![REASON_NO_INCLUSION]);
}

#[test]
fn test_normalize() {
    let normalized = normalize(&["  Asthma ", "", "   ", "TYPE 1 Diabetes"]);

    assert_eq!(normalized, vec!["asthma", "type 1 diabetes"]);
}

#[test]
fn test_exclusion_hits_collects_all_in_order() {
    let criteria = Criteria::new(
        Vec::<String>::new(),
        ["Uncontrolled hypertension", "pregnant", "Hypertension crisis"],
    );
    let conditions = normalize(&["hypertension"]);

    let hits = exclusion_hits(&criteria, &conditions);

    assert_eq!(hits, vec!["uncontrolled hypertension", "hypertension crisis"]);
    assert_eq!(
        first_exclusion_match(&criteria, &conditions).as_deref(),
        Some("uncontrolled hypertension")
    );
}

#[test]
fn test_criteria_deserialize_missing_lists() {
    let criteria: Criteria = serde_json::from_value(json!({"inclusion": ["asthma"]})).unwrap();

    assert_eq!(criteria.inclusion, vec!["asthma"]);
    assert!(criteria.exclusion.is_empty());
}

#[test]
fn test_patient_record_ignores_unknown_fields() {
    let patient: Patient = serde_json::from_value(json!({
        "patient_id": "PAT_00001",
        "demographics": {"age": 54, "sex": "Female", "bmi": 31.2},
        "conditions": ["Type 2 Diabetes"],
        "medications": ["Metformin"],
        "RAGText": "Synthetic EHR record"
    }))
    .unwrap();

    assert_eq!(patient.patient_id, "PAT_00001");
    assert_eq!(patient.demographics.age, Some(54));
    assert_eq!(patient.demographics.sex.as_deref(), Some("Female"));
    assert_eq!(patient.demographics.extra.get("bmi"), Some(&json!(31.2)));

    let summary = patient.summary();
    assert_eq!(summary.conditions, vec!["Type 2 Diabetes"]);
    assert_eq!(summary.medications, vec!["Metformin"]);
}

#[test]
fn test_verdict_serialization_shape() {
    let verdict = EligibilityVerdict::conservative("Verification unavailable");

    let value = serde_json::to_value(&verdict).unwrap();

    assert_eq!(
        value,
        json!({"eligible": false, "reasons": ["Verification unavailable"], "confidence": "low"})
    );
}

fn low_terms() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-m]{1,6}", 0..4)
}

fn high_terms() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[n-z ]{0,12}", 0..4)
}

proptest! {
    #[test]
    fn property_evaluate_is_deterministic(
        inclusion in prop::collection::vec("[a-zA-Z ]{0,10}", 0..4),
        exclusion in prop::collection::vec("[a-zA-Z ]{0,10}", 0..4),
        conditions in prop::collection::vec("[a-zA-Z ]{0,8}", 0..4),
    ) {
        let criteria = Criteria { inclusion, exclusion };
        let patient = PatientSummary { conditions, ..Default::default() };

        prop_assert_eq!(evaluate(&criteria, &patient), evaluate(&criteria, &patient));
    }

    #[test]
    fn property_exclusion_dominates(
        conditions in prop::collection::vec("[a-m]{1,6}", 1..4),
        inclusion in prop::collection::vec("[a-z ]{0,10}", 0..4),
        pick in any::<prop::sample::Index>(),
        prefix in "[a-z ]{0,4}",
        suffix in "[a-z ]{0,4}",
    ) {
        let hit = pick.get(&conditions).clone();
        let criteria = Criteria {
            inclusion,
            exclusion: vec![format!("{prefix}{}{suffix}", hit.to_uppercase())],
        };
        let patient = PatientSummary { conditions, ..Default::default() };

        let verdict = evaluate(&criteria, &patient);

        prop_assert!(!verdict.eligible);
        prop_assert!(verdict.reasons[0].starts_with(HARD_EXCLUSION_PREFIX));
    }

    #[test]
    fn property_inclusion_necessity(
        conditions in low_terms(),
        inclusion in prop::collection::vec("[a-z ]{0,10}", 1..4),
        exclusion in high_terms(),
    ) {
        // Conditions use letters a-m only, exclusions n-z only, so no exclusion can match.
        let normalized = normalize(&conditions);
        let expected = normalize(&inclusion)
            .iter()
            .any(|term| normalized.iter().any(|c| term.contains(c.as_str())));

        let criteria = Criteria { inclusion, exclusion };
        let patient = PatientSummary { conditions, ..Default::default() };

        prop_assert_eq!(evaluate(&criteria, &patient).eligible, expected);
    }
}
