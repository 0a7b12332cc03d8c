/// Property-based tests using proptest
/// Tests invariants of the estimator, scorer and validators for all inputs
use proptest::prelude::*;
use restoration_leads::assessment::DamageAssessment;
use restoration_leads::estimator::calculate_restoration_cost;
use restoration_leads::models::{DamageType, LeadTier, PropertyType, Severity, Urgency};
use restoration_leads::scoring::{calculate_lead_score, score_lead};
use restoration_leads::validation::{is_valid_email, validate_us_phone};

fn damage_type() -> impl Strategy<Value = Option<DamageType>> {
    prop::option::of(prop_oneof![
        Just(DamageType::Water),
        Just(DamageType::Fire),
        Just(DamageType::Mold),
        Just(DamageType::Storm),
        Just(DamageType::Industrial),
        Just(DamageType::Environmental),
    ])
}

fn severity() -> impl Strategy<Value = Option<Severity>> {
    prop::option::of(prop_oneof![
        Just(Severity::Minor),
        Just(Severity::Moderate),
        Just(Severity::Severe),
        Just(Severity::Catastrophic),
    ])
}

fn urgency() -> impl Strategy<Value = Option<Urgency>> {
    prop::option::of(prop_oneof![
        Just(Urgency::Emergency),
        Just(Urgency::Urgent),
        Just(Urgency::Scheduled),
        Just(Urgency::Assessment),
    ])
}

fn property_type() -> impl Strategy<Value = Option<PropertyType>> {
    prop::option::of(prop_oneof![
        Just(PropertyType::Office),
        Just(PropertyType::Warehouse),
        Just(PropertyType::Manufacturing),
        Just(PropertyType::Retail),
        Just(PropertyType::Healthcare),
        Just(PropertyType::Educational),
        Just(PropertyType::MultiFamily),
        Just(PropertyType::Restaurant),
        Just(PropertyType::Other),
    ])
}

fn subcategory() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop_oneof![
        Just("category1".to_string()),
        Just("category3".to_string()),
        Just("classC".to_string()),
        Just("blackMold".to_string()),
        Just("roof".to_string()),
        Just("hazmat".to_string()),
        "[a-z]{0,8}",
    ])
}

fn affected_areas() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            Just("HVAC system".to_string()),
            Just("electrical".to_string()),
            Just("Contents/inventory".to_string()),
            Just("Flooring".to_string()),
        ],
        0..4,
    )
}

prop_compose! {
    fn assessment()(
        damage_type in damage_type(),
        damage_subcategory in subcategory(),
        severity in severity(),
        urgency in urgency(),
        property_type in property_type(),
        square_footage in prop::option::of(1i64..=500_000),
        affected_areas in affected_areas(),
    ) -> DamageAssessment {
        DamageAssessment {
            damage_type,
            damage_subcategory,
            severity,
            urgency,
            property_type,
            square_footage,
            affected_areas,
            ..Default::default()
        }
    }
}

// Property: estimates are a well-formed ±20% band
proptest! {
    #[test]
    fn estimate_range_is_ordered_and_positive(a in assessment()) {
        let estimate = calculate_restoration_cost(&a);
        prop_assert!(estimate.low > 0);
        prop_assert!(estimate.low <= estimate.high);
    }

    #[test]
    fn estimate_band_is_twenty_percent_around_total(a in assessment()) {
        let estimate = calculate_restoration_cost(&a);
        let total = (estimate.base_cost + estimate.complexity) as f64;
        // base_cost and complexity are each rounded, so allow a couple of dollars
        prop_assert!((estimate.low as f64 - total * 0.8).abs() <= 2.0);
        prop_assert!((estimate.high as f64 - total * 1.2).abs() <= 2.0);
    }

    #[test]
    fn estimate_is_deterministic(a in assessment()) {
        prop_assert_eq!(calculate_restoration_cost(&a), calculate_restoration_cost(&a));
    }

    #[test]
    fn larger_area_never_costs_less(a in assessment(), extra in 1i64..10_000) {
        let sq_ft = a.square_footage.unwrap_or(1_000);
        let bigger = DamageAssessment { square_footage: Some(sq_ft + extra), ..a.clone() };
        let smaller = DamageAssessment { square_footage: Some(sq_ft), ..a };
        prop_assert!(
            calculate_restoration_cost(&bigger).high >= calculate_restoration_cost(&smaller).high
        );
    }
}

// Property: scores stay in range and tiers follow the thresholds
proptest! {
    #[test]
    fn score_is_bounded(a in assessment(), estimate_high in prop::option::of(0i64..1_000_000)) {
        let score = calculate_lead_score(&a, estimate_high);
        prop_assert!(score <= 100);
        prop_assert!(score >= 50);
    }

    #[test]
    fn score_is_deterministic(a in assessment(), estimate_high in prop::option::of(0i64..1_000_000)) {
        prop_assert_eq!(score_lead(&a, estimate_high), score_lead(&a, estimate_high));
    }

    #[test]
    fn tier_matches_score(a in assessment(), estimate_high in prop::option::of(0i64..1_000_000)) {
        let scored = score_lead(&a, estimate_high);
        prop_assert_eq!(scored.tier, LeadTier::from_score(scored.score));
    }

    #[test]
    fn tier_is_monotonic(x in 0u8..=100, y in 0u8..=100) {
        let (lo, hi) = if x <= y { (x, y) } else { (y, x) };
        prop_assert!(LeadTier::from_score(lo) <= LeadTier::from_score(hi));
    }
}

// Property: validators never panic
proptest! {
    #[test]
    fn email_validation_never_panics(email in "\\PC*") {
        let _ = is_valid_email(&email);
    }

    #[test]
    fn phone_validation_never_panics(phone in "\\PC*") {
        let _ = validate_us_phone(&phone);
    }

    #[test]
    fn valid_us_phones_normalize_to_e164(
        area in prop_oneof![Just("301"), Just("202"), Just("703"), Just("410")],
        exchange in 200u16..=999,
        line in 0u16..=9999,
    ) {
        let phone = format!("({}) {}-{:04}", area, exchange, line);
        let (valid, normalized) = validate_us_phone(&phone);
        if valid {
            prop_assert!(normalized.starts_with("+1"));
            prop_assert_eq!(normalized.len(), 12);
        }
    }
}

#[test]
fn test_known_estimate() {
    let a = DamageAssessment {
        damage_type: Some(DamageType::Water),
        severity: Some(Severity::Moderate),
        urgency: Some(Urgency::Urgent),
        property_type: Some(PropertyType::Office),
        square_footage: Some(3_000),
        ..Default::default()
    };
    let estimate = calculate_restoration_cost(&a);
    assert_eq!((estimate.low, estimate.high), (19_800, 29_700));
}

#[test]
fn test_top_lead_is_platinum() {
    let a = DamageAssessment {
        damage_type: Some(DamageType::Fire),
        severity: Some(Severity::Catastrophic),
        urgency: Some(Urgency::Emergency),
        property_type: Some(PropertyType::Manufacturing),
        square_footage: Some(30_000),
        ..Default::default()
    };
    let scored = score_lead(&a, Some(150_000));
    assert!(scored.score >= 90);
    assert_eq!(scored.tier, LeadTier::Platinum);
}
