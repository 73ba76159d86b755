use googletest::prelude::*;
use rstest::rstest;

use super::*;

#[googletest::test]
#[rstest]
#[case::none(0, Confidence::None)]
#[case::low_edge(25, Confidence::Low)]
#[case::medium_edge(50, Confidence::Medium)]
#[case::high_edge(75, Confidence::High)]
#[case::top(100, Confidence::High)]
fn test_confidence_from_pct(#[case] pct: u8, #[case] expected: Confidence) {
    expect_that!(Confidence::from_pct(pct), eq(expected));
}

#[googletest::test]
fn test_confidence_ordering_and_display() {
    expect_that!(Confidence::None, lt(Confidence::Low));
    expect_that!(Confidence::Medium, lt(Confidence::High));
    expect_that!(Confidence::Medium.to_string(), eq("medium"));
}

fn default_sequence() -> Vec<Box<dyn Observer>> {
    vec![
        Box::new(BiphaseObserver),
        Box::new(FieldParityObserver),
        Box::new(PalPhaseObserver),
        Box::new(PulldownObserver),
        Box::new(LeadInOutObserver),
        Box::new(FieldQualityObserver),
        Box::new(BurstLevelObserver),
        Box::new(WhiteSnrObserver),
        Box::new(BlackPsnrObserver),
        Box::new(WhiteFlagObserver),
        Box::new(FmCodeObserver),
        Box::new(ClosedCaptionObserver),
        Box::new(VitcObserver),
        Box::new(VideoIdObserver),
    ]
}

#[googletest::test]
fn test_default_sequence_validates() {
    let report = validate_observer_sequence(&default_sequence());
    expect_that!(report.errors, empty());
    expect_that!(report.warnings, empty());
    expect_that!(report.is_valid(), eq(true));
}

#[googletest::test]
fn test_requirements_before_providers_are_errors() {
    // Pulldown and lead-in/out both need the biphase results.
    let observers: Vec<Box<dyn Observer>> =
        vec![Box::new(PulldownObserver), Box::new(BiphaseObserver)];
    let report = validate_observer_sequence(&observers);
    expect_that!(report.is_valid(), eq(false));
    expect_that!(report.errors, len(eq(2)));
    expect_that!(report.errors[0], contains_substring("biphase.confidence"));
    expect_that!(report.errors[1], contains_substring("biphase.picture_number"));
}

#[googletest::test]
fn test_duplicate_providers_warn() {
    let observers: Vec<Box<dyn Observer>> =
        vec![Box::new(BiphaseObserver), Box::new(BiphaseObserver)];
    let report = validate_observer_sequence(&observers);
    expect_that!(report.is_valid(), eq(true));
    expect_that!(report.warnings.is_empty(), eq(false));
}

#[googletest::test]
fn test_observer_schemas_register_cleanly() {
    // The full observer set's declared keys must form a consistent schema.
    let mut context = crate::obs::ObservationContext::new();
    for observer in default_sequence() {
        context.register_schema(&observer.provided_observations()).unwrap();
    }
}

#[googletest::test]
fn test_default_configuration_is_accepted() {
    let mut observer = BiphaseObserver;
    let config = crate::params::ParameterMap::new();
    expect_that!(observer.configure(&config).is_ok(), eq(true));
}
