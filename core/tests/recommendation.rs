//! The streak rule over pressure leaders.

use revenue_core::{
    recommendation::{latest_non_null, select, trailing_streak, RecommendationMode},
    types::Driver::{self, Acquisition, Pricing, Retention},
};

fn s(series: &[Option<Driver>]) -> Vec<Option<Driver>> {
    series.to_vec()
}

#[test]
fn three_identical_trailing_leaders_name_a_single_driver() {
    let pressure = s(&[Some(Retention), Some(Pricing), Some(Pricing), Some(Pricing)]);
    let lever = s(&[Some(Acquisition), Some(Acquisition), Some(Retention), Some(Acquisition)]);

    let rec = select(&pressure, &lever, 3);

    assert_eq!(rec.mode, RecommendationMode::SingleDriver);
    assert_eq!(rec.driver, Some(Pricing));
    assert_eq!(rec.pressure_streak, 3);
    assert_eq!(rec.lever_leader, Some(Acquisition));
}

#[test]
fn an_interrupted_tail_is_mixed_signal() {
    let pressure = s(&[Some(Pricing), Some(Pricing), Some(Retention), Some(Pricing)]);

    let rec = select(&pressure, &[], 3);

    assert_eq!(rec.mode, RecommendationMode::MixedSignal);
    assert_eq!(rec.driver, None);
    assert_eq!(rec.pressure_streak, 1);
    assert_eq!(rec.pressure_leader, Some(Pricing));
    assert_eq!(rec.lever_leader, None);
}

#[test]
fn a_trailing_null_breaks_the_streak() {
    let pressure = s(&[Some(Pricing), Some(Pricing), Some(Pricing), None]);

    assert_eq!(trailing_streak(&pressure), 0);
    let rec = select(&pressure, &pressure, 3);
    assert_eq!(rec.mode, RecommendationMode::MixedSignal);
    assert_eq!(rec.pressure_leader, Some(Pricing));
}

#[test]
fn nulls_before_the_tail_do_not_matter() {
    let pressure = s(&[None, None, Some(Retention), Some(Retention), Some(Retention)]);
    assert_eq!(trailing_streak(&pressure), 3);
    assert_eq!(select(&pressure, &[], 3).driver, Some(Retention));
}

#[test]
fn empty_series_is_mixed_signal() {
    let rec = select(&[], &[], 3);
    assert_eq!(rec.mode, RecommendationMode::MixedSignal);
    assert_eq!(rec.pressure_streak, 0);
    assert_eq!(rec.pressure_leader, None);
}

#[test]
fn latest_non_null_skips_trailing_gaps() {
    assert_eq!(latest_non_null(&[Some(Acquisition), Some(Retention), None]), Some(Retention));
    assert_eq!(latest_non_null(&[None, None]), None);
}

#[test]
fn mode_serializes_kebab_case() {
    let rec = select(&s(&[Some(Pricing); 3]), &[], 3);
    let json = serde_json::to_string(&rec).unwrap();
    assert!(json.contains(r#""mode":"single-driver""#), "{json}");
    assert!(json.contains(r#""driver":"pricing""#), "{json}");
}
