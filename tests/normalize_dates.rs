// tests/normalize_dates.rs
use chrono::NaiveDate;
use oldtimecrank::lead::PostedDate;
use oldtimecrank::normalize::{normalize_date_at, normalize_opt_date_at};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn known(y: i32, m: u32, day: u32) -> PostedDate {
    PostedDate::Known(d(y, m, day))
}

#[test]
fn full_timestamps_truncate_to_written_date() {
    let today = d(2026, 3, 1);
    assert_eq!(normalize_date_at("2026-02-14T23:30:00-05:00", today), known(2026, 2, 14));
    assert_eq!(normalize_date_at("2026-02-14 08:15", today), known(2026, 2, 14));
    assert_eq!(normalize_date_at("2026-02-14", today), known(2026, 2, 14));
    assert_eq!(normalize_date_at("02/14/2025", today), known(2025, 2, 14));
    assert_eq!(
        normalize_date_at("Sat, 14 Feb 2026 10:00:00 +0000", today),
        known(2026, 2, 14)
    );
}

#[test]
fn month_day_uses_current_year() {
    let today = d(2026, 3, 1);
    assert_eq!(normalize_date_at("2/14", today), known(2026, 2, 14));
    assert_eq!(normalize_date_at("posted 2/14 - $100", today), known(2026, 2, 14));
}

#[test]
fn embedded_full_date_in_meta_text_keeps_its_year() {
    let today = d(2026, 3, 1);
    assert_eq!(normalize_date_at("2/10/2026 BOCA RATON", today), known(2026, 2, 10));
    assert_eq!(normalize_date_at("posted 12/30/2025\nMiami", today), known(2025, 12, 30));
}

#[test]
fn invalid_token_does_not_hide_a_later_valid_one() {
    let today = d(2026, 3, 1);
    assert_eq!(normalize_date_at("13/45 2/10", today), known(2026, 2, 10));
    assert_eq!(normalize_date_at("2/30 then 2/11", today), known(2026, 2, 11));
}

#[test]
fn tokens_glued_to_other_digits_are_ignored() {
    let today = d(2026, 3, 1);
    assert_eq!(normalize_date_at("2026/2/10", today), PostedDate::UnknownOld);
    assert_eq!(normalize_date_at("1/2/3", today), PostedDate::UnknownOld);
    assert_eq!(normalize_date_at("12/30/26", today), PostedDate::UnknownOld);
}

#[test]
fn month_day_within_tolerance_stays_this_year() {
    let today = d(2026, 3, 1);
    assert_eq!(normalize_date_at("3/3", today), known(2026, 3, 3));
}

#[test]
fn month_day_past_tolerance_wraps_to_last_year() {
    let today = d(2026, 1, 3);
    assert_eq!(normalize_date_at("12/30", today), known(2025, 12, 30));
    assert_eq!(normalize_date_at("1/6", today), known(2025, 1, 6));
}

#[test]
fn garbage_degrades_to_sentinel() {
    let today = d(2026, 3, 1);
    for raw in ["", "   ", "yesterday", "13/45", "2/30", "1970-01-01", "1969-07-20"] {
        assert_eq!(normalize_date_at(raw, today), PostedDate::UnknownOld, "{raw:?}");
    }
    assert_eq!(normalize_opt_date_at(None, today), PostedDate::UnknownOld);
}

#[test]
fn sentinel_sorts_before_every_real_date() {
    assert!(PostedDate::UnknownOld < known(1970, 1, 2));
    assert_eq!(PostedDate::UnknownOld.to_string(), "1970-01-01");
}

#[test]
fn normalizing_own_output_is_stable() {
    let mut rng = StdRng::seed_from_u64(42);
    let today = d(2026, 1, 2);

    for _ in 0..1_000 {
        let raw = match rng.random_range(0..5) {
            0 => format!("{}/{}", rng.random_range(0..15), rng.random_range(0..35)),
            1 => format!(
                "{:04}-{:02}-{:02}",
                rng.random_range(1960..2030),
                rng.random_range(1..13),
                rng.random_range(1..29)
            ),
            2 => format!(
                "{:02}/{:02}/{}",
                rng.random_range(1..13),
                rng.random_range(1..29),
                rng.random_range(1990..2030)
            ),
            3 => "no date here".to_string(),
            _ => String::new(),
        };
        let once = normalize_date_at(&raw, today);
        let twice = normalize_date_at(&once.to_string(), today);
        assert_eq!(once, twice, "not stable for {raw:?}");
    }
}
