use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use proptest::test_runner::Config;

use projplan_core::velocity::{extrapolate, CurvePoint, ExtrapolationParams};
use projplan_core::{
    Backlog, BacklogTask, ConstraintInterval, ConstraintSeries, FocusArea, FocusAreaRegistry,
    Granularity, PlanError, ScenarioBuilder,
};

fn origin() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Open-ended series from interval lengths (days) and values.
fn series_from(parts: &[(u64, f64)]) -> ConstraintSeries {
    let mut start = origin();
    let mut intervals = Vec::new();
    for (i, (len, value)) in parts.iter().enumerate() {
        if i + 1 == parts.len() {
            intervals.push(ConstraintInterval::open(start, *value));
        } else {
            let end = start + Days::new(len - 1);
            intervals.push(ConstraintInterval::closed(start, end, *value));
            start = end + Days::new(1);
        }
    }
    ConstraintSeries::new(intervals).unwrap()
}

proptest! {
    #![proptest_config(Config::with_cases(64))]

    #[test]
    fn series_value_constant_between_breakpoints(
        parts in prop::collection::vec((1_u64..90, 0.0_f64..10.0), 1..6),
        a in 0_u64..600,
        b in 0_u64..600,
    ) {
        let series = series_from(&parts);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let d1 = origin() + Days::new(lo);
        let d2 = origin() + Days::new(hi);
        let crosses = series.breakpoints().any(|bp| bp > d1 && bp <= d2);
        if !crosses {
            prop_assert_eq!(series.value_at(d1).unwrap(), series.value_at(d2).unwrap());
        }
        let before_origin = origin().pred_opt().unwrap();
        let out_of_range = matches!(series.value_at(before_origin), Err(PlanError::OutOfRange { .. }));
        prop_assert!(out_of_range);
    }

    #[test]
    fn consumed_effort_is_conserved(
        efforts in prop::collection::vec((0.0_f64..60.0, 0.0_f64..60.0), 0..12),
        alloc_a in 0.0_f64..2.0,
        alloc_b in 0.0_f64..2.0,
        wpt in 0.1_f64..2.0,
    ) {
        let registry = FocusAreaRegistry::new(vec![FocusArea::new("A"), FocusArea::new("B")]).unwrap();
        let tasks = efforts
            .iter()
            .enumerate()
            .map(|(i, (ea, eb))| {
                BacklogTask::new(format!("1.0.{i}"), "t")
                    .with_priority((i % 3) as i32)
                    .with_effort("A", *ea)
                    .with_effort("B", *eb)
            })
            .collect();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let scenario = ScenarioBuilder::new("prop", 4.0, registry, origin(), end)
            .granularity(Granularity::Month)
            .work_per_task(wpt)
            .allocation("A", alloc_a)
            .allocation("B", alloc_b)
            .backlog(Backlog::from_tasks(tasks))
            .build()
            .unwrap();
        let roadmap = scenario.schedule().unwrap();

        for name in ["A", "B"] {
            let budget: f64 = roadmap.buckets.iter().map(|r| r.areas[name].budget).sum();
            let total = scenario.backlog().total_effort(name);
            let consumed = roadmap.consumed_total(name);
            prop_assert!((consumed - total.min(budget)).abs() < 1e-6 * (1.0 + total));

            let curve = roadmap.curve(name).unwrap();
            prop_assert!(curve.windows(2).all(|w| w[1].effort >= w[0].effort && w[1].completed >= w[0].completed));
        }
        for record in &roadmap.buckets {
            prop_assert!(record.allocated <= record.capacity + 1e-9);
            prop_assert!(record.unallocated >= 0.0);
        }
    }

    #[test]
    fn over_allocation_is_never_clipped(extra in 0.01_f64..5.0) {
        let registry = FocusAreaRegistry::new(vec![FocusArea::new("A")]).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let result = ScenarioBuilder::new("over", 2.0, registry, origin(), end)
            .allocation("A", 2.0 + extra)
            .build()
            .unwrap()
            .schedule();
        let over = matches!(result, Err(PlanError::OverAllocation { .. }));
        prop_assert!(over);
    }

    #[test]
    fn extrapolation_is_continuous_and_monotone(
        steps in prop::collection::vec((0.1_f64..10.0, 0_u32..3), 1..10),
        horizon in 1.0_f64..300.0,
        delta in 0.0_f64..3.0,
        transition_steps in 1_u32..6,
        final_len in 0.0_f64..40.0,
    ) {
        let mut effort = 0.0;
        let mut completed = 0.0;
        let history: Vec<CurvePoint> = steps
            .iter()
            .map(|(de, dc)| {
                effort += de;
                completed += f64::from(*dc);
                CurvePoint::new(effort, completed)
            })
            .collect();
        let params = ExtrapolationParams::new(horizon)
            .with_delta(delta)
            .with_steps(transition_steps)
            .with_final_len(final_len);
        let ex = extrapolate(&history, &params).unwrap();

        for pair in ex.segments.windows(2) {
            prop_assert_eq!(pair[0].last(), pair[1].first());
        }
        prop_assert_eq!(ex.resampled.len(), horizon.floor() as usize + 1);
        prop_assert!(ex.resampled.windows(2).all(|w| w[1] >= w[0] - 1e-9));
        let points = ex.points();
        prop_assert!(points.windows(2).all(|w| w[1].effort > w[0].effort));
    }
}
