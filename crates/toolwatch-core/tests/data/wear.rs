use proptest::prelude::*;
use toolwatch_core::data::wear;
use toolwatch_core::{Tool, ToolType};

proptest! {
    #[test]
    fn wear_level_stays_in_range(
        max_runtime in 0.0f64..10_000.0,
        max_distance in 0.0f64..100_000.0,
        usage in prop::collection::vec((-100.0f64..5_000.0, -100.0f64..50_000.0), 0..40),
    ) {
        let mut tool = Tool::new(1, "T1", ToolType::Endmill, 6.0, 50.0)
            .with_limits(max_runtime, max_distance);

        for (runtime, distance) in usage {
            let before = (tool.total_runtime, tool.total_distance);
            tool.update_usage(runtime, distance);

            prop_assert!((0.0..=100.0).contains(&tool.wear_level));
            prop_assert!(tool.total_runtime >= before.0);
            prop_assert!(tool.total_distance >= before.1);
        }
    }

    #[test]
    fn wear_matches_formula(
        runtime in 0.0f64..5_000.0,
        max_runtime in 0.0f64..5_000.0,
        distance in 0.0f64..50_000.0,
        max_distance in 0.0f64..50_000.0,
    ) {
        let runtime_ratio = if max_runtime > 0.0 { runtime / max_runtime } else { 0.0 };
        let distance_ratio = if max_distance > 0.0 { distance / max_distance } else { 0.0 };
        let expected = (100.0 * runtime_ratio.max(distance_ratio)).min(100.0);

        let actual = wear::usage_wear(runtime, max_runtime, distance, max_distance);
        prop_assert!((actual - expected).abs() < 1e-9);
    }
}

#[test]
fn test_unlimited_tool_never_wears() {
    let mut tool = Tool::new(2, "Drill", ToolType::Drill, 3.0, 40.0);
    tool.update_usage(1e6, 1e9);
    assert_eq!(tool.wear_level, 0.0);
    assert!(!tool.needs_warning());
    assert!(!tool.needs_replacement());
}

#[test]
fn test_runtime_limit_reaches_warning() {
    let mut tool = Tool::new(3, "Ballnose", ToolType::Ballnose, 4.0, 45.0).with_limits(100.0, 0.0);
    tool.update_usage(79.0, 0.0);
    assert!(!tool.needs_warning());
    tool.update_usage(1.0, 0.0);
    assert!(tool.needs_warning());
    assert!(!tool.needs_replacement());
}
