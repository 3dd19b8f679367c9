use rstest::rstest;
use soil_core::calibration::underwatering_report;
use soil_core::correction::{CorrectionWindow, plan, plan_corrections};
use soil_core::mocks::{InMemoryHistory, RowBuilder};
use soil_core::{CapMode, CorrectionCfg, CorrectionResult, PlantBounds};
use soil_traits::MeasurementRow;

fn bounds(min_dry: i64, max_water: i64) -> PlantBounds {
    PlantBounds {
        min_dry_weight_g: Some(min_dry),
        max_water_weight_g: Some(max_water),
    }
}

/// Write a plan back the way the store does.
fn apply(h: &mut InMemoryHistory, result: &CorrectionResult) {
    for c in &result.rows {
        let mut row: MeasurementRow = h.rows().iter().find(|r| r.id == c.id).cloned().unwrap();
        row.water_added_g = Some(c.new_water_added_g);
        row.last_wet_weight_g = Some(c.new_last_wet_weight_g);
        h.upsert(row);
    }
}

#[test]
fn caps_an_overfilled_watering_at_capacity() {
    let row = RowBuilder::new(1).watering(80, 110, 50).build();
    let result = plan_corrections(&[row], 100, true);
    assert_eq!(result.updated, 1);
    assert_eq!(result.total_excess_g, 10);
    assert_eq!(result.target_weight_g, Some(100));
    let c = &result.rows[0];
    assert_eq!(c.excess_g, 10);
    assert_eq!(c.new_water_added_g, 40);
    assert_eq!(c.new_last_wet_weight_g, 100);
}

#[test]
fn second_run_is_a_no_op() {
    let mut h = InMemoryHistory::from_rows(vec![
        RowBuilder::new(1).watering(80, 110, 50).build(),
        RowBuilder::new(2).weight(95).wet(110).build(),
        RowBuilder::new(3).watering(80, 130, 50).build(),
    ]);
    let plant = RowBuilder::plant();
    let cfg = CorrectionCfg::default();

    let first = plan(&h, &plant, &bounds(80, 20), None, &cfg, CorrectionWindow::default()).unwrap();
    assert_eq!(first.updated, 2);
    assert_eq!(first.total_excess_g, 40);
    apply(&mut h, &first);

    let second = plan(&h, &plant, &bounds(80, 20), None, &cfg, CorrectionWindow::default()).unwrap();
    assert_eq!(second.updated, 0);
    assert_eq!(second.total_excess_g, 0);
}

#[test]
fn default_window_starts_at_last_repotting() {
    let h = InMemoryHistory::from_rows(vec![
        RowBuilder::new(1).watering(80, 150, 70).build(),
        RowBuilder::new(2).repotting(120, 100, 20).build(),
        RowBuilder::new(3).watering(100, 140, 40).build(),
    ]);
    let result = plan(
        &h,
        &RowBuilder::plant(),
        &bounds(100, 20),
        None,
        &CorrectionCfg::default(),
        CorrectionWindow::default(),
    )
    .unwrap();
    assert_eq!(result.updated, 1);
    assert_eq!(result.rows[0].id, RowBuilder::id(3));
}

#[rstest]
#[case(Some(RowBuilder::new(1).build().measured_at), None, 2)]
#[case(None, Some(RowBuilder::new(1).build().measured_at), 1)]
#[case(Some(RowBuilder::new(2).build().measured_at), Some(RowBuilder::new(2).build().measured_at), 0)]
fn explicit_window_limits_rows(
    #[case] from: Option<chrono::NaiveDateTime>,
    #[case] to: Option<chrono::NaiveDateTime>,
    #[case] expected: usize,
) {
    let h = InMemoryHistory::from_rows(vec![
        RowBuilder::new(1).watering(80, 150, 70).build(),
        RowBuilder::new(3).watering(80, 140, 60).build(),
    ]);
    let window = CorrectionWindow { from, to };
    let result = plan(&h, &RowBuilder::plant(), &bounds(80, 20), None, &CorrectionCfg::default(), window)
        .unwrap();
    assert_eq!(result.updated, expected);
}

#[test]
fn missing_calibration_is_a_no_op() {
    let h = InMemoryHistory::from_rows(vec![RowBuilder::new(1).watering(80, 150, 70).build()]);
    let cfg = CorrectionCfg {
        cap: CapMode::RetainedRatio,
        edit_last_wet: true,
    };
    let result = plan(&h, &RowBuilder::plant(), &bounds(80, 20), None, &cfg, CorrectionWindow::default())
        .unwrap();
    assert_eq!(result, CorrectionResult::default());

    let result = plan(
        &h,
        &RowBuilder::plant(),
        &PlantBounds::default(),
        Some(40.0),
        &CorrectionCfg::default(),
        CorrectionWindow::default(),
    )
    .unwrap();
    assert_eq!(result.updated, 0);
}

#[test]
fn underwatering_lists_short_fills_newest_first() {
    let h = InMemoryHistory::from_rows(vec![
        RowBuilder::new(1).repotting(100, 80, 20).build(),
        RowBuilder::new(2).watering(80, 95, 15).build(),
        RowBuilder::new(3).weight(90).build(),
        RowBuilder::new(4).watering(85, 105, 20).build(),
    ]);
    let items = underwatering_report(&h, &RowBuilder::plant(), &bounds(80, 20)).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, RowBuilder::id(4));
    assert_eq!(items[0].under_g, Some(0));
    assert_eq!(items[1].under_g, Some(5));
    assert_eq!(items[1].under_pct, Some(25.0));
    assert_eq!(items[1].target_weight_g, 100);
}

#[test]
fn underwatering_needs_positive_capacity() {
    let h = InMemoryHistory::from_rows(vec![RowBuilder::new(2).watering(80, 95, 15).build()]);
    assert!(
        underwatering_report(&h, &RowBuilder::plant(), &bounds(80, 0))
            .unwrap()
            .is_empty()
    );
}
