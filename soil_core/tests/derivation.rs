use soil_core::error::EngineError;
use soil_core::loss::{accumulate_totals, day_loss};
use soil_core::mocks::{BrokenHistory, InMemoryHistory, RowBuilder};
use soil_core::{MeasurementInput, MeasurementKind, derive_measurement};
use soil_traits::MeasurementHistory;

#[test]
fn bare_watering_after_repot_synthesizes_wet_from_dry() {
    // strict watering of 20 g, then a repot whose new pot weighs 80 g
    let h = InMemoryHistory::from_rows(vec![
        RowBuilder::new(1).watering(60, 80, 20).build(),
        RowBuilder::new(2).repotting(80, 60, 20).build(),
    ]);
    let input = MeasurementInput {
        measured_at: RowBuilder::new(3).build().measured_at,
        ..MeasurementInput::default()
    };
    let d = derive_measurement(&h, &RowBuilder::plant(), &input, None).unwrap();
    assert_eq!(d.kind, MeasurementKind::Watering);
    assert_eq!(d.weights.last_dry_weight_g, Some(80));
    assert_eq!(d.weights.last_wet_weight_g, Some(100));
    assert_eq!(d.weights.water_added_g, 20);
}

#[test]
fn watering_yields_zero_total_and_nothing_else() {
    let h = InMemoryHistory::from_rows(vec![RowBuilder::new(1).weight(500).build()]);
    let at = RowBuilder::new(2).build().measured_at;
    let d = derive_measurement(&h, &RowBuilder::plant(), &MeasurementInput::watering(at, 150), None)
        .unwrap();
    assert!(d.loss.is_watering_event);
    assert_eq!(d.loss.total_pct, Some(0.0));
    assert_eq!(d.loss.day_g, None);
    assert_eq!(d.loss.day_pct, None);
    assert_eq!(d.loss.total_g, None);
    assert_eq!(d.weights.last_wet_weight_g, Some(650));

    let row = d.into_row(RowBuilder::id(2), RowBuilder::plant(), MeasurementInput::watering(at, 150));
    assert_eq!(row.measured_weight_g, None);
    assert_eq!(row.water_added_g, Some(150));
}

#[test]
fn accumulator_scenario_from_pure_parts() {
    let (day_g, day_pct) = day_loss(Some(480), Some(1200), 800, Some(500));
    assert_eq!(day_g, Some(20));
    assert_eq!(day_pct, Some(2.5));

    let watered = RowBuilder::new(1).watering(400, 1200, 800).build();
    let loss = accumulate_totals(day_g, day_pct, &[], &watered);
    assert_eq!(loss.total_g, Some(20));
    assert_eq!(loss.total_pct, Some(2.5));
}

#[test]
fn accumulator_scenario_through_history() {
    let h = InMemoryHistory::from_rows(vec![
        RowBuilder::new(1).watering(400, 1200, 800).build(),
        RowBuilder::new(2).weight(500).dry(400).wet(1200).added(800).day_g(0).build(),
    ]);
    let at = RowBuilder::new(3).build().measured_at;
    let d = derive_measurement(&h, &RowBuilder::plant(), &MeasurementInput::weighing(at, 480), None)
        .unwrap();
    assert_eq!(d.kind, MeasurementKind::Weighing);
    assert_eq!(d.weights.water_added_g, 800);
    assert_eq!(d.loss.day_g, Some(20));
    assert_eq!(d.loss.day_pct, Some(2.5));
    assert_eq!(d.loss.total_g, Some(20));
    assert_eq!(d.loss.total_pct, Some(2.5));
}

#[test]
fn totals_sum_stored_day_losses_since_last_watering() {
    let h = InMemoryHistory::from_rows(vec![
        RowBuilder::new(1).watering(400, 600, 200).build(),
        RowBuilder::new(2).weight(580).wet(600).day_g(20).build(),
        RowBuilder::new(3).weight(560).wet(600).build(),
    ]);
    let at = RowBuilder::new(4).build().measured_at;
    let d = derive_measurement(&h, &RowBuilder::plant(), &MeasurementInput::weighing(at, 550), None)
        .unwrap();
    // 20 stored + 40 fallback (600 - 560) + 10 today
    assert_eq!(d.loss.day_g, Some(10));
    assert_eq!(d.loss.total_g, Some(70));
    assert_eq!(d.loss.total_pct, Some(35.0));
}

#[test]
fn no_prior_watering_leaves_totals_unset() {
    let h = InMemoryHistory::from_rows(vec![RowBuilder::new(1).weight(500).build()]);
    let at = RowBuilder::new(2).build().measured_at;
    let d = derive_measurement(&h, &RowBuilder::plant(), &MeasurementInput::weighing(at, 490), None)
        .unwrap();
    assert_eq!(d.loss.day_g, Some(10));
    assert_eq!(d.loss.total_g, None);
    assert_eq!(d.loss.total_pct, None);
}

#[test]
fn edited_row_is_not_its_own_neighbour() {
    let mut h = InMemoryHistory::default();
    h.push(RowBuilder::new(1).weight(500).build());
    h.push(RowBuilder::new(2).weight(480).build());

    // move row 2 one day later with a new weight
    let input = MeasurementInput::weighing(RowBuilder::new(3).build().measured_at, 470);
    let edited = derive_measurement(&h, &RowBuilder::plant(), &input, Some(RowBuilder::id(2))).unwrap();
    assert_eq!(edited.weights.prev_measured_weight, Some(500));
    assert_eq!(edited.loss.day_g, Some(30));

    let appended = derive_measurement(&h, &RowBuilder::plant(), &input, None).unwrap();
    assert_eq!(appended.weights.prev_measured_weight, Some(480));
}

#[test]
fn exclusive_fields_are_rejected_before_history_is_read() {
    let mut input = MeasurementInput::weighing(RowBuilder::epoch(), 500);
    input.water_added_g = Some(100);
    let err = derive_measurement(&BrokenHistory, &RowBuilder::plant(), &input, None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::Validation(_))
    ));
}

#[test]
fn history_failures_surface_as_history_errors() {
    let input = MeasurementInput::weighing(RowBuilder::epoch(), 500);
    let err = derive_measurement(&BrokenHistory, &RowBuilder::plant(), &input, None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::History(_))
    ));
}

#[test]
fn mock_history_orders_scans() {
    let h = InMemoryHistory::from_rows(vec![
        RowBuilder::new(3).weight(3).build(),
        RowBuilder::new(1).weight(1).build(),
        RowBuilder::new(2).weight(2).build(),
    ]);
    let rows = h
        .scan(
            &RowBuilder::plant(),
            soil_traits::EventFilter::Any,
            &soil_traits::ScanRange::all(),
        )
        .unwrap();
    let weights: Vec<_> = rows.iter().filter_map(|r| r.measured_weight_g).collect();
    assert_eq!(weights, vec![1, 2, 3]);
}
