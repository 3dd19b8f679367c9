use chrono::TimeDelta;
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use soil_core::mocks::{InMemoryHistory, RowBuilder};
use soil_core::{BoundCandidate, MeasurementInput, derive_measurement, recompute_bounds};

// A year of twice-daily weighings with a watering every five days
fn synth_history(days: i64) -> InMemoryHistory {
    let mut h = InMemoryHistory::default();
    let mut weight = 900i64;
    for half_day in 0..days * 2 {
        let b = RowBuilder::new(0).hours(half_day * 12);
        let b = if half_day % 10 == 0 {
            weight = 900;
            b.watering(600, 900, 300)
        } else {
            weight -= 25;
            b.weight(weight).dry(weight + 25).wet(900).added(300).day_g(25)
        };
        let mut row = b.build();
        row.id = soil_traits::MeasurementId::from_bytes((half_day as u128).to_be_bytes());
        h.push(row);
    }
    h
}

fn bench_derivation(c: &mut Criterion) {
    let h = synth_history(365);
    let plant = RowBuilder::plant();
    let at = RowBuilder::epoch() + TimeDelta::days(366);

    c.bench_function("derive_weighing_year_history", |b| {
        b.iter_batched(
            || MeasurementInput::weighing(at, 700),
            |input| {
                let d = derive_measurement(&h, &plant, &input, None);
                black_box(d.ok());
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("recompute_bounds_year_history", |b| {
        b.iter(|| {
            let bounds = recompute_bounds(&h, &plant, BoundCandidate::default());
            black_box(bounds.ok());
        })
    });
}

criterion_group!(benches, bench_derivation);
criterion_main!(benches);
