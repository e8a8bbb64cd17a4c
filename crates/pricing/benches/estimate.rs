use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use hearth_core::Money;
use hearth_pricing::{
    AirDuctOptions, DryerVentOptions, PackageTier, PriceBookEntry, PriceCatalog, Selection, Sku,
    compose, estimate,
};

fn catalog() -> PriceCatalog {
    let rows = [
        ("PKG-BASIC", 129),
        ("PKG-COMP", 200),
        ("PKG-PREM", 279),
        ("DV-TRANS-HD", 30),
        ("EXT-GUARD-STD", 20),
        ("DV-AIRFLOW", 45),
        ("DV-EXTRA-UNIT", 89),
        ("AD-BASIC", 399),
        ("AD-STD", 499),
        ("AD-PREM", 649),
        ("AD-SANITIZE", 79),
        ("AD-COIL", 149),
        ("AD-EXTRA-SYS", 249),
        ("ACC-ROOF", 50),
        ("ACC-ATTIC", 75),
        ("ACC-BIRD", 95),
        ("BUNDLE-DISC", 100),
    ];
    PriceCatalog::from_entries(rows.iter().map(|(code, units)| {
        PriceBookEntry::active(Sku::new(code).unwrap(), Money::from_units(*units))
    }))
    .unwrap()
}

fn bundle(tier: PackageTier) -> Selection {
    let mut ad = AirDuctOptions::new(tier);
    ad.attic_access = true;
    ad.system_count = 2;
    let mut dv = DryerVentOptions::new(tier);
    dv.roof_access = true;
    dv.bird_nest = true;
    Selection::Bundle {
        air_duct: ad,
        dryer_vent: dv,
    }
}

/// Recompute cost per keystroke: the wizard re-runs this on every input change.
fn bench_estimate(c: &mut Criterion) {
    let catalog = catalog();
    let mut group = c.benchmark_group("estimate");

    for tier in PackageTier::ALL {
        let selection = bundle(tier);
        group.bench_with_input(BenchmarkId::new("compose", tier.as_str()), &selection, |b, s| {
            b.iter(|| compose(black_box(s)));
        });
        group.bench_with_input(BenchmarkId::new("compose_and_price", tier.as_str()), &selection, |b, s| {
            b.iter(|| estimate(black_box(s), &catalog, None).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_estimate);
criterion_main!(benches);
