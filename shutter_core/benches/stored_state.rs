use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use shutter_core::mocks::{SpyMotor, SpyStore};
use shutter_core::{CourseCfg, SafetyCfg, StoredState, build_shutter};
use shutter_traits::ManualClock;

// Packed states spread over the course-time and level ranges
fn sample_states(n: usize, seed: u64) -> Vec<u64> {
    let mut x = seed.max(1);
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        let mut s = StoredState::new();
        s.set_up_course_time(((x >> 8) as u32 % 60_000) + 1);
        s.set_down_course_time(((x >> 32) as u32 % 60_000) + 1);
        s.set_level(Some((x % 101) as u8));
        out.push(s.to_u64());
    }
    out
}

fn configure(g: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p shutter_core --bench stored_state
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }
}

pub fn bench_codec(c: &mut Criterion) {
    let mut g = c.benchmark_group("stored_state");
    configure(&mut g);

    let states = sample_states(10_000, 0xC0FFEE);
    let decimals: Vec<String> = states
        .iter()
        .map(|&s| StoredState::from_u64(s).to_decimal())
        .collect();

    g.bench_function("decode_u64", |b| {
        b.iter(|| {
            for &s in &states {
                black_box(StoredState::from_u64(black_box(s)));
            }
        })
    });
    g.bench_function("encode_u64", |b| {
        let decoded: Vec<StoredState> = states.iter().map(|&s| StoredState::from_u64(s)).collect();
        b.iter(|| {
            for s in &decoded {
                black_box(s.to_u64());
            }
        })
    });
    g.bench_function("decode_decimal", |b| {
        b.iter(|| {
            for d in &decimals {
                black_box(StoredState::from_decimal(black_box(d)));
            }
        })
    });
    g.finish();
}

pub fn bench_traversal(c: &mut Criterion) {
    let mut g = c.benchmark_group("tick");
    configure(&mut g);

    g.bench_function("full_traversal_10ms_ticks", |b| {
        b.iter_batched(
            || {
                let mut initial = StoredState::new();
                initial.set_up_course_time(10_000);
                initial.set_down_course_time(10_000);
                initial.set_level(Some(0));
                let clock = ManualClock::new();
                let shutter = build_shutter(
                    SpyMotor::new(),
                    SpyStore::with_state(initial.to_u64()),
                    CourseCfg {
                        up_course_ms: 10_000,
                        down_course_ms: 0,
                        calibration_ratio: 0.1,
                    },
                    SafetyCfg::default(),
                    Some(Box::new(clock.clone())),
                )
                .expect("build");
                (shutter, clock)
            },
            |(mut shutter, clock)| {
                shutter.set_level(100);
                for _ in 0..1_200 {
                    clock.advance_ms(10);
                    black_box(shutter.tick().expect("tick"));
                }
            },
            BatchSize::SmallInput,
        )
    });
    g.finish();
}

criterion_group!(stored_state, bench_codec, bench_traversal);
criterion_main!(stored_state);
