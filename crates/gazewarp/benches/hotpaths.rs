use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gazewarp::{CoordinateMapper, Correspondences, ThinPlateSpline};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const IMAGE_W: f64 = 1920.0;
const IMAGE_H: f64 = 1080.0;

/// Six border anchors plus `extra` jittered interior pairs.
fn make_pairs(extra: usize) -> (Vec<[f64; 2]>, Vec<[f64; 2]>) {
    let anchors = Correspondences::image_anchors(IMAGE_W, IMAGE_H);
    let mut src = anchors.sources();
    let mut dst = anchors.destinations();
    let mut rng = StdRng::seed_from_u64(0x6a7e);
    for _ in 0..extra {
        let p = [
            rng.gen_range(100.0..IMAGE_W - 100.0),
            rng.gen_range(100.0..IMAGE_H - 100.0),
        ];
        src.push(p);
        dst.push([p[0] + rng.gen_range(-20.0..20.0), p[1] + rng.gen_range(-20.0..20.0)]);
    }
    (src, dst)
}

fn make_samples(n: usize) -> Vec<Option<[f64; 2]>> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..n)
        .map(|_| {
            (!rng.gen_bool(0.05))
                .then(|| [rng.gen_range(0.0..IMAGE_W), rng.gen_range(0.0..IMAGE_H)])
        })
        .collect()
}

fn bench_fit(c: &mut Criterion) {
    let (src, dst) = make_pairs(14);
    c.bench_function("tps_fit_20pairs", |b| {
        b.iter(|| {
            let tps = ThinPlateSpline::fit(black_box(&src), black_box(&dst))
                .expect("fixture pairs are well spread");
            black_box(tps)
        })
    });
}

fn bench_apply(c: &mut Criterion) {
    let (src, dst) = make_pairs(14);
    let mapper = CoordinateMapper::fit(&src, &dst).expect("fixture pairs are well spread");
    let samples = make_samples(10_000);
    c.bench_function("mapper_apply_10k_samples", |b| {
        b.iter(|| black_box(mapper.apply(black_box(&samples))))
    });
}

criterion_group!(hotpaths, bench_fit, bench_apply);
criterion_main!(hotpaths);
