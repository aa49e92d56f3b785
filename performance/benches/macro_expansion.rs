use criterion::{criterion_group, criterion_main, Criterion};
use rand::SeedableRng;

pub fn macro_expansion_bench(c: &mut Criterion) {
    let num_calls = match std::env::var("MACRO_EXPANSION_CALLS") {
        Ok(val) => match val.parse::<usize>() {
            Ok(val) => val,
            Err(_) => panic!["Failed to parse env var MACRO_EXPANSION_CALLS={} as an integer", val],
        },
        Err(_) => 1000,
    };
    let mut rng = rand::prelude::StdRng::seed_from_u64(43);

    let mut group = c.benchmark_group("macro-expansion");
    for depth in [1, 10, 100] {
        let tex_input = performance::generate_macro_chain_document(&mut rng, depth, num_calls);
        group.bench_function(format!["chain_depth_{depth}"], |b| {
            b.iter(|| performance::run_expansion(&tex_input))
        });
    }
}

criterion_group!(benches, macro_expansion_bench);
criterion_main!(benches);
