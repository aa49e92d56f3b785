use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rand::SeedableRng;

fn env_var_or(name: &str, default: usize) -> usize {
    match std::env::var(name) {
        Ok(val) => match val.parse::<usize>() {
            Ok(val) => val,
            Err(_) => panic!["Failed to parse env var {}={} as an integer", name, val],
        },
        Err(_) => default,
    }
}

pub fn lexer_throughput_bench(c: &mut Criterion) {
    let num_lines = env_var_or("LEXER_THROUGHPUT_LINES", 100_000);
    let weights = Default::default();
    let mut rng = rand::prelude::StdRng::seed_from_u64(43);
    let tex_input =
        performance::generate_random_tex_document(&mut rng, num_lines, (20, 50), (80, 100), &weights);

    let mut group = c.benchmark_group("lexer-throughput");
    group.throughput(Throughput::Bytes(tex_input.len() as u64));

    group.bench_function("tokenize", |b| {
        b.iter(|| performance::run_lexer(&tex_input))
    });
    group.bench_function("expand", |b| {
        b.iter(|| performance::run_expansion(&tex_input))
    });
}

criterion_group!(benches, lexer_throughput_bench);
criterion_main!(benches);
