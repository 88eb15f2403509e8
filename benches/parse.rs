use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for size in [1_024usize, 10_240, 102_400] {
        let input = make_input(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| dotsource::parse_str(black_box(input)).expect("parse should succeed"));
        });
    }
    group.finish();
}

fn make_input(bytes: usize) -> String {
    let block = "PLAIN=value # comment\nHASH=value#literal\nMULTI='first\n# second\nthird'\n";
    let repeat = bytes / block.len() + 1;
    let mut input = String::with_capacity(repeat * (block.len() + 8));
    for idx in 0..repeat {
        input.push_str(&block.replace('=', &format!("_{idx}=")));
    }
    input
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
