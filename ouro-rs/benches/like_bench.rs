use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ouro::pattern::{general_match, LikeMatcher};

fn make_names(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 4 {
            0 => format!("report_{i}.txt"),
            1 => format!("photo-{i}.jpg"),
            2 => format!("notes{i}.md"),
            _ => format!("archive.{i}.tar.gz"),
        })
        .collect()
}

fn bench_like(c: &mut Criterion) {
    let names = make_names(1000);
    let patterns = ["report%", "%.txt", "%note%", "photo-___.jpg", "%[0-9].md", "_r%#.tar.gz"];

    let mut g = c.benchmark_group("like_compare");

    for pattern in patterns {
        let matcher = LikeMatcher::compile(pattern);
        g.bench_function(format!("{}_{pattern}", matcher.name()), |b| {
            b.iter(|| names.iter().filter(|n| matcher.is_match(black_box(n))).count())
        });
        g.bench_function(format!("general_{pattern}"), |b| {
            b.iter(|| names.iter().filter(|n| general_match(black_box(pattern), black_box(n))).count())
        });
    }

    g.finish();
}

criterion_group!(benches, bench_like);
criterion_main!(benches);
