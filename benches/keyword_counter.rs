//! Keyword counting and feed summary benchmarks.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dataprobe::analysis::{Feed, FeedSummary, KeywordCounter, KeywordDictionary};

const SNIPPETS: &[&str] = &[
    "平价穿搭分享，学生党必看",
    "冬季显瘦羽绒服测评",
    "ootd 今日通勤 look",
    "教程：三步搞定法式发型",
    "好物推荐！性价比超高",
    "为什么大家都在买这件卫衣？",
];

fn feeds(n: usize) -> Vec<Feed> {
    (0..n)
        .map(|i| Feed {
            id: i.to_string(),
            title: SNIPPETS[i % SNIPPETS.len()].to_string(),
            body: SNIPPETS[(i * 7 + 3) % SNIPPETS.len()].repeat(3),
            likes: (i as u64 * 37) % 5000,
            ..Feed::default()
        })
        .collect()
}

fn bench_observe(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyword_counter");

    for size in [10usize, 100, 1000] {
        let texts: Vec<String> = feeds(size).iter().map(Feed::full_text).collect();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("observe", size), &texts, |b, texts| {
            b.iter(|| {
                let mut counter = KeywordCounter::new(KeywordDictionary::post_copy());
                counter.observe_all(black_box(texts));
                black_box(counter.total())
            })
        });

        group.bench_with_input(
            BenchmarkId::new("observe_case_insensitive", size),
            &texts,
            |b, texts| {
                b.iter(|| {
                    let mut counter =
                        KeywordCounter::new(KeywordDictionary::post_copy()).case_insensitive(true);
                    counter.observe_all(black_box(texts));
                    black_box(counter.total())
                })
            },
        );
    }

    group.finish();
}

fn bench_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("feed_summary");

    for size in [50usize, 500] {
        let feeds = feeds(size);
        group.bench_with_input(BenchmarkId::new("build", size), &feeds, |b, feeds| {
            b.iter(|| {
                let summary = FeedSummary::build(
                    black_box(feeds),
                    KeywordCounter::new(KeywordDictionary::post_copy()),
                );
                black_box(summary.categories.len())
            })
        });
    }

    group.finish();
}

criterion_group!(keyword_benches, bench_observe, bench_summary);
criterion_main!(keyword_benches);
