//! Benchmark batched upserts and save-query generation.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tabula::{Entity, Handler, TableBuilder, TableMetadata, TableRegistry};
use tabula_db::pool::init_memory_pool;

#[derive(Debug, Default, Clone)]
struct Item {
    id: i64,
    title: String,
    year: i32,
    rating: f64,
}

impl Entity for Item {
    type Key = i64;

    fn id(&self) -> &i64 {
        &self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn describe(table: &mut TableBuilder<Self>) {
        table
            .name("Items")
            .field("Title", |i| &i.title, |i, v| i.title = v)
            .field("Year", |i| &i.year, |i, v| i.year = v)
            .field("Rating", |i| &i.rating, |i, v| i.rating = v);
    }
}

fn items(n: usize) -> Vec<Item> {
    (0..n)
        .map(|i| Item {
            id: i as i64 + 1,
            title: format!("Item {i:04}"),
            year: 2024,
            rating: 7.5,
        })
        .collect()
}

fn bench_save(c: &mut Criterion) {
    let pool = init_memory_pool().expect("pool");
    pool.get()
        .expect("conn")
        .execute_batch(
            "CREATE TABLE Items (Id INTEGER PRIMARY KEY, Title TEXT, Year INTEGER, Rating REAL)",
        )
        .expect("schema");
    let handler = Handler::new(pool).with_registry(Arc::new(TableRegistry::new()));

    let mut group = c.benchmark_group("save");

    group.bench_function("save_one", |b| {
        let mut item = items(1).remove(0);
        b.iter(|| handler.save(&mut item).unwrap());
    });

    for size in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("save_many", size), &size, |b, &size| {
            let mut batch = items(size);
            b.iter(|| handler.save_many(&mut batch).unwrap());
        });
    }

    group.finish();
}

fn bench_query_generation(c: &mut Criterion) {
    c.bench_function("save_query_for_100_uncached", |b| {
        b.iter(|| {
            let table = TableMetadata::<Item>::build().unwrap();
            table.save_query_for(100).unwrap()
        });
    });
}

criterion_group!(benches, bench_save, bench_query_generation);
criterion_main!(benches);
