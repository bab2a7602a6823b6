//! Benchmarks for page pool lookups and schema serialization.
//!
//! Run: cargo bench --bench page_pool

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use columnardb::buffer::{PagePool, PoolKey};
use columnardb::format::{DescriptorBuilder, Serializer};
use columnardb::schema::{Field, SchemaModel};
use columnardb::storage::page::{ClusterInfo, ElementType, HeapPageAllocator, PageAllocator};

const PAGE_ELEMENTS: usize = 1000;

fn filled_pool(n_pages: u64) -> PagePool {
    let allocator = HeapPageAllocator::new();
    let pool = PagePool::new();
    for i in 0..n_pages {
        let mut page = allocator.new_page(ElementType::Float32.size(), PAGE_ELEMENTS);
        page.grow_unchecked(PAGE_ELEMENTS);
        page
            .set_window(i * PAGE_ELEMENTS as u64, ClusterInfo::default())
            .unwrap();
        pool.preload_page(page, PoolKey::new(1, ElementType::Float32));
    }
    pool
}

fn bench_get_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_page");
    let key = PoolKey::new(1, ElementType::Float32);

    for n_pages in [16u64, 256, 4096] {
        let pool = filled_pool(n_pages);
        let last_row = n_pages * PAGE_ELEMENTS as u64 - 1;
        group.bench_with_input(BenchmarkId::from_parameter(n_pages), &last_row, |b, &row| {
            b.iter(|| {
                let page_ref = pool.get_page(key, black_box(row));
                black_box(page_ref.is_null())
            })
        });
    }
    group.finish();
}

fn bench_evict(c: &mut Criterion) {
    c.bench_function("evict_256", |b| {
        b.iter_batched(
            || filled_pool(256),
            |pool| black_box(pool.evict(usize::MAX)),
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_serialize_header(c: &mut Criterion) {
    let mut model = SchemaModel::create();
    for i in 0..64 {
        model
            .add_field(Field::new(format!("f{}", i), "std::vector<float>").unwrap())
            .unwrap();
    }
    model.freeze();
    let descriptor = DescriptorBuilder::from_model(&model)
        .unwrap()
        .build()
        .unwrap();

    c.bench_function("serialize_header_64_fields", |b| {
        b.iter(|| {
            let context = Serializer::serialize_header(None, &descriptor).unwrap();
            let mut buffer = vec![0u8; context.header_size()];
            Serializer::serialize_header(Some(&mut buffer), black_box(&descriptor)).unwrap();
            buffer
        })
    });
}

criterion_group!(benches, bench_get_page, bench_evict, bench_serialize_header);
criterion_main!(benches);
