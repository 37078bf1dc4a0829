use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sheetsync::chunk::plan_chunks;
use sheetsync::header::{header_merge_ranges, labels_to_header_rows, promote_header_blanks};
use sheetsync::memory::MemorySheetService;
use sheetsync::types::{CellValue, Coordinate};
use sheetsync::{ColumnLabel, Spread, SyncConfig, Table, WriteOptions};

fn benchmark_chunk_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_plan");

    for rows in [1_000u32, 10_000, 100_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(rows), rows, |b, &rows| {
            b.iter(|| {
                let values = vec![0u8; rows as usize * 10];
                let plan = plan_chunks(
                    Coordinate { row: 1, col: 1 },
                    Coordinate { row: rows, col: 10 },
                    values,
                    black_box(50_000),
                )
                .unwrap();
                black_box(plan.count())
            });
        });
    }

    group.finish();
}

fn benchmark_header_codec(c: &mut Criterion) {
    let labels: Vec<ColumnLabel> = (0..500)
        .map(|i| ColumnLabel::multi([format!("group_{}", i / 10), format!("col_{}", i)]))
        .collect();

    c.bench_function("labels_to_header_rows", |b| {
        b.iter(|| black_box(labels_to_header_rows(black_box(&labels), false, 0, None)))
    });

    let rows = labels_to_header_rows(&labels, false, 0, None);
    c.bench_function("header_merge_ranges", |b| {
        b.iter(|| black_box(header_merge_ranges(black_box(&rows), 0)))
    });

    c.bench_function("promote_header_blanks", |b| {
        b.iter(|| {
            let mut rows = rows.clone();
            promote_header_blanks(&mut rows);
            black_box(rows)
        })
    });
}

fn benchmark_table_to_sheet(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_to_sheet");
    group.sample_size(10);

    for size in [1_000i64, 10_000].iter() {
        let rows = (0..*size)
            .map(|i| {
                vec![
                    CellValue::Int(i),
                    CellValue::String(format!("Name_{}", i)),
                    CellValue::Float(i as f64 * 1.5),
                ]
            })
            .collect();
        let table = Table::from_rows(["ID", "Name", "Value"], rows).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &table, |b, table| {
            b.iter(|| {
                let mut service = MemorySheetService::new();
                let doc = service.add_spreadsheet("bench");
                let config = SyncConfig::new().with_max_cells_per_request(9_000);
                let mut spread = Spread::open(service, doc, config).unwrap();
                spread
                    .table_to_sheet(table, &WriteOptions::new().with_index(false))
                    .unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_chunk_plan,
    benchmark_header_codec,
    benchmark_table_to_sheet
);
criterion_main!(benches);
