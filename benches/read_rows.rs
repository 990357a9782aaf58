use std::sync::Arc;

use chrono::NaiveDate;
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use sheet_mapper::{
    CodecRegistry, Mapper, Schema, SchemaManifest, SheetRow,
    codec::{DateCodec, FlagCodec},
};

#[derive(Debug, Default)]
struct Order {
    id: i64,
    customer: String,
    quantity: i32,
    price: f64,
    ordered: Option<NaiveDate>,
    paid: bool,
}

const HEADER: [&str; 7] = ["ID", "Customer", "Region", "Quantity", "Price", "Ordered", "Paid"];

const MANIFEST: &str = r#"
record: Order
case_sensitive: false
fields:
  - label: Id
    type: long
  - label: Customer
    type: string
  - label: Quantity
    type: int
  - label: Price
    type: double
  - label: Ordered
    type: custom
    nullable: true
    codec: date
  - label: Paid
    type: bool
    codec: flag
"#;

fn order_schema(codecs: &CodecRegistry) -> Schema<Order> {
    Schema::<Order>::builder("Order", codecs)
        .case_sensitive(false)
        .field("id", "Id", |o| &o.id, |o| &mut o.id)
        .field("customer", "Customer", |o| &o.customer, |o| &mut o.customer)
        .field("quantity", "Quantity", |o| &o.quantity, |o| &mut o.quantity)
        .field("price", "Price", |o| &o.price, |o| &mut o.price)
        .optional_codec_field::<DateCodec>("ordered", "Ordered", "", |o| &o.ordered, |o| {
            &mut o.ordered
        })
        .codec_field::<FlagCodec>("paid", "Paid", "", |o| &o.paid, |o| &mut o.paid)
        .build()
        .expect("order schema")
}

fn generate_rows(rows: usize) -> Vec<Vec<String>> {
    (0..rows)
        .map(|i| {
            let region = match i % 3 {
                0 => "north",
                1 => "south",
                _ => "west",
            };
            let day = (i % 28) + 1;
            let paid = if i % 2 == 0 { "yes" } else { "no" };
            vec![
                i.to_string(),
                format!("customer-{i}"),
                region.to_string(),
                (i % 50).to_string(),
                format!("{}.{:02}", i % 1000, i % 100),
                format!("2024-01-{day:02}"),
                paid.to_string(),
            ]
        })
        .collect()
}

fn bench_read_rows(c: &mut Criterion) {
    let rows = generate_rows(10_000);
    let codecs = CodecRegistry::new();
    let typed = Mapper::for_header(Arc::new(order_schema(&codecs)), HEADER);
    let manifest = SchemaManifest::from_yaml_str(MANIFEST).expect("manifest");
    let dynamic = Mapper::for_header(Arc::new(manifest.compile(&codecs).expect("compile")), HEADER);

    let mut group = c.benchmark_group("read_rows");
    group.bench_function("typed_record", |b| {
        b.iter(|| {
            let mut total = 0i64;
            for row in &rows {
                let order = typed.read(row);
                total += order.id + i64::from(order.quantity);
            }
            total
        })
    });
    group.bench_function("dynamic_record", |b| {
        b.iter(|| rows.iter().map(|row| dynamic.read(row).values().len()).sum::<usize>())
    });
    group.bench_function("typed_write", |b| {
        let records = rows.iter().map(|row| typed.read(row)).collect::<Vec<_>>();
        b.iter_batched(
            SheetRow::default,
            |mut target| {
                for record in &records {
                    typed.write(&mut target, record);
                }
                target
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_read_rows);
criterion_main!(benches);
