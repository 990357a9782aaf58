mod common;

use std::{sync::Arc, thread};

use common::{Person, ada, strings};
use sheet_mapper::{CodecRegistry, MapperRegistry, SheetRow};

#[test]
fn schemas_are_compiled_once_per_registry() {
    let registry = MapperRegistry::new();
    assert!(registry.lookup::<Person>().is_none());

    let first = registry.schema::<Person>().expect("schema");
    let second = registry.schema::<Person>().expect("schema");
    assert!(Arc::ptr_eq(&first, &second));
    assert!(registry.lookup::<Person>().is_some());
}

#[test]
fn dynamic_mappers_are_memoized_per_header() {
    let registry = MapperRegistry::new();
    let a = registry
        .mapper_for_header::<Person, _, _>(["Age", "Name"])
        .expect("mapper");
    let b = registry
        .mapper_for_row::<Person, _>(&SheetRow::from_texts(["Age", "Name"]))
        .expect("mapper");
    let c = registry
        .mapper_for_header::<Person, _, _>(["Name", "Age"])
        .expect("mapper");

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(registry.cached_mappers(), 2);

    let person = a.read(&strings(&["36", "Ada"]));
    assert_eq!(person.name, "Ada");
    assert_eq!(person.age, 36);
}

#[test]
fn shared_codec_registry_deduplicates_across_registries() {
    let codecs = Arc::new(CodecRegistry::new());
    let left = MapperRegistry::with_codecs(Arc::clone(&codecs));
    let right = MapperRegistry::with_codecs(Arc::clone(&codecs));
    left.schema::<Person>().expect("schema");
    right.schema::<Person>().expect("schema");
    // date(%d/%m/%Y) and flag(Y|N)
    assert_eq!(codecs.instance_count(), 2);
}

#[test]
fn concurrent_lookups_converge_on_one_mapper() {
    let registry = MapperRegistry::new();
    let mappers = thread::scope(|scope| {
        let handles = (0..8)
            .map(|_| scope.spawn(|| registry.mapper::<Person>().expect("mapper")))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("lookup thread"))
            .collect::<Vec<_>>()
    });

    let reference = registry.mapper::<Person>().expect("mapper");
    assert!(mappers.iter().all(|mapper| Arc::ptr_eq(mapper, &reference)));

    let mut row = SheetRow::default();
    reference.write(&mut row, &ada());
    assert_eq!(reference.read(&row), ada());
}
