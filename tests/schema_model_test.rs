//! Integration tests for the schema model, projected fields and schema
//! updates of a running writer.

use columnardb::common::IdGenerator;
use columnardb::format::{MemorySink, Source};
use columnardb::schema::{Field, SchemaModel, Value, Writer};
use columnardb::{Error, WriteOptions};
use proptest::prelude::*;
use std::collections::HashSet;

static IDS: IdGenerator = IdGenerator::new();

fn muon_model() -> SchemaModel {
    let mut model = SchemaModel::create_with(&IDS);
    model.add_field(Field::new("pt", "float").unwrap()).unwrap();
    model
        .add_field(Field::new("jets", "std::vector<float>").unwrap())
        .unwrap();
    model
        .add_field(Field::new("var", "std::variant<float,std::int32_t>").unwrap())
        .unwrap();
    model
        .add_field(Field::new("arr", "std::array<float,4>").unwrap())
        .unwrap();
    model
}

proptest! {
    /// Adding a name twice always fails and leaves the model unchanged.
    #[test]
    fn prop_duplicate_names_rejected(names in prop::collection::vec("[a-d]{1,2}", 1..20)) {
        let mut model = SchemaModel::create_with(&IDS);
        let mut seen = HashSet::new();

        for name in &names {
            let result = model.add_field(Field::new(name.as_str(), "float").unwrap());
            if seen.insert(name.clone()) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(matches!(result, Err(Error::DuplicateFieldName(_))), "duplicate name accepted");
            }
        }
        prop_assert_eq!(model.tree().top_level().len(), seen.len());
    }

    /// More fields never need less write memory.
    #[test]
    fn prop_estimate_is_monotonic(types in prop::collection::vec(0usize..4, 1..12), buffered in any::<bool>()) {
        const TYPES: [&str; 4] = ["float", "std::vector<double>", "std::string", "std::int64_t"];
        let options = WriteOptions::new()
            .with_page_buffer_budget(usize::MAX)
            .with_buffered_write(buffered);

        let mut model = SchemaModel::create_with(&IDS);
        let mut last = model.estimate_write_memory_usage(&options);
        for (i, &t) in types.iter().enumerate() {
            model.add_field(Field::new(format!("f{}", i), TYPES[t]).unwrap()).unwrap();
            let estimate = model.estimate_write_memory_usage(&options);
            prop_assert!(estimate >= last);
            last = estimate;
        }
    }

    /// A larger page buffer budget never lowers the estimate.
    #[test]
    fn prop_estimate_grows_with_budget(
        types in prop::collection::vec(0usize..4, 0..12),
        budget in 1usize..(1 << 28),
        extra in 0usize..(1 << 28),
        buffered in any::<bool>(),
    ) {
        const TYPES: [&str; 4] = ["float", "std::vector<double>", "std::string", "std::int64_t"];
        let options = |budget| {
            WriteOptions::new()
                .with_page_buffer_budget(budget)
                .with_buffered_write(buffered)
        };

        let mut model = SchemaModel::create_with(&IDS);
        for (i, &t) in types.iter().enumerate() {
            model.add_field(Field::new(format!("f{}", i), TYPES[t]).unwrap()).unwrap();
        }
        let small = model.estimate_write_memory_usage(&options(budget));
        let large = model.estimate_write_memory_usage(&options(budget + extra));
        prop_assert!(small <= large);
    }
}

/// Oversized arrays are refused up front and leave the model untouched.
#[test]
fn test_oversized_array_rejected() {
    let mut model = muon_model();
    let err = Field::new("huge", "std::array<float,18446744073709551615>").unwrap_err();
    assert!(matches!(err, Error::UnknownType(_)));

    let item = Field::new("_0", "std::array<double,65536>").unwrap();
    assert!(matches!(
        Field::array("huge", item, 65536),
        Err(Error::UnknownType(_))
    ));

    assert!(model.find_field("huge").is_none());
    model
        .add_field(Field::new("small", "std::array<float,3>").unwrap())
        .unwrap();
    model.freeze();
    assert_eq!(model.create_entry().unwrap().len(), 5);
}

/// A cardinality field may read the length of a collection.
#[test]
fn test_cardinality_projection_accepted() {
    let mut model = muon_model();
    let id = model
        .add_projected_field(Field::cardinality("njets").unwrap(), |_| "jets".to_string())
        .unwrap();
    assert_eq!(
        model.projected_fields().source_of(id),
        model.find_field("jets")
    );
}

/// Fields below a fixed-size array cannot be projected.
#[test]
fn test_array_projection_rejected() {
    let mut model = muon_model();
    let err = model
        .add_projected_field(Field::new("first", "float").unwrap(), |_| "arr._0".to_string())
        .unwrap_err();
    assert!(matches!(err, Error::ArrayMapping { .. }));
    assert!(model.projected_fields().is_empty());
}

/// The target's break point must be a collection, even when the source's is.
#[test]
fn test_variant_target_break_point_rejected() {
    let mut model = muon_model();
    let err = model
        .add_projected_field(
            Field::new("alt", "std::variant<float,std::int32_t>").unwrap(),
            |name| match name {
                "alt" => "var".to_string(),
                "alt._0" => "jets._0".to_string(),
                _ => "var._1".to_string(),
            },
        )
        .unwrap_err();

    match err {
        Error::UnsupportedMapping {
            side,
            source_field,
            target,
        } => {
            assert_eq!(side, "target");
            assert_eq!(source_field, "jets._0");
            assert_eq!(target, "alt._0");
        }
        other => panic!("expected UnsupportedMapping, got {:?}", other),
    }
    assert!(model.projected_fields().is_empty());

    // The name is still free.
    model
        .add_projected_field(Field::new("alt", "float").unwrap(), |_| "pt".to_string())
        .unwrap();
}

fn assert_mapping_error(
    model: &mut SchemaModel,
    field: Field,
    mapping: impl Fn(&str) -> String,
    check: impl FnOnce(&Error) -> bool,
) {
    let before = model.projected_fields().clone();
    let err = model.add_projected_field(field, mapping).unwrap_err();
    assert!(check(&err), "unexpected error: {:?}", err);
    assert_eq!(model.projected_fields(), &before);
}

/// A record cannot read from a leaf.
#[test]
fn test_record_over_leaf_rejected() {
    let mut model = muon_model();
    let point = Field::record("point", "Point", vec![Field::new("x", "float").unwrap()]).unwrap();
    assert_mapping_error(&mut model, point, |_| "pt".to_string(), |err| {
        matches!(err, Error::MappingStructureMismatch { source_field, target }
            if source_field == "pt" && target == "point")
    });
}

/// A top-level leaf cannot read a collection item.
#[test]
fn test_leaf_over_collection_item_rejected() {
    let mut model = muon_model();
    assert_mapping_error(
        &mut model,
        Field::new("first_jet", "float").unwrap(),
        |_| "jets._0".to_string(),
        |err| {
            matches!(err, Error::MappingStructureMismatch { source_field, target }
                if source_field == "jets._0" && target == "first_jet")
        },
    );
}

/// Items must come from the collection their parent maps to.
#[test]
fn test_items_of_unrelated_collection_rejected() {
    let mut model = muon_model();
    model
        .add_field(Field::new("jets2", "std::vector<float>").unwrap())
        .unwrap();
    assert_mapping_error(
        &mut model,
        Field::new("vec", "std::vector<float>").unwrap(),
        |name| match name {
            "vec" => "jets".to_string(),
            _ => "jets2._0".to_string(),
        },
        |err| {
            matches!(err, Error::MappingStructureMismatch { source_field, target }
                if source_field == "jets2._0" && target == "vec._0")
        },
    );

    // The same shape mapped consistently is fine.
    model
        .add_projected_field(Field::new("vec", "std::vector<float>").unwrap(), |name| {
            name.replacen("vec", "jets2", 1)
        })
        .unwrap();
}

/// A variant alternative cannot be projected.
#[test]
fn test_variant_source_break_point_rejected() {
    let mut model = muon_model();
    assert_mapping_error(
        &mut model,
        Field::new("x", "float").unwrap(),
        |_| "var._0".to_string(),
        |err| {
            matches!(err, Error::UnsupportedMapping { side, source_field, target }
                if *side == "source" && source_field == "var._0" && target == "x")
        },
    );
}

/// Unknown source paths name the missing field.
#[test]
fn test_missing_source() {
    let mut model = muon_model();
    let err = model
        .add_projected_field(Field::new("x", "float").unwrap(), |_| "nope".to_string())
        .unwrap_err();
    assert!(matches!(err, Error::NoSuchField(path) if path == "nope"));
}

/// Full writer flow: fill, extend the schema, fill again, read back.
#[test]
fn test_schema_update_flow() {
    let mut model = muon_model();
    model
        .add_projected_field(Field::cardinality("njets").unwrap(), |_| "jets".to_string())
        .unwrap();

    let mut writer = Writer::new(model, MemorySink::new(), "muons").unwrap();
    let token = writer.model().token("pt").unwrap();
    for i in 0..5 {
        let entry = writer.default_entry_mut().unwrap();
        entry.bind(token, Value::Float(i as f32)).unwrap();
        writer.fill_default().unwrap();
    }

    {
        let mut updater = writer.create_model_updater();
        updater.begin_update();
        updater
            .add_field(Field::new("eta", "double").unwrap())
            .unwrap();
        updater
            .add_projected_field(Field::new("pt_alias", "float").unwrap(), |_| {
                "pt".to_string()
            })
            .unwrap();
        updater.commit_update().unwrap();
    }

    // Tokens of the old schema are stale now.
    let mut entry = writer.create_entry().unwrap();
    assert!(matches!(
        entry.bind(token, Value::Float(1.0)),
        Err(Error::StaleToken { .. })
    ));
    entry.bind_by_name("eta", Value::Double(0.5)).unwrap();
    writer.fill(&entry).unwrap();

    let sink = writer.commit().unwrap();
    assert_eq!(sink.schema_updates().len(), 1);
    assert_eq!(sink.schema_updates()[0].first_entry, 5);

    let mut source = sink.into_source();
    source.attach().unwrap();
    let descriptor = source.descriptor().unwrap();
    assert_eq!(descriptor.name(), "muons");
    assert_eq!(descriptor.n_entries(), 6);
    assert_eq!(descriptor.extension_fields().len(), 2);
    assert_eq!(descriptor.field_by_name("eta").unwrap().first_entry(), Some(5));
    assert_eq!(descriptor.field_by_name("pt").unwrap().first_entry(), None);

    let rebuilt = descriptor.create_model().unwrap();
    assert!(rebuilt.find_field("eta").is_some());
    let alias = rebuilt
        .projected_fields()
        .tree()
        .find("pt_alias")
        .unwrap();
    assert_eq!(
        rebuilt.projected_fields().source_of(alias),
        rebuilt.find_field("pt")
    );
}
