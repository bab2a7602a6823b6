//! Integration tests for format compatibility: feature flags, descriptors
//! and the file collaborators.

use columnardb::format::{
    DescriptorBuilder, FieldDescriptor, FileSink, FileSource, MemorySource, Serializer, Sink,
    Source, FEATURE_FLAG_TEST,
};
use columnardb::schema::{Field, SchemaModel, Structure, Writer};
use columnardb::Error;
use tempfile::tempdir;

/// Serialize `builder` into header and footer envelopes and hand them to
/// `sink`.
fn write_descriptor(builder: DescriptorBuilder, sink: &mut impl Sink) {
    let descriptor = builder.build().unwrap();
    let context = Serializer::serialize_header(None, &descriptor).unwrap();
    let mut header = vec![0u8; context.header_size()];
    let context = Serializer::serialize_header(Some(&mut header), &descriptor).unwrap();
    sink.write_header(&header, header.len()).unwrap();

    let size = Serializer::serialize_footer(None, &descriptor, &context).unwrap();
    let mut footer = vec![0u8; size];
    Serializer::serialize_footer(Some(&mut footer), &descriptor, &context).unwrap();
    sink.write_footer(&footer, footer.len()).unwrap();
}

/// A file written with an unknown feature flag refuses to attach.
#[test]
fn test_unknown_feature_in_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("future.cdb");

    let mut builder = DescriptorBuilder::new();
    builder.set_name("future");
    builder.set_feature(FEATURE_FLAG_TEST);
    builder
        .add_field(FieldDescriptor::new("pt", "float", Structure::Leaf))
        .unwrap();
    let mut sink = FileSink::create(&path).unwrap();
    write_descriptor(builder, &mut sink);
    drop(sink);

    let mut source = FileSource::open(&path).unwrap();
    assert!(matches!(source.descriptor(), Err(Error::NotAttached)));

    let err = source.attach().unwrap_err();
    assert!(matches!(&err, Error::UnsupportedFeature(flags) if flags == &[FEATURE_FLAG_TEST]));
    assert_eq!(err.to_string(), "unsupported format feature: 137");

    assert!(matches!(source.descriptor(), Err(Error::NotAttached)));
    assert!(matches!(source.page_pool(), Err(Error::NotAttached)));
}

/// A model written to a file comes back with all fields.
#[test]
fn test_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.cdb");

    let mut model = SchemaModel::create();
    model.set_description("file round trip").unwrap();
    model.add_field(Field::new("pt", "float").unwrap()).unwrap();
    model
        .add_field(Field::new("tracks", "std::vector<std::vector<double>>").unwrap())
        .unwrap();
    model
        .add_projected_field(Field::cardinality("ntracks").unwrap(), |_| {
            "tracks".to_string()
        })
        .unwrap();

    let mut writer = Writer::new(model, FileSink::create(&path).unwrap(), "events").unwrap();
    for _ in 0..4 {
        writer.fill_default().unwrap();
    }
    writer.commit().unwrap();

    let mut source = FileSource::open(&path).unwrap();
    source.attach().unwrap();
    let descriptor = source.descriptor().unwrap();
    assert_eq!(descriptor.name(), "events");
    assert_eq!(descriptor.description(), "file round trip");
    assert_eq!(descriptor.n_entries(), 4);
    assert!(descriptor.features().is_empty());
    assert!(descriptor.field_by_name("tracks._0._0").is_some());

    let model = descriptor.create_model().unwrap();
    assert!(model.is_frozen());
    assert_eq!(model.create_entry().unwrap().len(), 2);
    assert!(source.page_pool().unwrap().is_empty());
}

/// Creating a sink over an existing file fails.
#[test]
fn test_file_sink_refuses_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("taken.cdb");
    std::fs::write(&path, b"occupied").unwrap();

    assert!(matches!(FileSink::create(&path), Err(Error::Io(_))));
}

/// A truncated header is reported as corrupt, not as unsupported.
#[test]
fn test_truncated_header() {
    let mut builder = DescriptorBuilder::new();
    builder.set_feature(FEATURE_FLAG_TEST);
    let descriptor = builder.build().unwrap();
    let context = Serializer::serialize_header(None, &descriptor).unwrap();
    let mut header = vec![0u8; context.header_size()];
    Serializer::serialize_header(Some(&mut header), &descriptor).unwrap();

    header.truncate(header.len() - 1);
    let mut source = MemorySource::new(header, Vec::new());
    assert!(matches!(
        source.attach(),
        Err(Error::ChecksumMismatch { .. }) | Err(Error::InvalidFormat(_))
    ));
}
