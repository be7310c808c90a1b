use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bitweave_core::{
    BitCursor, BitWriter, BooleanCodec, Builder, Codec, CodecConfig, CodecDescriptor, CodecFactory,
    CompositeCodecFactory, ConditionalSelector, DecodingError, DefaultBuilder, EncodingError, Expr,
    FieldMeta, InstantiationError, IntType, ListCodec, NumericCodec, Record, RecordCodec, Resolver,
    SchemaError, SimpleDescriptor, SwitchingCodec, TypeHierarchy, TypePrefixSelector, TypeTag,
    Value, engine, reconcile_sizes,
};

/// Counts decode calls and optionally fails.
#[derive(Debug)]
struct Counting {
    tag: TypeTag,
    calls: AtomicUsize,
    fail: bool,
}

impl Counting {
    fn new(tag: &'static str, fail: bool) -> Arc<Self> {
        Arc::new(Counting {
            tag: TypeTag::from_static(tag),
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Codec for Counting {
    fn decode(
        &self,
        _cursor: &mut BitCursor<'_>,
        _resolver: &mut Resolver<'_>,
        _builder: &dyn Builder,
    ) -> Result<Value, DecodingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(DecodingError::OutOfRange {
                what: "stub",
                value: 2,
            })
        } else {
            Ok(Value::Bool(true))
        }
    }

    fn encode(
        &self,
        _value: &Value,
        _writer: &mut BitWriter,
        _resolver: &mut Resolver<'_>,
    ) -> Result<(), EncodingError> {
        Ok(())
    }

    fn size(&self) -> Option<Expr> {
        Some(Expr::Int(0))
    }

    fn ty(&self) -> TypeTag {
        self.tag.clone()
    }

    fn descriptor(&self) -> Box<dyn CodecDescriptor + '_> {
        Box::new(SimpleDescriptor::new(self.tag.name().to_string(), "0 bits"))
    }
}

fn counting(tag: &'static str) -> Arc<dyn Codec> {
    Counting::new(tag, false)
}

fn boolean() -> Arc<dyn Codec> {
    Arc::new(BooleanCodec::new())
}

fn boxed_boolean() -> Arc<dyn Codec> {
    Arc::new(BooleanCodec::boxed())
}

fn sized(bits: impl Into<Expr>) -> Arc<dyn Codec> {
    Arc::new(NumericCodec::new(IntType::U64).with_width(bits))
}

fn union_of(choices: Vec<Arc<dyn Codec>>) -> SwitchingCodec {
    let selector = choices
        .into_iter()
        .fold(ConditionalSelector::new(), |s, c| s.with_choice(Expr::Bool(true), c));
    SwitchingCodec::new(selector)
}

#[test]
fn union_size_reconciliation() {
    assert_eq!(union_of(vec![]).size(), None);
    assert_eq!(union_of(vec![sized(8)]).size(), Some(Expr::Int(8)));
    assert_eq!(union_of(vec![sized(16), sized(16)]).size(), Some(Expr::Int(16)));
    assert_eq!(union_of(vec![sized(16), sized(24)]).size(), None);
    assert_eq!(
        union_of(vec![sized(Expr::reference("a")), sized(Expr::reference("b"))]).size(),
        None
    );
}

fn prefixed_union_of(choices: Vec<Arc<dyn Codec>>) -> SwitchingCodec {
    let selector = choices
        .into_iter()
        .enumerate()
        .try_fold(TypePrefixSelector::new(4).unwrap(), |s, (i, c)| s.with_choice(i as u64, c))
        .unwrap();
    SwitchingCodec::new(selector)
}

#[test]
fn prefixed_union_size_leaves_out_the_prefix() {
    assert_eq!(prefixed_union_of(vec![]).size(), None);
    assert_eq!(prefixed_union_of(vec![sized(8)]).size(), Some(Expr::Int(8)));
    assert_eq!(prefixed_union_of(vec![sized(16), sized(16)]).size(), Some(Expr::Int(16)));
    assert_eq!(prefixed_union_of(vec![sized(16), sized(24)]).size(), None);
    assert_eq!(
        prefixed_union_of(vec![sized(8), sized(Expr::reference("n"))]).size(),
        Some(Expr::Int(8))
    );
    assert_eq!(
        prefixed_union_of(vec![sized(Expr::reference("a")), sized(Expr::reference("b"))]).size(),
        None
    );

    let byte = SwitchingCodec::new(
        TypePrefixSelector::new(1)
            .unwrap()
            .with_choice(0, Arc::new(NumericCodec::new(IntType::U8)))
            .unwrap(),
    );
    assert_eq!(byte.size(), Some(Expr::Int(8)));
    assert_eq!(byte.size_of(&Resolver::new()).unwrap(), 8);
}

#[test]
fn union_size_skips_parameterized_candidates() {
    // Asymmetric: the parameterized candidate is not checked against the
    // constant one, so the union claims 8 bits even though the second
    // candidate may need more.
    let choices = vec![sized(8), sized(Expr::reference("n"))];
    assert_eq!(reconcile_sizes(&choices), Some(Expr::Int(8)));
    assert_eq!(union_of(choices).size(), Some(Expr::Int(8)));
}

#[test]
fn union_size_with_one_parameterized_candidate() {
    let n = Expr::reference("n").mul(8);
    let codec = union_of(vec![sized(n.clone())]);
    assert_eq!(codec.size(), Some(n));
    let resolver = Resolver::with_params([("n", Value::Int(2))]);
    assert_eq!(codec.size_of(&resolver).unwrap(), 16);
    assert_eq!(
        codec.size_of(&Resolver::new()).unwrap_err(),
        DecodingError::Expr(bitweave_core::ExprError::UnresolvedReference("n".to_string()))
    );
}

#[test]
fn undefined_union_size_is_an_error_for_size_of() {
    let codec = union_of(vec![sized(8), sized(9)]);
    assert_eq!(codec.size_of(&Resolver::new()).unwrap_err(), DecodingError::UndefinedSize);
}

#[test]
fn selector_is_exact() {
    let selector = TypePrefixSelector::new(3)
        .unwrap()
        .with_choice(0b001, boolean())
        .unwrap()
        .with_choice(0b010, boxed_boolean())
        .unwrap();
    let codec = SwitchingCodec::new(selector);
    let data = [0b0101_0000];

    let mut first = BitCursor::new(&data);
    let mut second = BitCursor::new(&data);
    let resolver = Resolver::new();
    let a = codec.selector().select(&mut first, &resolver).unwrap();
    let b = codec.selector().select(&mut second, &resolver).unwrap();
    assert!(Arc::ptr_eq(a, b));
    assert_eq!(first.position(), 3);
    assert_eq!(second.position(), 3);
    assert_eq!(a.types(), vec![TypeTag::BOXED_BOOL]);
}

#[test]
fn type_union_and_common_type() {
    let hierarchy = TypeHierarchy::new()
        .with(TypeTag::new("shape"), TypeTag::ANY)
        .unwrap()
        .with(TypeTag::new("circle"), TypeTag::new("shape"))
        .unwrap()
        .with(TypeTag::new("square"), TypeTag::new("shape"))
        .unwrap();
    let circle = counting("circle");
    let codec = union_of(vec![circle.clone(), counting("square"), circle])
        .with_hierarchy(Arc::new(hierarchy));

    assert_eq!(codec.types(), vec![TypeTag::new("circle"), TypeTag::new("square")]);
    assert_eq!(codec.common_type(), TypeTag::new("shape"));
    assert_eq!(codec.ty(), TypeTag::new("shape"));

    let unrelated = union_of(vec![boolean(), sized(8)]);
    assert_eq!(unrelated.common_type(), TypeTag::ANY);
    let plain = union_of(vec![boolean(), boxed_boolean()]);
    assert_eq!(plain.types(), vec![TypeTag::BOOL, TypeTag::BOXED_BOOL]);
    assert_eq!(plain.common_type(), TypeTag::BOOL);
}

#[test]
fn label_joins_candidates() {
    let codec = union_of(vec![counting("X"), counting("Y"), counting("Z")]);
    let descriptor = codec.descriptor();
    assert_eq!(descriptor.label(), "either X, Y, or Z");

    let mut reference = String::new();
    descriptor.write_reference(&mut reference).unwrap();
    assert_eq!(reference, "either X, Y, or Z");
}

#[test]
fn only_the_selected_candidate_runs() {
    let first = Counting::new("first", false);
    let second = Counting::new("second", true);
    let third = Counting::new("third", false);
    let selector = TypePrefixSelector::new(2)
        .unwrap()
        .with_choice(0, first.clone())
        .unwrap()
        .with_choice(1, second.clone())
        .unwrap()
        .with_choice(2, third.clone())
        .unwrap();
    let codec = SwitchingCodec::new(selector);

    let err = engine::decode(&codec, &[0b0100_0000], &CodecConfig::default()).unwrap_err();
    assert_eq!(
        err,
        DecodingError::OutOfRange {
            what: "stub",
            value: 2
        }
    );
    assert_eq!(first.calls(), 0);
    assert_eq!(second.calls(), 1);
    assert_eq!(third.calls(), 0);
}

#[test]
fn unknown_discriminator_is_not_defaulted() {
    let first = Counting::new("first", false);
    let selector = TypePrefixSelector::new(2)
        .unwrap()
        .with_choice(0, first.clone())
        .unwrap();
    let err = engine::decode(&SwitchingCodec::new(selector), &[0xC0], &CodecConfig::default())
        .unwrap_err();
    assert_eq!(err, DecodingError::NoMatchingCandidate { value: 3, width: 2 });
    assert_eq!(first.calls(), 0);
}

fn packet() -> RecordCodec {
    let body = SwitchingCodec::new(
        ConditionalSelector::new()
            .with_choice(
                Expr::reference("kind").equals(0),
                Arc::new(ListCodec::new(
                    Expr::reference("count"),
                    Arc::new(NumericCodec::new(IntType::U8)),
                )),
            )
            .with_choice(
                Expr::reference("kind").equals(1),
                Arc::new(NumericCodec::new(IntType::I16)),
            ),
    );
    let config = CodecConfig::default().with_param("version", 1);
    let context = config.resolver_context();
    RecordCodec::builder_in(TypeTag::new("packet"), &context)
        .field("kind", Arc::new(NumericCodec::new(IntType::U8).with_width(4)))
        .unwrap()
        .field("count", Arc::new(NumericCodec::new(IntType::U8).with_width(4)))
        .unwrap()
        .field("body", Arc::new(body))
        .unwrap()
        .build()
}

#[test]
fn record_with_union_body() {
    let codec = packet();
    let config = CodecConfig::default();

    let list = engine::decode(&codec, &[0x02, 0xAA, 0xBB], &config).unwrap();
    let record = list.as_record().unwrap();
    assert_eq!(
        record.get("body"),
        Some(&Value::List(vec![Value::UInt(0xAA), Value::UInt(0xBB)]))
    );

    let signed = engine::decode(&codec, &[0x10, 0xFF, 0xFE], &config).unwrap();
    assert_eq!(signed.as_record().unwrap().get("body"), Some(&Value::Int(-2)));
    assert_eq!(engine::encode(&codec, &signed, &config).unwrap(), vec![0x10, 0xFF, 0xFE]);

    let short = engine::decode(&codec, &[0x03, 0xAA], &config).unwrap_err();
    assert!(short.is_out_of_data());

    let unknown = engine::decode(&codec, &[0x20], &config).unwrap_err();
    assert_eq!(unknown, DecodingError::NoSatisfiedCondition);
}

#[test]
fn later_field_references_are_rejected() {
    let err = RecordCodec::builder(TypeTag::new("bad"))
        .field(
            "items",
            Arc::new(ListCodec::new(
                Expr::reference("count"),
                Arc::new(BooleanCodec::new()),
            )),
        )
        .unwrap_err();
    assert_eq!(
        err,
        SchemaError::UnresolvedReference {
            field: "items".to_string(),
            name: "count".to_string(),
        }
    );
}

#[test]
fn factory_builds_a_record() {
    let factory = CompositeCodecFactory::default();
    let mut builder = RecordCodec::builder(TypeTag::new("reading"));
    for (name, target, meta) in [
        ("valid", TypeTag::BOOL, FieldMeta::bound()),
        ("bits", TypeTag::new("u8"), FieldMeta::bound().with_size(4)),
        (
            "sample",
            TypeTag::new("i32"),
            FieldMeta::bound().with_size(Expr::reference("bits")),
        ),
    ] {
        let codec = factory
            .create(&meta, &target, builder.context())
            .unwrap()
            .unwrap();
        builder = builder.field(name, codec).unwrap();
    }
    let codec = builder.build();

    // valid=1, bits=3, sample=0b101 (-3)
    let value = engine::decode(&codec, &[0b1001_1101], &CodecConfig::default()).unwrap();
    let record = value.as_record().unwrap();
    assert_eq!(record.get("sample"), Some(&Value::Int(-3)));
    // sample is sized by bits, which the caller never sees.
    assert_eq!(codec.size(), None);
}

#[test]
fn factory_rejects_unknown_size_reference() {
    let factory = CompositeCodecFactory::default();
    let builder = RecordCodec::builder(TypeTag::new("reading"));
    let err = factory
        .create(
            &FieldMeta::bound().with_size(Expr::reference("bits")),
            &TypeTag::new("u32"),
            builder.context(),
        )
        .unwrap_err();
    assert_eq!(err, SchemaError::UnknownReference("bits".to_string()));
}

/// Only knows how to build `packet`.
struct PacketsOnly;

impl Builder for PacketsOnly {
    fn instantiate(&self, ty: &TypeTag) -> Result<Record, InstantiationError> {
        if ty.name() == "packet" {
            Ok(Record::new(ty.clone()))
        } else {
            Err(InstantiationError::Unknown(ty.clone()))
        }
    }
}

#[test]
fn custom_builder() {
    let config = CodecConfig::default();
    assert!(engine::decode_with(&packet(), &[0x10, 0x00, 0x01], &config, &PacketsOnly).is_ok());

    let other = RecordCodec::builder(TypeTag::new("other"))
        .field("a", Arc::new(BooleanCodec::new()))
        .unwrap()
        .build();
    let err = engine::decode_with(&other, &[0xFF], &config, &PacketsOnly).unwrap_err();
    assert_eq!(
        err,
        DecodingError::Instantiation(InstantiationError::Unknown(TypeTag::new("other")))
    );
    assert!(engine::decode_with(&other, &[0xFF], &config, &DefaultBuilder::new()).is_ok());
}

#[test]
fn config_from_toml_drives_decode() {
    let config = CodecConfig::from_toml_str(
        r#"
        allow_trailing_bits = false

        [params]
        width = 12
        "#,
    )
    .unwrap();
    let codec = NumericCodec::new(IntType::U16).with_width(Expr::reference("width"));
    assert_eq!(engine::decode(&codec, &[0x12, 0x30], &config).unwrap(), Value::UInt(0x123));
    assert_eq!(
        engine::decode(&codec, &[0x12, 0x30, 0x00], &config).unwrap_err(),
        DecodingError::TrailingData { remaining: 12 }
    );
}

#[test]
fn one_tree_many_threads() {
    let codec = packet();
    std::thread::scope(|s| {
        for i in 0..4u8 {
            let codec = &codec;
            s.spawn(move || {
                let value = engine::decode(codec, &[0x01, i], &CodecConfig::default()).unwrap();
                let body = value.as_record().unwrap().get("body").unwrap();
                assert_eq!(body, &Value::List(vec![Value::UInt(i as u64)]));
            });
        }
    });
}
