use std::sync::Arc;

use crate::buffer::{BitCursor, BitWriter};
use crate::builder::Builder;
use crate::codec::{Codec, CodecDescriptor, SimpleDescriptor};
use crate::error::{DecodingError, EncodingError};
use crate::expr::Expr;
use crate::resolver::Resolver;
use crate::types::TypeTag;
use crate::value::Value;

// Upper bound on preallocation; counts come from untrusted input.
const MAX_PREALLOCATED: usize = 1024;

/// An element codec repeated `count` times.
#[derive(Debug, Clone)]
pub struct ListCodec {
    count: Expr,
    element: Arc<dyn Codec>,
}

impl ListCodec {
    pub fn new(count: impl Into<Expr>, element: Arc<dyn Codec>) -> Self {
        ListCodec {
            count: count.into(),
            element,
        }
    }

    pub fn count(&self) -> &Expr {
        &self.count
    }
}

impl Codec for ListCodec {
    fn decode(
        &self,
        cursor: &mut BitCursor<'_>,
        resolver: &mut Resolver<'_>,
        builder: &dyn Builder,
    ) -> Result<Value, DecodingError> {
        let count = self.count.eval_int(resolver)?;
        let count = u64::try_from(count).map_err(|_| DecodingError::OutOfRange {
            what: "count",
            value: count,
        })?;
        let mut items = Vec::with_capacity((count as usize).min(MAX_PREALLOCATED));
        // Elements that read nothing never run out of data, so the count is
        // bounded by the input left instead.
        let budget = cursor.remaining().max(MAX_PREALLOCATED as u64);
        for _ in 0..count {
            let before = cursor.position();
            let mut scope = resolver.scope();
            items.push(self.element.decode(cursor, &mut scope, builder)?);
            if cursor.position() == before && count > budget {
                return Err(DecodingError::OutOfRange {
                    what: "count",
                    value: count as i64,
                });
            }
        }
        Ok(Value::List(items))
    }

    fn encode(
        &self,
        value: &Value,
        writer: &mut BitWriter,
        resolver: &mut Resolver<'_>,
    ) -> Result<(), EncodingError> {
        let items = value.as_list().ok_or_else(|| EncodingError::TypeMismatch {
            expected: TypeTag::LIST,
            found: value.type_tag(),
        })?;
        let count = self.count.eval_int(resolver)?;
        let expected = u64::try_from(count).map_err(|_| EncodingError::OutOfRange {
            what: "count",
            value: count,
        })?;
        if items.len() as u64 != expected {
            return Err(EncodingError::LengthMismatch {
                expected,
                found: items.len() as u64,
            });
        }
        for item in items {
            let mut scope = resolver.scope();
            self.element.encode(item, writer, &mut scope)?;
        }
        Ok(())
    }

    fn size(&self) -> Option<Expr> {
        Some(self.count.clone().mul(self.element.size()?))
    }

    fn ty(&self) -> TypeTag {
        TypeTag::LIST
    }

    fn accepts(&self, value: &Value) -> bool {
        value
            .as_list()
            .is_some_and(|items| items.iter().all(|item| self.element.accepts(item)))
    }

    fn dependencies(&self) -> Vec<String> {
        let mut deps: Vec<String> = self.count.references().into_iter().map(String::from).collect();
        for dep in self.element.dependencies() {
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        deps
    }

    fn descriptor(&self) -> Box<dyn CodecDescriptor + '_> {
        let mut element = String::new();
        // Writing into a String cannot fail.
        let _ = self.element.descriptor().write_reference(&mut element);
        Box::new(SimpleDescriptor::new(
            format!("a list of {} times {}", self.count, element),
            SimpleDescriptor::size_text(self.size().as_ref()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DefaultBuilder;
    use crate::codec::{NumericCodec, RecordCodec};
    use crate::types::IntType;

    fn nibbles(count: impl Into<Expr>) -> ListCodec {
        ListCodec::new(count, Arc::new(NumericCodec::new(IntType::U8).with_width(4)))
    }

    #[test]
    fn count_from_resolver() {
        let codec = nibbles(Expr::reference("n"));
        let mut resolver = Resolver::with_params([("n", Value::Int(3))]);
        let mut cursor = BitCursor::new(&[0x12, 0x30]);
        let value = codec
            .decode(&mut cursor, &mut resolver, &DefaultBuilder::new())
            .unwrap();
        assert_eq!(
            value,
            Value::List(vec![Value::UInt(1), Value::UInt(2), Value::UInt(3)])
        );
        assert_eq!(cursor.position(), 12);
        assert_eq!(codec.size_of(&resolver).unwrap(), 12);
    }

    #[test]
    fn negative_count() {
        let codec = nibbles(Expr::reference("n"));
        let mut resolver = Resolver::with_params([("n", Value::Int(-1))]);
        let err = codec
            .decode(&mut BitCursor::new(&[]), &mut resolver, &DefaultBuilder::new())
            .unwrap_err();
        assert_eq!(err, DecodingError::OutOfRange { what: "count", value: -1 });
    }

    #[test]
    fn huge_count_runs_out_of_data() {
        let codec = nibbles(i64::MAX);
        let err = codec
            .decode(&mut BitCursor::new(&[0xFF]), &mut Resolver::new(), &DefaultBuilder::new())
            .unwrap_err();
        assert!(err.is_out_of_data());
    }

    #[test]
    fn empty_elements_cannot_outnumber_the_input() {
        let empty: Arc<dyn Codec> = Arc::new(RecordCodec::builder(TypeTag::new("unit")).build());
        let codec = ListCodec::new(Expr::reference("n"), empty);

        let mut resolver = Resolver::with_params([("n", Value::Int(2_000_000))]);
        let err = codec
            .decode(&mut BitCursor::new(&[]), &mut resolver, &DefaultBuilder::new())
            .unwrap_err();
        assert_eq!(err, DecodingError::OutOfRange { what: "count", value: 2_000_000 });

        let mut resolver = Resolver::with_params([("n", Value::Int(3))]);
        let value = codec
            .decode(&mut BitCursor::new(&[]), &mut resolver, &DefaultBuilder::new())
            .unwrap();
        assert_eq!(value.as_list().map(|items| items.len()), Some(3));
    }

    #[test]
    fn element_sized_by_its_own_fields_has_no_size() {
        let chunk = RecordCodec::builder(TypeTag::new("chunk"))
            .field("len", Arc::new(NumericCodec::new(IntType::U8).with_width(4)))
            .unwrap()
            .field(
                "body",
                Arc::new(NumericCodec::new(IntType::U16).with_width(Expr::reference("len"))),
            )
            .unwrap()
            .build();
        let codec = ListCodec::new(2, Arc::new(chunk));
        assert_eq!(codec.size(), None);
        let resolver = Resolver::with_params([("len", Value::Int(12))]);
        assert_eq!(codec.size_of(&resolver), Err(DecodingError::UndefinedSize));
    }

    #[test]
    fn count_driven_by_earlier_field() {
        let codec = RecordCodec::builder(TypeTag::new("msg"))
            .field("n", Arc::new(NumericCodec::new(IntType::U8).with_width(4)))
            .unwrap()
            .field("items", Arc::new(nibbles(Expr::reference("n"))))
            .unwrap()
            .build();
        let value = codec
            .decode(&mut BitCursor::new(&[0x2A, 0xB0]), &mut Resolver::new(), &DefaultBuilder::new())
            .unwrap();
        let items = value.as_record().unwrap().get("items").unwrap();
        assert_eq!(items, &Value::List(vec![Value::UInt(0xA), Value::UInt(0xB)]));
    }

    #[test]
    fn encode_checks_length() {
        let codec = nibbles(2);
        let err = codec
            .encode(&Value::List(vec![Value::UInt(1)]), &mut BitWriter::new(), &mut Resolver::new())
            .unwrap_err();
        assert_eq!(err, EncodingError::LengthMismatch { expected: 2, found: 1 });

        let mut writer = BitWriter::new();
        codec
            .encode(
                &Value::List(vec![Value::UInt(0xC), Value::UInt(0xD)]),
                &mut writer,
                &mut Resolver::new(),
            )
            .unwrap();
        assert_eq!(writer.finish(), vec![0xCD]);
    }

    #[test]
    fn size_multiplies() {
        assert_eq!(nibbles(5).size(), Some(Expr::Int(20)));
        assert!(nibbles(Expr::reference("n")).size().unwrap().is_parameterized());
        assert_eq!(nibbles(5).descriptor().label(), "a list of 5 times an unsigned integer of 4 bits, big endian");
    }
}
