use std::fmt;
use std::sync::Arc;

use crate::buffer::{BitCursor, BitWriter};
use crate::builder::Builder;
use crate::codec::{Codec, CodecDescriptor, SimpleDescriptor};
use crate::error::{DecodingError, EncodingError, SchemaError};
use crate::expr::Expr;
use crate::resolver::{Resolver, ResolverContext};
use crate::types::TypeTag;
use crate::value::Value;

#[derive(Debug, Clone)]
struct Field {
    name: String,
    codec: Arc<dyn Codec>,
}

/// Ordered named fields decoded into a [`Record`](crate::Record).
///
/// Each decoded field is bound in the record's scope under its name, so
/// later fields can size or select themselves from it.
#[derive(Debug, Clone)]
pub struct RecordCodec {
    type_tag: TypeTag,
    fields: Vec<Field>,
}

impl RecordCodec {
    /// Starts a record whose fields may only reference each other.
    pub fn builder(type_tag: TypeTag) -> RecordCodecBuilder<'static> {
        RecordCodecBuilder {
            type_tag,
            fields: Vec::new(),
            context: ResolverContext::new(),
        }
    }

    /// Starts a record nested in `outer`: its fields may also reference
    /// names declared there.
    pub fn builder_in<'p>(type_tag: TypeTag, outer: &'p ResolverContext<'p>) -> RecordCodecBuilder<'p> {
        RecordCodecBuilder {
            type_tag,
            fields: Vec::new(),
            context: outer.scope(),
        }
    }

    pub fn type_tag(&self) -> &TypeTag {
        &self.type_tag
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// The binding a dotted path starts from.
fn head(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

/// Assembles a [`RecordCodec`], rejecting fields that read names no earlier
/// field or enclosing scope provides.
#[derive(Debug)]
pub struct RecordCodecBuilder<'p> {
    type_tag: TypeTag,
    fields: Vec<Field>,
    context: ResolverContext<'p>,
}

impl<'p> RecordCodecBuilder<'p> {
    pub fn field(mut self, name: impl Into<String>, codec: Arc<dyn Codec>) -> Result<Self, SchemaError> {
        let name = name.into();
        if self.context.declares_locally(&name) {
            return Err(SchemaError::DuplicateField(name));
        }
        if let Some(missing) = codec
            .dependencies()
            .into_iter()
            .find(|dep| !self.context.is_available(dep))
        {
            return Err(SchemaError::UnresolvedReference {
                field: name,
                name: missing,
            });
        }
        self.context.declare(name.clone());
        self.fields.push(Field { name, codec });
        Ok(self)
    }

    /// The names visible to the next field.
    pub fn context(&self) -> &ResolverContext<'p> {
        &self.context
    }

    pub fn build(self) -> RecordCodec {
        RecordCodec {
            type_tag: self.type_tag,
            fields: self.fields,
        }
    }
}

impl Codec for RecordCodec {
    fn decode(
        &self,
        cursor: &mut BitCursor<'_>,
        resolver: &mut Resolver<'_>,
        builder: &dyn Builder,
    ) -> Result<Value, DecodingError> {
        let mut record = builder.instantiate(&self.type_tag)?;
        let mut scope = resolver.scope();
        for field in &self.fields {
            let at = cursor.position();
            let value = field.codec.decode(cursor, &mut scope, builder)?;
            log::trace!("{}.{} decoded at bit {}: {:?}", self.type_tag, field.name, at, value);
            scope.bind(field.name.clone(), value);
        }
        for (name, value) in scope.into_bindings() {
            record.insert(name, value);
        }
        Ok(Value::Record(record))
    }

    fn encode(
        &self,
        value: &Value,
        writer: &mut BitWriter,
        resolver: &mut Resolver<'_>,
    ) -> Result<(), EncodingError> {
        let record = match value {
            Value::Record(record) if *record.type_tag() == self.type_tag => record,
            other => {
                return Err(EncodingError::TypeMismatch {
                    expected: self.type_tag.clone(),
                    found: other.type_tag(),
                });
            }
        };
        let mut scope = resolver.scope();
        for field in &self.fields {
            let value = record
                .get(&field.name)
                .ok_or_else(|| EncodingError::MissingField(field.name.clone()))?;
            field.codec.encode(value, writer, &mut scope)?;
            scope.bind(field.name.clone(), value.clone());
        }
        Ok(())
    }

    /// Sum of the field sizes. Undefined when a field is sized by an earlier
    /// one: those bindings live in the record's own scope and the caller
    /// cannot evaluate them.
    fn size(&self) -> Option<Expr> {
        let mut total = Expr::Int(0);
        for (i, field) in self.fields.iter().enumerate() {
            let size = field.codec.size()?;
            let earlier = &self.fields[..i];
            if size
                .references()
                .into_iter()
                .any(|r| earlier.iter().any(|f| f.name == head(r)))
            {
                return None;
            }
            total = total.add(size);
        }
        Some(total)
    }

    fn ty(&self) -> TypeTag {
        self.type_tag.clone()
    }

    fn dependencies(&self) -> Vec<String> {
        let own = |dep: &String| self.fields.iter().any(|f| f.name == head(dep));
        let mut out: Vec<String> = Vec::new();
        for field in &self.fields {
            for dep in field.codec.dependencies() {
                if !own(&dep) && !out.contains(&dep) {
                    out.push(dep);
                }
            }
        }
        out
    }

    fn descriptor(&self) -> Box<dyn CodecDescriptor + '_> {
        Box::new(RecordDescriptor { codec: self })
    }
}

struct RecordDescriptor<'a> {
    codec: &'a RecordCodec,
}

impl CodecDescriptor for RecordDescriptor<'_> {
    fn label(&self) -> String {
        format!("a {} record", self.codec.type_tag)
    }

    fn size(&self) -> String {
        SimpleDescriptor::size_text(self.codec.size().as_ref())
    }

    fn has_full_description(&self) -> bool {
        !self.codec.fields.is_empty()
    }

    fn write_one_liner(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{} of ", self.label())?;
        for (i, field) in self.codec.fields.iter().enumerate() {
            if i > 0 {
                out.write_str(", ")?;
            }
            write!(out, "{} (", field.name)?;
            field.codec.descriptor().write_reference(out)?;
            out.write_str(")")?;
        }
        Ok(())
    }
}
