use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;

use crate::buffer::{BitCursor, BitWriter};
use crate::builder::Builder;
use crate::codec::{Codec, CodecDescriptor, SimpleDescriptor};
use crate::error::{DecodingError, EncodingError};
use crate::expr::Expr;
use crate::resolver::Resolver;
use crate::selector::CodecSelector;
use crate::types::{TypeHierarchy, TypeTag};
use crate::value::Value;

/// A discriminated union: the selector picks one candidate, which then
/// decodes the rest.
///
/// Exactly one candidate is attempted per call. Its error, if any, is
/// returned as is.
#[derive(Debug)]
pub struct SwitchingCodec {
    selector: Box<dyn CodecSelector>,
    hierarchy: Arc<TypeHierarchy>,
}

impl SwitchingCodec {
    pub fn new(selector: impl CodecSelector + 'static) -> Self {
        SwitchingCodec {
            selector: Box::new(selector),
            hierarchy: Arc::new(TypeHierarchy::new()),
        }
    }

    /// Uses `hierarchy` when computing [`SwitchingCodec::common_type`].
    pub fn with_hierarchy(mut self, hierarchy: Arc<TypeHierarchy>) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    pub fn selector(&self) -> &dyn CodecSelector {
        self.selector.as_ref()
    }

    /// Nearest common ancestor of every candidate's type.
    pub fn common_type(&self) -> TypeTag {
        let tags: Vec<TypeTag> = self.selector.choices().iter().map(|c| c.ty()).collect();
        self.hierarchy.common_supertype(&tags)
    }
}

/// Combines candidate sizes into one formula that holds whichever candidate
/// is selected.
///
/// A single candidate keeps its own formula. With several, any candidate
/// without a size makes the union undefined, and all constant sizes must
/// agree. Parameterized sizes are skipped, so `8` and `n * 8` reconcile to
/// `8` as long as some constant was seen.
pub fn reconcile_sizes(choices: &[Arc<dyn Codec>]) -> Option<Expr> {
    match choices {
        [] => None,
        [only] => only.size(),
        many => {
            let mut agreed: Option<i64> = None;
            for codec in many {
                let size = codec.size()?;
                if size.is_parameterized() {
                    continue;
                }
                let bits = size.constant()?;
                match agreed {
                    Some(seen) if seen != bits => return None,
                    _ => agreed = Some(bits),
                }
            }
            agreed.map(Expr::Int)
        }
    }
}

impl Codec for SwitchingCodec {
    fn decode(
        &self,
        cursor: &mut BitCursor<'_>,
        resolver: &mut Resolver<'_>,
        builder: &dyn Builder,
    ) -> Result<Value, DecodingError> {
        let codec = self.selector.select(cursor, resolver)?;
        codec.decode(cursor, resolver, builder)
    }

    fn encode(
        &self,
        value: &Value,
        writer: &mut BitWriter,
        resolver: &mut Resolver<'_>,
    ) -> Result<(), EncodingError> {
        let codec = self.selector.select_for_encode(value, writer, resolver)?;
        codec.encode(value, writer, resolver)
    }

    /// The reconciled candidate size. The selector's discriminator is not
    /// counted; `CodecSelector::size` reports it separately.
    fn size(&self) -> Option<Expr> {
        reconcile_sizes(self.selector.choices())
    }

    fn ty(&self) -> TypeTag {
        self.common_type()
    }

    fn types(&self) -> Vec<TypeTag> {
        let mut all = IndexSet::new();
        for codec in self.selector.choices() {
            all.extend(codec.types());
        }
        all.into_iter().collect()
    }

    fn accepts(&self, value: &Value) -> bool {
        self.selector.choices().iter().any(|c| c.accepts(value))
    }

    fn dependencies(&self) -> Vec<String> {
        let mut all: IndexSet<String> = self.selector.dependencies().into_iter().collect();
        for codec in self.selector.choices() {
            all.extend(codec.dependencies());
        }
        all.into_iter().collect()
    }

    fn descriptor(&self) -> Box<dyn CodecDescriptor + '_> {
        Box::new(SwitchingDescriptor { codec: self })
    }
}

struct SwitchingDescriptor<'a> {
    codec: &'a SwitchingCodec,
}

/// Writes "either A", "either A or B", "either A, B, or C", or "nothing".
fn write_either<F>(out: &mut dyn fmt::Write, choices: &[Arc<dyn Codec>], mut write_one: F) -> fmt::Result
where
    F: FnMut(&dyn CodecDescriptor, &mut dyn fmt::Write) -> fmt::Result,
{
    if choices.is_empty() {
        return out.write_str("nothing");
    }
    out.write_str("either ")?;
    let last = choices.len() - 1;
    for (i, codec) in choices.iter().enumerate() {
        if i > 0 {
            let separator = match (i == last, choices.len()) {
                (true, 2) => " or ",
                (true, _) => ", or ",
                (false, _) => ", ",
            };
            out.write_str(separator)?;
        }
        write_one(codec.descriptor().as_ref(), &mut *out)?;
    }
    Ok(())
}

impl CodecDescriptor for SwitchingDescriptor<'_> {
    fn label(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = write_either(&mut out, self.codec.selector.choices(), |d, out| {
            out.write_str(&d.label())
        });
        out
    }

    fn size(&self) -> String {
        match self.codec.size() {
            Some(size) => SimpleDescriptor::size_text(Some(&size)),
            None => "depends on the selected variant".to_string(),
        }
    }

    fn has_full_description(&self) -> bool {
        true
    }

    fn write_reference(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write_either(out, self.codec.selector.choices(), |d, out| {
            d.write_reference(out)
        })
    }

    fn write_one_liner(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.codec.selector.document(out)
    }
}
