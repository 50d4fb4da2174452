use crate::error::AnalysisError;
use crate::parser::Parser;
use crate::record::FieldDescriptor;
use crate::registry::TypeRegistry;
use crate::resolver::Resolver;
use crate::string_interner::StringInterner;
use crate::types::TypeDescriptor;
use serde::Deserialize;
use tracing::debug;

/// Extra named types loaded from a RON file, e.g.
///
/// ```ron
/// (
///     types: [
///         (name: "uuid.UUID", layout: Fixed(size: 16, align: 1)),
///         (name: "net.IP", layout: Defined("[]byte")),
///         (name: "http.Cookie", layout: Fields([("Name", "string"), ("Raw", "string")])),
///     ],
/// )
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TypeTable {
    pub types: Vec<TypeEntry>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    pub layout: EntryLayout,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub enum EntryLayout {
    /// A struct given as `(field, type expression)` pairs.
    Fields(Vec<(String, String)>),
    /// An opaque type with a known size and alignment.
    Fixed { size: u64, align: u64 },
    /// A defined type sharing the layout of a type expression.
    Defined(String),
}

impl TypeTable {
    pub fn from_ron(text: &str) -> Result<TypeTable, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Registers every entry in file order. Type expressions may refer to
    /// anything registered before them, including earlier entries.
    pub fn apply(&self, registry: &mut TypeRegistry) -> Result<(), AnalysisError> {
        for entry in &self.types {
            let descriptor = entry.descriptor(registry)?;
            registry.register(entry.name.clone(), descriptor);
        }

        debug!(count = self.types.len(), "applied type table");

        Ok(())
    }
}

impl TypeEntry {
    fn invalid(&self, reason: impl Into<String>) -> AnalysisError {
        AnalysisError::InvalidTypeTable {
            entry: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn descriptor(&self, registry: &TypeRegistry) -> Result<TypeDescriptor, AnalysisError> {
        let target = registry.target();

        match &self.layout {
            EntryLayout::Fixed { size, align } => {
                let (size, align) = (*size, *align);

                if !align.is_power_of_two() || align > target.max_align() {
                    return Err(self.invalid(format!(
                        "alignment {align} must be a power of two no larger than {}",
                        target.max_align()
                    )));
                }

                if size % align != 0 {
                    return Err(self.invalid(format!(
                        "size {size} is not a multiple of alignment {align}"
                    )));
                }

                if size > target.max_object_size() {
                    return Err(self.invalid(format!(
                        "size {size} exceeds the maximum object size of {}",
                        target.max_object_size()
                    )));
                }

                Ok(TypeDescriptor::named_composite(&self.name, size, align))
            }
            EntryLayout::Defined(text) => {
                let descriptor = resolve(registry, text).map_err(|reason| self.invalid(reason))?;
                Ok(descriptor.renamed(&self.name))
            }
            EntryLayout::Fields(fields) => {
                let fields = fields
                    .iter()
                    .map(|(name, text)| {
                        let ty = resolve(registry, text)
                            .map_err(|reason| self.invalid(format!("field `{name}`: {reason}")))?;

                        Ok(FieldDescriptor {
                            name: name.clone(),
                            ty,
                            tag: None,
                            embedded: false,
                        })
                    })
                    .collect::<Result<Vec<_>, AnalysisError>>()?;

                let result = crate::layout::layout(&fields, target)
                    .map_err(|e| self.invalid(e.to_string()))?;

                Ok(TypeDescriptor::named_composite(
                    &self.name,
                    result.total_size,
                    result.align,
                ))
            }
        }
    }
}

/// Parses and resolves one type expression against the registry as it stands.
fn resolve(registry: &TypeRegistry, text: &str) -> Result<TypeDescriptor, String> {
    let mut symbols = StringInterner::new();

    let ty = Parser::new(text, &mut symbols)
        .parse_type_expression()
        .map_err(|e| format!("cannot parse `{text}`: {e}"))?;

    Resolver::new(registry, &symbols, text)
        .resolve(&ty)
        .map_err(|e| e.to_string())
}
