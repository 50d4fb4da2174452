use crate::array_length::{self, ArrayLengthError};
use crate::ast::{TypeExpr, TypeExprKind};
use crate::registry::TypeRegistry;
use crate::string_interner::StringInterner;
use crate::types::{TypeDescriptor, TypeKind};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unresolved type `{0}`")]
    UnresolvedIdentifier(String),
    #[error("unresolved imported type `{0}`")]
    UnresolvedQualified(String),
    #[error("unsupported {form} `{text}`")]
    UnsupportedForm { form: &'static str, text: String },
    #[error(transparent)]
    ArrayLength(#[from] ArrayLengthError),
    #[error("type `{0}` is larger than the maximum object size")]
    TooLarge(String),
}

/// Turns type expressions into descriptors using a fixed registry. Nothing is
/// looked up outside the registry, so any name it doesn't know is an error.
pub struct Resolver<'a> {
    registry: &'a TypeRegistry,
    symbols: &'a StringInterner,
    source: &'a str,
}

impl<'a> Resolver<'a> {
    /// `source` is the text the expressions were parsed from, used when
    /// reporting unsupported forms.
    pub fn new(registry: &'a TypeRegistry, symbols: &'a StringInterner, source: &'a str) -> Self {
        Resolver {
            registry,
            symbols,
            source,
        }
    }

    pub fn resolve(&self, ty: &TypeExpr) -> Result<TypeDescriptor, ResolveError> {
        let target = self.registry.target();
        let word = target.word_size();

        match &ty.kind {
            TypeExprKind::Identifier(sym) => {
                let name = self.symbols.get(sym);
                self.registry
                    .lookup(name)
                    .cloned()
                    .ok_or_else(|| ResolveError::UnresolvedIdentifier(name.to_string()))
            }
            TypeExprKind::Qualified { package, name } => {
                let qualified = self.symbols.qualified(package, name);

                match self.registry.lookup(&qualified) {
                    Some(descriptor) => Ok(descriptor.clone()),
                    None => {
                        warn!(name = %qualified, "imported type is not in the type table");
                        Err(ResolveError::UnresolvedQualified(qualified))
                    }
                }
            }
            TypeExprKind::Pointer(inner) => {
                let element = self.resolve(inner)?;

                Ok(TypeDescriptor {
                    name: format!("*{}", element.name),
                    size: word,
                    align: word,
                    kind: TypeKind::Pointer(element.into()),
                })
            }
            TypeExprKind::Array { length, element } => {
                let length = array_length::evaluate(length)?;
                let element = self.resolve(element)?;
                let name = format!("[{length}]{}", element.name);

                let size = element
                    .size
                    .checked_mul(length)
                    .filter(|size| *size <= target.max_object_size())
                    .ok_or_else(|| ResolveError::TooLarge(name.clone()))?;

                Ok(TypeDescriptor {
                    name,
                    size,
                    align: element.align,
                    kind: TypeKind::FixedArray {
                        element: element.into(),
                        length,
                    },
                })
            }
            TypeExprKind::Slice(element) => {
                let element = self.resolve(element)?;

                // Data pointer, length and capacity.
                Ok(TypeDescriptor {
                    name: format!("[]{}", element.name),
                    size: 3 * word,
                    align: word,
                    kind: TypeKind::DynamicSequence(element.into()),
                })
            }
            TypeExprKind::Map { key, value } => {
                let key = self.resolve(key)?;
                let value = self.resolve(value)?;

                // A map value is a pointer to the runtime's hash table.
                Ok(TypeDescriptor {
                    name: format!("map[{}]{}", key.name, value.name),
                    size: word,
                    align: word,
                    kind: TypeKind::AssociativeContainer {
                        key: key.into(),
                        value: value.into(),
                    },
                })
            }
            TypeExprKind::Unsupported(form) => Err(ResolveError::UnsupportedForm {
                form: form.description(),
                text: ty.span.text(self.source).to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::target::Target;

    fn resolve_in(registry: &TypeRegistry, text: &str) -> Result<TypeDescriptor, ResolveError> {
        let mut symbols = StringInterner::new();
        let ty = Parser::new(text, &mut symbols)
            .parse_type_expression()
            .unwrap();
        Resolver::new(registry, &symbols, text).resolve(&ty)
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::with_builtin_types(Target::Amd64);
        registry.register("Record", TypeDescriptor::named_composite("Record", 32, 8));
        registry.register("Other", TypeDescriptor::named_composite("Other", 3, 1));
        registry
    }

    #[test]
    fn primitives_and_composites() {
        let registry = registry();

        let int = resolve_in(&registry, "int").unwrap();
        assert_eq!((int.size, int.align), (8, 8));

        let string = resolve_in(&registry, "string").unwrap();
        assert_eq!((string.size, string.align), (16, 8));

        let ptr = resolve_in(&registry, "*Record").unwrap();
        assert_eq!((ptr.size, ptr.align), (8, 8));
        assert_eq!(ptr.name, "*Record");
        assert_eq!(ptr.element(), registry.lookup("Record"));

        let slice = resolve_in(&registry, "[]*Record").unwrap();
        assert_eq!((slice.size, slice.align), (24, 8));
        assert_eq!(slice.name, "[]*Record");

        let time = resolve_in(&registry, "time.Time").unwrap();
        assert_eq!((time.size, time.align), (24, 8));
        assert_eq!(time.kind, TypeKind::NamedComposite);
    }

    #[test]
    fn fixed_array_of_records() {
        let array = resolve_in(&registry(), "[1000]Record").unwrap();

        assert_eq!(array.size, 32000);
        assert_eq!(array.align, 8);
        assert_eq!(array.name, "[1000]Record");
        assert!(matches!(array.kind, TypeKind::FixedArray { length: 1000, .. }));
    }

    #[test]
    fn map_size_does_not_depend_on_value() {
        let registry = registry();

        let a = resolve_in(&registry, "map[string]Record").unwrap();
        let b = resolve_in(&registry, "map[string]Other").unwrap();

        assert_eq!((a.size, a.align), (8, 8));
        assert_eq!((a.size, a.align), (b.size, b.align));
        assert_ne!(a, b);
    }

    #[test]
    fn unknown_names_are_errors() {
        let registry = registry();

        assert_eq!(
            resolve_in(&registry, "Missing"),
            Err(ResolveError::UnresolvedIdentifier("Missing".to_string()))
        );
        assert_eq!(
            resolve_in(&registry, "*net.Conn"),
            Err(ResolveError::UnresolvedQualified("net.Conn".to_string()))
        );
        assert_eq!(
            resolve_in(&registry, "map[Missing]int"),
            Err(ResolveError::UnresolvedIdentifier("Missing".to_string()))
        );
    }

    #[test]
    fn named_array_length_is_an_error() {
        assert_eq!(
            resolve_in(&registry(), "[Size]byte"),
            Err(ResolveError::ArrayLength(ArrayLengthError(
                "Size".to_string()
            )))
        );
    }

    #[test]
    fn unsupported_forms_name_the_expression() {
        assert_eq!(
            resolve_in(&registry(), "chan int"),
            Err(ResolveError::UnsupportedForm {
                form: "channel",
                text: "chan int".to_string()
            })
        );
        assert_eq!(
            resolve_in(&registry(), "[]interface{}"),
            Err(ResolveError::UnsupportedForm {
                form: "interface literal",
                text: "interface{}".to_string()
            })
        );
    }

    #[test]
    fn oversized_arrays_are_rejected() {
        let registry = TypeRegistry::new(Target::I386);

        assert!(matches!(
            resolve_in(&registry, "[1048576][4096]byte"),
            Err(ResolveError::TooLarge(_))
        ));
    }

    #[test]
    fn resolution_is_deterministic() {
        let registry = registry();
        let text = "map[time.Time][4][]*Record";

        assert_eq!(resolve_in(&registry, text), resolve_in(&registry, text));
    }
}
