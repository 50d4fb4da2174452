use crate::layout::{layout, LayoutError};
use crate::record::FieldDescriptor;
use crate::target::Target;
use crate::types::TypeDescriptor;
use std::collections::HashMap;
use tracing::{debug, warn};

enum BuiltinType {
    /// A defined type sharing the layout of another registered type.
    Defined(&'static str),
    /// A struct, given as `(field, registered type)` pairs.
    Record(&'static [(&'static str, &'static str)]),
}

/// Standard library types that show up in struct fields often enough to be
/// known without a type table. Entries may only refer to names registered
/// before them.
const BUILTIN_TYPES: &[(&str, BuiltinType)] = &[
    ("time.Duration", BuiltinType::Defined("int64")),
    ("time.Month", BuiltinType::Defined("int")),
    ("time.Weekday", BuiltinType::Defined("int")),
    (
        "time.Time",
        BuiltinType::Record(&[
            ("wall", "uint64"),
            ("ext", "int64"),
            ("loc", "unsafe.Pointer"),
        ]),
    ),
    (
        "sync.Mutex",
        BuiltinType::Record(&[("state", "int32"), ("sema", "uint32")]),
    ),
    (
        "sync.RWMutex",
        BuiltinType::Record(&[
            ("w", "sync.Mutex"),
            ("writerSem", "uint32"),
            ("readerSem", "uint32"),
            ("readerCount", "int32"),
            ("readerWait", "int32"),
        ]),
    ),
    (
        "sync.Once",
        BuiltinType::Record(&[("done", "uint32"), ("m", "sync.Mutex")]),
    ),
];

/// The closed set of type names that can be resolved, with their layout on a
/// single target. Bare names are local types, `pkg.Name` keys are imported
/// ones.
#[derive(Clone, Debug)]
pub struct TypeRegistry {
    target: Target,
    types: HashMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    /// A registry holding only the predeclared types of the language.
    pub fn new(target: Target) -> TypeRegistry {
        let word = target.word_size();
        let basic = |name: &str, size: u64| {
            TypeDescriptor::primitive(name, size, target.basic_align(size))
        };
        // Complex numbers align like their components.
        let complex = |name: &str, size: u64| {
            TypeDescriptor::primitive(name, size, target.basic_align(size / 2))
        };
        // Multi-word headers align to a single word.
        let header = |name: &str, words: u64| TypeDescriptor::primitive(name, words * word, word);

        let primitives = [
            basic("bool", 1),
            basic("int8", 1),
            basic("uint8", 1),
            basic("byte", 1),
            basic("int16", 2),
            basic("uint16", 2),
            basic("int32", 4),
            basic("uint32", 4),
            basic("rune", 4),
            basic("float32", 4),
            basic("int64", 8),
            basic("uint64", 8),
            basic("float64", 8),
            basic("int", word),
            basic("uint", word),
            basic("uintptr", word),
            basic("unsafe.Pointer", word),
            complex("complex64", 8),
            complex("complex128", 16),
            header("string", 2),
            header("any", 2),
            header("error", 2),
        ];

        let types = primitives
            .into_iter()
            .map(|descriptor| (descriptor.name.clone(), descriptor))
            .collect();

        TypeRegistry { target, types }
    }

    /// The predeclared types plus the built-in standard library table.
    pub fn with_builtin_types(target: Target) -> TypeRegistry {
        let mut registry = TypeRegistry::new(target);

        for (name, builtin) in BUILTIN_TYPES {
            match builtin {
                BuiltinType::Defined(underlying) => match registry.lookup(underlying) {
                    Some(descriptor) => {
                        let descriptor = descriptor.renamed(*name);
                        registry.register(*name, descriptor);
                    }
                    None => warn!(name, underlying, "skipping built-in type"),
                },
                BuiltinType::Record(fields) => {
                    let fields = fields
                        .iter()
                        .map(|(field, ty)| {
                            registry.lookup(ty).map(|ty| FieldDescriptor {
                                name: field.to_string(),
                                ty: ty.clone(),
                                tag: None,
                                embedded: false,
                            })
                        })
                        .collect::<Option<Vec<_>>>();

                    let registered = fields
                        .map(|fields| registry.register_record(*name, &fields))
                        .transpose();

                    if !matches!(registered, Ok(Some(()))) {
                        warn!(name, "skipping built-in type");
                    }
                }
            }
        }

        registry
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// Adds or replaces the descriptor for `name`.
    pub fn register(&mut self, name: impl Into<String>, descriptor: TypeDescriptor) {
        let name = name.into();
        debug!(name = %name, size = descriptor.size, align = descriptor.align, "registering type");
        self.types.insert(name, descriptor);
    }

    /// Lays out `fields` and registers the result as a composite named `name`.
    pub fn register_record(
        &mut self,
        name: &str,
        fields: &[FieldDescriptor],
    ) -> Result<(), LayoutError> {
        let result = layout(fields, self.target)?;
        self.register(
            name,
            TypeDescriptor::named_composite(name, result.total_size, result.align),
        );
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeKind;

    fn size_align(registry: &TypeRegistry, name: &str) -> (u64, u64) {
        let descriptor = registry.lookup(name).unwrap();
        (descriptor.size, descriptor.align)
    }

    #[test]
    fn primitives_on_64_bit_targets() {
        let registry = TypeRegistry::new(Target::Amd64);

        assert_eq!(size_align(&registry, "bool"), (1, 1));
        assert_eq!(size_align(&registry, "int16"), (2, 2));
        assert_eq!(size_align(&registry, "rune"), (4, 4));
        assert_eq!(size_align(&registry, "int"), (8, 8));
        assert_eq!(size_align(&registry, "complex64"), (8, 4));
        assert_eq!(size_align(&registry, "complex128"), (16, 8));
        assert_eq!(size_align(&registry, "string"), (16, 8));
        assert_eq!(size_align(&registry, "error"), (16, 8));
        assert_eq!(size_align(&registry, "unsafe.Pointer"), (8, 8));
    }

    #[test]
    fn primitives_on_32_bit_targets() {
        let registry = TypeRegistry::new(Target::I386);

        assert_eq!(size_align(&registry, "int"), (4, 4));
        assert_eq!(size_align(&registry, "int64"), (8, 4));
        assert_eq!(size_align(&registry, "float64"), (8, 4));
        assert_eq!(size_align(&registry, "complex128"), (16, 4));
        assert_eq!(size_align(&registry, "string"), (8, 4));
    }

    #[test]
    fn builtin_standard_library_types() {
        let registry = TypeRegistry::with_builtin_types(Target::Amd64);

        assert_eq!(size_align(&registry, "time.Time"), (24, 8));
        assert_eq!(size_align(&registry, "time.Duration"), (8, 8));
        assert_eq!(size_align(&registry, "sync.Mutex"), (8, 4));
        assert_eq!(size_align(&registry, "sync.RWMutex"), (24, 4));
        assert_eq!(size_align(&registry, "sync.Once"), (12, 4));

        assert_eq!(
            registry.lookup("time.Time").unwrap().kind,
            TypeKind::NamedComposite
        );
        assert_eq!(registry.lookup("time.Duration").unwrap().name, "time.Duration");

        let registry = TypeRegistry::with_builtin_types(Target::Arm);
        assert_eq!(size_align(&registry, "time.Time"), (20, 4));
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = TypeRegistry::new(Target::Amd64);
        assert!(!registry.contains("Header"));

        registry.register("Header", TypeDescriptor::named_composite("Header", 8, 8));
        registry.register("Header", TypeDescriptor::named_composite("Header", 16, 4));

        assert_eq!(size_align(&registry, "Header"), (16, 4));
    }
}
