//! Property tests for field placement and type resolution.

use proptest::prelude::*;
use structlayout::layout::layout;
use structlayout::parser::Parser;
use structlayout::record::FieldDescriptor;
use structlayout::registry::TypeRegistry;
use structlayout::resolver::{ResolveError, Resolver};
use structlayout::string_interner::StringInterner;
use structlayout::target::Target;
use structlayout::types::TypeDescriptor;

fn target_strategy() -> impl Strategy<Value = Target> {
    prop::sample::select(Target::ALL.to_vec())
}

/// Sizes are always a multiple of the alignment, like every Go type.
fn field_strategy() -> impl Strategy<Value = FieldDescriptor> {
    (0u32..4, 0u64..6, "[A-Z][a-z]{0,6}").prop_map(|(shift, count, name)| {
        let align = 1u64 << shift;
        FieldDescriptor {
            name,
            ty: TypeDescriptor::primitive(format!("t{align}x{count}"), align * count, align),
            tag: None,
            embedded: false,
        }
    })
}

fn fields_strategy() -> impl Strategy<Value = Vec<FieldDescriptor>> {
    prop::collection::vec(field_strategy(), 0..12)
}

fn type_expression_strategy() -> impl Strategy<Value = String> {
    let leaf = prop::sample::select(vec![
        "bool",
        "int8",
        "uint16",
        "int",
        "float64",
        "complex64",
        "string",
        "error",
        "time.Time",
        "sync.Mutex",
    ])
    .prop_map(str::to_string);

    leaf.prop_recursive(4, 16, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|t| format!("*{t}")),
            inner.clone().prop_map(|t| format!("[]{t}")),
            (0u64..5, inner.clone()).prop_map(|(n, t)| format!("[{n}]{t}")),
            (inner.clone(), inner).prop_map(|(k, v)| format!("map[{k}]{v}")),
        ]
    })
}

fn resolve(
    registry: &TypeRegistry,
    text: &str,
) -> Result<TypeDescriptor, ResolveError> {
    let mut symbols = StringInterner::new();
    let ty = Parser::new(text, &mut symbols)
        .parse_type_expression()
        .unwrap();
    Resolver::new(registry, &symbols, text).resolve(&ty)
}

proptest! {
    #[test]
    fn offsets_are_aligned_and_ordered(fields in fields_strategy(), target in target_strategy()) {
        let result = layout(&fields, target).unwrap();

        let mut end = 0;
        for entry in &result.entries {
            prop_assert_eq!(entry.offset % entry.field.ty.align, 0);
            prop_assert!(entry.offset >= end);
            prop_assert_eq!(entry.offset, end + entry.padding_before);
            end = entry.offset + entry.field.ty.size;
        }

        prop_assert_eq!(result.total_size, end + result.trailing_padding);
    }

    #[test]
    fn total_size_is_a_multiple_of_alignment(fields in fields_strategy(), target in target_strategy()) {
        let result = layout(&fields, target).unwrap();

        prop_assert_eq!(result.total_size % result.align, 0);
        prop_assert!(result.trailing_padding < result.align);

        let max_align = fields.iter().map(|f| f.ty.align).max().unwrap_or(1);
        prop_assert_eq!(result.align, max_align);
    }

    #[test]
    fn reordering_keeps_field_descriptors(
        (fields, shuffled) in fields_strategy()
            .prop_flat_map(|fields| (Just(fields.clone()), Just(fields).prop_shuffle()))
    ) {
        let a = layout(&fields, Target::Amd64).unwrap();
        let b = layout(&shuffled, Target::Amd64).unwrap();

        prop_assert_eq!(a.align, b.align);

        for (entry, field) in b.entries.iter().zip(&shuffled) {
            prop_assert_eq!(&entry.field.ty, &field.ty);
        }

        let payload = |fields: &[FieldDescriptor]| fields.iter().map(|f| f.ty.size).sum::<u64>();
        let padding = |r: &structlayout::layout::LayoutResult| {
            r.entries.iter().map(|e| e.padding_before).sum::<u64>() + r.trailing_padding
        };

        prop_assert_eq!(a.total_size - padding(&a), payload(&fields));
        prop_assert_eq!(b.total_size - padding(&b), payload(&shuffled));
    }

    #[test]
    fn resolution_is_deterministic(text in type_expression_strategy(), target in target_strategy()) {
        let registry = TypeRegistry::with_builtin_types(target);

        let first = resolve(&registry, &text).unwrap();
        let second = resolve(&registry, &text).unwrap();

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first.name, &second.name);
        prop_assert_eq!(&first.name, &text);
        prop_assert!(first.align.is_power_of_two());
        prop_assert!(first.align <= target.max_align());
        prop_assert_eq!(first.size % first.align, 0);
    }

    #[test]
    fn unregistered_names_never_resolve(name in "Unknown[A-Z][a-z]{0,8}", wrap in 0usize..4) {
        let registry = TypeRegistry::with_builtin_types(Target::Amd64);
        let text = match wrap {
            0 => name.clone(),
            1 => format!("*{name}"),
            2 => format!("[4]{name}"),
            _ => format!("map[string][]{name}"),
        };

        prop_assert_eq!(
            resolve(&registry, &text),
            Err(ResolveError::UnresolvedIdentifier(name))
        );
    }
}
