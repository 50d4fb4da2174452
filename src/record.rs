use crate::ast::{Declaration, DeclarationKind, TypeExpr, TypeExprKind};
use crate::error::AnalysisError;
use crate::resolver::Resolver;
use crate::string_interner::{StringInterner, Symbol};
use crate::types::TypeDescriptor;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

#[derive(Clone, Debug, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeDescriptor,
    pub tag: Option<String>,
    pub embedded: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct RecordDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

/// A struct field before its type has been resolved.
#[derive(Clone, Copy, Debug)]
pub struct LocatedField<'d> {
    pub name: Symbol,
    pub ty: &'d TypeExpr,
    pub tag: Option<Symbol>,
    pub embedded: bool,
}

/// Finds the declaration called `name` and lists its fields in declaration
/// order. `type A = B` and `type A B` are followed to `B`, so they share its
/// fields when `B` is a struct declared in the same file.
pub fn locate<'d>(
    declarations: &'d [Declaration],
    name: &str,
    symbols: &StringInterner,
) -> Result<Vec<LocatedField<'d>>, AnalysisError> {
    let find = |sym: Symbol| declarations.iter().find(|decl| decl.name.sym == sym);

    let mut declaration = symbols
        .find_symbol(name)
        .and_then(find)
        .ok_or_else(|| AnalysisError::RecordNotFound(name.to_string()))?;

    let mut visited = HashSet::from([declaration.name.sym]);

    while let DeclarationKind::Other(TypeExpr {
        kind: TypeExprKind::Identifier(underlying),
        ..
    }) = &declaration.kind
    {
        let Some(next) = find(*underlying) else {
            break;
        };

        if !visited.insert(*underlying) {
            break;
        }

        declaration = next;
    }

    if declaration.generic {
        return Err(AnalysisError::GenericRecord(name.to_string()));
    }

    fields_of(declaration).ok_or_else(|| AnalysisError::NotARecord(name.to_string()))
}

/// One entry per field name, so `A, B int` yields two fields sharing a type
/// expression. `None` if the declaration is not a struct.
pub fn fields_of(declaration: &Declaration) -> Option<Vec<LocatedField<'_>>> {
    let DeclarationKind::Record(fields) = &declaration.kind else {
        return None;
    };

    let located = fields
        .iter()
        .flat_map(|field| {
            field.names.iter().map(move |name| LocatedField {
                name: name.sym,
                ty: &field.ty,
                tag: field.tag,
                embedded: field.embedded,
            })
        })
        .collect();

    Some(located)
}

/// Resolves the type of every field. The first field that fails to resolve
/// fails the whole record.
pub fn resolve_record(
    record_name: &str,
    fields: &[LocatedField<'_>],
    resolver: &Resolver<'_>,
    symbols: &StringInterner,
) -> Result<RecordDescriptor, AnalysisError> {
    let fields = fields
        .iter()
        .map(|field| -> Result<FieldDescriptor, AnalysisError> {
            let name = symbols.get(&field.name).to_string();

            let ty = resolver
                .resolve(field.ty)
                .map_err(|source| AnalysisError::FieldResolution {
                    record: record_name.to_string(),
                    field: name.clone(),
                    source,
                })?;

            debug!(record = record_name, field = %name, ty = %ty.name, size = ty.size, align = ty.align, "resolved field");

            Ok(FieldDescriptor {
                name,
                ty,
                tag: field.tag.map(|tag| symbols.get(&tag).to_string()),
                embedded: field.embedded,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RecordDescriptor {
        name: record_name.to_string(),
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::parser::Parser;
    use crate::registry::TypeRegistry;
    use crate::target::Target;

    const SOURCE: &str = r#"
package shapes

type Point struct {
    X, Y int32 `json:"coord"`
    Label string
}

type Line struct {
    A, B Missing
}

type ID uint64

type Box[T any] struct {
    Value T
}

type Vertex = Point
type Anchor Vertex
type Handle ID
type Ping Pong
type Pong Ping
"#;

    fn parse(symbols: &mut StringInterner) -> Vec<Declaration> {
        Parser::new(SOURCE, symbols).parse_declarations().unwrap()
    }

    #[test]
    fn shared_type_expressions_expand_per_name() {
        let mut symbols = StringInterner::new();
        let declarations = parse(&mut symbols);

        let fields = locate(&declarations, "Point", &symbols).unwrap();
        let names = fields
            .iter()
            .map(|f| symbols.get(&f.name))
            .collect::<Vec<_>>();

        assert_eq!(names, vec!["X", "Y", "Label"]);
        assert!(std::ptr::eq(fields[0].ty, fields[1].ty));
        assert_eq!(fields[0].tag, fields[1].tag);

        let registry = TypeRegistry::new(Target::Amd64);
        let resolver = Resolver::new(&registry, &symbols, SOURCE);
        let record = resolve_record("Point", &fields, &resolver, &symbols).unwrap();

        assert_eq!(record.fields[0].ty, record.fields[1].ty);
        assert_eq!(record.fields[1].tag.as_deref(), Some("json:\"coord\""));
        assert_eq!(record.fields[2].tag, None);
    }

    #[test]
    fn failure_kinds() {
        let mut symbols = StringInterner::new();
        let declarations = parse(&mut symbols);

        let kind = |name: &str| locate(&declarations, name, &symbols).unwrap_err().kind();

        assert_eq!(kind("Circle"), ErrorKind::RecordNotFound);
        assert_eq!(kind("point"), ErrorKind::RecordNotFound);
        assert_eq!(kind("ID"), ErrorKind::NotARecord);
        assert_eq!(kind("Box"), ErrorKind::UnsupportedRecord);
        assert_eq!(kind("Handle"), ErrorKind::NotARecord);
        assert_eq!(kind("Ping"), ErrorKind::NotARecord);
    }

    #[test]
    fn aliases_and_defined_types_share_struct_fields() {
        let mut symbols = StringInterner::new();
        let declarations = parse(&mut symbols);

        let point = locate(&declarations, "Point", &symbols).unwrap();

        for name in ["Vertex", "Anchor"] {
            let fields = locate(&declarations, name, &symbols).unwrap();

            assert_eq!(fields.len(), point.len());
            for (a, b) in fields.iter().zip(&point) {
                assert_eq!(a.name, b.name);
                assert!(std::ptr::eq(a.ty, b.ty));
            }
        }
    }

    #[test]
    fn unresolved_field_fails_the_record() {
        let mut symbols = StringInterner::new();
        let declarations = parse(&mut symbols);

        let registry = TypeRegistry::new(Target::Amd64);
        let resolver = Resolver::new(&registry, &symbols, SOURCE);

        let fields = locate(&declarations, "Line", &symbols).unwrap();
        let err = resolve_record("Line", &fields, &resolver, &symbols).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TypeResolution);
        assert_eq!(
            err.to_string(),
            "field `A` of `Line`: unresolved type `Missing`"
        );
    }
}
