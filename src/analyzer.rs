use crate::ast::{Declaration, DeclarationKind};
use crate::error::AnalysisError;
use crate::layout::layout;
use crate::parser::Parser;
use crate::record::{self, fields_of};
use crate::registry::TypeRegistry;
use crate::report::{self, Report};
use crate::resolver::Resolver;
use crate::string_interner::StringInterner;
use crate::target::Target;
use crate::type_table::TypeTable;
use crate::types::TypeDescriptor;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Register the file's own top-level type declarations before analyzing.
    pub register_local_types: bool,
}

/// Shared state for analyzing records on one target. The registry is seeded
/// once and is only read by `analyze`; local types go into a per-run copy.
pub struct Context {
    pub symbols: StringInterner,
    pub registry: TypeRegistry,
}

impl Context {
    /// A context with the predeclared and built-in standard library types.
    pub fn new(target: Target) -> Self {
        Context {
            symbols: StringInterner::new(),
            registry: TypeRegistry::with_builtin_types(target),
        }
    }

    pub fn target(&self) -> Target {
        self.registry.target()
    }

    pub fn load_type_table(&mut self, table: &TypeTable) -> Result<(), AnalysisError> {
        table.apply(&mut self.registry)
    }

    pub fn analyze_file(
        &mut self,
        path: impl AsRef<Path>,
        record_name: &str,
        options: &Options,
    ) -> Result<Report, AnalysisError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.analyze(&source, record_name, options)
    }

    pub fn analyze(
        &mut self,
        source: &str,
        record_name: &str,
        options: &Options,
    ) -> Result<Report, AnalysisError> {
        let declarations = Parser::new(source, &mut self.symbols).parse_declarations()?;

        debug!(count = declarations.len(), "parsed type declarations");

        let local_registry;
        let registry = if options.register_local_types {
            let mut registry = self.registry.clone();
            register_local_types(&mut registry, &declarations, &self.symbols, source);
            local_registry = registry;
            &local_registry
        } else {
            &self.registry
        };

        let fields = record::locate(&declarations, record_name, &self.symbols)?;
        let resolver = Resolver::new(registry, &self.symbols, source);
        let record = record::resolve_record(record_name, &fields, &resolver, &self.symbols)?;

        let result = layout(&record.fields, registry.target())?;

        info!(
            record = record_name,
            target = %registry.target(),
            size = result.total_size,
            align = result.align,
            "analyzed record"
        );

        Ok(report::build(&record, &result, registry.target()))
    }
}

/// Registers every non-generic declaration under its bare name. Declarations
/// may refer to each other in any order, so this repeats until a pass
/// registers nothing new. Whatever is left over stays unknown.
fn register_local_types(
    registry: &mut TypeRegistry,
    declarations: &[Declaration],
    symbols: &StringInterner,
    source: &str,
) {
    let mut pending = declarations
        .iter()
        .filter(|decl| !decl.generic)
        .collect::<Vec<_>>();

    loop {
        let before = pending.len();

        pending.retain(|decl| match local_descriptor(registry, decl, symbols, source) {
            Some(descriptor) => {
                registry.register(symbols.get(&decl.name.sym), descriptor);
                false
            }
            None => true,
        });

        if pending.is_empty() || pending.len() == before {
            break;
        }
    }

    for decl in pending {
        debug!(name = symbols.get(&decl.name.sym), "local type left unregistered");
    }
}

fn local_descriptor(
    registry: &TypeRegistry,
    declaration: &Declaration,
    symbols: &StringInterner,
    source: &str,
) -> Option<TypeDescriptor> {
    let name = symbols.get(&declaration.name.sym);
    let resolver = Resolver::new(registry, symbols, source);

    match &declaration.kind {
        DeclarationKind::Record(_) => {
            let fields = fields_of(declaration)?;
            let record = record::resolve_record(name, &fields, &resolver, symbols).ok()?;
            let result = layout(&record.fields, registry.target()).ok()?;

            Some(TypeDescriptor::named_composite(
                name,
                result.total_size,
                result.align,
            ))
        }
        // An alias is the aliased type, a defined type only shares its layout.
        DeclarationKind::Other(ty) => {
            let descriptor = resolver.resolve(ty).ok()?;

            if declaration.alias {
                Some(descriptor)
            } else {
                Some(descriptor.renamed(name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const SOURCE: &str = r#"
package model

// Refers to types declared further down.
type Order struct {
    ID     OrderID
    Status Status
    Lines  []Line
    Total  Money
}

type Line struct {
    SKU   string
    Count uint16
    Price Money
}

type (
    OrderID uint64
    Status  uint8
    Money   = int64
)

type Node struct {
    Value int
    Next  *Node
}

type List struct {
    Head Node
}
"#;

    fn local() -> Options {
        Options {
            register_local_types: true,
        }
    }

    #[test]
    fn local_types_resolve_in_any_order() {
        let mut context = Context::new(Target::Amd64);
        let report = context.analyze(SOURCE, "Order", &local()).unwrap();

        let fields = report
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.offset, f.type_name.as_str()))
            .collect::<Vec<_>>();

        assert_eq!(
            fields,
            vec![
                ("ID", 0, "OrderID"),
                ("Status", 8, "Status"),
                ("Lines", 16, "[]Line"),
                ("Total", 40, "int64"),
            ]
        );
        assert_eq!(report.size, 48);
    }

    #[test]
    fn local_types_need_the_option() {
        let mut context = Context::new(Target::Amd64);
        let err = context
            .analyze(SOURCE, "Order", &Options::default())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TypeResolution);
        assert!(!context.registry.contains("OrderID"));
    }

    #[test]
    fn analysis_leaves_the_registry_alone() {
        let mut context = Context::new(Target::Amd64);
        let before = context.registry.len();

        context.analyze(SOURCE, "Line", &local()).unwrap();

        assert_eq!(context.registry.len(), before);
    }

    #[test]
    fn self_reference_stays_unresolved() {
        let mut context = Context::new(Target::Amd64);

        let err = context.analyze(SOURCE, "Node", &local()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeResolution);
        assert_eq!(
            err.to_string(),
            "field `Next` of `Node`: unresolved type `Node`"
        );

        let err = context.analyze(SOURCE, "List", &local()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeResolution);
    }

    #[test]
    fn missing_file() {
        let mut context = Context::new(Target::Amd64);
        let err = context
            .analyze_file("does/not/exist.go", "Order", &Options::default())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }

    #[test]
    fn unbalanced_source() {
        let mut context = Context::new(Target::Amd64);
        let err = context
            .analyze("package p\nfunc f() {\n", "T", &Options::default())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }
}
