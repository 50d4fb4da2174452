use serde::Serialize;

/// Memory shape of a type on one target.
///
/// Composite descriptors own their element, key and value descriptors, so a
/// descriptor is always a tree. `name` is only used for display and does not
/// take part in equality.
#[derive(Clone, Debug, Serialize)]
pub struct TypeDescriptor {
    pub name: String,
    pub size: u64,
    pub align: u64,
    pub kind: TypeKind,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TypeKind {
    Primitive,
    Pointer(Box<TypeDescriptor>),
    FixedArray {
        element: Box<TypeDescriptor>,
        length: u64,
    },
    DynamicSequence(Box<TypeDescriptor>),
    AssociativeContainer {
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    NamedComposite,
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &TypeDescriptor) -> bool {
        self.size == other.size && self.align == other.align && self.kind == other.kind
    }
}

impl TypeDescriptor {
    pub fn primitive(name: impl Into<String>, size: u64, align: u64) -> TypeDescriptor {
        TypeDescriptor {
            name: name.into(),
            size,
            align,
            kind: TypeKind::Primitive,
        }
    }

    pub fn named_composite(name: impl Into<String>, size: u64, align: u64) -> TypeDescriptor {
        TypeDescriptor {
            name: name.into(),
            size,
            align,
            kind: TypeKind::NamedComposite,
        }
    }

    /// The same shape under another display name, e.g. for `type ID uint64`.
    pub fn renamed(&self, name: impl Into<String>) -> TypeDescriptor {
        TypeDescriptor {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn element(&self) -> Option<&TypeDescriptor> {
        match &self.kind {
            TypeKind::Pointer(element)
            | TypeKind::DynamicSequence(element)
            | TypeKind::FixedArray { element, .. } => Some(element.as_ref()),
            _ => None,
        }
    }
}
