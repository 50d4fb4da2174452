use crate::record::FieldDescriptor;
use crate::target::Target;
use serde::Serialize;
use thiserror::Error;
use tracing::trace;

#[derive(Clone, Debug, Serialize)]
pub struct LayoutEntry {
    pub field: FieldDescriptor,
    pub offset: u64,
    pub padding_before: u64,
}

/// Placement of every field of a record. `total_size` already includes
/// `trailing_padding`.
#[derive(Clone, Debug, Serialize)]
pub struct LayoutResult {
    pub total_size: u64,
    pub align: u64,
    pub trailing_padding: u64,
    pub entries: Vec<LayoutEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("layout reaches past the maximum object size of {limit} bytes at field `{field}`")]
pub struct LayoutError {
    pub field: String,
    pub limit: u64,
}

/// Bytes needed to move `cursor` up to the next multiple of `align`.
pub fn padding_for(cursor: u64, align: u64) -> u64 {
    debug_assert!(align.is_power_of_two());
    cursor.wrapping_neg() & (align - 1)
}

/// Lays the fields out in declaration order, each at the first offset that
/// satisfies its alignment. The record is aligned to its most aligned field.
pub fn layout(fields: &[FieldDescriptor], target: Target) -> Result<LayoutResult, LayoutError> {
    let limit = target.max_object_size();

    let mut cursor = 0u64;
    let mut max_align = 1u64;
    let mut entries = Vec::with_capacity(fields.len());

    for field in fields {
        let padding = padding_for(cursor, field.ty.align);
        let offset = cursor + padding;

        cursor = offset
            .checked_add(field.ty.size)
            .filter(|end| *end <= limit)
            .ok_or_else(|| LayoutError {
                field: field.name.clone(),
                limit,
            })?;

        max_align = max_align.max(field.ty.align);

        trace!(field = %field.name, offset, padding, size = field.ty.size, "placed field");

        entries.push(LayoutEntry {
            field: field.clone(),
            offset,
            padding_before: padding,
        });
    }

    let trailing_padding = padding_for(cursor, max_align);
    let total_size = cursor + trailing_padding;

    if total_size > limit {
        return Err(LayoutError {
            field: fields.last().map(|f| f.name.clone()).unwrap_or_default(),
            limit,
        });
    }

    Ok(LayoutResult {
        total_size,
        align: max_align,
        trailing_padding,
        entries,
    })
}
