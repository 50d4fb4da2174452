use crate::layout::LayoutResult;
use crate::record::RecordDescriptor;
use crate::target::Target;
use ron::ser::PrettyConfig;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldReport {
    pub name: String,
    pub offset: u64,
    pub size: u64,
    pub align: u64,
    pub type_name: String,
    pub padding_before: u64,
    pub tag: Option<String>,
    pub embedded: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub record: String,
    pub target: Target,
    pub size: u64,
    pub align: u64,
    pub trailing_padding: u64,
    pub fields: Vec<FieldReport>,
}

/// Copies the numbers of a finished layout into a report, field by field.
pub fn build(record: &RecordDescriptor, layout: &LayoutResult, target: Target) -> Report {
    let fields = layout
        .entries
        .iter()
        .map(|entry| FieldReport {
            name: entry.field.name.clone(),
            offset: entry.offset,
            size: entry.field.ty.size,
            align: entry.field.ty.align,
            type_name: entry.field.ty.name.clone(),
            padding_before: entry.padding_before,
            tag: entry.field.tag.clone(),
            embedded: entry.field.embedded,
        })
        .collect();

    Report {
        record: record.name.clone(),
        target,
        size: layout.total_size,
        align: layout.align,
        trailing_padding: layout.trailing_padding,
        fields,
    }
}

impl Report {
    /// Sum of all padding, between fields and after the last one.
    pub fn padding(&self) -> u64 {
        self.fields.iter().map(|f| f.padding_before).sum::<u64>() + self.trailing_padding
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, PrettyConfig::default())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Unsafe size of struct: {} bytes", self.size)?;
        writeln!(f, "Analyzing struct: {} ({})", self.record, self.target)?;

        for field in &self.fields {
            if field.padding_before > 0 {
                writeln!(f, "  Padding: {} bytes", field.padding_before)?;
            }

            write!(
                f,
                "  Field: {:<10} Offset: {:<3} Size: {:<2} Align: {:<2} Type: {}",
                field.name, field.offset, field.size, field.align, field.type_name
            )?;

            if field.embedded {
                write!(f, " (embedded)")?;
            }

            if let Some(tag) = &field.tag {
                write!(f, " Tag: `{tag}`")?;
            }

            writeln!(f)?;
        }

        if self.trailing_padding > 0 {
            writeln!(f, "  Trailing padding: {} bytes", self.trailing_padding)?;
        }

        writeln!(
            f,
            "Total struct size: {} bytes (align {}, padding {})",
            self.size,
            self.align,
            self.padding()
        )
    }
}
