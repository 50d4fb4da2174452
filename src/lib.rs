pub mod ast;
pub mod parser;
pub mod tokenizer;

pub mod analyzer;

pub mod error;

pub mod source_location;
pub mod string_interner;

pub mod array_length;
pub mod layout;
pub mod record;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod target;
pub mod type_table;
pub mod types;
