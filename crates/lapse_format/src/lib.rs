//! Duration render templates.
//!
//! A template is literal text interspersed with `{FIELD}` or
//! `{FIELD:SPEC}` placeholders, where the field is one of `D`, `H`, `M`,
//! `S`, `MS` and the spec is a numeric width with an optional zero-fill
//! flag. Rendering decomposes a [`std::time::Duration`] into exactly the
//! fields the template mentions.

pub mod template;

pub use template::{
    DEFAULT_TEMPLATE, Field, FormatError, PadSpec, Segment, Template, format_duration,
    format_duration_default,
};
