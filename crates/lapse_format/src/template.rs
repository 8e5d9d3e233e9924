use core::fmt;
use std::time::Duration;

use once_cell::sync::Lazy;
use thiserror::Error;

/// Template used when a caller supplies none: milliseconds only,
/// right-aligned to width 4.
pub const DEFAULT_TEMPLATE: &str = "{MS:4}ms";

static DEFAULT: Lazy<Template> =
    Lazy::new(|| Template::parse(DEFAULT_TEMPLATE).expect("default template parses"));

/// Errors produced while parsing a render template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("unterminated placeholder starting at byte {0}")]
    UnterminatedPlaceholder(usize),
    #[error("unmatched '}}' at byte {0}")]
    UnmatchedBrace(usize),
    #[error("invalid width spec {spec:?} for field {field}")]
    InvalidSpec { field: Field, spec: String },
}

/// A duration component addressable from a template.
///
/// Listed in decomposition order: higher units are carved off the total
/// first, so any unit missing from a template folds into the next lower
/// one that is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Days,
    Hours,
    Minutes,
    Seconds,
    Millis,
}

impl Field {
    pub const IN_ORDER: [Field; 5] = [
        Field::Days,
        Field::Hours,
        Field::Minutes,
        Field::Seconds,
        Field::Millis,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Field::Days => "D",
            Field::Hours => "H",
            Field::Minutes => "M",
            Field::Seconds => "S",
            Field::Millis => "MS",
        }
    }

    pub fn unit_ms(self) -> u128 {
        match self {
            Field::Days => 86_400_000,
            Field::Hours => 3_600_000,
            Field::Minutes => 60_000,
            Field::Seconds => 1_000,
            Field::Millis => 1,
        }
    }

    fn from_token(token: &str) -> Option<Field> {
        Field::IN_ORDER.into_iter().find(|f| f.token() == token)
    }

    fn index(self) -> usize {
        match self {
            Field::Days => 0,
            Field::Hours => 1,
            Field::Minutes => 2,
            Field::Seconds => 3,
            Field::Millis => 4,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Width and fill for one placeholder, parsed from the `SPEC` part of
/// `{FIELD:SPEC}`. A leading `0` zero-fills, otherwise values are
/// right-aligned with spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PadSpec {
    pub zero_fill: bool,
    pub width: usize,
}

impl PadSpec {
    fn parse(spec: &str) -> Option<PadSpec> {
        let (zero_fill, digits) = match spec.strip_prefix('0') {
            Some(rest) if !rest.is_empty() => (true, rest),
            _ => (false, spec),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let width = digits.parse().ok()?;
        Some(PadSpec { zero_fill, width })
    }

    fn apply(self, value: u128) -> String {
        if self.width == 0 {
            value.to_string()
        } else if self.zero_fill {
            format!("{value:0width$}", width = self.width)
        } else {
            format!("{value:width$}", width = self.width)
        }
    }
}

/// One parsed piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder { field: Field, pad: PadSpec },
}

/// A parsed render template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parses `input` into literal and placeholder segments.
    ///
    /// `{{` and `}}` escape literal braces. A placeholder whose field
    /// token is not recognized is kept as literal text, so templates can
    /// carry tokens this crate does not understand yet.
    pub fn parse(input: &str) -> Result<Template, FormatError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = input.char_indices().peekable();

        while let Some((at, ch)) = chars.next() {
            match ch {
                '{' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        literal.push('{');
                        continue;
                    }
                    let mut body = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        body.push(c);
                    }
                    if !closed || body.contains('{') {
                        return Err(FormatError::UnterminatedPlaceholder(at));
                    }
                    let (token, spec) = match body.split_once(':') {
                        Some((token, spec)) => (token, Some(spec)),
                        None => (body.as_str(), None),
                    };
                    match Field::from_token(token) {
                        Some(field) => {
                            let pad = match spec {
                                Some(spec) => PadSpec::parse(spec).ok_or_else(|| {
                                    FormatError::InvalidSpec {
                                        field,
                                        spec: spec.to_string(),
                                    }
                                })?,
                                None => PadSpec::default(),
                            };
                            if !literal.is_empty() {
                                segments.push(Segment::Literal(std::mem::take(&mut literal)));
                            }
                            segments.push(Segment::Placeholder { field, pad });
                        }
                        None => {
                            literal.push('{');
                            literal.push_str(&body);
                            literal.push('}');
                        }
                    }
                }
                '}' => {
                    if matches!(chars.peek(), Some((_, '}'))) {
                        chars.next();
                        literal.push('}');
                    } else {
                        return Err(FormatError::UnmatchedBrace(at));
                    }
                }
                _ => literal.push(ch),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Template { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Renders `elapsed` through this template.
    ///
    /// The duration is truncated to whole milliseconds, then decomposed
    /// in fixed order (days down to milliseconds) across the fields the
    /// template references. A field the template omits contributes its
    /// magnitude to the next lower referenced field instead.
    pub fn render(&self, elapsed: Duration) -> String {
        let mut remainder = elapsed.as_millis();
        let mut values = [None; 5];

        for field in Field::IN_ORDER {
            if self.references(field) {
                values[field.index()] = Some(remainder / field.unit_ms());
                remainder %= field.unit_ms();
            }
        }

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder { field, pad } => {
                    let value = values[field.index()].unwrap_or(0);
                    out.push_str(&pad.apply(value));
                }
            }
        }
        out
    }

    fn references(&self, field: Field) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::Placeholder { field: f, .. } if *f == field))
    }
}

/// Parses `template` and renders `elapsed` through it in one step.
pub fn format_duration(elapsed: Duration, template: &str) -> Result<String, FormatError> {
    Ok(Template::parse(template)?.render(elapsed))
}

/// Renders `elapsed` through [`DEFAULT_TEMPLATE`].
pub fn format_duration_default(elapsed: Duration) -> String {
    DEFAULT.render(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(total: u64) -> Duration {
        Duration::from_millis(total)
    }

    #[test]
    fn default_template_pads_millis_to_width_4() {
        assert_eq!(format_duration_default(ms(42)), "  42ms");
        assert_eq!(format_duration_default(ms(7)), "   7ms");
        assert_eq!(format_duration_default(ms(12345)), "12345ms");
    }

    #[test]
    fn decomposes_across_referenced_fields() {
        let rendered = format_duration(ms(3_661_000), "{H}{M:02}{S:02}").unwrap();
        assert_eq!(rendered, "10101");
    }

    #[test]
    fn full_field_set_round_trips() {
        // 2d 3h 4m 5s 678ms
        let total = 2 * 86_400_000 + 3 * 3_600_000 + 4 * 60_000 + 5 * 1_000 + 678;
        let rendered =
            format_duration(ms(total), "{D}d {H}h {M:02}m {S:02}s {MS:03}ms").unwrap();
        assert_eq!(rendered, "2d 3h 04m 05s 678ms");
    }

    #[test]
    fn omitted_field_folds_into_lower_one() {
        // With hours omitted, 1h30m renders as 90 minutes.
        let rendered = format_duration(ms(5_400_000), "{M}m").unwrap();
        assert_eq!(rendered, "90m");

        // With everything above millis omitted, the total lands there.
        let rendered = format_duration(ms(1_500), "{MS}").unwrap();
        assert_eq!(rendered, "1500");
    }

    #[test]
    fn sub_millisecond_remainder_truncates() {
        let elapsed = Duration::from_micros(42_900);
        assert_eq!(format_duration_default(elapsed), "  42ms");
    }

    #[test]
    fn repeated_placeholders_render_the_same_value() {
        let rendered = format_duration(ms(61_000), "{S} and again {S}").unwrap();
        assert_eq!(rendered, "61 and again 61");
    }

    #[test]
    fn seconds_and_millis_split() {
        assert_eq!(format_duration(ms(1_500), "{S}.{MS:03}s").unwrap(), "1.500s");
    }

    #[test]
    fn no_recognized_field_leaves_literal_text_unchanged() {
        assert_eq!(format_duration(ms(9_000), "elapsed").unwrap(), "elapsed");
        assert_eq!(format_duration(ms(9_000), "{X} {y:02}").unwrap(), "{X} {y:02}");
    }

    #[test]
    fn brace_escapes() {
        assert_eq!(format_duration(ms(2_000), "{{{S}}}").unwrap(), "{2}");
    }

    #[test]
    fn malformed_templates_error() {
        assert_eq!(
            Template::parse("{S").unwrap_err(),
            FormatError::UnterminatedPlaceholder(0)
        );
        assert_eq!(Template::parse("ms}").unwrap_err(), FormatError::UnmatchedBrace(2));
        assert!(matches!(
            Template::parse("{S:xx}").unwrap_err(),
            FormatError::InvalidSpec { field: Field::Seconds, .. }
        ));
        assert!(Template::parse("{S{MS}").is_err());
    }

    #[test]
    fn zero_width_spec_is_rejected_only_when_not_numeric() {
        // "0" alone is a plain width of zero, not a fill flag.
        assert_eq!(format_duration(ms(8), "{MS:0}").unwrap(), "8");
    }
}
