//! Identifier / texture templates such as `"crab_{timestamp}"`.
//!
//! Templates are parsed once when a rule compiles, so a typo in a
//! placeholder fails the room load instead of producing odd ids later.

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `{id}` – id of the body the rule acted on.
    Id,
    /// `{timestamp}` – room clock in whole milliseconds.
    Timestamp,
    /// `{tick}` – room tick counter.
    Tick,
    /// `{seq}` – per-room spawn counter.
    Seq,
}

/// Values substituted into a [`Template`].
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub id: &'a str,
    pub timestamp_ms: u64,
    pub tick: u64,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Template, ConfigError> {
        let bad = |reason: &str| ConfigError::BadTemplate {
            template: source.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            if rest[..open].contains('}') {
                return Err(bad("stray '}'"));
            }
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| bad("unclosed '{'"))?;
            let placeholder = match &after[..close] {
                "id" => Segment::Id,
                "timestamp" => Segment::Timestamp,
                "tick" => Segment::Tick,
                "seq" => Segment::Seq,
                other => return Err(bad(&format!("unknown placeholder '{{{}}}'", other))),
            };
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(placeholder);
            rest = &after[close + 1..];
        }
        if rest.contains('}') {
            return Err(bad("stray '}'"));
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Template {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when the template has no placeholders.
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    pub fn render(&self, ctx: &TemplateContext<'_>) -> String {
        let mut out = String::with_capacity(self.source.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Id => out.push_str(ctx.id),
                Segment::Timestamp => out.push_str(&ctx.timestamp_ms.to_string()),
                Segment::Tick => out.push_str(&ctx.tick.to_string()),
                Segment::Seq => out.push_str(&ctx.seq.to_string()),
            }
        }
        out
    }
}
