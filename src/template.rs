// Query template compilation and rendering

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unclosed template parameter starting at byte {offset}")]
    Unclosed { offset: usize },

    #[error("unknown template parameter {{{{{name}}}}}")]
    UnknownParameter { name: String },
}

/// Parameter record a template is rendered with: a relative time range
/// and an aggregation window width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateParams {
    pub range_start: String,
    pub range_stop: String,
    pub window_every: String,
}

impl TemplateParams {
    /// The fixed record every poll cycle renders with. The range is
    /// expressed as relative offsets, so the window slides because the
    /// query re-runs each tick, not because the substituted text changes.
    pub fn sliding_window() -> Self {
        Self {
            range_start: "-40s".to_string(),
            range_stop: "-10s".to_string(),
            window_every: "1s".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Parameter(String),
}

/// A compiled query template. Placeholders are written `{{range_start}}`,
/// `{{range_stop}}`, `{{window_every}}`; single braces are left alone so
/// the query language's own record syntax passes through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    segments: Vec<Segment>,
}

impl QueryTemplate {
    /// Parse template text into literal and parameter segments. Only
    /// syntax is checked here; unknown parameter names surface at render.
    pub fn compile(text: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = text;
        let mut offset = 0;

        while let Some(open) = rest.find("{{") {
            literal.push_str(&rest[..open]);
            let after_open = &rest[open + 2..];
            let close = after_open
                .find("}}")
                .ok_or(TemplateError::Unclosed {
                    offset: offset + open,
                })?;

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Parameter(after_open[..close].trim().to_string()));

            offset += open + 2 + close + 2;
            rest = &after_open[close + 2..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Substitute the parameter record into the template. Pure: the same
    /// template and record always produce the same text.
    pub fn render(&self, params: &TemplateParams) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Parameter(name) => match name.as_str() {
                    "range_start" => out.push_str(&params.range_start),
                    "range_stop" => out.push_str(&params.range_stop),
                    "window_every" => out.push_str(&params.window_every),
                    _ => {
                        return Err(TemplateError::UnknownParameter { name: name.clone() });
                    }
                },
            }
        }
        Ok(out)
    }
}
