// Dashboard layout configuration

use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use crate::template::{QueryTemplate, TemplateError};

/// Marker prefixing a query that should be loaded from a template file
/// relative to the config file's directory.
pub const QUERY_FILE_MARKER: char = '@';

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("failed to read query template {path}: {source}")]
    TemplateRead {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to compile query template {path}: {source}")]
    TemplateCompile {
        path: String,
        source: TemplateError,
    },
}

/// Identity of one widget. Titles may repeat across a layout; this key
/// never does, and it is what datasets and chart state are tracked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetId(Uuid);

impl WidgetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WidgetId {
    fn default() -> Self {
        Self::new()
    }
}

/// Named terminal colors accepted in the layout document. Unknown names
/// fall back to green rather than failing the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum WidgetColor {
    Black,
    Red,
    #[default]
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl From<String> for WidgetColor {
    fn from(s: String) -> Self {
        match s.as_str() {
            "black" => Self::Black,
            "red" => Self::Red,
            "green" => Self::Green,
            "yellow" => Self::Yellow,
            "blue" => Self::Blue,
            "magenta" => Self::Magenta,
            "cyan" => Self::Cyan,
            "white" => Self::White,
            _ => Self::Green,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rows: Vec<RowConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RowConfig {
    #[serde(default)]
    pub widgets: Vec<Widget>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Widget {
    #[serde(skip)]
    pub id: WidgetId,

    pub title: String,

    /// Literal query text, or a template file path when prefixed with
    /// [`QUERY_FILE_MARKER`].
    pub query: String,

    /// Result column the values are read from.
    pub column: String,

    pub color: WidgetColor,

    /// Rows of sparkline per series. Normalized to at least 1 at load.
    pub height: i64,

    /// Layout weight on a 12-column grid.
    pub span: u16,

    /// Expected maximum number of concurrent series; sizes the visual
    /// area only, it does not cap the data.
    pub limit: u16,

    /// Compiled query template. Present iff `query` used the file marker.
    #[serde(skip)]
    pub template: Option<QueryTemplate>,
}

impl Default for Widget {
    fn default() -> Self {
        Self {
            id: WidgetId::new(),
            title: String::new(),
            query: String::new(),
            column: default_column(),
            color: WidgetColor::default(),
            height: 1,
            span: 12,
            limit: 1,
            template: None,
        }
    }
}

fn default_column() -> String {
    "_value".to_string()
}

impl Widget {
    fn normalize(&mut self) {
        self.height = self.height.max(1);
        self.span = self.span.clamp(1, 12);
        self.limit = self.limit.max(1);
        if self.column.is_empty() {
            self.column = default_column();
        }
    }

    /// Terminal rows the widget's box occupies: one title row plus
    /// `height` data rows per expected series, plus the border.
    pub fn box_height(&self) -> u16 {
        let height = self.height.min(u16::MAX as i64) as u16;
        self.limit
            .saturating_mul(height.saturating_add(1))
            .saturating_add(2)
    }
}

impl Config {
    /// Load a layout document, normalize every widget, and compile any
    /// file-referenced query templates. Template paths are resolved
    /// relative to the config file's own directory.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let mut config: Config =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));

        for row in &mut config.rows {
            for widget in &mut row.widgets {
                widget.normalize();

                if let Some(rest) = widget.query.strip_prefix(QUERY_FILE_MARKER) {
                    let template_path = base.join(rest);
                    let text = fs::read_to_string(&template_path).map_err(|source| {
                        ConfigError::TemplateRead {
                            path: template_path.display().to_string(),
                            source,
                        }
                    })?;

                    let template = QueryTemplate::compile(&text).map_err(|source| {
                        ConfigError::TemplateCompile {
                            path: template_path.display().to_string(),
                            source,
                        }
                    })?;
                    widget.template = Some(template);
                }
            }
        }

        Ok(config)
    }

    /// All widgets across all rows, in layout order.
    pub fn widgets(&self) -> impl Iterator<Item = &Widget> {
        self.rows.iter().flat_map(|row| row.widgets.iter())
    }
}
