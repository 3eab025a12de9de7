use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use super::{Map, Value};

/// One step of a [`Path`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A nested lookup path into a state or maps container.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<PathSegment>);

/// Converts a textual path into segments.
pub type PathParser = Arc<dyn Fn(&str) -> Path + Send + Sync>;

fn parser_slot() -> &'static RwLock<Option<PathParser>> {
    static PARSER: OnceLock<RwLock<Option<PathParser>>> = OnceLock::new();
    PARSER.get_or_init(|| RwLock::new(None))
}

/// Install a custom parser used by [`Path::parse`] for the whole process.
pub fn set_path_parser<F>(parser: F)
where
    F: Fn(&str) -> Path + Send + Sync + 'static,
{
    *parser_slot().write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(parser));
}

/// Restore the built-in dotted parser.
pub fn reset_path_parser() {
    *parser_slot().write().unwrap_or_else(PoisonError::into_inner) = None;
}

impl Path {
    /// Build a path from already-split segments.
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Parse a textual path with the currently installed parser.
    ///
    /// The default accepts `profile.name` and `items[0].title` forms.
    pub fn parse(text: &str) -> Self {
        let custom = parser_slot()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match custom {
            Some(parser) => parser(text),
            None => Self::parse_dotted(text),
        }
    }

    /// The built-in parser, available to custom parsers that only want to
    /// pre-process their input.
    pub fn parse_dotted(text: &str) -> Self {
        let mut segments = Vec::new();
        for part in text.split('.').filter(|p| !p.is_empty()) {
            let (key, mut rest) = match part.find('[') {
                Some(at) => part.split_at(at),
                None => (part, ""),
            };
            if !key.is_empty() {
                segments.push(PathSegment::Key(key.to_string()));
            }
            while let Some(inner) = rest.strip_prefix('[') {
                let Some(end) = inner.find(']') else {
                    segments.push(PathSegment::Key(rest.to_string()));
                    break;
                };
                let token = &inner[..end];
                segments.push(match token.parse::<usize>() {
                    Ok(index) => PathSegment::Index(index),
                    Err(_) => PathSegment::Key(token.to_string()),
                });
                rest = &inner[end + 1..];
            }
        }
        Self(segments)
    }

    /// The segments in lookup order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl From<&str> for Path {
    fn from(text: &str) -> Self {
        Path::parse(text)
    }
}

impl From<String> for Path {
    fn from(text: String) -> Self {
        Path::parse(&text)
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(keys: [&str; N]) -> Self {
        Self(keys.iter().map(|k| PathSegment::Key(k.to_string())).collect())
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

/// Walk `path` into `container`.
///
/// Missing keys, out-of-range indices and scalar intermediates all resolve
/// to [`Value::Null`]. So does an empty path.
pub fn get_value_from_state(container: &Map, path: &Path) -> Value {
    let mut segments = path.segments().iter();
    let mut current = match segments.next() {
        Some(PathSegment::Key(key)) => container.get(key).cloned().unwrap_or_default(),
        Some(PathSegment::Index(_)) => return Value::Null,
        None => return Value::Null,
    };
    for segment in segments {
        if current.is_null() {
            break;
        }
        current = current.get(segment);
    }
    current
}
