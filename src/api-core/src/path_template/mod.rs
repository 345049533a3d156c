// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Resource path templates.
//!
//! Google Cloud resources are identified by names such as
//! `projects/my-project/locations/us-central1/instances/my-instance`. A path
//! template describes the shape of such names, for example
//! `projects/{project}/locations/{location}/instances/{instance}`.
//!
//! Templates support:
//! - literal components, such as `projects`,
//! - `*`, matching exactly one component,
//! - `**`, matching one or more components (at most one per template),
//! - named variables, `{name}` or `{name=pattern}`,
//! - a custom verb suffix, such as `:cancel`.
//!
//! # Example
//! ```
//! # use google_cloud_api_core::path_template::{PathTemplate, Bindings};
//! let template = PathTemplate::new("projects/{project}/topics/{topic}")?;
//! let bindings = Bindings::from([
//!     ("project".to_string(), "my-project".to_string()),
//!     ("topic".to_string(), "my-topic".to_string()),
//! ]);
//! let name = template.render(&bindings)?;
//! assert_eq!(name, "projects/my-project/topics/my-topic");
//! assert_eq!(template.matches(&name)?, bindings);
//! # Ok::<(), google_cloud_api_core::path_template::Error>(())
//! ```

mod parser;
mod resource_names;
mod segment;

pub use resource_names::ResourceNames;
pub use segment::{Segment, SegmentKind};

use std::collections::BTreeMap;

/// Variable values, keyed by variable name.
///
/// Unnamed wildcards use positional names: `$0`, `$1`, ...
pub type Bindings = BTreeMap<String, String>;

/// Errors parsing, rendering, or matching path templates.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The template text is malformed.
    #[error(
        "cannot parse path template `{template}`: {message} at line {line}, column {column}, near `{near}`"
    )]
    Parse {
        template: String,
        message: String,
        line: usize,
        column: usize,
        near: String,
    },
    #[error("path template `{0}` cannot contain more than one path wildcard")]
    MultiplePathWildcards(String),
    #[error("value for key `{0}` not provided")]
    MissingBinding(String),
    #[error("path component `{found}` does not match `{expected}`")]
    LiteralMismatch { expected: String, found: String },
    /// The path has too few or too many components for the template.
    #[error("path `{path}` does not match template `{template}`")]
    IncompleteMatch { path: String, template: String },
    #[error("`{name}` does not match any of the templates [{}]", .templates.join(", "))]
    NoMatchingTemplate { name: String, templates: Vec<String> },
    #[error("no template named `{0}`")]
    UnknownTemplate(String),
}

impl From<Error> for crate::error::Error {
    fn from(value: Error) -> Self {
        Self::binding(value)
    }
}

/// A parsed path template.
///
/// Templates are immutable once parsed, and safe to share across threads.
#[derive(Clone, Debug, PartialEq)]
pub struct PathTemplate {
    segments: Vec<Segment>,
    segment_count: usize,
}

impl PathTemplate {
    /// Parses a template.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_api_core::path_template::PathTemplate;
    /// let template = PathTemplate::new("shelves/*/books/{book}")?;
    /// assert_eq!(template.segment_count(), 4);
    /// assert!(PathTemplate::new("a/**/b/**").is_err());
    /// # Ok::<(), google_cloud_api_core::path_template::Error>(())
    /// ```
    pub fn new(template: &str) -> Result<Self, Error> {
        let segments = parser::parse(template)?;
        let segment_count = segments
            .iter()
            .filter(|s| s.kind() == SegmentKind::Terminal)
            .count();
        Ok(Self {
            segments,
            segment_count,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The number of terminal segments.
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// The variable names, in template order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .filter(|s| s.kind() == SegmentKind::Binding)
            .map(|s| s.literal())
    }

    /// Renders the template using `bindings`.
    ///
    /// Each value is parsed as a template of its own, so values may span
    /// several components when the variable pattern allows it. The result is
    /// matched against this template before it is returned.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_api_core::path_template::{PathTemplate, Bindings};
    /// let template = PathTemplate::new("v1/{name=projects/*/locations/*}:cancel")?;
    /// let bindings = Bindings::from([(
    ///     "name".to_string(),
    ///     "projects/p/locations/l".to_string(),
    /// )]);
    /// assert_eq!(template.render(&bindings)?, "v1/projects/p/locations/l:cancel");
    /// # Ok::<(), google_cloud_api_core::path_template::Error>(())
    /// ```
    pub fn render(&self, bindings: &Bindings) -> Result<String, Error> {
        let mut components: Vec<String> = Vec::new();
        let mut inside_binding = false;
        for segment in &self.segments {
            match segment.kind() {
                SegmentKind::Binding => {
                    let name = segment.literal();
                    let value = bindings
                        .get(name)
                        .ok_or_else(|| Error::MissingBinding(name.to_string()))?;
                    let value = PathTemplate::new(value)?;
                    components.extend(
                        value
                            .segments
                            .into_iter()
                            .filter(|s| s.kind() == SegmentKind::Terminal)
                            .map(|s| s.literal().to_string()),
                    );
                    inside_binding = true;
                }
                SegmentKind::EndBinding => inside_binding = false,
                SegmentKind::Terminal if !inside_binding => {
                    components.push(segment.literal().to_string());
                }
                SegmentKind::Terminal => {
                    if let (Some(verb), Some(last)) = (segment.suffix(), components.last_mut()) {
                        last.push(':');
                        last.push_str(verb);
                    }
                }
            }
        }
        let path = components.join("/");
        self.matches(&path)?;
        Ok(path)
    }

    /// Matches `path` against the template, returning the variable values.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_api_core::path_template::PathTemplate;
    /// let template = PathTemplate::new("a/{x=**}/b")?;
    /// let bindings = template.matches("a/p/q/r/b")?;
    /// assert_eq!(bindings.get("x").map(String::as_str), Some("p/q/r"));
    /// assert!(template.matches("a/b").is_err());
    /// # Ok::<(), google_cloud_api_core::path_template::Error>(())
    /// ```
    pub fn matches(&self, path: &str) -> Result<Bindings, Error> {
        let components = path.split('/').collect::<Vec<_>>();
        let incomplete = || Error::IncompleteMatch {
            path: path.to_string(),
            template: self.to_string(),
        };

        let mut bindings = Bindings::new();
        let mut captured: Vec<&str> = Vec::new();
        let mut index = 0_usize;
        for segment in &self.segments {
            match segment.kind() {
                SegmentKind::Binding => captured.clear(),
                SegmentKind::EndBinding => {
                    bindings.insert(segment.literal().to_string(), captured.join("/"));
                }
                SegmentKind::Terminal => {
                    // All the other terminals consume exactly one component.
                    let count = if segment.is_path_wildcard() {
                        (components.len() + 1)
                            .checked_sub(self.segment_count)
                            .filter(|c| *c > 0)
                            .ok_or_else(incomplete)?
                    } else {
                        1
                    };
                    let span = components
                        .get(index..index + count)
                        .ok_or_else(incomplete)?;
                    index += count;
                    let (last, prefix) = span.split_last().ok_or_else(incomplete)?;
                    let last = strip_suffix(segment, last)?;
                    match segment.pattern() {
                        _ if segment.is_wildcard() || segment.is_path_wildcard() => {
                            let empty = prefix.iter().chain([&last]).find(|c| c.is_empty());
                            if let Some(empty) = empty {
                                return Err(Error::LiteralMismatch {
                                    expected: segment.literal().to_string(),
                                    found: empty.to_string(),
                                });
                            }
                        }
                        literal if literal != last => {
                            return Err(Error::LiteralMismatch {
                                expected: segment.literal().to_string(),
                                found: span[0].to_string(),
                            });
                        }
                        _ => {}
                    }
                    captured.extend(prefix);
                    captured.push(last);
                }
            }
        }
        if index != components.len() {
            return Err(incomplete());
        }
        Ok(bindings)
    }

    /// Like [matches][PathTemplate::matches], but a path that does not match
    /// is not an error.
    pub fn try_match(&self, path: &str) -> Option<Bindings> {
        self.matches(path).ok()
    }
}

fn strip_suffix<'a>(segment: &Segment, component: &'a str) -> Result<&'a str, Error> {
    let Some(verb) = segment.suffix() else {
        return Ok(component);
    };
    component
        .strip_suffix(verb)
        .and_then(|c| c.strip_suffix(':'))
        .ok_or_else(|| Error::LiteralMismatch {
            expected: segment.literal().to_string(),
            found: component.to_string(),
        })
}

impl std::str::FromStr for PathTemplate {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut components: Vec<String> = Vec::new();
        let mut inner: Vec<&str> = Vec::new();
        let mut verb = None;
        let mut inside_binding = false;
        for segment in &self.segments {
            match segment.kind() {
                SegmentKind::Binding => {
                    inner.clear();
                    inside_binding = true;
                }
                SegmentKind::EndBinding => {
                    inside_binding = false;
                    let component = match (segment.is_positional(), inner.as_slice()) {
                        (true, _) => inner.join("/"),
                        (false, ["*"]) => format!("{{{}}}", segment.literal()),
                        (false, _) => format!("{{{}={}}}", segment.literal(), inner.join("/")),
                    };
                    components.push(component);
                }
                SegmentKind::Terminal => {
                    verb = segment.suffix().or(verb);
                    if inside_binding {
                        inner.push(segment.pattern());
                    } else {
                        components.push(segment.pattern().to_string());
                    }
                }
            }
        }
        write!(f, "{}", components.join("/"))?;
        if let Some(verb) = verb {
            write!(f, ":{verb}")?;
        }
        Ok(())
    }
}
