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

//! The parsed representation of a path template.

/// The kind of a [Segment].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    /// A literal path component, `*`, or `**`.
    Terminal,
    /// Opens a named capture. The literal is the variable name.
    Binding,
    /// Closes the most recently opened capture.
    EndBinding,
}

/// One element of a parsed path template.
///
/// A template such as `projects/{project}/topics/*` parses into:
///
/// | kind         | literal    |
/// |--------------|------------|
/// | `Terminal`   | `projects` |
/// | `Binding`    | `project`  |
/// | `Terminal`   | `*`        |
/// | `EndBinding` | `project`  |
/// | `Terminal`   | `topics`   |
/// | `Binding`    | `$0`       |
/// | `Terminal`   | `*`        |
/// | `EndBinding` | `$0`       |
///
/// The `:verb` suffix of a custom method is merged into the last terminal,
/// for example `*:cancel`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    kind: SegmentKind,
    literal: String,
}

pub(crate) const WILDCARD: &str = "*";
pub(crate) const PATH_WILDCARD: &str = "**";

impl Segment {
    pub(crate) fn terminal<T: Into<String>>(literal: T) -> Self {
        Self {
            kind: SegmentKind::Terminal,
            literal: literal.into(),
        }
    }

    pub(crate) fn binding<T: Into<String>>(name: T) -> Self {
        Self {
            kind: SegmentKind::Binding,
            literal: name.into(),
        }
    }

    pub(crate) fn end_binding<T: Into<String>>(name: T) -> Self {
        Self {
            kind: SegmentKind::EndBinding,
            literal: name.into(),
        }
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    /// The literal payload, including any `:verb` suffix.
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// The literal without the `:verb` suffix.
    pub fn pattern(&self) -> &str {
        self.literal
            .split_once(':')
            .map(|(p, _)| p)
            .unwrap_or(&self.literal)
    }

    /// The `:verb` suffix merged into this segment, without the colon.
    pub fn suffix(&self) -> Option<&str> {
        self.literal.split_once(':').map(|(_, s)| s)
    }

    pub(crate) fn append_suffix(&mut self, verb: &str) {
        self.literal.push(':');
        self.literal.push_str(verb);
    }

    /// A terminal matching exactly one path component.
    pub fn is_wildcard(&self) -> bool {
        self.kind == SegmentKind::Terminal && self.pattern() == WILDCARD
    }

    /// A terminal matching one or more path components.
    pub fn is_path_wildcard(&self) -> bool {
        self.kind == SegmentKind::Terminal && self.pattern() == PATH_WILDCARD
    }

    /// A terminal that must match a path component exactly.
    pub fn is_literal(&self) -> bool {
        self.kind == SegmentKind::Terminal && !self.is_wildcard() && !self.is_path_wildcard()
    }

    /// Binding names that start with `$` are synthesized for unnamed wildcards.
    pub fn is_positional(&self) -> bool {
        self.kind != SegmentKind::Terminal && self.literal.starts_with('$')
    }
}
