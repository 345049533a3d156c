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

use super::{Bindings, Error, PathTemplate};

/// A collection of named path templates for one kind of resource.
///
/// Some resources have more than one name format, for example a log may live
/// under a project, a folder, or an organization. Generated clients create a
/// `ResourceNames` value once and use it to format and parse those names.
///
/// # Example
/// ```
/// # use google_cloud_api_core::path_template::{Bindings, ResourceNames};
/// let names = ResourceNames::new()
///     .add("project_log", "projects/{project}/logs/{log}")?
///     .add("folder_log", "folders/{folder}/logs/{log}")?;
/// let bindings = names.parse("folders/f/logs/l", None)?;
/// assert_eq!(bindings.get("folder").map(String::as_str), Some("f"));
/// assert_eq!(names.render("folder_log", &bindings)?, "folders/f/logs/l");
/// # Ok::<(), google_cloud_api_core::path_template::Error>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct ResourceNames {
    templates: Vec<(String, PathTemplate)>,
}

impl ResourceNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template, replacing any previous template with the same name.
    ///
    /// Templates are tried by [parse][ResourceNames::parse] in the order they
    /// are added.
    pub fn add<N: Into<String>>(mut self, name: N, template: &str) -> Result<Self, Error> {
        let name = name.into();
        let template = PathTemplate::new(template)?;
        match self.templates.iter_mut().find(|(n, _)| *n == name) {
            Some((_, t)) => *t = template,
            None => self.templates.push((name, template)),
        }
        Ok(self)
    }

    pub fn template(&self, name: &str) -> Result<&PathTemplate, Error> {
        self.templates
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
            .ok_or_else(|| Error::UnknownTemplate(name.to_string()))
    }

    pub fn render(&self, name: &str, bindings: &Bindings) -> Result<String, Error> {
        self.template(name)?.render(bindings)
    }

    /// Parses `resource` with the template named `template_name`, or with the
    /// first template that matches if `template_name` is `None`.
    pub fn parse(&self, resource: &str, template_name: Option<&str>) -> Result<Bindings, Error> {
        if let Some(name) = template_name {
            return self.template(name)?.matches(resource);
        }
        self.templates
            .iter()
            .find_map(|(_, t)| t.try_match(resource))
            .ok_or_else(|| Error::NoMatchingTemplate {
                name: resource.to_string(),
                templates: self.templates.iter().map(|(_, t)| t.to_string()).collect(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    type TestResult = anyhow::Result<()>;

    fn names() -> Result<ResourceNames, Error> {
        ResourceNames::new()
            .add("project_topic", "projects/{project}/topics/{topic}")?
            .add("deleted_topic", "_deleted-topic_")?
            .add("any", "{name=**}")
    }

    #[test]
    fn parse_first_match() -> TestResult {
        let names = names()?;
        let got = names.parse("projects/p/topics/t", None)?;
        let want = Bindings::from([
            ("project".to_string(), "p".to_string()),
            ("topic".to_string(), "t".to_string()),
        ]);
        assert_eq!(got, want);

        let got = names.parse("_deleted-topic_", None)?;
        assert!(got.is_empty(), "{got:?}");

        let got = names.parse("folders/f", None)?;
        assert_eq!(got.get("name").map(String::as_str), Some("folders/f"));
        Ok(())
    }

    #[test]
    fn parse_named() -> TestResult {
        let names = names()?;
        let got = names.parse("projects/p/topics/t", Some("any"))?;
        assert_eq!(
            got.get("name").map(String::as_str),
            Some("projects/p/topics/t")
        );

        let got = names.parse("folders/f", Some("project_topic"));
        assert!(matches!(got, Err(Error::LiteralMismatch { .. })), "{got:?}");

        let got = names.parse("folders/f", Some("missing"));
        assert_eq!(got, Err(Error::UnknownTemplate("missing".to_string())));
        Ok(())
    }

    #[test]
    fn no_matching_template() -> TestResult {
        let names = ResourceNames::new()
            .add("a", "projects/{project}")?
            .add("b", "folders/{folder}")?;
        let got = names.parse("organizations/o", None);
        assert_eq!(
            got,
            Err(Error::NoMatchingTemplate {
                name: "organizations/o".to_string(),
                templates: vec![
                    "projects/{project}".to_string(),
                    "folders/{folder}".to_string()
                ],
            })
        );
        let msg = got.unwrap_err().to_string();
        assert!(msg.contains("projects/{project}, folders/{folder}"), "{msg}");
        Ok(())
    }

    #[test]
    fn add_replaces() -> TestResult {
        let names = ResourceNames::new()
            .add("a", "projects/{project}")?
            .add("a", "folders/{folder}")?;
        assert_eq!(names.template("a")?.to_string(), "folders/{folder}");
        assert!(names.parse("projects/p", None).is_err());
        Ok(())
    }

    #[test]
    fn add_invalid() {
        let got = ResourceNames::new().add("a", "projects/{project");
        assert!(matches!(got, Err(Error::Parse { .. })), "{got:?}");
    }

    #[test]
    fn render() -> TestResult {
        let names = names()?;
        let bindings = Bindings::from([
            ("project".to_string(), "p".to_string()),
            ("topic".to_string(), "t".to_string()),
        ]);
        assert_eq!(
            names.render("project_topic", &bindings)?,
            "projects/p/topics/t"
        );
        let got = names.render("unknown", &bindings);
        assert_eq!(got, Err(Error::UnknownTemplate("unknown".to_string())));
        Ok(())
    }
}
