//! `{{VARIABLE}}` substitution for generated file content.

use std::collections::BTreeMap;

/// Variables available to templated file content.
///
/// ## Built-in Variables
///
/// | Variable | Example |
/// |----------|---------|
/// | `PROJECT_NAME` | "My Awesome App" |
/// | `PROJECT_NAME_SNAKE` | "my_awesome_app" |
/// | `PROJECT_NAME_KEBAB` | "my-awesome-app" |
/// | `PROJECT_NAME_PASCAL` | "MyAwesomeApp" |
///
/// The CLI adds `YEAR`; generators add their own flag values per operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    variables: BTreeMap<String, String>,
}

impl RenderContext {
    pub fn new(project_name: impl Into<String>) -> Self {
        let name = project_name.into();
        Self::default()
            .with_variable("PROJECT_NAME_SNAKE", to_snake_case(&name))
            .with_variable("PROJECT_NAME_KEBAB", to_kebab_case(&name))
            .with_variable("PROJECT_NAME_PASCAL", to_pascal_case(&name))
            .with_variable("PROJECT_NAME", name)
    }

    /// Add or override a variable.
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Layer `variables` on top of this context.
    pub fn extended<'a>(&self, variables: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        let mut out = self.clone();
        for (key, value) in variables {
            out.variables.insert(key.clone(), value.clone());
        }
        out
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace every known `{{NAME}}`. Unknown placeholders stay literal and
    /// substituted values are never rescanned.
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => match self.get(after[..end].trim()) {
                    Some(value) => {
                        out.push_str(value);
                        rest = &after[end + 2..];
                    }
                    None => {
                        out.push_str("{{");
                        rest = after;
                    }
                },
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

// ── Case helpers ─────────────────────────────────────────────────────────────

pub fn to_snake_case(s: &str) -> String {
    split_words(s).join("_")
}

pub fn to_kebab_case(s: &str) -> String {
    split_words(s).join("-")
}

pub fn to_pascal_case(s: &str) -> String {
    split_words(s)
        .into_iter()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect()
}

/// Words split on `_`, `-`, whitespace, camelCase humps and acronym ends
/// (`HTTPServer` → `http`, `server`).
fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(current.to_lowercase());
                current.clear();
            }
            continue;
        }

        current.push(c);
        let Some(&next) = chars.peek() else { continue };
        let hump = c.is_lowercase() && next.is_uppercase();
        let acronym_end = c.is_uppercase()
            && next.is_uppercase()
            && chars.clone().nth(1).is_some_and(char::is_lowercase);
        if hump || acronym_end {
            words.push(current.to_lowercase());
            current.clear();
        }
    }

    if !current.is_empty() {
        words.push(current.to_lowercase());
    }
    words
}
