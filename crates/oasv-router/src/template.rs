//! Path templates.
//!
//! A template such as `/pets/{petId}/photos/{file}.{ext}` compiles to the
//! anchored expression `^/pets/([^/]+)/photos/([^/]+)\.([^/]+)$`. Each
//! placeholder captures one non-empty run of characters inside a single
//! segment; literal text is matched exactly.

use regex::Regex;

use crate::error::RouterError;

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    names: Vec<String>,
    matcher: Regex,
}

impl PathTemplate {
    /// Compile `raw`.
    ///
    /// # Errors
    ///
    /// [`RouterError::MalformedTemplate`] when the template does not start
    /// with `/`, has unbalanced or nested braces, an empty or repeated
    /// placeholder name, or two placeholders with no literal between them.
    pub fn parse(raw: &str) -> Result<Self, RouterError> {
        let malformed = |reason: &str| RouterError::MalformedTemplate {
            template: raw.to_string(),
            reason: reason.to_string(),
        };
        if !raw.starts_with('/') {
            return Err(malformed("template must start with '/'"));
        }

        let mut names: Vec<String> = Vec::new();
        let mut pattern = String::from("^");
        let mut literal = String::new();
        let mut chars = raw.chars();
        let mut last_was_placeholder = false;
        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    if last_was_placeholder && literal.is_empty() {
                        return Err(malformed("adjacent placeholders are ambiguous"));
                    }
                    pattern.push_str(&regex::escape(&literal));
                    literal.clear();
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        match n {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' | '/' => return Err(malformed("unterminated placeholder")),
                            other => name.push(other),
                        }
                    }
                    if !closed {
                        return Err(malformed("unterminated placeholder"));
                    }
                    let name = name.trim().to_string();
                    if name.is_empty() {
                        return Err(malformed("empty placeholder name"));
                    }
                    if names.contains(&name) {
                        return Err(malformed(&format!("placeholder \"{name}\" appears twice")));
                    }
                    names.push(name);
                    pattern.push_str("([^/]+)");
                    last_was_placeholder = true;
                }
                '}' => return Err(malformed("unmatched '}'")),
                other => {
                    literal.push(other);
                    last_was_placeholder = false;
                }
            }
        }
        pattern.push_str(&regex::escape(&literal));
        pattern.push('$');

        let matcher = Regex::new(&pattern).map_err(|e| malformed(&e.to_string()))?;
        Ok(Self {
            raw: raw.to_string(),
            names,
            matcher,
        })
    }

    /// The template as declared.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in order of appearance.
    pub fn placeholders(&self) -> &[String] {
        &self.names
    }

    /// Number of placeholders. Fewer means more specific.
    pub fn placeholder_count(&self) -> usize {
        self.names.len()
    }

    /// Captured parameters when `path` matches.
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let caps = self.matcher.captures(path)?;
        Some(
            self.names
                .iter()
                .enumerate()
                .filter_map(|(i, name)| {
                    caps.get(i + 1)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }

    /// Whether `path` matches.
    pub fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }
}
