//! Structural validation of untrusted JSON payloads.
//!
//! A [`Shape`] describes the fields a response must carry. Validation stops at
//! the first mismatch and reports a path rooted at `$`, for example
//! `$.result.socialProfile.email`.

use serde_json::Value;

/// Expected structure of a JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    String,
    Number,
    /// A number representable as `i64`.
    Integer,
    /// An object that has at least these properties. Extra properties are
    /// allowed.
    Record(Vec<(&'static str, Shape)>),
}

/// A payload did not match its expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Root-relative location of the mismatch.
    pub path: String,
    pub message: String,
}

impl Shape {
    pub fn record(fields: impl IntoIterator<Item = (&'static str, Shape)>) -> Self {
        Shape::Record(fields.into_iter().collect())
    }

    /// Check `value` against this shape.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        let mut path = Vec::new();
        self.validate_at(value, &mut path)
    }

    /// Human-readable type expression, e.g. `{ email: string }`.
    pub fn type_expr(&self) -> String {
        match self {
            Shape::String => "string".to_string(),
            Shape::Number => "number".to_string(),
            Shape::Integer => "integer".to_string(),
            Shape::Record(fields) => {
                let properties: Vec<String> = fields
                    .iter()
                    .map(|(key, shape)| format!("{key}: {}", shape.type_expr()))
                    .collect();
                format!("{{ {} }}", properties.join(", "))
            }
        }
    }

    fn validate_at(
        &self,
        value: &Value,
        path: &mut Vec<&'static str>,
    ) -> Result<(), ValidationError> {
        let matches = match self {
            Shape::String => value.is_string(),
            Shape::Number => value.is_number(),
            Shape::Integer => value.is_i64(),
            Shape::Record(fields) => {
                let Some(object) = value.as_object() else {
                    return Err(self.mismatch(value, path));
                };
                for (key, shape) in fields {
                    let Some(property) = object.get(*key) else {
                        return Err(ValidationError {
                            path: show_path(path),
                            message: format!(
                                "Expected property \"{key}\". at: {}",
                                show_path(path)
                            ),
                        });
                    };
                    path.push(*key);
                    shape.validate_at(property, path)?;
                    path.pop();
                }
                true
            }
        };

        if matches {
            Ok(())
        } else {
            Err(self.mismatch(value, path))
        }
    }

    fn mismatch(&self, actual: &Value, path: &[&'static str]) -> ValidationError {
        let location = show_path(path);
        ValidationError {
            message: format!(
                "Expected {}. actual: {actual}. at: {location}",
                self.type_expr()
            ),
            path: location,
        }
    }
}

fn show_path(path: &[&'static str]) -> String {
    let mut result = String::from("$");
    for segment in path {
        result.push('.');
        result.push_str(segment);
    }
    result
}
