//! JSON Schema validation that reports every failing field

use std::fmt;

use jsonschema::JSONSchema;
use schemars::gen::SchemaGenerator;
use schemars::JsonSchema;
use serde_json::Value;

use crate::error::SchemaError;

/// One field that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// JSON pointer to the offending value (`""` is the document root)
    pub path: String,
    /// Validator message
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "(root)" } else { &self.path };
        write!(f, "{path}: {}", self.message)
    }
}

/// All failures found in one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: Vec<FieldError>,
}

impl ValidationReport {
    /// Failing fields in validator order
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Number of failing fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when nothing failed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether some failure points at `path`
    #[must_use]
    pub fn has_path(&self, path: &str) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {error}")?;
        }
        Ok(())
    }
}

impl FromIterator<FieldError> for ValidationReport {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

/// Compiled schema for one record type
pub struct SchemaValidator {
    type_name: &'static str,
    schema: Value,
    compiled: JSONSchema,
}

impl SchemaValidator {
    /// Generate and compile the schema for `T`
    ///
    /// # Errors
    /// `SchemaError` if the generated schema cannot be serialized or compiled.
    pub fn for_type<T: JsonSchema>() -> Result<Self, SchemaError> {
        let root = SchemaGenerator::default().into_root_schema_for::<T>();
        let schema = serde_json::to_value(&root)?;
        Self::from_schema(short_type_name::<T>(), schema)
    }

    /// Compile a hand-written schema
    ///
    /// # Errors
    /// `SchemaError::Compile` if the schema is not a valid JSON Schema.
    pub fn from_schema(type_name: &'static str, schema: Value) -> Result<Self, SchemaError> {
        let compiled = JSONSchema::compile(&schema).map_err(|e| SchemaError::Compile {
            type_name,
            reason: e.to_string(),
        })?;
        Ok(Self {
            type_name,
            schema,
            compiled,
        })
    }

    /// Name of the validated type
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The schema document
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Validate `instance`, collecting every failure
    ///
    /// # Errors
    /// A non-empty `ValidationReport` listing all failing fields.
    pub fn check(&self, instance: &Value) -> Result<(), ValidationReport> {
        match self.compiled.validate(instance) {
            Ok(()) => Ok(()),
            Err(errors) => Err(errors
                .map(|e| FieldError {
                    path: e.instance_path.to_string(),
                    message: e.to_string(),
                })
                .collect()),
        }
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
