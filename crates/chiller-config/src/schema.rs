//! Declarative schema validation for JSON documents.
//!
//! A [`Schema`] is a tree of constraints (kind, numeric bounds, array items,
//! object properties) plus named semantic tags. Tags are bound to
//! [`SemanticValidator`] implementations through a [`ValidatorRegistry`].
//!
//! Validation walks the schema and the document in lockstep and stops at the
//! first failure, reporting the field path and the rule that failed:
//!
//! ```text
//! $.control_machines[1]: unknown machine "Foo" (machine_name)
//! ```

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

/// Rule name reported for undeclared object keys.
pub const RULE_ADDITIONAL_PROPERTIES: &str = "additionalProperties";
/// Rule name reported for missing required keys.
pub const RULE_REQUIRED: &str = "required";
/// Rule name reported for kind mismatches.
pub const RULE_TYPE: &str = "type";
/// Rule name reported for numbers below the declared minimum.
pub const RULE_MIN: &str = "min";
/// Rule name reported for numbers above the declared maximum.
pub const RULE_MAX: &str = "max";
/// Rule name reported when a schema names a tag with no registered validator.
pub const RULE_VALIDATOR: &str = "validator";

/// A schema violation: where it happened and which rule rejected the value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {reason} ({rule})")]
pub struct SchemaViolation {
    /// Field path in `$.a.b[2]` form.
    pub path: String,
    /// Name of the rule that failed (`required`, `type`, `min`, a tag name, ...).
    pub rule: String,
    /// Human readable explanation.
    pub reason: String,
}

impl SchemaViolation {
    fn new(path: &str, rule: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            rule: rule.to_string(),
            reason: reason.into(),
        }
    }
}

/// Runtime kind of a JSON value as understood by the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Number,
    /// A number with no fractional part.
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}

impl ValueKind {
    /// Schema keyword for this kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
        }
    }

    /// Whether `value` is of this kind.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.as_f64().is_some_and(|n| n.fract() == 0.0),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Null => value.is_null(),
        }
    }

    /// The most specific kind describing `value`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node in a declarative schema tree.
///
/// Built with the constructor helpers and chained modifiers:
///
/// ```
/// use chiller_config::schema::Schema;
///
/// let schema = Schema::object()
///     .deny_additional()
///     .required("serial_baud", Schema::number().min(0.0))
///     .optional("label", Schema::string());
/// assert_eq!(schema.property_names().count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    kind: Option<ValueKind>,
    min: Option<f64>,
    max: Option<f64>,
    items: Option<Box<Schema>>,
    properties: Vec<(String, Schema)>,
    required: Vec<String>,
    additional_properties: bool,
    tags: Vec<String>,
}

impl Schema {
    /// A node that accepts any value.
    pub fn any() -> Self {
        Self {
            additional_properties: true,
            ..Self::default()
        }
    }

    /// A node constrained to the given kind.
    pub fn of_kind(kind: ValueKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::any()
        }
    }

    pub fn string() -> Self {
        Self::of_kind(ValueKind::String)
    }

    pub fn number() -> Self {
        Self::of_kind(ValueKind::Number)
    }

    pub fn integer() -> Self {
        Self::of_kind(ValueKind::Integer)
    }

    pub fn boolean() -> Self {
        Self::of_kind(ValueKind::Boolean)
    }

    /// An object node. Undeclared keys are allowed until [`deny_additional`](Self::deny_additional).
    pub fn object() -> Self {
        Self::of_kind(ValueKind::Object)
    }

    /// An array node whose elements must each satisfy `items`.
    pub fn array(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of_kind(ValueKind::Array)
        }
    }

    /// Set an inclusive numeric lower bound.
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Set an inclusive numeric upper bound.
    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Attach a named semantic validator tag.
    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    /// Declare a property that must be present.
    pub fn required(mut self, name: &str, schema: Schema) -> Self {
        self.required.push(name.to_string());
        self.properties.push((name.to_string(), schema));
        self
    }

    /// Declare a property that may be absent.
    pub fn optional(mut self, name: &str, schema: Schema) -> Self {
        self.properties.push((name.to_string(), schema));
        self
    }

    /// Reject object keys that are neither declared nor required.
    pub fn deny_additional(mut self) -> Self {
        self.additional_properties = false;
        self
    }

    /// Declared property names in declaration order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(name, _)| name.as_str())
    }

    /// Names of the required properties.
    pub fn required_names(&self) -> &[String] {
        &self.required
    }

    fn property(&self, name: &str) -> Option<&Schema> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, schema)| schema)
    }

    fn declares(&self, name: &str) -> bool {
        self.property(name).is_some() || self.required.iter().any(|r| r == name)
    }

    /// Visit every node with its field path, depth first.
    fn walk<'s>(&'s self, path: &str, visit: &mut dyn FnMut(&str, &'s Schema)) {
        visit(path, self);
        if let Some(items) = &self.items {
            items.walk(&format!("{path}[]"), visit);
        }
        for (name, child) in &self.properties {
            child.walk(&format!("{path}.{name}"), visit);
        }
    }
}

/// A named rule beyond kind and bounds checking.
///
/// Returns `Err` with a description of why the value was rejected.
pub trait SemanticValidator: Send + Sync {
    fn validate(&self, value: &Value) -> Result<(), String>;
}

impl<F> SemanticValidator for F
where
    F: Fn(&Value) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Result<(), String> {
        self(value)
    }
}

/// Mapping from tag name to validator implementation.
#[derive(Default)]
pub struct ValidatorRegistry<'a> {
    validators: HashMap<String, Box<dyn SemanticValidator + 'a>>,
}

impl<'a> ValidatorRegistry<'a> {
    pub fn new() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    /// Bind `tag` to `validator`, replacing any previous binding.
    pub fn register(&mut self, tag: &str, validator: impl SemanticValidator + 'a) {
        self.validators.insert(tag.to_string(), Box::new(validator));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, tag: &str, validator: impl SemanticValidator + 'a) -> Self {
        self.register(tag, validator);
        self
    }

    pub fn get(&self, tag: &str) -> Option<&(dyn SemanticValidator + 'a)> {
        self.validators.get(tag).map(|v| v.as_ref())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.validators.contains_key(tag)
    }

    /// Check that every tag used anywhere in `schema` has a validator.
    ///
    /// Run this once when a schema is paired with a registry so that a
    /// misspelt tag fails before any document is read.
    pub fn check_schema(&self, schema: &Schema) -> Result<(), SchemaViolation> {
        let mut missing = None;
        schema.walk("$", &mut |path: &str, node: &Schema| {
            if missing.is_some() {
                return;
            }
            if let Some(tag) = node.tags.iter().find(|t| !self.contains(t)) {
                missing = Some(SchemaViolation::new(
                    path,
                    RULE_VALIDATOR,
                    format!("no validator registered for tag \"{tag}\""),
                ));
            }
        });
        missing.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for ValidatorRegistry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("ValidatorRegistry").field("tags", &tags).finish()
    }
}

/// Validate `document` against `schema`, resolving tags through `validators`.
///
/// Pure: the result depends only on the three inputs.
pub fn validate(
    document: &Value,
    schema: &Schema,
    validators: &ValidatorRegistry<'_>,
) -> Result<(), SchemaViolation> {
    validate_node(document, schema, validators, "$")
}

fn validate_node(
    value: &Value,
    schema: &Schema,
    validators: &ValidatorRegistry<'_>,
    path: &str,
) -> Result<(), SchemaViolation> {
    if let Some(kind) = schema.kind
        && !kind.matches(value)
    {
        return Err(SchemaViolation::new(
            path,
            RULE_TYPE,
            format!("expected {kind}, found {}", ValueKind::of(value)),
        ));
    }

    if let (Some(min), Some(n)) = (schema.min, value.as_f64())
        && n < min
    {
        return Err(SchemaViolation::new(
            path,
            RULE_MIN,
            format!("value {n} is below minimum {min}"),
        ));
    }

    if let (Some(max), Some(n)) = (schema.max, value.as_f64())
        && n > max
    {
        return Err(SchemaViolation::new(
            path,
            RULE_MAX,
            format!("value {n} is above maximum {max}"),
        ));
    }

    if let (Some(items), Some(elements)) = (&schema.items, value.as_array()) {
        for (i, element) in elements.iter().enumerate() {
            validate_node(element, items, validators, &format!("{path}[{i}]"))?;
        }
    }

    if let Some(object) = value.as_object() {
        if !schema.additional_properties
            && let Some(key) = object.keys().find(|key| !schema.declares(key))
        {
            return Err(SchemaViolation::new(
                &format!("{path}.{key}"),
                RULE_ADDITIONAL_PROPERTIES,
                "unknown field",
            ));
        }

        if let Some(key) = schema.required.iter().find(|key| !object.contains_key(*key)) {
            return Err(SchemaViolation::new(
                &format!("{path}.{key}"),
                RULE_REQUIRED,
                "missing required field",
            ));
        }

        for (name, child) in &schema.properties {
            if let Some(field) = object.get(name) {
                validate_node(field, child, validators, &format!("{path}.{name}"))?;
            }
        }
    }

    for tag in &schema.tags {
        let validator = validators.get(tag).ok_or_else(|| {
            SchemaViolation::new(
                path,
                RULE_VALIDATOR,
                format!("no validator registered for tag \"{tag}\""),
            )
        })?;
        validator
            .validate(value)
            .map_err(|reason| SchemaViolation::new(path, tag, reason))?;
    }

    Ok(())
}
