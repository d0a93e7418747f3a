//! Structural and cross-field validation of pack entities.
//!
//! Validation is side-effect free and stops at the first offending field. A pack is only
//! accepted when every entity it declares passes.

pub use kreg_domain::model::is_valid_code;
use kreg_domain::model::PREFIX_KEY;
use kreg_domain::{Concept, Pack, Value, ValueSet};
use std::borrow::Cow;
use strum_macros::Display;

/// Kind of entity a [`ValidationError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EntityKind {
    #[strum(serialize = "concept")]
    Concept,
    #[strum(serialize = "value set")]
    ValueSet,
    #[strum(serialize = "value")]
    Value,
    #[strum(serialize = "pack")]
    Pack,
}

#[kreg_derive::kreg_error]
pub enum ValidationError {
    #[error("{entity} '{code}' is missing required field `{field}`{}", format_context(.context))]
    MissingField {
        entity: EntityKind,
        code: String,
        field: &'static str,
        context: Option<Cow<'static, str>>,
    },

    #[error("{entity} '{code}' has invalid `{field}`{}: {message}", format_context(.context))]
    InvalidField {
        entity: EntityKind,
        code: String,
        field: &'static str,
        message: Cow<'static, str>,
        context: Option<Cow<'static, str>>,
    },
}

impl ValidationError {
    #[must_use]
    pub const fn entity(&self) -> EntityKind {
        match self {
            Self::MissingField { entity, .. } | Self::InvalidField { entity, .. } => *entity,
        }
    }

    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::MissingField { field, .. } | Self::InvalidField { field, .. } => field,
        }
    }

    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::MissingField { code, .. } | Self::InvalidField { code, .. } => code,
        }
    }
}

/// Entities that can check their own shape.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for Concept {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_concept(self)
    }
}

impl Validate for ValueSet {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_value_set(self)
    }
}

impl Validate for Value {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_value(self)
    }
}

impl Validate for Pack {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_pack(self)
    }
}

/// Returns `true` for lowercase pack ids such as `core`, `finance-eu` or `tax_2024`.
#[must_use]
pub fn is_valid_pack_id(id: &str) -> bool {
    id.bytes().next().is_some_and(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        && id.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
}

fn is_semver(version: &str) -> bool {
    let parts: Vec<_> = version.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

struct Checker<'a> {
    entity: EntityKind,
    code: &'a str,
}

impl<'a> Checker<'a> {
    const fn new(entity: EntityKind, code: &'a str) -> Self {
        Self { entity, code }
    }

    fn required(&self, field: &'static str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingField {
                entity: self.entity,
                code: self.code.to_owned(),
                field,
                context: None,
            });
        }
        Ok(())
    }

    fn code(&self, field: &'static str, value: &str) -> Result<(), ValidationError> {
        self.required(field, value)?;
        if !is_valid_code(value) {
            return Err(self.invalid(
                field,
                format!("'{value}' must be UPPER_SNAKE (A-Z, 0-9, single underscores, leading letter)"),
            ));
        }
        Ok(())
    }

    /// Single-line text: no control characters at all.
    fn line(&self, field: &'static str, value: &str) -> Result<(), ValidationError> {
        self.plain(field, value, |_| false)
    }

    /// Free text: line breaks and tabs are allowed, other control characters are not.
    fn text(&self, field: &'static str, value: &str) -> Result<(), ValidationError> {
        self.plain(field, value, |c| matches!(c, '\n' | '\r' | '\t'))
    }

    fn plain(
        &self,
        field: &'static str,
        value: &str,
        allowed: impl Fn(char) -> bool,
    ) -> Result<(), ValidationError> {
        match value.chars().find(|&c| c.is_control() && !allowed(c)) {
            Some(c) => Err(self.invalid(field, format!("contains control character {c:?}"))),
            None => Ok(()),
        }
    }

    fn invalid(&self, field: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
        ValidationError::InvalidField {
            entity: self.entity,
            code: self.code.to_owned(),
            field,
            message: message.into(),
            context: None,
        }
    }
}

pub fn validate_concept(concept: &Concept) -> Result<(), ValidationError> {
    let check = Checker::new(EntityKind::Concept, &concept.code);
    check.code("code", &concept.code)?;
    check.required("category", &concept.category)?;
    check.line("category", &concept.category)?;
    check.required("domain", &concept.domain)?;
    check.line("domain", &concept.domain)?;
    check.text("description", &concept.description)?;
    if concept.tags.iter().any(|t| t.trim().is_empty()) {
        return Err(check.invalid("tags", "tags must not be blank"));
    }
    Ok(())
}

pub fn validate_value_set(value_set: &ValueSet) -> Result<(), ValidationError> {
    let check = Checker::new(EntityKind::ValueSet, &value_set.code);
    check.code("code", &value_set.code)?;
    check.required("domain", &value_set.domain)?;
    check.line("domain", &value_set.domain)?;
    check.text("description", &value_set.description)?;

    match value_set.metadata.get(PREFIX_KEY) {
        None => {},
        Some(serde_json::Value::String(prefix)) if is_valid_code(prefix) => {},
        Some(serde_json::Value::String(prefix)) => {
            return Err(check.invalid("metadata.prefix", format!("'{prefix}' must be UPPER_SNAKE")));
        },
        Some(other) => {
            return Err(check.invalid("metadata.prefix", format!("expected a string, found {other}")));
        },
    }
    Ok(())
}

pub fn validate_value(value: &Value) -> Result<(), ValidationError> {
    let key = if value.value_set_code.is_empty() {
        value.code.clone()
    } else {
        value.key().to_string()
    };
    let check = Checker::new(EntityKind::Value, &key);
    check.code("code", &value.code)?;
    check.code("value_set_code", &value.value_set_code)?;
    check.required("label", &value.label)?;
    check.line("label", &value.label)?;
    check.text("description", &value.description)?;
    if let Some(order) = value.sort_order
        && order < 0
    {
        return Err(check.invalid("sort_order", format!("{order} must be non-negative")));
    }
    Ok(())
}

/// Validates the pack header, then every entity it declares.
pub fn validate_pack(pack: &Pack) -> Result<(), ValidationError> {
    let check = Checker::new(EntityKind::Pack, &pack.id);
    check.required("id", &pack.id)?;
    if !is_valid_pack_id(&pack.id) {
        return Err(check.invalid("id", "must be lowercase [a-z0-9_-], starting with a letter or digit"));
    }
    check.required("version", &pack.version)?;
    if !is_semver(&pack.version) {
        return Err(check.invalid("version", format!("'{}' must be MAJOR.MINOR.PATCH", pack.version)));
    }
    check.required("domain", &pack.domain)?;

    let entities = pack
        .concepts
        .iter()
        .map(Validate::validate)
        .chain(pack.value_sets.iter().map(Validate::validate))
        .chain(pack.values.iter().map(Validate::validate));
    for result in entities {
        if result.is_err() {
            return result.context(format!("pack '{}'", pack.id));
        }
    }
    Ok(())
}
