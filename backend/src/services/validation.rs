//! Input validation for mutation arguments.
//!
//! A `ValidationRegistry` maps input shape names to ordered field rules, each
//! rule being a predicate with the message reported when it fails. The
//! `ValidationPipe` coerces a payload into its declared shape and runs the
//! registered rules before the payload reaches business logic.

use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
};

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::errors::AppError;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern")
});

/// Declared target shape of a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metatype {
    String,
    Boolean,
    Number,
    Array,
    Object,
    /// A named input shape looked up in the registry.
    Input(&'static str),
}

/// Input types that can be checked by the pipe.
pub trait InputShape: Serialize {
    const SHAPE: &'static str;
}

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Clone)]
struct Constraint {
    check: Predicate,
    message: String,
}

#[derive(Clone)]
pub struct FieldRules {
    field: &'static str,
    constraints: Vec<Constraint>,
}

impl FieldRules {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            constraints: Vec::new(),
        }
    }

    pub fn check<P>(mut self, predicate: P, message: impl Into<String>) -> Self
    where
        P: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.constraints.push(Constraint {
            check: Arc::new(predicate),
            message: message.into(),
        });
        self
    }

    fn first_violation(&self, value: &Value) -> Option<&str> {
        self.constraints
            .iter()
            .find(|constraint| !(constraint.check)(value))
            .map(|constraint| constraint.message.as_str())
    }
}

#[derive(Clone, Default)]
pub struct ValidationRegistry {
    shapes: HashMap<&'static str, Vec<FieldRules>>,
}

impl ValidationRegistry {
    pub fn with_shape(mut self, shape: &'static str, fields: Vec<FieldRules>) -> Self {
        self.shapes.insert(shape, fields);
        self
    }

    /// Messages of the first failing rule of every failing field, in field order.
    pub fn violations(&self, shape: &str, value: &Value) -> Vec<String> {
        let Some(fields) = self.shapes.get(shape) else {
            return Vec::new();
        };

        fields
            .iter()
            .filter_map(|rules| {
                rules
                    .first_violation(value.get(rules.field).unwrap_or(&Value::Null))
                    .map(str::to_string)
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct ValidationPipe {
    registry: Arc<ValidationRegistry>,
}

impl ValidationPipe {
    pub fn new(registry: ValidationRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Returns `value` unchanged when it satisfies its shape.
    pub fn transform(&self, value: Value, metatype: Option<&Metatype>) -> Result<Value, AppError> {
        let Some(Metatype::Input(shape)) = metatype else {
            return Ok(value);
        };

        let violations = self.registry.violations(shape, &value);
        if violations.is_empty() {
            Ok(value)
        } else {
            Err(AppError::UserInput(format!(
                "Form Arguments invalid {}",
                violations.join(", ")
            )))
        }
    }

    pub fn validate<T: InputShape>(&self, input: &T) -> Result<(), AppError> {
        let value = serde_json::to_value(input).map_err(|err| AppError::UserInput(err.to_string()))?;
        self.transform(value, Some(&Metatype::Input(T::SHAPE)))
            .map(|_| ())
    }
}

pub fn is_not_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

pub fn min_length(min: usize) -> impl Fn(&Value) -> bool + Send + Sync + 'static {
    move |value| value.as_str().is_some_and(|s| s.chars().count() >= min)
}

pub fn is_email(value: &Value) -> bool {
    value.as_str().is_some_and(|s| EMAIL.is_match(s))
}

/// Rules for every input shape accepted by the mutations.
pub fn default_registry() -> ValidationRegistry {
    let role_fields = || {
        vec![
            FieldRules::new("name").check(is_not_empty, "name should not be empty"),
            FieldRules::new("nodeId").check(is_not_empty, "nodeId should not be empty"),
        ]
    };

    ValidationRegistry::default()
        .with_shape(
            "CreateUserInput",
            vec![
                FieldRules::new("username")
                    .check(is_not_empty, "username should not be empty")
                    .check(min_length(4), "username must be longer than or equal to 4 characters"),
                FieldRules::new("email").check(is_email, "email must be an email"),
                FieldRules::new("password")
                    .check(is_not_empty, "password should not be empty")
                    .check(min_length(6), "password must be longer than or equal to 6 characters"),
            ],
        )
        .with_shape(
            "LoginUserInput",
            vec![
                FieldRules::new("username").check(is_not_empty, "username should not be empty"),
                FieldRules::new("password").check(is_not_empty, "password should not be empty"),
            ],
        )
        .with_shape("CreateRoleInput", role_fields())
        .with_shape("UpdateRoleInput", role_fields())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn pipe() -> ValidationPipe {
        ValidationPipe::new(default_registry())
    }

    #[test]
    fn primitive_shapes_pass_through_unchanged() {
        let pipe = pipe();
        let cases = [
            (Metatype::String, json!("")),
            (Metatype::Boolean, json!(false)),
            (Metatype::Number, json!(-1)),
            (Metatype::Array, json!([1, "two"])),
            (Metatype::Object, json!({ "username": "" })),
        ];

        for (metatype, value) in cases {
            assert_eq!(pipe.transform(value.clone(), Some(&metatype)).unwrap(), value);
        }
        assert_eq!(pipe.transform(json!(null), None).unwrap(), json!(null));
    }

    #[test]
    fn valid_input_is_returned_unchanged() {
        let value = json!({ "username": "alice", "password": "secret" });
        let out = pipe()
            .transform(value.clone(), Some(&Metatype::Input("LoginUserInput")))
            .unwrap();
        assert_eq!(out, value);
    }

    #[test]
    fn single_failing_field_reports_its_message_once() {
        let err = pipe()
            .transform(
                json!({ "username": "", "password": "secret" }),
                Some(&Metatype::Input("LoginUserInput")),
            )
            .unwrap_err();

        let AppError::UserInput(message) = err else {
            panic!("expected a user input error");
        };
        assert_eq!(message, "Form Arguments invalid username should not be empty");
        assert_eq!(message.matches("username should not be empty").count(), 1);
    }

    #[test]
    fn only_the_first_message_per_field_is_reported() {
        let err = pipe()
            .transform(
                json!({ "username": "", "email": "a@b.com", "password": "secret1" }),
                Some(&Metatype::Input("CreateUserInput")),
            )
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Form Arguments invalid username should not be empty"
        );
    }

    #[test]
    fn failing_fields_are_joined_in_order() {
        let err = pipe()
            .transform(
                json!({ "username": "al", "email": "nope", "password": "secret1" }),
                Some(&Metatype::Input("CreateUserInput")),
            )
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Form Arguments invalid username must be longer than or equal to 4 characters, email must be an email"
        );
    }

    #[test]
    fn non_object_payload_fails_every_field() {
        let err = pipe()
            .transform(json!("oops"), Some(&Metatype::Input("LoginUserInput")))
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Form Arguments invalid username should not be empty, password should not be empty"
        );
    }

    #[test]
    fn unregistered_shapes_pass() {
        let value = json!({ "anything": null });
        assert_eq!(
            pipe()
                .transform(value.clone(), Some(&Metatype::Input("Unknown")))
                .unwrap(),
            value
        );
    }
}
