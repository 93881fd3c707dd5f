//! Field rules for employee input.
//!
//! Both shapes run through [`validate`]; the shape only decides whether a
//! missing required field is an error. Every failing field is reported, each
//! with its first failing rule.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::schema::{
    EMAIL_MAX_LEN, EmployeeChanges, EmployeeInput, Field, NAME_MIN_LETTERS, NewEmployee,
    PHONE_DIGITS, TEXT_MAX_LEN, TEXT_MIN_LEN,
};

const PLACEHOLDER: &str = "string";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$",
    )
    .expect("valid email regex")
});

/// Which payload is being validated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    /// Required fields must be present.
    Create,
    /// Every field is optional; only supplied ones are checked.
    Update,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Error)]
#[error("{}", summary(.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|err| format!("{}: {}", err.field, err.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn field(&self, field: Field) -> Option<&FieldError> {
        self.errors.iter().find(|err| err.field == field)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, field: Field, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// Validate a create payload.
pub fn validate_create(input: EmployeeInput) -> Result<NewEmployee, ValidationErrors> {
    validate(input, Shape::Create).and_then(NewEmployee::try_from)
}

/// Validate an update payload. Unsupplied fields are never checked.
pub fn validate_update(input: EmployeeInput) -> Result<EmployeeChanges, ValidationErrors> {
    validate(input, Shape::Update)
}

/// Normalize `input` for the given shape.
pub fn validate(input: EmployeeInput, shape: Shape) -> Result<EmployeeChanges, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let changes = EmployeeChanges {
        first_name: required(&mut errors, shape, Field::FirstName, input.first_name, |v| {
            person_name(Field::FirstName, v)
        }),
        last_name: required(&mut errors, shape, Field::LastName, input.last_name, |v| {
            person_name(Field::LastName, v)
        }),
        email: required(&mut errors, shape, Field::Email, input.email, email),
        phone: optional(&mut errors, Field::Phone, input.phone, phone),
        department: optional(&mut errors, Field::Department, input.department, |v| {
            org_text(Field::Department, v)
        }),
        position: optional(&mut errors, Field::Position, input.position, |v| {
            org_text(Field::Position, v)
        }),
        salary: optional(&mut errors, Field::Salary, input.salary, salary),
        hire_date: optional(&mut errors, Field::HireDate, input.hire_date, Ok),
    };
    errors.into_result(changes)
}

impl TryFrom<EmployeeChanges> for NewEmployee {
    type Error = ValidationErrors;

    fn try_from(changes: EmployeeChanges) -> Result<Self, Self::Error> {
        let EmployeeChanges {
            first_name,
            last_name,
            email,
            phone,
            department,
            position,
            salary,
            hire_date,
        } = changes;
        match (first_name, last_name, email) {
            (Some(first_name), Some(last_name), Some(email)) => Ok(Self {
                first_name,
                last_name,
                email,
                phone: phone.flatten(),
                department: department.flatten(),
                position: position.flatten(),
                salary: salary.flatten(),
                hire_date: hire_date.flatten(),
            }),
            (first_name, last_name, email) => {
                let mut errors = ValidationErrors::default();
                for (field, missing) in [
                    (Field::FirstName, first_name.is_none()),
                    (Field::LastName, last_name.is_none()),
                    (Field::Email, email.is_none()),
                ] {
                    if missing {
                        errors.push(field, "Field required");
                    }
                }
                Err(errors)
            }
        }
    }
}

fn required<T, U>(
    errors: &mut ValidationErrors,
    shape: Shape,
    field: Field,
    value: Option<Option<T>>,
    rule: impl FnOnce(T) -> Result<U, String>,
) -> Option<U> {
    match (value, shape) {
        (Some(Some(raw)), _) => apply(errors, field, raw, rule),
        (None, Shape::Update) => None,
        (None, Shape::Create) | (Some(None), Shape::Create) => {
            errors.push(field, "Field required");
            None
        }
        (Some(None), Shape::Update) => {
            errors.push(field, format!("{} may not be null", field.label()));
            None
        }
    }
}

fn optional<T, U>(
    errors: &mut ValidationErrors,
    field: Field,
    value: Option<Option<T>>,
    rule: impl FnOnce(T) -> Result<U, String>,
) -> Option<Option<U>> {
    match value {
        None => None,
        Some(None) => Some(None),
        Some(Some(raw)) => apply(errors, field, raw, rule).map(Some),
    }
}

fn apply<T, U>(
    errors: &mut ValidationErrors,
    field: Field,
    raw: T,
    rule: impl FnOnce(T) -> Result<U, String>,
) -> Option<U> {
    match rule(raw) {
        Ok(value) => Some(value),
        Err(message) => {
            errors.push(field, message);
            None
        }
    }
}

fn reject_placeholder(field: Field, value: &str) -> Result<(), String> {
    if value.eq_ignore_ascii_case(PLACEHOLDER) {
        return Err(format!(
            "{} cannot be \"{PLACEHOLDER}\". Please enter a real {}.",
            field.label(),
            field.label().to_lowercase()
        ));
    }
    Ok(())
}

fn person_name(field: Field, raw: String) -> Result<String, String> {
    let value = raw.trim();
    reject_placeholder(field, value)?;
    if !value
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_whitespace())
    {
        return Err("Name must contain only letters and spaces".into());
    }
    let letters = value.chars().filter(|c| !c.is_whitespace()).count();
    if letters < NAME_MIN_LETTERS {
        return Err(format!("Name must have at least {NAME_MIN_LETTERS} letters"));
    }
    if value.chars().count() > TEXT_MAX_LEN {
        return Err(format!("Name must be at most {TEXT_MAX_LEN} characters"));
    }
    Ok(value.to_string())
}

fn org_text(field: Field, raw: String) -> Result<String, String> {
    let value = raw.trim();
    reject_placeholder(field, value)?;
    let len = value.chars().count();
    if len < TEXT_MIN_LEN {
        return Err(format!(
            "{} must be at least {TEXT_MIN_LEN} characters",
            field.label()
        ));
    }
    if len > TEXT_MAX_LEN {
        return Err(format!(
            "{} must be at most {TEXT_MAX_LEN} characters",
            field.label()
        ));
    }
    Ok(value.to_string())
}

fn email(raw: String) -> Result<String, String> {
    let value = raw.trim();
    if value.chars().count() > EMAIL_MAX_LEN {
        return Err(format!("Email must be at most {EMAIL_MAX_LEN} characters"));
    }
    if !EMAIL_RE.is_match(value) {
        return Err("Invalid email address".into());
    }
    Ok(value.to_string())
}

fn phone(raw: String) -> Result<String, String> {
    let value = raw.trim();
    if value.len() != PHONE_DIGITS || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("Phone must be exactly {PHONE_DIGITS} digits"));
    }
    Ok(value.to_string())
}

fn salary(value: f64) -> Result<f64, String> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err("Salary must be greater than 0".into())
    }
}
