use chrono::{DateTime, FixedOffset, NaiveDate};
use entity::employees;
use serde::{Deserialize, Deserializer, Serialize};

pub const NAME_MIN_LETTERS: usize = 2;
pub const TEXT_MIN_LEN: usize = 2;
pub const TEXT_MAX_LEN: usize = 50;
pub const EMAIL_MAX_LEN: usize = 100;
pub const PHONE_DIGITS: usize = 10;

/// Employee attributes accepted from callers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    FirstName,
    LastName,
    Email,
    Phone,
    Department,
    Position,
    Salary,
    HireDate,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Department => "department",
            Field::Position => "position",
            Field::Salary => "salary",
            Field::HireDate => "hire_date",
        }
    }

    /// Human label, e.g. `First Name`.
    pub fn label(self) -> &'static str {
        match self {
            Field::FirstName => "First Name",
            Field::LastName => "Last Name",
            Field::Email => "Email",
            Field::Phone => "Phone",
            Field::Department => "Department",
            Field::Position => "Position",
            Field::Salary => "Salary",
            Field::HireDate => "Hire Date",
        }
    }

    pub fn is_required(self) -> bool {
        matches!(self, Field::FirstName | Field::LastName | Field::Email)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw, unvalidated employee fields shared by the create and update shapes.
///
/// The outer `Option` records whether the key was supplied at all, the inner
/// one whether it was supplied as `null`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct EmployeeInput {
    #[serde(default, deserialize_with = "supplied")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "supplied")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "supplied")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "supplied")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "supplied")]
    pub department: Option<Option<String>>,
    #[serde(default, deserialize_with = "supplied")]
    pub position: Option<Option<String>>,
    #[serde(default, deserialize_with = "supplied")]
    pub salary: Option<Option<f64>>,
    #[serde(default, deserialize_with = "supplied")]
    pub hire_date: Option<Option<NaiveDate>>,
}

fn supplied<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl EmployeeInput {
    /// Input carrying the three required fields.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: Some(Some(first_name.into())),
            last_name: Some(Some(last_name.into())),
            email: Some(Some(email.into())),
            ..Self::default()
        }
    }

    pub fn first_name(mut self, value: impl Into<String>) -> Self {
        self.first_name = Some(Some(value.into()));
        self
    }

    pub fn last_name(mut self, value: impl Into<String>) -> Self {
        self.last_name = Some(Some(value.into()));
        self
    }

    pub fn email(mut self, value: impl Into<String>) -> Self {
        self.email = Some(Some(value.into()));
        self
    }

    pub fn phone(mut self, value: impl Into<String>) -> Self {
        self.phone = Some(Some(value.into()));
        self
    }

    pub fn department(mut self, value: impl Into<String>) -> Self {
        self.department = Some(Some(value.into()));
        self
    }

    pub fn position(mut self, value: impl Into<String>) -> Self {
        self.position = Some(Some(value.into()));
        self
    }

    pub fn salary(mut self, value: f64) -> Self {
        self.salary = Some(Some(value));
        self
    }

    pub fn hire_date(mut self, value: NaiveDate) -> Self {
        self.hire_date = Some(Some(value));
        self
    }
}

/// A fully validated employee ready to insert.
#[derive(Clone, Debug, PartialEq)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub salary: Option<f64>,
    pub hire_date: Option<NaiveDate>,
}

/// Validated partial update. `None` leaves a column untouched; `Some(None)`
/// clears an optional column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmployeeChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub department: Option<Option<String>>,
    pub position: Option<Option<String>>,
    pub salary: Option<Option<f64>>,
    pub hire_date: Option<Option<NaiveDate>>,
}

impl EmployeeChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Serialized view of a stored employee.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EmployeeRecord {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub salary: Option<f64>,
    pub hire_date: Option<NaiveDate>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl From<employees::Model> for EmployeeRecord {
    fn from(model: employees::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            phone: model.phone,
            department: model.department,
            position: model.position,
            salary: model.salary,
            hire_date: model.hire_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_null_and_value_are_distinguished() {
        let input: EmployeeInput = serde_json::from_value(json!({
            "first_name": "Ada",
            "phone": null,
        }))
        .unwrap();
        assert_eq!(input.first_name, Some(Some("Ada".to_string())));
        assert_eq!(input.phone, Some(None));
        assert_eq!(input.department, None);
    }

    #[test]
    fn numbers_and_dates_deserialize() {
        let input: EmployeeInput = serde_json::from_value(json!({
            "salary": 50000,
            "hire_date": "2024-01-15",
        }))
        .unwrap();
        assert_eq!(input.salary, Some(Some(50000.0)));
        assert_eq!(
            input.hire_date,
            Some(NaiveDate::from_ymd_opt(2024, 1, 15))
        );
    }

    #[test]
    fn malformed_date_is_a_deserialize_error() {
        let result = serde_json::from_value::<EmployeeInput>(json!({"hire_date": "15/01/2024"}));
        assert!(result.is_err());
    }

    #[test]
    fn record_renders_dates_as_iso_strings() {
        let created_at = DateTime::parse_from_rfc3339("2024-02-01T09:30:00+00:00").unwrap();
        let record = EmployeeRecord {
            id: 7,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: None,
            department: Some("Engineering".into()),
            position: None,
            salary: Some(1.0),
            hire_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            created_at,
            updated_at: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["hire_date"], "2024-01-15");
        assert_eq!(value["created_at"], "2024-02-01T09:30:00+00:00");
        assert_eq!(value["updated_at"], serde_json::Value::Null);
        assert_eq!(value["phone"], serde_json::Value::Null);
    }
}
