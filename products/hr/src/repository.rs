//! CRUD over the `employees` table.
//!
//! Reads run on whatever connection they are given. Writes open a
//! transaction on it so the email pre-check and the write observe the same
//! state; the unique index still has the final word and its violations are
//! reported as [`HrError::DuplicateEmail`].

use chrono::Utc;
use entity::employees;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::{debug, info, instrument};

use crate::error::{HrError, HrResult};
use crate::schema::{EmployeeChanges, EmployeeInput};
use crate::validate::{validate_create, validate_update};

pub const DEFAULT_LIST_LIMIT: u64 = 100;

/// Largest OFFSET/LIMIT the stores accept; both bind them as signed 64-bit.
const MAX_ROW_BOUND: u64 = i64::MAX as u64;

/// Validate and insert a new employee.
#[instrument(name = "hr.employees.create", skip_all)]
pub async fn create<C>(db: &C, input: EmployeeInput) -> HrResult<employees::Model>
where
    C: TransactionTrait,
{
    let employee = validate_create(input)?;
    let txn = db.begin().await?;
    ensure_email_available(&txn, &employee.email, None).await?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    let active = employees::ActiveModel {
        id: NotSet,
        first_name: Set(employee.first_name),
        last_name: Set(employee.last_name),
        email: Set(employee.email),
        phone: Set(employee.phone),
        department: Set(employee.department),
        position: Set(employee.position),
        salary: Set(employee.salary),
        hire_date: Set(employee.hire_date),
        created_at: Set(now),
        updated_at: Set(None),
    };
    let model = active.insert(&txn).await.map_err(HrError::from_write)?;
    txn.commit().await?;
    info!(employee_id = model.id, "employee created");
    Ok(model)
}

#[instrument(name = "hr.employees.get", skip(db))]
pub async fn get<C>(db: &C, id: i32) -> HrResult<employees::Model>
where
    C: ConnectionTrait,
{
    employees::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(HrError::NotFound)
}

/// Employees in id order, skipping `skip` and returning at most `limit`.
/// Bounds above `i64::MAX` are clamped.
#[instrument(name = "hr.employees.list", skip(db))]
pub async fn list<C>(db: &C, skip: u64, limit: u64) -> HrResult<Vec<employees::Model>>
where
    C: ConnectionTrait,
{
    let records = employees::Entity::find()
        .order_by_asc(employees::Column::Id)
        .offset(skip.min(MAX_ROW_BOUND))
        .limit(limit.min(MAX_ROW_BOUND))
        .all(db)
        .await?;
    Ok(records)
}

/// Apply the supplied fields of `input` to employee `id`.
#[instrument(name = "hr.employees.update", skip(db, input))]
pub async fn update<C>(db: &C, id: i32, input: EmployeeInput) -> HrResult<employees::Model>
where
    C: TransactionTrait,
{
    let txn = db.begin().await?;
    let existing = employees::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(HrError::NotFound)?;
    let changes = validate_update(input)?;

    if let Some(email) = changes.email.as_deref() {
        if email != existing.email {
            ensure_email_available(&txn, email, Some(id)).await?;
        }
    }

    let mut active: employees::ActiveModel = existing.into();
    apply_changes(&mut active, changes);
    let now: DateTimeWithTimeZone = Utc::now().into();
    active.updated_at = Set(Some(now));
    let model = active.update(&txn).await.map_err(HrError::from_write)?;
    txn.commit().await?;
    info!(employee_id = model.id, "employee updated");
    Ok(model)
}

/// Remove employee `id` permanently.
#[instrument(name = "hr.employees.delete", skip(db))]
pub async fn delete<C>(db: &C, id: i32) -> HrResult<()>
where
    C: TransactionTrait,
{
    let txn = db.begin().await?;
    let result = employees::Entity::delete_by_id(id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(HrError::NotFound);
    }
    txn.commit().await?;
    info!(employee_id = id, "employee deleted");
    Ok(())
}

async fn ensure_email_available<C>(db: &C, email: &str, except: Option<i32>) -> HrResult<()>
where
    C: ConnectionTrait,
{
    let mut query = employees::Entity::find().filter(employees::Column::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(employees::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        debug!("email already registered");
        return Err(HrError::DuplicateEmail);
    }
    Ok(())
}

fn apply_changes(active: &mut employees::ActiveModel, changes: EmployeeChanges) {
    if let Some(first_name) = changes.first_name {
        active.first_name = Set(first_name);
    }
    if let Some(last_name) = changes.last_name {
        active.last_name = Set(last_name);
    }
    if let Some(email) = changes.email {
        active.email = Set(email);
    }
    if let Some(phone) = changes.phone {
        active.phone = Set(phone);
    }
    if let Some(department) = changes.department {
        active.department = Set(department);
    }
    if let Some(position) = changes.position {
        active.position = Set(position);
    }
    if let Some(salary) = changes.salary {
        active.salary = Set(salary);
    }
    if let Some(hire_date) = changes.hire_date {
        active.hire_date = Set(hire_date);
    }
}
