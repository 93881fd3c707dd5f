//! Keyword and exact-match lookups.

use entity::employees;
use sea_orm::sea_query::{BinOper, Expr, Func, SimpleExpr};
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::instrument;

use crate::error::HrResult;

const KEYWORD_COLUMNS: [employees::Column; 5] = [
    employees::Column::FirstName,
    employees::Column::LastName,
    employees::Column::Email,
    employees::Column::Department,
    employees::Column::Position,
];

/// Employees whose first name, last name, email, department or position
/// contains `keyword`, ignoring case.
#[instrument(name = "hr.employees.search", skip(db))]
pub async fn search_by_keyword<C>(db: &C, keyword: &str) -> HrResult<Vec<employees::Model>>
where
    C: ConnectionTrait,
{
    let pattern = format!("%{}%", escape_like(keyword));
    let condition = KEYWORD_COLUMNS
        .into_iter()
        .fold(Condition::any(), |condition, column| {
            condition.add(contains_ignore_case(column, &pattern))
        });
    let records = employees::Entity::find()
        .filter(condition)
        .order_by_asc(employees::Column::Id)
        .all(db)
        .await?;
    Ok(records)
}

#[instrument(name = "hr.employees.by_department", skip(db))]
pub async fn find_by_department<C>(db: &C, department: &str) -> HrResult<Vec<employees::Model>>
where
    C: ConnectionTrait,
{
    find_exact(db, employees::Column::Department, department).await
}

#[instrument(name = "hr.employees.by_position", skip(db))]
pub async fn find_by_position<C>(db: &C, position: &str) -> HrResult<Vec<employees::Model>>
where
    C: ConnectionTrait,
{
    find_exact(db, employees::Column::Position, position).await
}

async fn find_exact<C>(
    db: &C,
    column: employees::Column,
    value: &str,
) -> HrResult<Vec<employees::Model>>
where
    C: ConnectionTrait,
{
    let records = employees::Entity::find()
        .filter(column.eq(value))
        .order_by_asc(employees::Column::Id)
        .all(db)
        .await?;
    Ok(records)
}

/// `LOWER(column) LIKE LOWER(pattern) ESCAPE '\'`, both sides folded by the store.
fn contains_ignore_case(column: employees::Column, pattern: &str) -> SimpleExpr {
    let folded_pattern = SimpleExpr::Binary(
        Box::new(Func::lower(Expr::val(pattern)).into()),
        BinOper::Escape,
        Box::new(SimpleExpr::Constant('\\'.into())),
    );
    Expr::expr(Func::lower(Expr::col(column))).binary(BinOper::Like, folded_pattern)
}

/// Make `%`, `_` and `\` match literally inside a LIKE pattern.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn keyword_and_column_are_both_lowered_in_sql() {
        let sql = employees::Entity::find()
            .filter(contains_ignore_case(employees::Column::Department, "%x%"))
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(sql.contains(r#"LOWER("department") LIKE LOWER("#), "{sql}");
        assert!(sql.contains("ESCAPE"), "{sql}");
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
        assert_eq!(escape_like("plain"), "plain");
    }
}
