use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Phone,
    Department,
    Position,
    Salary,
    HireDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Employees::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Employees::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Employees::FirstName).string_len(50).not_null())
                    .col(ColumnDef::new(Employees::LastName).string_len(50).not_null())
                    .col(ColumnDef::new(Employees::Email).string_len(100).not_null())
                    .col(ColumnDef::new(Employees::Phone).string_len(10))
                    .col(ColumnDef::new(Employees::Department).string_len(50))
                    .col(ColumnDef::new(Employees::Position).string_len(50))
                    .col(ColumnDef::new(Employees::Salary).double())
                    .col(ColumnDef::new(Employees::HireDate).date())
                    .col(
                        ColumnDef::new(Employees::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Employees::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Email uniqueness is enforced here, not only by the repository pre-check.
        manager
            .create_index(
                Index::create()
                    .name("idx_employees_email")
                    .table(Employees::Table)
                    .col(Employees::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_employees_department")
                    .table(Employees::Table)
                    .col(Employees::Department)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_employees_position")
                    .table(Employees::Table)
                    .col(Employees::Position)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Employees::Table).if_exists().to_owned())
            .await
    }
}
