use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Outbox::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Outbox::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Outbox::PatientId).uuid().not_null())
                    .col(
                        ColumnDef::new(Outbox::Channel)
                            .string()
                            .not_null()
                            .default("EMAIL"),
                    )
                    .col(ColumnDef::new(Outbox::To).string().not_null())
                    .col(ColumnDef::new(Outbox::Subject).string())
                    .col(ColumnDef::new(Outbox::Body).text().not_null())
                    .col(
                        ColumnDef::new(Outbox::Status)
                            .string()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Outbox::Error).text())
                    .col(ColumnDef::new(Outbox::SentAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Outbox::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // No cascade: entries are kept for audit.
                    .foreign_key(
                        ForeignKey::create()
                            .from(Outbox::Table, Outbox::PatientId)
                            .to(Patients::Table, Patients::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Worker poll: WHERE status = 'PENDING' ORDER BY created_at.
        manager
            .create_index(
                Index::create()
                    .table(Outbox::Table)
                    .col(Outbox::Status)
                    .col(Outbox::CreatedAt)
                    .name("idx_outbox_status_created_at")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Outbox::Table)
                    .col(Outbox::PatientId)
                    .name("idx_outbox_patient_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Outbox::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Outbox {
    Table,
    Id,
    PatientId,
    Channel,
    To,
    Subject,
    Body,
    Status,
    Error,
    SentAt,
    CreatedAt,
}

#[derive(Iden)]
enum Patients {
    Table,
    Id,
}
