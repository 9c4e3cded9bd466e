use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum ReminderLog {
    Table,
    Id,
    SentAt,
    PendingCount,
    PendingTotalMinor,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReminderLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReminderLog::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReminderLog::SentAt).timestamp().not_null())
                    .col(
                        ColumnDef::new(ReminderLog::PendingCount)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReminderLog::PendingTotalMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-reminder_log-sent_at")
                    .table(ReminderLog::Table)
                    .col(ReminderLog::SentAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReminderLog::Table).to_owned())
            .await?;
        Ok(())
    }
}
