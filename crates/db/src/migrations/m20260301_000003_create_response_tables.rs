//! Create response and answer tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Response::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Response::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Response::SurveyId).string_len(32).not_null())
                    .col(ColumnDef::new(Response::UserId).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Response::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_response_survey")
                            .from(Response::Table, Response::SurveyId)
                            .to(Survey::Table, Survey::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_response_user")
                            .from(Response::Table, Response::UserId)
                            .to(User::Table, User::Uuid)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: one response per (survey, user)
        manager
            .create_index(
                Index::create()
                    .name("idx_response_survey_user")
                    .table(Response::Table)
                    .col(Response::SurveyId)
                    .col(Response::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Answer::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Answer::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Answer::ResponseId).string_len(32).not_null())
                    .col(ColumnDef::new(Answer::QuestionId).string_len(32).not_null())
                    .col(ColumnDef::new(Answer::OptionId).string_len(32))
                    .col(ColumnDef::new(Answer::Text).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_answer_response")
                            .from(Answer::Table, Answer::ResponseId)
                            .to(Response::Table, Response::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_answer_question")
                            .from(Answer::Table, Answer::QuestionId)
                            .to(Question::Table, Question::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_answer_option")
                            .from(Answer::Table, Answer::OptionId)
                            .to(QuestionOption::Table, QuestionOption::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_answer_response_id")
                    .table(Answer::Table)
                    .col(Answer::ResponseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_answer_question_id")
                    .table(Answer::Table)
                    .col(Answer::QuestionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Answer::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Response::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Response {
    Table,
    Id,
    SurveyId,
    UserId,
    CreatedAt,
}

#[derive(Iden)]
enum Answer {
    Table,
    Id,
    ResponseId,
    QuestionId,
    OptionId,
    Text,
}

#[derive(Iden)]
enum Survey {
    Table,
    Id,
}

#[derive(Iden)]
enum Question {
    Table,
    Id,
}

#[derive(Iden)]
enum QuestionOption {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Uuid,
}
