//! Create survey, question, option and target constraint tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Survey::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Survey::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Survey::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Survey::Description).text().not_null())
                    .col(ColumnDef::new(Survey::IsAnonymous).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(Survey::Deadline)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Survey::EstimatedTime).integer().not_null())
                    .col(ColumnDef::new(Survey::AuthorId).string_len(64).not_null())
                    .col(ColumnDef::new(Survey::IsHidden).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Survey::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Survey::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_survey_author")
                            .from(Survey::Table, Survey::AuthorId)
                            .to(User::Table, User::Uuid)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_survey_author_id")
                    .table(Survey::Table)
                    .col(Survey::AuthorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_survey_deadline")
                    .table(Survey::Table)
                    .col(Survey::Deadline)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Question::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Question::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Question::SurveyId).string_len(32).not_null())
                    .col(ColumnDef::new(Question::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(Question::Content).string_len(500).not_null())
                    .col(ColumnDef::new(Question::Position).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_question_survey")
                            .from(Question::Table, Question::SurveyId)
                            .to(Survey::Table, Survey::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_question_survey_id")
                    .table(Question::Table)
                    .col(Question::SurveyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(QuestionOption::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuestionOption::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(QuestionOption::QuestionId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QuestionOption::Content)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(ColumnDef::new(QuestionOption::ImageUrl).string_len(1024))
                    .col(ColumnDef::new(QuestionOption::Position).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_question_option_question")
                            .from(QuestionOption::Table, QuestionOption::QuestionId)
                            .to(Question::Table, Question::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_question_option_question_id")
                    .table(QuestionOption::Table)
                    .col(QuestionOption::QuestionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TargetConstraint::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TargetConstraint::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TargetConstraint::SurveyId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(TargetConstraint::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(TargetConstraint::Value).string_len(100))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_target_constraint_survey")
                            .from(TargetConstraint::Table, TargetConstraint::SurveyId)
                            .to(Survey::Table, Survey::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_target_constraint_survey_id")
                    .table(TargetConstraint::Table)
                    .col(TargetConstraint::SurveyId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TargetConstraint::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(QuestionOption::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Question::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Survey::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Survey {
    Table,
    Id,
    Title,
    Description,
    IsAnonymous,
    Deadline,
    EstimatedTime,
    AuthorId,
    IsHidden,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Question {
    Table,
    Id,
    SurveyId,
    Kind,
    Content,
    Position,
}

#[derive(Iden)]
enum QuestionOption {
    Table,
    Id,
    QuestionId,
    Content,
    ImageUrl,
    Position,
}

#[derive(Iden)]
enum TargetConstraint {
    Table,
    Id,
    SurveyId,
    Kind,
    Value,
}

#[derive(Iden)]
enum User {
    Table,
    Uuid,
}
