//! Database entities.

pub mod answer;
pub mod comment;
pub mod notification;
pub mod question;
pub mod question_option;
pub mod refresh_session;
pub mod report;
pub mod response;
pub mod survey;
pub mod target_constraint;
pub mod token_blacklist;
pub mod user;

pub use answer::Entity as Answer;
pub use comment::Entity as Comment;
pub use notification::Entity as Notification;
pub use question::Entity as Question;
pub use question_option::Entity as QuestionOption;
pub use refresh_session::Entity as RefreshSession;
pub use report::Entity as Report;
pub use response::Entity as Response;
pub use survey::Entity as Survey;
pub use target_constraint::Entity as TargetConstraint;
pub use token_blacklist::Entity as TokenBlacklist;
pub use user::Entity as User;
