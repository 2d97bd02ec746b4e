//! Repository layer.
//!
//! Each repository wraps the shared connection and exposes the explicit
//! queries the services need. No implicit relation loading: callers
//! fetch exactly what they use.

mod comment;
mod notification;
mod report;
mod response;
mod survey;
mod token;
mod user;

pub use comment::CommentRepository;
pub use notification::NotificationRepository;
pub use report::ReportRepository;
pub use response::{NewAnswerRow, ResponseRepository, SubjectiveAnswerRow};
pub use survey::{SurveyChildren, SurveyRepository};
pub use token::TokenRepository;
pub use user::UserRepository;
