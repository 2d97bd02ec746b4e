//! Business logic services.

#![allow(missing_docs)]

pub mod auth;
pub mod comment;
pub mod idp;
pub mod report;
pub mod survey;
pub mod token;
pub mod user;

pub use auth::{AuthService, LoginResponse};
pub use comment::{CommentService, CommentView};
pub use idp::{IdpClient, IdpUserInfo};
pub use report::ReportService;
pub use survey::{
    CreateConstraintInput, CreateOptionInput, CreateQuestionInput, CreateSurveyInput,
    OptionTally, QuestionResults, QuestionWithOptions, SubjectiveAnswerView, SubjectivePage,
    SurveyDetail, SurveyResults, SurveyService, SurveySummary, SurveyTab, VoteAnswerInput,
};
pub use token::{Claims, TokenKind, TokenPair, TokenService, hash_token};
pub use user::{
    MyCommentSummary, MyResponseSummary, MySurveySummary, UpdateProfileInput, UserService,
};
