pub mod batch_result;
pub mod criteria;
pub mod entry;
pub mod loaders;
pub mod outcome;
pub mod participation;

pub use batch_result::{BatchResult, BatchSummary, FailedResult, ItemOutcome};
pub use criteria::{
    Criteria, CriteriaConfig, LatePenalty, LatePenaltyConfig, SubmissionCriteria,
    SubmissionCriteriaConfig,
};
pub use entry::{Attachment, CourseUser, DiscussionEntry, DiscussionTopic, Gradable, Submission, UserId};
pub use loaders::{load_criteria_file, CriteriaFile};
pub use outcome::{CriterionAssessment, GradeOutcome, ScoreBreakdown, WritePayload};
pub use participation::ParticipationRecord;
