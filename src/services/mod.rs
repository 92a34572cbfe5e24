pub mod criteria_validator;
pub mod grade_writer;
pub mod paginated_fetcher;
pub mod score_calculator;
pub mod scorer;
pub mod thread_reconstructor;

pub use grade_writer::{GradeWriter, LmsGradeWriter};
pub use paginated_fetcher::PaginatedFetcher;
pub use scorer::{DiscussionScorer, FnScorer, ItemScorer, SubmissionScorer};
pub use thread_reconstructor::ThreadIndex;
