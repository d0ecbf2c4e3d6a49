pub mod court;
pub mod plan;
pub mod search;
pub mod session;

pub use court::{selectable_options, Bench, Court, SelectOption};
pub use plan::{load_search_plan, SearchPlan};
pub use search::{
    AttemptOutcome, CaseRecord, SearchAttempt, SearchOutcomeEvent, SearchQuery, SearchType,
};
pub use session::{CaptchaChallenge, SessionTokens};
