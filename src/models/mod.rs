pub mod candidate;
pub mod form_control;
pub mod job_record;
pub mod search;
pub mod stats;

pub use candidate::{CandidateSet, CandidateStatus, JobCandidate};
pub use form_control::{DocumentKind, FormControl, StepAction};
pub use job_record::{split_page_title, JobRecord, TIMESTAMP_FORMAT};
pub use search::{ExperienceLevel, SearchCombination};
pub use stats::{CampaignStats, PairStats};
