pub mod knowledge_base;
pub mod ledger;
pub mod navigation;
pub mod pacing;

pub use knowledge_base::{AnswerRules, Inference, KnowledgeBase, MANUAL_PLACEHOLDER};
pub use ledger::Ledger;
pub use pacing::Pacing;
