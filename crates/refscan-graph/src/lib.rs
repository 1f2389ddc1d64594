pub mod aggregator;
pub mod cancel;
pub mod orchestrator;
pub mod predicates;
pub mod record;
pub mod report;
pub mod walker;

pub use aggregator::*;
pub use cancel::*;
pub use orchestrator::*;
pub use record::*;
pub use report::*;
pub use walker::*;
