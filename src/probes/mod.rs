pub mod age;
pub mod backend;
pub mod checks;
pub mod live;
pub mod orchestrator;
pub mod scoring;
pub mod whois;

pub use backend::{DnsAnswer, ProbeBackend, RecordKind};
pub use live::LiveBackend;
pub use orchestrator::{DomainAssessor, ProbeOrchestrator};
pub use scoring::ScoringPolicy;
