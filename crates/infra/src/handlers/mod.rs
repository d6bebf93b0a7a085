//! Job handlers: the generation orchestrator, email dispatch, and the batch
//! progress aggregator they report into.

pub mod batch;
pub mod email;
pub mod generate;

pub use batch::BatchAggregator;
pub use email::SendEmailHandler;
pub use generate::GenerateCertificateHandler;
