//! Bank statement import: normalize, classify, reconcile, then write.

pub mod classification;
pub mod detailing;
pub mod normalizer;
pub mod onboarding;
pub mod reconcile;
pub mod session;
pub mod writer;

pub use classification::ClassificationGrid;
pub use detailing::{DetailingFlow, DetailingStep, SelectionRow};
pub use normalizer::{parse_amount, parse_date, parse_statement, parse_workbook, read_statement};
pub use onboarding::{OnboardingFlow, OnboardingStep};
pub use reconcile::{Partition, PendingMaterial, ProjectIndex, partition};
pub use session::{ImportSession, ImportStep};
pub use writer::{WriteOutcome, WriteReport, write_entries};
