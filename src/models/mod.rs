mod candidate;
mod entry;
mod project;

pub use candidate::CandidateRow;
pub use entry::{Category, DedupKey, Entry, Item, NewEntry, items_total, validate_amount, validate_items};
pub use project::{NewProject, Project, ProjectForm, is_valid_tax_id, normalize_name};
