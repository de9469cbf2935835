//! Setlist search builder: row list, command handlers and submission.

mod editor;
mod rows;
mod submit;

pub use editor::{EditorError, PickerConfig, SearchEditor, SelectionWidget};
pub use rows::{
    ConjunctionId, ConjunctionRow, CriterionRow, Entry, FieldKey, FieldRole, InvariantViolation,
    Pairing, RowId, RowList,
};
pub use submit::{describe, results_url, FormSubmission};
