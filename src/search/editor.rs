//! Command handlers for the search builder.
//!
//! `SearchEditor` owns the `RowList` and talks to a selection widget for the
//! song fields. The widget is a collaborator: the editor only tells it which
//! field to attach to, hide or drop, and reads back the song the user chose.

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Choice, Operator, Position, Song};

use super::rows::{FieldKey, FieldRole, Pairing, RowId, RowList};

/// Settings handed to the selection widget whenever it is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerConfig {
    /// Characters required before the widget searches the catalog.
    pub min_input_length: usize,
    pub placeholder: String,
    /// Whether a chosen song can be cleared again.
    pub allow_clear: bool,
    /// Display theme name.
    pub theme: String,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            min_input_length: 3,
            placeholder: "Select a song".to_string(),
            allow_clear: true,
            theme: "bootstrap-5".to_string(),
        }
    }
}

/// A searchable single-select bound to a song field.
pub trait SelectionWidget {
    /// Bind (or re-show) a picker on `field`. Re-attaching a hidden field keeps
    /// whatever the picker held.
    fn attach(&mut self, field: FieldKey, config: &PickerConfig);
    /// Hide the picker without forgetting its state.
    fn hide(&mut self, field: FieldKey);
    /// Drop the picker entirely.
    fn detach(&mut self, field: FieldKey);
    /// Current selection of the picker on `field`.
    fn value(&self, field: FieldKey) -> Option<Song>;
    /// Drop the picker's selection. Returns `false` when nothing was cleared.
    fn clear(&mut self, field: FieldKey) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("{0} does not exist")]
    UnknownRow(RowId),
    #[error("{0} is hidden")]
    FieldHidden(FieldKey),
}

/// Owns the row list and keeps the selection widgets in step with it.
pub struct SearchEditor<W> {
    rows: RowList,
    widgets: W,
    picker: PickerConfig,
}

impl<W: SelectionWidget> SearchEditor<W> {
    /// Build the initial state: one criterion with its song picker attached.
    pub fn new(widgets: W, picker: PickerConfig) -> Self {
        let mut editor = Self {
            rows: RowList::empty(),
            widgets,
            picker,
        };
        editor.add_row();
        editor
    }

    pub fn rows(&self) -> &RowList {
        &self.rows
    }

    pub fn widgets(&self) -> &W {
        &self.widgets
    }

    pub fn widgets_mut(&mut self) -> &mut W {
        &mut self.widgets
    }

    pub fn picker_config(&self) -> &PickerConfig {
        &self.picker
    }

    pub fn total_forms(&self) -> usize {
        self.rows.total_forms()
    }

    /// Append a criterion and attach a picker to its first song field.
    pub fn add_row(&mut self) -> RowId {
        let id = self.rows.add_row();
        self.widgets.attach(FieldKey::song1(id), &self.picker);
        debug!(row = id.0, total = self.rows.total_forms(), "added criterion");
        id
    }

    /// Remove a criterion. An empty list or an unknown id is a silent no-op
    /// reported as `false`.
    pub fn remove_row(&mut self, id: RowId) -> bool {
        if self.rows.total_forms() == 0 {
            warn!(row = id.0, "remove ignored: no criteria left");
            return false;
        }
        if !self.rows.remove_row(id) {
            warn!(row = id.0, "remove ignored: unknown criterion");
            return false;
        }
        self.widgets.detach(FieldKey::song1(id));
        self.widgets.detach(FieldKey::song2(id));
        debug!(row = id.0, total = self.rows.total_forms(), "removed criterion");
        true
    }

    /// Change the position of a criterion, revealing or hiding the second
    /// song field. Returns the row's resulting pairing.
    pub fn set_comparison_mode(
        &mut self,
        id: RowId,
        position: Position,
    ) -> Result<Pairing, EditorError> {
        let row = self.rows.get_mut(id).ok_or(EditorError::UnknownRow(id))?;
        let before = row.pairing();
        row.position = position;
        let after = row.pairing();

        match (before, after) {
            (Pairing::Single, Pairing::Paired) => {
                self.widgets.attach(FieldKey::song2(id), &self.picker);
            }
            (Pairing::Paired, Pairing::Single) => {
                self.widgets.hide(FieldKey::song2(id));
            }
            _ => {}
        }
        Ok(after)
    }

    pub fn set_choice(&mut self, id: RowId, choice: Choice) -> Result<(), EditorError> {
        let row = self.rows.get_mut(id).ok_or(EditorError::UnknownRow(id))?;
        row.choice = choice;
        Ok(())
    }

    /// Update the shared operator shown on every conjunction.
    pub fn set_operator(&mut self, operator: Operator) {
        self.rows.set_operator(operator);
    }

    /// Copy the widget's current selection for `field` onto the row.
    pub fn pick(&mut self, field: FieldKey) -> Result<Option<&Song>, EditorError> {
        let value = self.widgets.value(field);
        let row = self
            .rows
            .get_mut(field.row)
            .ok_or(EditorError::UnknownRow(field.row))?;
        if field.role == FieldRole::Song2 && !row.song2_visible() {
            return Err(EditorError::FieldHidden(field));
        }
        let slot = row.song_mut(field.role);
        *slot = value;
        Ok(slot.as_ref())
    }

    /// Forget the song chosen for `field`, both in the widget and on the row.
    /// Returns `false` when the widget had nothing to clear.
    pub fn clear(&mut self, field: FieldKey) -> Result<bool, EditorError> {
        let row = self
            .rows
            .get_mut(field.row)
            .ok_or(EditorError::UnknownRow(field.row))?;
        if field.role == FieldRole::Song2 && !row.song2_visible() {
            return Err(EditorError::FieldHidden(field));
        }
        if !self.widgets.clear(field) {
            return Ok(false);
        }
        *row.song_mut(field.role) = None;
        Ok(true)
    }

    /// Run conjunction reconciliation explicitly. Normally every structural
    /// command already does this.
    pub fn reconcile_conjunctions(&mut self) {
        self.rows.reconcile_conjunctions();
    }

    /// Discard the search and start over with a single criterion.
    pub fn reset(&mut self) {
        for id in self.rows.row_ids() {
            self.widgets.detach(FieldKey::song1(id));
            self.widgets.detach(FieldKey::song2(id));
        }
        self.rows = RowList::empty();
        self.add_row();
    }
}
