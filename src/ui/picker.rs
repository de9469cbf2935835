use std::collections::HashMap;

use anyhow::Result;

use crate::models::Song;
use crate::search::{FieldKey, PickerConfig, SelectionWidget};

/// Searchable single-select bound to one song field.
#[derive(Debug, Clone)]
pub(crate) struct PickerState {
    pub(crate) query: String,
    pub(crate) matches: Vec<Song>,
    pub(crate) highlighted: usize,
    pub(crate) selected: Option<Song>,
    pub(crate) visible: bool,
    config: PickerConfig,
}

impl PickerState {
    pub(crate) fn new(config: PickerConfig) -> Self {
        Self {
            query: String::new(),
            matches: Vec::new(),
            highlighted: 0,
            selected: None,
            visible: true,
            config,
        }
    }

    pub(crate) fn config(&self) -> &PickerConfig {
        &self.config
    }

    /// Append a character to the query. Returns `false` for control input.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.query.push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.query.pop();
    }

    /// Characters still needed before a search runs.
    pub(crate) fn missing_chars(&self) -> usize {
        self.config
            .min_input_length
            .saturating_sub(self.query.trim().chars().count())
    }

    /// Re-run the search through `lookup` once the query is long enough;
    /// shorter queries just clear the match list.
    pub(crate) fn refresh<F>(&mut self, lookup: F) -> Result<()>
    where
        F: FnOnce(&str) -> Result<Vec<Song>>,
    {
        if self.missing_chars() > 0 {
            self.matches.clear();
        } else {
            self.matches = lookup(self.query.trim())?;
        }
        if self.highlighted >= self.matches.len() {
            self.highlighted = self.matches.len().saturating_sub(1);
        }
        Ok(())
    }

    pub(crate) fn move_highlight(&mut self, offset: isize) {
        if self.matches.is_empty() {
            return;
        }
        let len = self.matches.len() as isize;
        let next = (self.highlighted as isize + offset).clamp(0, len - 1);
        self.highlighted = next as usize;
    }

    /// Commit the highlighted match as the picker's value.
    pub(crate) fn choose(&mut self) -> Option<&Song> {
        let song = self.matches.get(self.highlighted)?.clone();
        self.selected = Some(song);
        self.query.clear();
        self.matches.clear();
        self.highlighted = 0;
        self.selected.as_ref()
    }

    /// Drop the current value if the configuration allows clearing.
    pub(crate) fn clear(&mut self) -> bool {
        if !self.config.allow_clear || self.selected.is_none() {
            return false;
        }
        self.selected = None;
        true
    }

    /// Leave the popup without choosing anything.
    pub(crate) fn cancel(&mut self) {
        self.query.clear();
        self.matches.clear();
        self.highlighted = 0;
    }
}

/// Every picker currently bound to a song field, keyed directly by field.
#[derive(Debug, Default)]
pub(crate) struct PickerHost {
    pickers: HashMap<FieldKey, PickerState>,
}

impl PickerHost {
    pub(crate) fn get(&self, field: FieldKey) -> Option<&PickerState> {
        self.pickers.get(&field)
    }

    pub(crate) fn get_mut(&mut self, field: FieldKey) -> Option<&mut PickerState> {
        self.pickers.get_mut(&field)
    }

    pub(crate) fn is_visible(&self, field: FieldKey) -> bool {
        self.pickers.get(&field).is_some_and(|picker| picker.visible)
    }
}

impl SelectionWidget for PickerHost {
    fn attach(&mut self, field: FieldKey, config: &PickerConfig) {
        self.pickers
            .entry(field)
            .and_modify(|picker| picker.visible = true)
            .or_insert_with(|| PickerState::new(config.clone()));
    }

    fn hide(&mut self, field: FieldKey) {
        if let Some(picker) = self.pickers.get_mut(&field) {
            picker.visible = false;
            picker.cancel();
        }
    }

    fn detach(&mut self, field: FieldKey) {
        self.pickers.remove(&field);
    }

    fn value(&self, field: FieldKey) -> Option<Song> {
        self.pickers
            .get(&field)
            .and_then(|picker| picker.selected.clone())
    }

    fn clear(&mut self, field: FieldKey) -> bool {
        self.pickers
            .get_mut(&field)
            .is_some_and(|picker| picker.clear())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::search::RowId;

    fn songs() -> Vec<Song> {
        ["Backstreets", "Badlands", "Born to Run"]
            .iter()
            .enumerate()
            .map(|(i, name)| Song {
                id: i as i64 + 1,
                name: name.to_string(),
                num_plays: 10,
            })
            .collect()
    }

    fn type_query(picker: &mut PickerState, text: &str) {
        for ch in text.chars() {
            picker.push_char(ch);
        }
    }

    #[test]
    fn short_queries_do_not_search() {
        let mut picker = PickerState::new(PickerConfig::default());
        type_query(&mut picker, "Ba");
        assert_eq!(picker.missing_chars(), 1);
        picker
            .refresh(|_| Err(anyhow!("lookup should not run")))
            .unwrap();
        assert!(picker.matches.is_empty());
    }

    #[test]
    fn long_enough_queries_search_and_choose() {
        let mut picker = PickerState::new(PickerConfig::default());
        type_query(&mut picker, "Bac");
        picker
            .refresh(|query| {
                assert_eq!(query, "Bac");
                Ok(songs())
            })
            .unwrap();
        picker.move_highlight(1);
        picker.move_highlight(5);
        assert_eq!(picker.highlighted, 2);
        assert_eq!(picker.choose().map(|s| s.id), Some(3));
        assert!(picker.query.is_empty());
        assert_eq!(picker.selected.as_ref().map(|s| s.id), Some(3));
    }

    #[test]
    fn choosing_without_matches_keeps_the_value() {
        let mut picker = PickerState::new(PickerConfig::default());
        assert!(picker.choose().is_none());
        assert!(picker.selected.is_none());
    }

    #[test]
    fn clear_respects_allow_clear() {
        let mut config = PickerConfig::default();
        config.allow_clear = false;
        let mut picker = PickerState::new(config);
        picker.selected = songs().into_iter().next();
        assert!(!picker.clear());
        assert!(picker.selected.is_some());
    }

    #[test]
    fn host_keeps_hidden_state_until_detached() {
        let mut host = PickerHost::default();
        let field = FieldKey::song2(RowId(4));
        host.attach(field, &PickerConfig::default());
        host.get_mut(field).unwrap().selected = songs().into_iter().next();

        host.hide(field);
        assert!(!host.is_visible(field));
        assert_eq!(host.value(field).map(|s| s.id), Some(1));

        host.attach(field, &PickerConfig::default());
        assert!(host.is_visible(field));
        assert_eq!(host.value(field).map(|s| s.id), Some(1));

        let mut locked = PickerConfig::default();
        locked.allow_clear = false;
        host.get_mut(field).unwrap().config = locked;
        assert!(!SelectionWidget::clear(&mut host, field));
        host.get_mut(field).unwrap().config = PickerConfig::default();
        assert!(SelectionWidget::clear(&mut host, field));
        assert!(host.value(field).is_none());

        host.detach(field);
        assert!(host.get(field).is_none());
        assert!(host.value(field).is_none());
    }
}
