use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use open::that as open_link;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use rusqlite::Connection;
use tracing::{error, info};

use crate::db::search_songs;
use crate::search::{
    describe, Entry, FieldKey, FieldRole, FormSubmission, PickerConfig, RowId, SearchEditor,
};

use super::helpers::{centered_rect, conjunction_line, selector_span, song_span, surface_error};
use super::picker::PickerHost;

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Height of the summary panel under the row list.
const SUMMARY_HEIGHT: u16 = 3;

/// Field of the selected criterion that keyboard input targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Focus {
    Song1,
    Choice,
    Position,
    Song2,
}

impl Focus {
    fn next(self, paired: bool) -> Self {
        match self {
            Focus::Song1 => Focus::Choice,
            Focus::Choice => Focus::Position,
            Focus::Position if paired => Focus::Song2,
            Focus::Position | Focus::Song2 => Focus::Song1,
        }
    }

    fn role(self) -> Option<FieldRole> {
        match self {
            Focus::Song1 => Some(FieldRole::Song1),
            Focus::Song2 => Some(FieldRole::Song2),
            Focus::Choice | Focus::Position => None,
        }
    }
}

enum Mode {
    Normal,
    Picking(FieldKey),
    ConfirmReset,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state for the search builder screen.
pub struct App {
    conn: Connection,
    editor: SearchEditor<PickerHost>,
    results_url: String,
    search_limit: usize,
    selected: usize,
    focus: Focus,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(
        conn: Connection,
        picker: PickerConfig,
        results_url: String,
        search_limit: usize,
    ) -> Self {
        Self {
            conn,
            editor: SearchEditor::new(PickerHost::default(), picker),
            results_url,
            search_limit,
            selected: 0,
            focus: Focus::Song1,
            mode: Mode::Normal,
            status: None,
        }
    }

    /// URL the current search would open.
    pub fn submission_url(&self) -> Result<String> {
        let url = FormSubmission::from_rows(self.editor.rows()).to_url(&self.results_url)?;
        Ok(url.to_string())
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::Picking(field) => self.handle_picker_key(code, field)?,
            Mode::ConfirmReset => self.handle_confirm_reset(code),
        };

        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') => {
                *exit = true;
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = self.editor.total_forms().saturating_sub(1),
            KeyCode::Tab => {
                if let Some(id) = self.current_row() {
                    self.focus = self.focus.next(self.is_paired(id));
                }
            }
            KeyCode::Char('+') => {
                self.clear_status();
                self.editor.add_row();
                self.selected = self.editor.total_forms() - 1;
                self.focus = Focus::Song1;
            }
            KeyCode::Char('-') => match self.current_row() {
                Some(id) => {
                    self.clear_status();
                    self.editor.remove_row(id);
                    self.clamp_selection();
                }
                None => self.set_status("No criterion selected to remove.", StatusKind::Error),
            },
            KeyCode::Char('c') | KeyCode::Char('C') => self.toggle_choice(),
            KeyCode::Left => self.cycle_position(-1),
            KeyCode::Right => self.cycle_position(1),
            KeyCode::Char('o') | KeyCode::Char('O') => {
                let operator = self.editor.rows().operator().toggled();
                self.editor.set_operator(operator);
                self.set_status(format!("Criteria joined with {operator}."), StatusKind::Info);
            }
            KeyCode::Enter => match self.focus {
                Focus::Choice => self.toggle_choice(),
                Focus::Position => self.cycle_position(1),
                Focus::Song1 | Focus::Song2 => {
                    if let Some(field) = self.focused_field() {
                        self.clear_status();
                        return Ok(Mode::Picking(field));
                    }
                }
            },
            KeyCode::Backspace | KeyCode::Delete => self.clear_focused_song(),
            KeyCode::Char('s') | KeyCode::Char('S') => self.submit(),
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.clear_status();
                return Ok(Mode::ConfirmReset);
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_picker_key(&mut self, code: KeyCode, field: FieldKey) -> Result<Mode> {
        let limit = self.search_limit;
        let conn = &self.conn;
        let Some(picker) = self.editor.widgets_mut().get_mut(field) else {
            return Ok(Mode::Normal);
        };

        match code {
            KeyCode::Esc => {
                picker.cancel();
                return Ok(Mode::Normal);
            }
            KeyCode::Up => picker.move_highlight(-1),
            KeyCode::Down => picker.move_highlight(1),
            KeyCode::PageUp => picker.move_highlight(-5),
            KeyCode::PageDown => picker.move_highlight(5),
            KeyCode::Backspace => {
                picker.backspace();
                if let Err(err) = picker.refresh(|query| search_songs(conn, query, limit)) {
                    self.set_status(surface_error(&err), StatusKind::Error);
                }
            }
            KeyCode::Char(ch) => {
                if picker.push_char(ch) {
                    if let Err(err) = picker.refresh(|query| search_songs(conn, query, limit)) {
                        self.set_status(surface_error(&err), StatusKind::Error);
                    }
                }
            }
            KeyCode::Enter => {
                if picker.choose().is_none() {
                    return Ok(Mode::Picking(field));
                }
                let picked = self
                    .editor
                    .pick(field)
                    .map(|song| song.map(|song| song.name.clone()));
                match picked {
                    Ok(Some(name)) => self.set_status(format!("Selected {name}."), StatusKind::Info),
                    Ok(None) => {}
                    Err(err) => self.set_status(err.to_string(), StatusKind::Error),
                }
                return Ok(Mode::Normal);
            }
            _ => {}
        }
        Ok(Mode::Picking(field))
    }

    fn handle_confirm_reset(&mut self, code: KeyCode) -> Mode {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.editor.reset();
                self.selected = 0;
                self.focus = Focus::Song1;
                self.set_status("Search cleared.", StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Mode::Normal,
            _ => Mode::ConfirmReset,
        }
    }

    fn submit(&mut self) {
        let rows = self.editor.rows();
        if rows.criteria().all(|row| row.song1.is_none()) {
            self.set_status("Please pick at least one song.", StatusKind::Error);
            return;
        }

        let summary = describe(rows);
        let url = match FormSubmission::from_rows(rows).to_url(&self.results_url) {
            Ok(url) => url,
            Err(err) => {
                self.set_status(surface_error(&err), StatusKind::Error);
                return;
            }
        };

        info!(criteria = rows.total_forms(), %url, "submitting setlist search");
        if let Err(err) = open_link(url.as_str()) {
            error!(%err, "failed to open results page");
            self.set_status(format!("Failed to open results: {err}"), StatusKind::Error);
            return;
        }

        // The form is discarded once submitted, like navigating away.
        self.editor.reset();
        self.selected = 0;
        self.focus = Focus::Song1;
        self.set_status(format!("Searched: {summary}"), StatusKind::Info);
    }

    fn toggle_choice(&mut self) {
        let Some(id) = self.current_row() else {
            return;
        };
        let choice = match self.editor.rows().get(id) {
            Some(row) => row.choice.toggled(),
            None => return,
        };
        if let Err(err) = self.editor.set_choice(id, choice) {
            self.set_status(err.to_string(), StatusKind::Error);
        }
    }

    fn cycle_position(&mut self, offset: isize) {
        let Some(id) = self.current_row() else {
            return;
        };
        let position = match self.editor.rows().get(id) {
            Some(row) => row.position.cycle(offset),
            None => return,
        };
        if let Err(err) = self.editor.set_comparison_mode(id, position) {
            self.set_status(err.to_string(), StatusKind::Error);
            return;
        }
        if self.focus == Focus::Song2 && !position.is_paired() {
            self.focus = Focus::Position;
        }
    }

    fn clear_focused_song(&mut self) {
        let Some(field) = self.focused_field() else {
            return;
        };
        match self.editor.clear(field) {
            Ok(true) => self.set_status("Selection cleared.", StatusKind::Info),
            Ok(false) => {}
            Err(err) => self.set_status(err.to_string(), StatusKind::Error),
        }
    }

    fn current_row(&self) -> Option<RowId> {
        self.editor.rows().row_ids().get(self.selected).copied()
    }

    fn is_paired(&self, id: RowId) -> bool {
        self.editor
            .rows()
            .get(id)
            .is_some_and(|row| row.song2_visible())
    }

    fn focused_field(&self) -> Option<FieldKey> {
        let id = self.current_row()?;
        let role = self.focus.role()?;
        if role == FieldRole::Song2 && !self.is_paired(id) {
            return None;
        }
        Some(FieldKey::new(id, role))
    }

    fn move_selection(&mut self, offset: isize) {
        let total = self.editor.total_forms();
        if total == 0 {
            return;
        }
        let next = (self.selected as isize + offset).clamp(0, total as isize - 1);
        self.selected = next as usize;
        if let Some(id) = self.current_row() {
            if self.focus == Focus::Song2 && !self.is_paired(id) {
                self.focus = Focus::Position;
            }
        }
    }

    fn clamp_selection(&mut self) {
        let total = self.editor.total_forms();
        if self.selected >= total {
            self.selected = total.saturating_sub(1);
        }
        if let Some(id) = self.current_row() {
            if self.focus == Focus::Song2 && !self.is_paired(id) {
                self.focus = Focus::Position;
            }
        }
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(SUMMARY_HEIGHT),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_rows(frame, chunks[0]);
        self.draw_summary(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::Picking(field) => self.draw_picker(frame, area, *field),
            Mode::ConfirmReset => self.draw_confirm_reset(frame, area),
            Mode::Normal => {}
        }
    }

    fn draw_rows(&self, frame: &mut Frame, area: Rect) {
        let rows = self.editor.rows();
        let title = format!("Setlist Search ({} criteria)", rows.total_forms());
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if rows.is_empty() {
            let hint = Paragraph::new(Line::from(vec![
                Span::raw("No criteria. Press "),
                Span::styled("+", Style::default().fg(Color::Cyan)),
                Span::raw(" to add one."),
            ]));
            frame.render_widget(hint, inner);
            return;
        }

        let placeholder = self.editor.picker_config().placeholder.clone();
        let current = self.current_row();
        let width = inner.width as usize;

        let lines: Vec<Line> = rows
            .entries()
            .iter()
            .map(|entry| match entry {
                Entry::Conjunction(conjunction) => conjunction_line(conjunction.label, width),
                Entry::Criterion(row) => {
                    let is_current = current == Some(row.id);
                    let focused = |focus: Focus| is_current && self.focus == focus;
                    let marker = if is_current { "▶ " } else { "  " };
                    let mut spans = vec![
                        Span::raw(marker),
                        Span::raw("Song: "),
                        song_span(row.song1.as_ref(), &placeholder, focused(Focus::Song1)),
                        Span::raw(" "),
                        selector_span(row.choice.form_value(), focused(Focus::Choice)),
                        Span::raw(" "),
                        selector_span(row.position.label(), focused(Focus::Position)),
                    ];
                    if row.song2_visible() {
                        spans.push(Span::raw(" "));
                        spans.push(song_span(
                            row.song2.as_ref(),
                            &placeholder,
                            focused(Focus::Song2),
                        ));
                    }
                    Line::from(spans)
                }
            })
            .collect();

        // Keep the selected criterion in view: each criterion after the first
        // sits two lines further down.
        let selected_line = (self.selected * 2) as u16;
        let scroll = selected_line.saturating_sub(inner.height.saturating_sub(1));
        let paragraph = Paragraph::new(lines).scroll((scroll, 0));
        frame.render_widget(paragraph, inner);
    }

    fn draw_summary(&self, frame: &mut Frame, area: Rect) {
        let summary = describe(self.editor.rows());
        let text = if summary.is_empty() {
            Span::styled("Pick a song to start.", Style::default().fg(Color::DarkGray))
        } else {
            Span::raw(summary)
        };
        let block = Block::default().title("Summary").borders(Borders::ALL);
        let paragraph = Paragraph::new(Line::from(text))
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let keys: &[(&str, &str)] = match self.mode {
            Mode::Picking(_) => &[
                ("[Type]", " Search   "),
                ("[↑↓]", " Navigate   "),
                ("[Enter]", " Choose   "),
                ("[Esc]", " Cancel"),
            ],
            Mode::ConfirmReset => &[("[y]", " Clear search   "), ("[n]", " Keep")],
            Mode::Normal => &[
                ("[+/-]", " Add/Remove   "),
                ("[↑↓]", " Row   "),
                ("[Tab]", " Field   "),
                ("[Enter]", " Edit   "),
                ("[c]", " Is/Not   "),
                ("[←→]", " Position   "),
                ("[o]", " AND/OR   "),
                ("[s]", " Search   "),
                ("[r]", " Reset   "),
                ("[q]", " Quit"),
            ],
        };
        let spans: Vec<Span<'static>> = keys
            .iter()
            .flat_map(|(key, label)| {
                [
                    Span::styled(key.to_string(), key_style),
                    Span::raw(label.to_string()),
                ]
            })
            .collect();
        Line::from(spans)
    }

    fn draw_picker(&self, frame: &mut Frame, area: Rect, field: FieldKey) {
        if !self.editor.widgets().is_visible(field) {
            return;
        }
        let Some(picker) = self.editor.widgets().get(field) else {
            return;
        };
        let popup_area = centered_rect(60, 60, area);
        frame.render_widget(Clear, popup_area);

        let title = match field.role {
            FieldRole::Song1 => "Select Song",
            FieldRole::Song2 => "Select Following Song",
        };
        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(0)])
            .split(inner);

        let prompt = format!("Search: {}", picker.query);
        frame.render_widget(Paragraph::new(prompt.clone()), chunks[0]);
        frame.set_cursor_position((chunks[0].x + prompt.chars().count() as u16, chunks[0].y));

        let missing = picker.missing_chars();
        if missing > 0 {
            let hint = format!(
                "Please enter {missing} or more characters ({} theme)",
                picker.config().theme
            );
            frame.render_widget(
                Paragraph::new(Span::styled(hint, Style::default().fg(Color::DarkGray))),
                chunks[1],
            );
            return;
        }
        if picker.matches.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "No results found",
                    Style::default().fg(Color::DarkGray),
                )),
                chunks[1],
            );
            return;
        }

        let items: Vec<ListItem> = picker
            .matches
            .iter()
            .map(|song| ListItem::new(song.name.clone()))
            .collect();
        let list = List::new(items)
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("▶ ");
        let mut list_state = ListState::default();
        list_state.select(Some(picker.highlighted));
        frame.render_stateful_widget(list, chunks[1], &mut list_state);
    }

    fn draw_confirm_reset(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(50, 20, area);
        frame.render_widget(Clear, popup_area);
        let block = Block::default().title("Clear Search").borders(Borders::ALL);
        let paragraph = Paragraph::new(vec![
            Line::from(format!(
                "Discard all {} criteria and start over?",
                self.editor.total_forms()
            )),
            Line::from(""),
            Line::from("Press y to clear or n to keep editing."),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);
    }
}
