//! Domain vocabulary shared by the editor, the catalog and the submission
//! encoder. These stay light-weight value types: the catalog hydrates `Song`,
//! the editor stores the enums on each criterion, and the encoder turns them
//! back into the form values the results endpoint expects.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A song from the catalog, as offered by the picker.
pub struct Song {
    /// Primary key from the catalog. This is the value submitted in the
    /// `song1`/`song2` form fields.
    pub id: i64,
    /// Full song title shown in the picker and the search summary.
    pub name: String,
    /// Number of public performances. Songs that were never played publicly are
    /// kept in the catalog but excluded from searches.
    pub num_plays: i64,
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The shared conjunction between criteria. There is exactly one operator per
/// search; every conjunction row displays it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Operator {
    #[default]
    And,
    Or,
}

impl Operator {
    /// Value used in the `conjunction` form field.
    pub fn form_value(self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
        }
    }

    /// Label rendered on conjunction rows.
    pub fn label(self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Operator::And => Operator::Or,
            Operator::Or => Operator::And,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether a criterion is asserted or negated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Choice {
    #[default]
    Is,
    Not,
}

impl Choice {
    pub fn form_value(self) -> &'static str {
        match self {
            Choice::Is => "is",
            Choice::Not => "not",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Choice::Is => Choice::Not,
            Choice::Not => Choice::Is,
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.form_value())
    }
}

/// Where in a show the song has to appear. `FollowedBy` is the one mode that
/// pairs the row with a second song.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Position {
    #[default]
    Anywhere,
    FollowedBy,
    ShowOpener,
    InShow,
    InSetOne,
    SetOneOpener,
    SetOneCloser,
    InSetTwo,
    SetTwoOpener,
    SetTwoCloser,
    MainSetCloser,
    EncoreOpener,
    InEncore,
    InPreshow,
    InRecording,
    InSoundcheck,
    ShowCloser,
}

impl Position {
    /// Every position in the order the form offers them.
    pub const ALL: [Position; 17] = [
        Position::Anywhere,
        Position::FollowedBy,
        Position::ShowOpener,
        Position::InShow,
        Position::InSetOne,
        Position::SetOneOpener,
        Position::SetOneCloser,
        Position::InSetTwo,
        Position::SetTwoOpener,
        Position::SetTwoCloser,
        Position::MainSetCloser,
        Position::EncoreOpener,
        Position::InEncore,
        Position::InPreshow,
        Position::InRecording,
        Position::InSoundcheck,
        Position::ShowCloser,
    ];

    /// Value used in the `position` form field.
    pub fn form_value(self) -> &'static str {
        match self {
            Position::Anywhere => "anywhere",
            Position::FollowedBy => "followed_by",
            Position::ShowOpener => "show_opener",
            Position::InShow => "in_show",
            Position::InSetOne => "in_set_one",
            Position::SetOneOpener => "set_one_opener",
            Position::SetOneCloser => "set_one_closer",
            Position::InSetTwo => "in_set_two",
            Position::SetTwoOpener => "set_two_opener",
            Position::SetTwoCloser => "set_two_closer",
            Position::MainSetCloser => "main_set_closer",
            Position::EncoreOpener => "encore_opener",
            Position::InEncore => "in_encore",
            Position::InPreshow => "in_preshow",
            Position::InRecording => "in_recording",
            Position::InSoundcheck => "in_soundcheck",
            Position::ShowCloser => "show_closer",
        }
    }

    /// Label shown in the position selector.
    pub fn label(self) -> &'static str {
        match self {
            Position::Anywhere => "Anywhere",
            Position::FollowedBy => "Followed By",
            Position::ShowOpener => "Show Opener",
            Position::InShow => "in Main Set",
            Position::InSetOne => "in Set 1",
            Position::SetOneOpener => "Set 1 Opener",
            Position::SetOneCloser => "Set 1 Closer",
            Position::InSetTwo => "in Set 2",
            Position::SetTwoOpener => "Set 2 Opener",
            Position::SetTwoCloser => "Set 2 Closer",
            Position::MainSetCloser => "Main Set Closer",
            Position::EncoreOpener => "Encore Opener",
            Position::InEncore => "Encore",
            Position::InPreshow => "Pre-Show",
            Position::InRecording => "Recording",
            Position::InSoundcheck => "Soundcheck",
            Position::ShowCloser => "Show Closer",
        }
    }

    /// Label used by the results page summary, which names the set rather
    /// than the selector wording ("Show" instead of "in Main Set").
    pub fn summary_label(self) -> &'static str {
        match self {
            Position::InShow => "Show",
            Position::InSetOne => "Set 1",
            Position::InSetTwo => "Set 2",
            other => other.label(),
        }
    }

    pub fn is_paired(self) -> bool {
        self == Position::FollowedBy
    }

    /// Step through `ALL`, wrapping at both ends.
    pub fn cycle(self, offset: isize) -> Self {
        let len = Self::ALL.len() as isize;
        let current = Self::ALL
            .iter()
            .position(|candidate| *candidate == self)
            .unwrap_or(0) as isize;
        let next = (current + offset).rem_euclid(len);
        Self::ALL[next as usize]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_followed_by_is_paired() {
        let paired: Vec<_> = Position::ALL.iter().filter(|p| p.is_paired()).collect();
        assert_eq!(paired, vec![&Position::FollowedBy]);
    }

    #[test]
    fn position_cycle_wraps() {
        assert_eq!(Position::Anywhere.cycle(-1), Position::ShowCloser);
        assert_eq!(Position::ShowCloser.cycle(1), Position::Anywhere);
        assert_eq!(Position::Anywhere.cycle(1), Position::FollowedBy);
    }

    #[test]
    fn summary_labels_name_the_set() {
        assert_eq!(Position::InShow.summary_label(), "Show");
        assert_eq!(Position::InEncore.summary_label(), "Encore");
        assert_eq!(Position::ShowCloser.summary_label(), "Show Closer");
    }

    #[test]
    fn operator_toggles() {
        assert_eq!(Operator::default(), Operator::And);
        assert_eq!(Operator::And.toggled(), Operator::Or);
        assert_eq!(Operator::Or.label(), "OR");
        assert_eq!(Choice::Not.form_value(), "not");
    }
}
