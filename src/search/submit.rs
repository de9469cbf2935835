//! Outbound encoding of a search: the indexed form fields the results endpoint
//! reads, the URL carrying them, and the one-line summary shown to the user.

use anyhow::{Context, Result};
use url::Url;

use crate::models::Position;

use super::rows::{CriterionRow, RowList};

/// Prefix of every formset field.
const FORM_PREFIX: &str = "form";
/// Upper bound the endpoint accepts for `MAX_NUM_FORMS`.
const MAX_NUM_FORMS: usize = 1000;

/// Ordered key/value pairs ready to be sent as a query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pairs: Vec<(String, String)>,
}

impl FormSubmission {
    pub fn from_rows(rows: &RowList) -> Self {
        let mut pairs = vec![
            management("TOTAL_FORMS", rows.total_forms()),
            management("INITIAL_FORMS", 0),
            management("MIN_NUM_FORMS", 0),
            management("MAX_NUM_FORMS", MAX_NUM_FORMS),
        ];

        // Dense ordinals rather than row ids so the endpoint always sees
        // 0..TOTAL_FORMS.
        for (ordinal, row) in rows.criteria().enumerate() {
            pairs.push((
                field(ordinal, "song1"),
                row.song1
                    .as_ref()
                    .map(|song| song.id.to_string())
                    .unwrap_or_default(),
            ));
            pairs.push((field(ordinal, "choice"), row.choice.form_value().to_string()));
            pairs.push((
                field(ordinal, "position"),
                row.position.form_value().to_string(),
            ));
            if row.song2_visible() {
                pairs.push((
                    field(ordinal, "song2"),
                    row.song2
                        .as_ref()
                        .map(|song| song.id.to_string())
                        .unwrap_or_default(),
                ));
            }
        }

        pairs.push((
            "conjunction".to_string(),
            rows.operator().form_value().to_string(),
        ));

        Self { pairs }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }

    /// Attach the fields to `results_url`, replacing any query it had.
    pub fn to_url(&self, results_url: &str) -> Result<Url> {
        let mut url = Url::parse(results_url)
            .with_context(|| format!("invalid results URL: {results_url}"))?;
        url.query_pairs_mut()
            .clear()
            .extend_pairs(self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        Ok(url)
    }
}

fn management(name: &str, value: usize) -> (String, String) {
    (format!("{FORM_PREFIX}-{name}"), value.to_string())
}

fn field(ordinal: usize, name: &str) -> String {
    format!("{FORM_PREFIX}-{ordinal}-{name}")
}

/// Join `base_url` and `results_path` into the endpoint URL.
pub fn results_url(base_url: &str, results_path: &str) -> Result<String> {
    let base = Url::parse(base_url).with_context(|| format!("invalid base URL: {base_url}"))?;
    let joined = base
        .join(results_path)
        .with_context(|| format!("invalid results path: {results_path}"))?;
    Ok(joined.to_string())
}

/// Human-readable summary of the search, e.g.
/// `Thunder Road (is followed by) Born to Run AND Jungleland (not Show Closer)`.
/// Criteria without a first song do not take part in a search and are left
/// out.
pub fn describe(rows: &RowList) -> String {
    let separator = format!(" {} ", rows.operator().label());
    rows.criteria()
        .filter_map(describe_row)
        .collect::<Vec<_>>()
        .join(&separator)
}

fn describe_row(row: &CriterionRow) -> Option<String> {
    let song1 = row.song1.as_ref()?;
    let text = match row.position {
        Position::FollowedBy => {
            let song2 = row
                .effective_song2()
                .map(|song| song.name.as_str())
                .unwrap_or("?");
            format!("{} ({} followed by) {}", song1.name, row.choice, song2)
        }
        Position::Anywhere => format!("{} ({} anywhere)", song1.name, row.choice),
        other => format!("{} ({} {})", song1.name, row.choice, other.summary_label()),
    };
    Some(text)
}
