use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::Song;

fn song_from_row(row: &Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        name: row.get(1)?,
        num_plays: row.get(2)?,
    })
}

/// Songs whose name contains `query`, case-insensitively. Only songs with at
/// least one public performance are offered, ordered by name like the form's
/// choice list.
pub fn search_songs(conn: &Connection, query: &str, limit: usize) -> Result<Vec<Song>> {
    let pattern = format!("%{}%", escape_like(query.trim()));
    let mut stmt = conn
        .prepare(
            "SELECT id, name, num_plays_public
             FROM songs
             WHERE num_plays_public >= 1
               AND (name LIKE ?1 ESCAPE '\\' OR short_name LIKE ?1 ESCAPE '\\')
             ORDER BY name COLLATE NOCASE
             LIMIT ?2",
        )
        .context("failed to prepare song search")?;

    let songs = stmt
        .query_map(params![pattern, limit as i64], song_from_row)
        .context("failed to iterate song matches")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect song matches")?;

    Ok(songs)
}

/// Look up a single song by id.
pub fn fetch_song(conn: &Connection, id: i64) -> Result<Option<Song>> {
    conn.query_row(
        "SELECT id, name, num_plays_public FROM songs WHERE id = ?1",
        [id],
        song_from_row,
    )
    .optional()
    .context("failed to fetch song")
}

/// Insert a song and echo the hydrated struct.
pub fn create_song(conn: &Connection, name: &str, num_plays: i64) -> Result<Song> {
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("Song name is required."));
    }
    conn.execute(
        "INSERT INTO songs (name, num_plays_public) VALUES (?1, ?2)",
        params![name, num_plays],
    )
    .with_context(|| format!("failed to insert song {name:?}"))?;

    Ok(Song {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        num_plays,
    })
}

/// Load songs from text, one `name[,plays]` per line. Blank lines and lines
/// starting with `#` are skipped; a missing play count means one public play.
/// Existing names are left untouched. Returns the number of new songs.
pub fn import_songs(conn: &mut Connection, text: &str) -> Result<usize> {
    let tx = conn
        .transaction()
        .context("failed to start import transaction")?;
    let mut inserted = 0usize;
    {
        let mut stmt = tx
            .prepare("INSERT OR IGNORE INTO songs (name, num_plays_public) VALUES (?1, ?2)")
            .context("failed to prepare song import")?;
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, plays) = parse_import_line(line)
                .with_context(|| format!("line {}: could not parse {line:?}", line_no + 1))?;
            inserted += stmt
                .execute(params![name, plays])
                .with_context(|| format!("line {}: failed to insert song", line_no + 1))?;
        }
    }
    tx.commit().context("failed to commit song import")?;
    Ok(inserted)
}

fn parse_import_line(line: &str) -> Result<(&str, i64)> {
    match line.rsplit_once(',') {
        Some((name, plays)) if is_count(plays.trim()) => {
            let plays = plays
                .trim()
                .parse::<i64>()
                .context("play count must be an integer")?;
            Ok((name.trim(), plays))
        }
        _ => Ok((line, 1)),
    }
}

fn is_count(raw: &str) -> bool {
    !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit())
}

/// Total number of songs in the catalog, searchable or not.
pub fn song_count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))
        .context("failed to count songs")
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn catalog() -> Connection {
        let mut conn = open_in_memory().unwrap();
        import_songs(
            &mut conn,
            "Thunder Road,1200\n\
             Born to Run,1500\n\
             # comment\n\
             \n\
             Thundercrack,90\n\
             Unplayed Outtake,0\n\
             100% Pure\n",
        )
        .unwrap();
        conn
    }

    #[test]
    fn import_counts_new_songs_only() {
        let mut conn = catalog();
        assert_eq!(song_count(&conn).unwrap(), 5);
        let again = import_songs(&mut conn, "Thunder Road,1\nJungleland,700\n").unwrap();
        assert_eq!(again, 1);
        assert_eq!(song_count(&conn).unwrap(), 6);
    }

    #[test]
    fn search_is_case_insensitive_and_ordered() {
        let conn = catalog();
        let names: Vec<_> = search_songs(&conn, "thunder", 10)
            .unwrap()
            .into_iter()
            .map(|song| song.name)
            .collect();
        assert_eq!(names, vec!["Thunder Road", "Thundercrack"]);
    }

    #[test]
    fn search_hides_unplayed_songs_and_respects_limit() {
        let conn = catalog();
        assert!(search_songs(&conn, "Outtake", 10).unwrap().is_empty());
        assert_eq!(search_songs(&conn, "", 2).unwrap().len(), 2);
    }

    #[test]
    fn like_wildcards_are_literal() {
        let conn = catalog();
        let hits = search_songs(&conn, "100%", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].num_plays, 1);
        assert!(search_songs(&conn, "_", 10).unwrap().is_empty());
    }

    #[test]
    fn create_and_fetch_round_trip() {
        let conn = open_in_memory().unwrap();
        let song = create_song(&conn, "  Badlands ", 900).unwrap();
        assert_eq!(song.name, "Badlands");
        assert_eq!(fetch_song(&conn, song.id).unwrap(), Some(song));
        assert_eq!(fetch_song(&conn, 4242).unwrap(), None);
        assert!(create_song(&conn, "   ", 1).is_err());
        assert!(create_song(&conn, "Badlands", 1).is_err());
    }

    #[test]
    fn comma_in_name_without_count_is_kept() {
        assert_eq!(
            parse_import_line("Hey, Blue Eyes").unwrap(),
            ("Hey, Blue Eyes", 1)
        );
        assert_eq!(parse_import_line("Hey, Blue Eyes,3").unwrap(), ("Hey, Blue Eyes", 3));
    }
}
