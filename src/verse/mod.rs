pub mod catalog;

pub use catalog::Catalog;

use std::path::Path;

use quick_xml::escape::{resolve_html5_entity, unescape_with};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, warn};

use crate::error::{ReelError, Result};

/// Verse text ready for layout, with the mushaf page it appears on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseText {
    pub sura: u32,
    pub ayah: u32,
    pub page: u32,
    pub text: String,
}

/// Storage for scripture text and page metadata, keyed by `(sura, ayah)`.
pub trait VerseDataRepository {
    /// Page number and raw (entity-encoded) text of a verse.
    fn lookup(&self, sura: u32, ayah: u32) -> Result<(u32, String)>;

    /// Per-line fragments of the verse as laid out on the printed page, in
    /// page order. Used to restore spacing the primary text drops.
    fn page_fragments(&self, sura: u32, ayah: u32) -> Result<Vec<String>>;

    fn verse_text(&self, sura: u32, ayah: u32) -> Result<VerseText> {
        let (page, raw) = self.lookup(sura, ayah)?;
        let fragments: Vec<String> = self
            .page_fragments(sura, ayah)?
            .iter()
            .map(|f| decode_entities(f))
            .collect();
        let text = restore_spacing(&decode_entities(&raw), &fragments);

        Ok(VerseText {
            sura,
            ayah,
            page,
            text,
        })
    }
}

pub struct SqliteVerseRepository {
    conn: Connection,
}

impl SqliteVerseRepository {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReelError::FileNotFound(path.display().to_string()));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        debug!("Opened verse database {}", path.display());
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl VerseDataRepository for SqliteVerseRepository {
    fn lookup(&self, sura: u32, ayah: u32) -> Result<(u32, String)> {
        self.conn
            .query_row(
                "SELECT page, text FROM sura_ayah_page_text WHERE sura = ?1 AND ayah = ?2",
                params![sura, ayah],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or(ReelError::LookupNotFound { sura, ayah })
    }

    fn page_fragments(&self, sura: u32, ayah: u32) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT text FROM madani_page_text WHERE sura = ?1 AND ayah = ?2 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![sura, ayah], |row| row.get(0))?;
        let fragments = rows.collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(fragments)
    }
}

/// Decode numeric and HTML5 named character references. Text with a
/// malformed or unknown reference is kept as stored.
pub fn decode_entities(text: &str) -> String {
    match unescape_with(text, resolve_html5_entity) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            warn!("Keeping undecodable verse text {text:?}: {e}");
            text.to_string()
        }
    }
}

/// Re-insert the wide gaps between printed page lines. For every fragment
/// but the last, the first occurrence of its final glyph in `text` gets two
/// spaces appended.
pub fn restore_spacing(text: &str, fragments: &[String]) -> String {
    let mut text = text.to_string();
    let Some((_, leading)) = fragments.split_last() else {
        return text;
    };

    for fragment in leading {
        let Some(last) = fragment.chars().last() else {
            continue;
        };
        let mut buf = [0u8; 4];
        let glyph: &str = last.encode_utf8(&mut buf);
        text = text.replacen(glyph, &format!("{glyph}  "), 1);
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_repository() -> SqliteVerseRepository {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE sura_ayah_page_text (sura INTEGER, ayah INTEGER, page INTEGER, text TEXT);
             CREATE TABLE madani_page_text (sura INTEGER, ayah INTEGER, text TEXT);
             INSERT INTO sura_ayah_page_text VALUES (2, 255, 42, '&#xFB51;&#xFB52;&#xFB53;&#xFB54;');
             INSERT INTO madani_page_text VALUES (2, 255, '&#xFB51;&#xFB52;');
             INSERT INTO madani_page_text VALUES (2, 255, '&#xFB53;&#xFB54;');
             INSERT INTO sura_ayah_page_text VALUES (1, 1, 1, 'abc');",
        )
        .unwrap();
        SqliteVerseRepository::from_connection(conn)
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("&#xFB51;"), "\u{FB51}");
        assert_eq!(decode_entities("&#65;&#x42;C"), "ABC");
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&hellip;&eacute;"), "\u{2026}\u{e9}");
        assert_eq!(decode_entities("a&zwj;b&nbsp;"), "a\u{200d}b\u{a0}");
        assert_eq!(decode_entities("&bogus; x"), "&bogus; x");
        assert_eq!(decode_entities("&#xZZ;"), "&#xZZ;");
        assert_eq!(decode_entities("plain"), "plain");
    }

    #[test]
    fn test_restore_spacing() {
        let fragments = vec!["ab".to_string(), "cd".to_string(), "ef".to_string()];
        assert_eq!(restore_spacing("abcdef", &fragments), "ab  cd  ef");
    }

    #[test]
    fn test_restore_spacing_only_first_occurrence() {
        let fragments = vec!["xa".to_string(), "last".to_string()];
        assert_eq!(restore_spacing("abab", &fragments), "a  bab");
    }

    #[test]
    fn test_restore_spacing_without_fragments() {
        assert_eq!(restore_spacing("abc", &[]), "abc");
        assert_eq!(restore_spacing("abc", &["only".to_string()]), "abc");
        assert_eq!(
            restore_spacing("abc", &[String::new(), "x".to_string()]),
            "abc"
        );
    }

    #[test]
    fn test_lookup() {
        let repo = seeded_repository();
        let (page, raw) = repo.lookup(2, 255).unwrap();
        assert_eq!(page, 42);
        assert!(raw.starts_with("&#xFB51;"));
    }

    #[test]
    fn test_lookup_not_found() {
        let repo = seeded_repository();
        assert!(matches!(
            repo.lookup(3, 1),
            Err(ReelError::LookupNotFound { sura: 3, ayah: 1 })
        ));
    }

    #[test]
    fn test_verse_text_restores_spacing() {
        let repo = seeded_repository();
        let verse = repo.verse_text(2, 255).unwrap();
        assert_eq!(verse.page, 42);
        assert_eq!(verse.text, "\u{FB51}\u{FB52}  \u{FB53}\u{FB54}");
    }

    #[test]
    fn test_verse_text_without_fragments() {
        let repo = seeded_repository();
        let verse = repo.verse_text(1, 1).unwrap();
        assert_eq!(verse.text, "abc");
    }

    #[test]
    fn test_open_missing_database() {
        assert!(matches!(
            SqliteVerseRepository::open(Path::new("/nonexistent/text.db")),
            Err(ReelError::FileNotFound(_))
        ));
    }
}
