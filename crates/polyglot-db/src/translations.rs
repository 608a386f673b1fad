use chrono::Duration;
use polyglot_types::TranslationType;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::models::{NewTranslation, Page, TranslationRow, TranslationStats};
use crate::{Database, StoreError, StoreResult, format_timestamp, now, parse_timestamp};

const TRANSLATION_COLUMNS: &str = "id, user_id, original_text, translated_text, source_language, \
     target_language, translation_type, filename, artifact, created_at, updated_at";

impl Database {
    pub fn create_translation(&self, new: &NewTranslation) -> StoreResult<TranslationRow> {
        validate_new(new)?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let stamp = format_timestamp(now());
            tx.execute(
                "INSERT INTO translations (user_id, original_text, translated_text, source_language,
                     target_language, translation_type, filename, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    new.user_id,
                    new.original_text,
                    new.translated_text,
                    new.source_language.as_str(),
                    new.target_language.as_str(),
                    new.translation_type.as_str(),
                    new.filename,
                    stamp,
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    StoreError::Validation(format!("user {} does not exist", new.user_id))
                }
                other => other.into(),
            })?;
            let id = tx.last_insert_rowid();
            let row = query_owned(&tx, id, new.user_id)?.ok_or(StoreError::NotFound)?;
            tx.commit()?;

            info!(
                "Stored {} translation {} for user {} ({} -> {})",
                new.translation_type, id, new.user_id, new.source_language, new.target_language
            );
            Ok(row)
        })
    }

    /// Records the output artifact name produced for a file translation.
    pub fn set_artifact(&self, id: i64, owner_id: i64, artifact: &str) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE translations SET artifact = ?1 WHERE id = ?2 AND user_id = ?3",
                params![artifact, id, owner_id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    pub fn get_translation(&self, id: i64, owner_id: i64) -> StoreResult<Option<TranslationRow>> {
        self.with_conn(|conn| query_owned(conn, id, owner_id))
    }

    /// Replaces the translated text. The new `updated_at` is strictly later
    /// than the previous one even when the clock has not advanced.
    pub fn update_translation(&self, id: i64, owner_id: i64, translated_text: &str) -> StoreResult<TranslationRow> {
        if translated_text.trim().is_empty() {
            return Err(StoreError::Validation("translated text is required".into()));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
            let previous: String = tx
                .query_row(
                    "SELECT updated_at FROM translations WHERE id = ?1 AND user_id = ?2",
                    params![id, owner_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(StoreError::NotFound)?;

            let previous = parse_timestamp(&previous)?;
            let updated_at = now().max(previous + Duration::microseconds(1));

            tx.execute(
                "UPDATE translations SET translated_text = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
                params![translated_text, format_timestamp(updated_at), id, owner_id],
            )?;
            let row = query_owned(&tx, id, owner_id)?.ok_or(StoreError::NotFound)?;
            tx.commit()?;

            debug!("Updated translation {} for user {}", id, owner_id);
            Ok(row)
        })
    }

    /// Deletes an owned record and returns it, so the caller can clean up any
    /// artifact it referenced.
    pub fn delete_translation(&self, id: i64, owner_id: i64) -> StoreResult<TranslationRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let row = query_owned(&tx, id, owner_id)?.ok_or(StoreError::NotFound)?;
            tx.execute(
                "DELETE FROM translations WHERE id = ?1 AND user_id = ?2",
                params![id, owner_id],
            )?;
            tx.commit()?;

            info!("Deleted translation {} for user {}", id, owner_id);
            Ok(row)
        })
    }

    /// One page of an owner's history, newest first, ties broken by id
    /// descending. Pages are 1-based.
    pub fn list_translations(&self, owner_id: i64, page: u32, per_page: u32) -> StoreResult<Page<TranslationRow>> {
        if page == 0 || per_page == 0 {
            return Err(StoreError::Validation("page and page size start at 1".into()));
        }

        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM translations WHERE user_id = ?1",
                [owner_id],
                |row| row.get(0),
            )?;
            let offset = i64::from(page - 1) * i64::from(per_page);
            let items = query_recent(conn, owner_id, i64::from(per_page), offset)?;

            Ok(Page {
                items,
                page,
                per_page,
                total: total as u64,
            })
        })
    }

    pub fn recent_translations(&self, owner_id: i64, limit: u32) -> StoreResult<Vec<TranslationRow>> {
        self.with_conn(|conn| query_recent(conn, owner_id, i64::from(limit), 0))
    }

    /// Every record of an owner, newest first.
    pub fn all_translations(&self, owner_id: i64) -> StoreResult<Vec<TranslationRow>> {
        self.with_conn(|conn| query_recent(conn, owner_id, -1, 0))
    }

    /// Lazily walks an owner's history page by page.
    pub fn history_pages(&self, owner_id: i64, per_page: u32) -> HistoryPages<'_> {
        HistoryPages {
            db: self,
            owner_id,
            per_page,
            next_page: 1,
            done: false,
        }
    }

    pub fn translation_stats(&self, owner_id: i64) -> StoreResult<TranslationStats> {
        self.with_conn(|conn| {
            let mut stats = TranslationStats::default();

            let mut stmt = conn.prepare(
                "SELECT translation_type, COUNT(*) FROM translations WHERE user_id = ?1 GROUP BY translation_type",
            )?;
            let counts = stmt
                .query_map([owner_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            for (kind, count) in counts {
                let count = count as u64;
                stats.total += count;
                match kind.parse::<TranslationType>() {
                    Ok(TranslationType::Voice) => stats.voice_count = count,
                    Ok(TranslationType::Text) => stats.text_count = count,
                    Ok(TranslationType::File) => stats.file_count = count,
                    Err(e) => return Err(anyhow::Error::from(e).into()),
                }
            }

            let mut stmt = conn.prepare(
                "SELECT target_language, COUNT(*) AS n FROM translations WHERE user_id = ?1
                 GROUP BY target_language ORDER BY n DESC, target_language ASC LIMIT 3",
            )?;
            stats.top_languages = stmt
                .query_map([owner_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(stats)
        })
    }

    /// True when `artifact` was produced by one of the owner's translations.
    pub fn owns_artifact(&self, owner_id: i64, artifact: &str) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM translations WHERE artifact = ?1 AND user_id = ?2",
                    params![artifact, owner_id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }
}

/// Iterator over history pages. Each `next` issues one query; iteration stops
/// after the last non-empty page. [`HistoryPages::starting_at`] restarts the
/// walk from any page.
pub struct HistoryPages<'a> {
    db: &'a Database,
    owner_id: i64,
    per_page: u32,
    next_page: u32,
    done: bool,
}

impl HistoryPages<'_> {
    pub fn starting_at(mut self, page: u32) -> Self {
        self.next_page = page.max(1);
        self.done = false;
        self
    }
}

impl Iterator for HistoryPages<'_> {
    type Item = StoreResult<Vec<TranslationRow>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.db.list_translations(self.owner_id, self.next_page, self.per_page) {
            Ok(page) => {
                self.done = !page.has_next() || self.next_page == u32::MAX;
                self.next_page = self.next_page.saturating_add(1);
                if page.items.is_empty() {
                    None
                } else {
                    Some(Ok(page.items))
                }
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn validate_new(new: &NewTranslation) -> StoreResult<()> {
    if new.original_text.trim().is_empty() {
        return Err(StoreError::Validation("original text is required".into()));
    }
    if !new.target_language.is_resolved() {
        return Err(StoreError::Validation("target language is required".into()));
    }
    match (new.translation_type, &new.filename) {
        (TranslationType::File, None) => {
            Err(StoreError::Validation("file translations need a filename".into()))
        }
        (TranslationType::Voice | TranslationType::Text, Some(_)) => Err(StoreError::Validation(
            "only file translations carry a filename".into(),
        )),
        _ => Ok(()),
    }
}

fn map_translation(row: &Row<'_>) -> rusqlite::Result<TranslationRow> {
    Ok(TranslationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        original_text: row.get(2)?,
        translated_text: row.get(3)?,
        source_language: row.get(4)?,
        target_language: row.get(5)?,
        translation_type: row.get(6)?,
        filename: row.get(7)?,
        artifact: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn query_owned(conn: &Connection, id: i64, owner_id: i64) -> StoreResult<Option<TranslationRow>> {
    let sql = format!("SELECT {TRANSLATION_COLUMNS} FROM translations WHERE id = ?1 AND user_id = ?2");
    let row = conn.query_row(&sql, params![id, owner_id], map_translation).optional()?;
    Ok(row)
}

/// A negative `limit` means no limit.
fn query_recent(conn: &Connection, owner_id: i64, limit: i64, offset: i64) -> StoreResult<Vec<TranslationRow>> {
    let sql = format!(
        "SELECT {TRANSLATION_COLUMNS} FROM translations WHERE user_id = ?1
         ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![owner_id, limit, offset], map_translation)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyglot_types::LanguageCode;

    fn setup() -> (Database, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_user("alice", "alice@example.com", "h").unwrap().id;
        let bob = db.create_user("bob", "bob@example.com", "h").unwrap().id;
        (db, alice, bob)
    }

    fn new(owner: i64, kind: TranslationType, target: &str) -> NewTranslation {
        NewTranslation {
            user_id: owner,
            original_text: "Bonjour le monde".into(),
            translated_text: "Hello world".into(),
            source_language: LanguageCode::parse("fr").unwrap(),
            target_language: LanguageCode::parse(target).unwrap(),
            translation_type: kind,
            filename: (kind == TranslationType::File).then(|| "20240101_120000_doc.txt".to_string()),
        }
    }

    #[test]
    fn create_rejects_missing_fields() {
        let (db, alice, _) = setup();

        let mut blank = new(alice, TranslationType::Text, "en");
        blank.original_text = "   ".into();
        assert!(matches!(db.create_translation(&blank).unwrap_err(), StoreError::Validation(_)));

        let mut no_name = new(alice, TranslationType::File, "en");
        no_name.filename = None;
        assert!(matches!(db.create_translation(&no_name).unwrap_err(), StoreError::Validation(_)));

        let mut auto_target = new(alice, TranslationType::Text, "en");
        auto_target.target_language = LanguageCode::auto();
        assert!(matches!(db.create_translation(&auto_target).unwrap_err(), StoreError::Validation(_)));
    }

    #[test]
    fn create_for_unknown_user_fails() {
        let (db, _, _) = setup();
        let err = db.create_translation(&new(999, TranslationType::Text, "en")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn update_refreshes_updated_at() {
        let (db, alice, _) = setup();
        let created = db.create_translation(&new(alice, TranslationType::Text, "en")).unwrap();
        assert_eq!(created.created_at, created.updated_at);

        let first = db.update_translation(created.id, alice, "Hi world").unwrap();
        let second = db.update_translation(created.id, alice, "Hey world").unwrap();
        assert!(first.updated_at > created.created_at);
        assert!(second.updated_at > first.updated_at);

        let listed = db.list_translations(alice, 1, 10).unwrap();
        assert_eq!(listed.items[0].translated_text, "Hey world");
        assert_eq!(listed.items[0].updated_at, second.updated_at);
    }

    #[test]
    fn non_owner_sees_not_found() {
        let (db, alice, bob) = setup();
        let created = db.create_translation(&new(alice, TranslationType::Voice, "en")).unwrap();

        assert!(matches!(db.update_translation(created.id, bob, "x").unwrap_err(), StoreError::NotFound));
        assert!(matches!(db.delete_translation(created.id, bob).unwrap_err(), StoreError::NotFound));
        assert!(db.get_translation(created.id, bob).unwrap().is_none());
        assert!(db.get_translation(created.id, alice).unwrap().is_some());
    }

    #[test]
    fn deleted_record_is_gone() {
        let (db, alice, _) = setup();
        let created = db.create_translation(&new(alice, TranslationType::Text, "en")).unwrap();

        let removed = db.delete_translation(created.id, alice).unwrap();
        assert_eq!(removed.id, created.id);
        assert!(matches!(db.update_translation(created.id, alice, "x").unwrap_err(), StoreError::NotFound));
        assert!(matches!(db.delete_translation(created.id, alice).unwrap_err(), StoreError::NotFound));
    }

    #[test]
    fn listing_is_newest_first_with_id_tiebreak() {
        let (db, alice, bob) = setup();
        let ids: Vec<i64> = (0..5)
            .map(|_| db.create_translation(&new(alice, TranslationType::Text, "en")).unwrap().id)
            .collect();
        db.create_translation(&new(bob, TranslationType::Text, "en")).unwrap();

        // Force identical timestamps so only the id decides the order.
        db.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE translations SET created_at = '2024-01-01T00:00:00.000000Z' WHERE user_id = ?1",
                [alice],
            )?;
            Ok(())
        })
        .unwrap();

        let page = db.list_translations(alice, 1, 3).unwrap();
        assert_eq!(page.total, 5);
        assert!(page.has_next());
        let listed: Vec<i64> = page.items.iter().map(|r| r.id).collect();
        assert_eq!(listed, vec![ids[4], ids[3], ids[2]]);

        let page = db.list_translations(alice, 2, 3).unwrap();
        assert!(!page.has_next());
        assert_eq!(page.items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![ids[1], ids[0]]);

        assert!(matches!(db.list_translations(alice, 0, 3).unwrap_err(), StoreError::Validation(_)));
    }

    #[test]
    fn history_pages_are_lazy_and_restartable() {
        let (db, alice, _) = setup();
        for _ in 0..5 {
            db.create_translation(&new(alice, TranslationType::Text, "en")).unwrap();
        }

        let sizes: Vec<usize> = db
            .history_pages(alice, 2)
            .map(|page| page.unwrap().len())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);

        let from_third: Vec<usize> = db
            .history_pages(alice, 2)
            .starting_at(3)
            .map(|page| page.unwrap().len())
            .collect();
        assert_eq!(from_third, vec![1]);

        assert_eq!(db.history_pages(999, 2).count(), 0);
    }

    #[test]
    fn history_pages_stop_at_the_last_page_number() {
        let (db, alice, _) = setup();
        for _ in 0..3 {
            db.create_translation(&new(alice, TranslationType::Text, "en")).unwrap();
        }

        let mut pages = db.history_pages(alice, 2).starting_at(u32::MAX);
        assert!(pages.next().is_none());
        assert!(pages.next().is_none());

        let restarted: Vec<usize> = pages
            .starting_at(1)
            .map(|page| page.unwrap().len())
            .collect();
        assert_eq!(restarted, vec![2, 1]);
    }

    #[test]
    fn stats_count_types_and_rank_languages() {
        let (db, alice, _) = setup();
        for (kind, target) in [
            (TranslationType::Voice, "es"),
            (TranslationType::Voice, "de"),
            (TranslationType::Text, "de"),
            (TranslationType::Text, "es"),
            (TranslationType::File, "en"),
            (TranslationType::Text, "ja"),
        ] {
            db.create_translation(&new(alice, kind, target)).unwrap();
        }

        let stats = db.translation_stats(alice).unwrap();
        assert_eq!(stats.total, 6);
        assert_eq!(stats.total, stats.voice_count + stats.text_count + stats.file_count);
        assert_eq!((stats.voice_count, stats.text_count, stats.file_count), (2, 3, 1));
        assert_eq!(
            stats.top_languages,
            vec![("de".to_string(), 2), ("es".to_string(), 2), ("en".to_string(), 1)]
        );
    }

    #[test]
    fn stats_for_empty_history() {
        let (db, alice, _) = setup();
        let stats = db.translation_stats(alice).unwrap();
        assert_eq!(stats, TranslationStats::default());
        assert_eq!(stats.percentage(TranslationType::File), 0.0);
    }

    #[test]
    fn artifacts_are_owner_scoped() {
        let (db, alice, bob) = setup();
        let created = db.create_translation(&new(alice, TranslationType::File, "en")).unwrap();
        db.set_artifact(created.id, alice, "translated_1_doc.txt").unwrap();

        assert!(db.owns_artifact(alice, "translated_1_doc.txt").unwrap());
        assert!(!db.owns_artifact(bob, "translated_1_doc.txt").unwrap());
        assert!(matches!(db.set_artifact(created.id, bob, "x").unwrap_err(), StoreError::NotFound));
    }

    #[test]
    fn deleting_user_cascades() {
        let (db, alice, bob) = setup();
        db.create_translation(&new(alice, TranslationType::Text, "en")).unwrap();
        db.create_translation(&new(bob, TranslationType::Text, "en")).unwrap();

        db.delete_user(alice).unwrap();

        let remaining: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM translations", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(remaining, 1);
        assert_eq!(db.translation_stats(alice).unwrap().total, 0);
    }
}
