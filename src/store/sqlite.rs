use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::domain::digest::{Digest, DigestItem, RecommendedAction};
use crate::store::repo::{HistoryEntry, HistoryRepository, RecordOutcome};

pub struct SqliteRepo {
    conn: Connection,
}

/// The part of an item that identifies "the same digest" across runs.
#[derive(Serialize)]
struct FingerprintItem<'a> {
    id: Option<&'a str>,
    from: &'a str,
    subject: &'a str,
    summary: &'a str,
    action: &'a str,
    reply: &'a str,
}

fn fingerprint(digest: &Digest) -> Result<String> {
    let items: Vec<FingerprintItem> = digest
        .items
        .iter()
        .map(|i| FingerprintItem {
            id: i.email_id(),
            from: &i.from,
            subject: &i.subject,
            summary: &i.summary,
            action: i.recommended_action.as_str(),
            reply: &i.reply_content,
        })
        .collect();
    Ok(serde_json::to_string(&items)?)
}

impl SqliteRepo {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.migrate()?;
        Ok(repo)
    }

    pub fn open_in_memory() -> Result<Self> {
        let repo = Self {
            conn: Connection::open_in_memory()?,
        };
        repo.migrate()?;
        Ok(repo)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS digests (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                at_epoch        INTEGER NOT NULL,
                global_summary  TEXT,
                fingerprint     TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS digest_items (
                digest_id       INTEGER NOT NULL REFERENCES digests(id) ON DELETE CASCADE,
                position        INTEGER NOT NULL,
                email_id        TEXT,
                sender          TEXT NOT NULL,
                subject         TEXT NOT NULL,
                summary         TEXT NOT NULL,
                action          TEXT NOT NULL,
                reply_content   TEXT NOT NULL,
                PRIMARY KEY (digest_id, position)
            );
            "#,
        )?;
        Ok(())
    }

    fn load_items(&self, digest_id: i64) -> Result<Vec<DigestItem>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT email_id, sender, subject, summary, action, reply_content
            FROM digest_items
            WHERE digest_id = ?1
            ORDER BY position
            "#,
        )?;
        let mut rows = stmt.query(params![digest_id])?;
        let mut out = Vec::new();
        while let Some(r) = rows.next()? {
            let action: String = r.get(4)?;
            out.push(DigestItem {
                id: r.get(0)?,
                from: r.get(1)?,
                subject: r.get(2)?,
                summary: r.get(3)?,
                recommended_action: RecommendedAction::parse(&action),
                reply_content: r.get(5)?,
                ..Default::default()
            });
        }
        Ok(out)
    }
}

impl HistoryRepository for SqliteRepo {
    fn record_digest(&self, digest: &Digest, at_epoch: i64) -> Result<RecordOutcome> {
        let fp = fingerprint(digest)?;

        let last: Option<String> = self
            .conn
            .query_row(
                "SELECT fingerprint FROM digests ORDER BY id DESC LIMIT 1",
                [],
                |r| r.get(0),
            )
            .optional()?;
        if last.as_deref() == Some(fp.as_str()) {
            return Ok(RecordOutcome::Duplicate);
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO digests (at_epoch, global_summary, fingerprint) VALUES (?1, ?2, ?3)",
            params![at_epoch, digest.global_summary, fp],
        )?;
        let digest_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO digest_items
                  (digest_id, position, email_id, sender, subject, summary, action, reply_content)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )?;
            for (pos, it) in digest.items.iter().enumerate() {
                stmt.execute(params![
                    digest_id,
                    pos as i64,
                    it.email_id(),
                    it.from,
                    it.subject,
                    it.summary,
                    it.recommended_action.as_str(),
                    it.reply_content,
                ])?;
            }
        }
        tx.commit()?;
        Ok(RecordOutcome::Recorded(digest_id))
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, at_epoch, global_summary
            FROM digests
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;
        let heads = stmt
            .query_map(params![limit as i64], |r| {
                Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?, r.get(2)?))
            })?
            .collect::<rusqlite::Result<Vec<(i64, i64, Option<String>)>>>()?;

        let mut out = Vec::with_capacity(heads.len());
        for (id, at_epoch, global_summary) in heads {
            out.push(HistoryEntry {
                id,
                at_epoch,
                global_summary,
                items: self.load_items(id)?,
            });
        }
        Ok(out)
    }

    fn prune_keep_recent(&self, keep: usize) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            DELETE FROM digests
            WHERE id NOT IN (
              SELECT id FROM digests ORDER BY id DESC LIMIT ?1
            )
            "#,
            params![keep as i64],
        )?;
        // in case foreign keys were off when rows were written
        tx.execute(
            "DELETE FROM digest_items WHERE digest_id NOT IN (SELECT id FROM digests)",
            [],
        )?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(subjects: &[&str]) -> Digest {
        Digest::new(
            subjects
                .iter()
                .enumerate()
                .map(|(n, s)| DigestItem {
                    id: Some(format!("id-{n}")),
                    from: "sender@example.com".into(),
                    subject: s.to_string(),
                    summary: format!("about {s}"),
                    recommended_action: if s.starts_with("Sale") {
                        RecommendedAction::Trash
                    } else {
                        RecommendedAction::Reply
                    },
                    reply_content: "ok".into(),
                    body: "full body is not stored".into(),
                    ..Default::default()
                })
                .collect(),
            Some("Two emails.".into()),
        )
    }

    #[test]
    fn records_and_lists_newest_first() {
        let repo = SqliteRepo::open_in_memory().unwrap();
        let first = repo.record_digest(&digest(&["Hello"]), 100).unwrap();
        let second = repo
            .record_digest(&digest(&["Deadline", "Sale 50%"]), 200)
            .unwrap();
        assert!(matches!(first, RecordOutcome::Recorded(_)));
        assert!(matches!(second, RecordOutcome::Recorded(_)));

        let entries = repo.list_recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].at_epoch, 200);
        assert_eq!(entries[0].items.len(), 2);
        assert_eq!(entries[0].items[1].recommended_action, RecommendedAction::Trash);
        assert_eq!(entries[0].items[0].body, "");
        assert_eq!(entries[0].global_summary.as_deref(), Some("Two emails."));
    }

    #[test]
    fn consecutive_duplicate_is_skipped() {
        let repo = SqliteRepo::open_in_memory().unwrap();
        repo.record_digest(&digest(&["A", "B"]), 1).unwrap();
        assert_eq!(
            repo.record_digest(&digest(&["A", "B"]), 2).unwrap(),
            RecordOutcome::Duplicate
        );

        // not consecutive any more once something else was recorded
        repo.record_digest(&digest(&["C"]), 3).unwrap();
        assert!(matches!(
            repo.record_digest(&digest(&["A", "B"]), 4).unwrap(),
            RecordOutcome::Recorded(_)
        ));
        assert_eq!(repo.list_recent(10).unwrap().len(), 3);
    }

    #[test]
    fn prune_keeps_latest() {
        let repo = SqliteRepo::open_in_memory().unwrap();
        for n in 0..5 {
            let subject = format!("mail {n}");
            repo.record_digest(&digest(&[subject.as_str()]), n).unwrap();
        }
        repo.prune_keep_recent(2).unwrap();

        let entries = repo.list_recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].items[0].subject, "mail 4");
        assert_eq!(entries[1].items[0].subject, "mail 3");
    }

    #[test]
    fn reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        {
            let repo = SqliteRepo::open(&path).unwrap();
            repo.record_digest(&digest(&["persisted"]), 7).unwrap();
        }
        let repo = SqliteRepo::open(&path).unwrap();
        assert_eq!(repo.list_recent(1).unwrap()[0].items[0].subject, "persisted");
    }
}
