use std::collections::HashMap;

use anyhow::Result;
use inbox_types::{Message, StoredMessage, decode_message, encode_message};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, error, warn};

use crate::Database;
use crate::models::{MessageRow, RowError, WriteOutcome};

impl Database {
    // -- Messages --

    /// All messages, newest row first. Rows that fail to decode are skipped.
    pub fn load_all_messages(&self) -> Result<Vec<Message>> {
        Ok(self
            .load_all_stored()?
            .into_iter()
            .map(|stored| stored.message)
            .collect())
    }

    /// Like [`load_all_messages`](Self::load_all_messages) but keeps row ids.
    pub fn load_all_stored(&self) -> Result<Vec<StoredMessage>> {
        let rows = self.with_conn(|conn| query_message_rows(conn, "ORDER BY id DESC"))?;
        Ok(decode_rows(rows))
    }

    pub fn message_count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?;
            Ok(count as usize)
        })
    }

    /// Persist a batch atomically. Any failure rolls the whole batch back.
    pub fn try_insert_messages(&self, batch: &[Message]) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare("INSERT INTO messages (json) VALUES (?1)")?;
                for message in batch {
                    let json = encode_message(message)?;
                    stmt.execute([&json])?;
                    debug!(
                        row_id = tx.last_insert_rowid(),
                        user = %message.user_name,
                        "Stored message"
                    );
                }
            }
            tx.commit()?;
            Ok(batch.len())
        })
    }

    /// Best-effort insert: failures are logged and reported as
    /// [`WriteOutcome::Failed`] instead of propagating.
    pub fn insert_messages(&self, batch: &[Message]) -> WriteOutcome {
        match self.try_insert_messages(batch) {
            Ok(rows) => {
                debug!("Saved {} messages", rows);
                WriteOutcome::Committed { rows }
            }
            Err(e) => {
                error!("Failed to save {} messages: {:#}", batch.len(), e);
                WriteOutcome::Failed
            }
        }
    }

    /// Clear the unread flag on the first stored row matching `target`.
    ///
    /// Returns true when a row actually changed. A row that is already read
    /// still counts as the match, so repeated calls never touch a second row.
    pub fn mark_as_read(&self, target: &Message) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let rows = query_message_rows(&tx, "ORDER BY id ASC")?;

            let found = decode_rows(rows)
                .into_iter()
                .find(|stored| stored.message.same_entry(target));

            let Some(stored) = found else {
                debug!("mark_as_read: no stored message for {}", target.user_name);
                return Ok(false);
            };
            if !stored.message.is_unread {
                return Ok(false);
            }

            let updated = Message {
                is_unread: false,
                ..stored.message
            };
            tx.execute(
                "UPDATE messages SET json = ?1 WHERE id = ?2",
                rusqlite::params![encode_message(&updated)?, stored.id],
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    /// Clear the unread flag on the row with this id. Returns true when the
    /// row existed and was unread.
    pub fn mark_as_read_id(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let row = tx
                .query_row("SELECT id, json FROM messages WHERE id = ?1", [id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        json: row.get(1)?,
                    })
                })
                .optional()?;

            let Some(row) = row else {
                debug!("mark_as_read_id: no row {}", id);
                return Ok(false);
            };
            let stored = decode_row(row)?;
            if !stored.message.is_unread {
                return Ok(false);
            }

            let updated = Message {
                is_unread: false,
                ..stored.message
            };
            tx.execute(
                "UPDATE messages SET json = ?1 WHERE id = ?2",
                rusqlite::params![encode_message(&updated)?, id],
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    // -- Remarks --

    pub fn save_remark(&self, user_name: &str, remark: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO remarks (userName, remark) VALUES (?1, ?2)
                 ON CONFLICT(userName) DO UPDATE SET remark = excluded.remark",
                (user_name, remark),
            )?;
            Ok(())
        })
    }

    pub fn get_remark(&self, user_name: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let remark = conn
                .query_row(
                    "SELECT remark FROM remarks WHERE userName = ?1",
                    [user_name],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?;
            Ok(remark.flatten())
        })
    }

    pub fn load_all_remarks(&self) -> Result<HashMap<String, String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT userName, remark FROM remarks")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            // NULL remarks behave like no remark at all
            Ok(rows
                .into_iter()
                .filter_map(|(user, remark)| remark.map(|r| (user, r)))
                .collect())
        })
    }
}

fn query_message_rows(conn: &Connection, order: &str) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(&format!("SELECT id, json FROM messages {}", order))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                json: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn decode_row(row: MessageRow) -> std::result::Result<StoredMessage, RowError> {
    decode_message(&row.json)
        .map(|message| StoredMessage { id: row.id, message })
        .map_err(|source| RowError { id: row.id, source })
}

fn decode_rows(rows: Vec<MessageRow>) -> Vec<StoredMessage> {
    rows.into_iter()
        .filter_map(|row| match decode_row(row) {
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!("Skipping {}", e);
                None
            }
        })
        .collect()
}
