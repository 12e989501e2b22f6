//! Poll persistence.
//!
//! # Invariants
//! - Polls with ballots can be neither updated nor deleted.
//! - Poll listing is ordered by code.

use crate::model::ids::PollCode;
use crate::model::poll::Poll;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::guard::ensure_poll_mutable;
use crate::repo::{decode_poll_code, ensure_schema_ready, invalid_column};
use log::info;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const POLL_SELECT_SQL: &str = "SELECT code, question, opens_at, closes_at FROM polls";

/// Repository interface for polls.
pub trait PollRepository {
    fn create_poll(&self, poll: &Poll) -> RepoResult<()>;
    fn get_poll(&self, code: &PollCode) -> RepoResult<Option<Poll>>;
    fn list_polls(&self) -> RepoResult<Vec<Poll>>;
    /// Replaces question and window, unless ballots reference the poll.
    fn update_poll(&self, poll: &Poll) -> RepoResult<()>;
    /// Removes the poll, unless ballots reference it.
    fn delete_poll(&self, code: &PollCode) -> RepoResult<()>;
}

/// SQLite-backed poll repository.
pub struct SqlitePollRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePollRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PollRepository for SqlitePollRepository<'_> {
    fn create_poll(&self, poll: &Poll) -> RepoResult<()> {
        poll.validate()?;
        self.conn.execute(
            "INSERT INTO polls (code, question, opens_at, closes_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                poll.code.as_str(),
                poll.question.trim(),
                poll.opens_at,
                poll.closes_at,
            ],
        )?;
        info!(
            "event=poll_create module=poll status=ok poll={}",
            poll.code
        );
        Ok(())
    }

    fn get_poll(&self, code: &PollCode) -> RepoResult<Option<Poll>> {
        load_poll(self.conn, code)
    }

    fn list_polls(&self) -> RepoResult<Vec<Poll>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{POLL_SELECT_SQL} ORDER BY code ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut polls = Vec::new();
        while let Some(row) = rows.next()? {
            polls.push(parse_poll_row(row)?);
        }
        Ok(polls)
    }

    fn update_poll(&self, poll: &Poll) -> RepoResult<()> {
        poll.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if load_poll(&tx, &poll.code)?.is_none() {
            return Err(RepoError::not_found("poll", &poll.code));
        }
        ensure_poll_mutable(&tx, &poll.code)?;

        tx.execute(
            "UPDATE polls
             SET question = ?2,
                 opens_at = ?3,
                 closes_at = ?4
             WHERE code = ?1;",
            params![
                poll.code.as_str(),
                poll.question.trim(),
                poll.opens_at,
                poll.closes_at,
            ],
        )?;
        tx.commit()?;

        info!(
            "event=poll_update module=poll status=ok poll={}",
            poll.code
        );
        Ok(())
    }

    fn delete_poll(&self, code: &PollCode) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if load_poll(&tx, code)?.is_none() {
            return Err(RepoError::not_found("poll", code));
        }
        ensure_poll_mutable(&tx, code)?;

        tx.execute("DELETE FROM polls WHERE code = ?1;", [code.as_str()])?;
        tx.commit()?;

        info!("event=poll_delete module=poll status=ok poll={code}");
        Ok(())
    }
}

/// Loads one poll; shared with the ballot port.
pub(crate) fn load_poll(conn: &Connection, code: &PollCode) -> RepoResult<Option<Poll>> {
    let mut stmt = conn.prepare(&format!("{POLL_SELECT_SQL} WHERE code = ?1;"))?;
    let mut rows = stmt.query([code.as_str()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_poll_row(row)?)),
        None => Ok(None),
    }
}

fn parse_poll_row(row: &Row<'_>) -> RepoResult<Poll> {
    let code: String = row.get("code")?;
    let poll = Poll {
        code: decode_poll_code(&code, "polls.code")?,
        question: row.get("question")?,
        opens_at: row.get("opens_at")?,
        closes_at: row.get("closes_at")?,
    };
    poll.validate().map_err(|err| invalid_column("polls", err))?;
    Ok(poll)
}
