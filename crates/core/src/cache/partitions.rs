//! Partition and entry operations for the SQLite backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

use super::connection::CacheDb;
use super::entry::CachedEntry;
use super::request::Request;
use super::response::{Response, ResponseType};
use super::storage::{CacheStorage, ensure_storable};
use crate::Error;

const ENTRY_COLUMNS: &str = "e.key, e.method, e.url, e.vary_json, e.response_url, e.status, e.headers_json, e.body, \
                             e.response_type, e.stored_at";

/// An `entries` row before its JSON and URL columns are decoded.
struct EntryRow {
    key: String,
    method: String,
    url: String,
    vary_json: String,
    response_url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
    response_type: String,
    stored_at: String,
}

impl EntryRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key: row.get(0)?,
            method: row.get(1)?,
            url: row.get(2)?,
            vary_json: row.get(3)?,
            response_url: row.get(4)?,
            status: row.get(5)?,
            headers_json: row.get(6)?,
            body: row.get(7)?,
            response_type: row.get(8)?,
            stored_at: row.get(9)?,
        })
    }

    fn decode(self) -> Result<CachedEntry, Error> {
        let vary: BTreeMap<String, Option<String>> = serde_json::from_str(&self.vary_json)?;
        let headers: BTreeMap<String, String> = serde_json::from_str(&self.headers_json)?;
        let url = Url::parse(&self.response_url).map_err(|e| Error::Storage(format!("corrupt record url: {e}")))?;
        let response_type = ResponseType::parse(&self.response_type)
            .ok_or_else(|| Error::Storage(format!("unknown response type: {}", self.response_type)))?;

        Ok(CachedEntry {
            key: self.key,
            url: self.url,
            method: self.method,
            vary,
            response: Response { url, status: self.status, headers, body: Bytes::from(self.body), response_type },
            stored_at: self.stored_at,
        })
    }
}

fn first_match(rows: Vec<EntryRow>, request: &Request) -> Result<Option<Response>, Error> {
    for row in rows {
        let entry = row.decode()?;
        if entry.matches(request) {
            return Ok(Some(entry.response));
        }
    }
    Ok(None)
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        let name = name.to_string();
        let key = request.key();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<EntryRow>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.partition = ?1 AND e.key = ?2"
                ))?;
                let rows = stmt
                    .query_map(params![name, key], EntryRow::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        first_match(rows, request)
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key = request.key();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<EntryRow>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries e
                     JOIN partitions p ON p.name = e.partition
                     WHERE e.key = ?1
                     ORDER BY p.seq ASC"
                ))?;
                let rows = stmt
                    .query_map(params![key], EntryRow::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        first_match(rows, request)
    }

    /// Upserts the record and its partition in one transaction.
    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        ensure_storable(request)?;
        let entry = CachedEntry::capture(request, response.clone());
        let vary_json = serde_json::to_string(&entry.vary)?;
        let headers_json = serde_json::to_string(&entry.response.headers)?;
        let name = name.to_string();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![&name, &entry.stored_at],
                )?;
                tx.execute(
                    "INSERT INTO entries (
                        partition, key, method, url, vary_json, response_url,
                        status, headers_json, body, response_type, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    ON CONFLICT(partition, key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        vary_json = excluded.vary_json,
                        response_url = excluded.response_url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        response_type = excluded.response_type,
                        stored_at = excluded.stored_at",
                    params![
                        &name,
                        &entry.key,
                        &entry.method,
                        &entry.url,
                        &vary_json,
                        entry.response.url.as_str(),
                        entry.response.status,
                        &headers_json,
                        entry.response.body.as_ref(),
                        entry.response.response_type.as_str(),
                        &entry.stored_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY seq ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn entries(&self, name: &str) -> Result<Vec<CachedEntry>, Error> {
        let name = name.to_string();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<EntryRow>, Error> {
                let mut stmt =
                    conn.prepare(&format!("SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.partition = ?1 ORDER BY e.url"))?;
                let rows = stmt
                    .query_map(params![name], EntryRow::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter().map(EntryRow::decode).collect()
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}
