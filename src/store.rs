use chrono::Utc;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};
use crate::models::{ApplicationRecord, Draft, Status, date_timestamp, parse_date};

/// Owns the application list and its file on disk. Every mutation
/// validates, applies in memory, then saves the whole collection.
///
/// If the save fails the in-memory change is kept and the error is
/// returned; a later successful save writes the full state.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    records: Vec<ApplicationRecord>,
}

/// On-disk shape. Files written before ids and timestamps existed may
/// lack either field.
#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    id: Option<i64>,
    date: String,
    company: String,
    job: String,
    description: String,
    status: Status,
    #[serde(default)]
    timestamp: Option<f64>,
}

impl RawRecord {
    /// A missing id becomes the zero-based file position (best-effort
    /// legacy fallback; a file mixing explicit out-of-order ids with
    /// legacy entries can still collide). A missing timestamp comes
    /// from the date, or the load clock if the date does not parse.
    fn into_record(self, position: usize, now: f64) -> ApplicationRecord {
        let timestamp = self
            .timestamp
            .unwrap_or_else(|| parse_date(&self.date).map(date_timestamp).unwrap_or(now));
        ApplicationRecord {
            id: self.id.unwrap_or(position as i64),
            date: self.date,
            company: self.company,
            job: self.job,
            description: self.description,
            status: self.status,
            timestamp,
        }
    }
}

impl Store {
    /// Read the collection at `path`. An absent file is an empty
    /// collection; a file that cannot be read or parsed is a load
    /// error the caller may recover from by starting empty.
    pub fn open(path: PathBuf) -> StoreResult<Self> {
        let raw: Vec<RawRecord> = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| StoreError::Load {
                path: path.clone(),
                detail: e.to_string(),
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(StoreError::Load {
                    path,
                    detail: e.to_string(),
                });
            }
        };

        let now = Utc::now().timestamp() as f64;
        let records = raw
            .into_iter()
            .enumerate()
            .map(|(position, r)| r.into_record(position, now))
            .collect();

        Ok(Self { path, records })
    }

    /// An empty store at `path`. Nothing is written until the first save.
    pub fn empty(path: PathBuf) -> Self {
        Self {
            path,
            records: Vec::new(),
        }
    }

    pub fn default_path() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "apptrack") {
            proj_dirs.data_dir().join("applications.json")
        } else {
            PathBuf::from("applications.json")
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read-only snapshot in insertion order.
    pub fn all(&self) -> &[ApplicationRecord] {
        &self.records
    }

    /// max(existing ids) + 1, or 1 for an empty collection. Unique as
    /// long as every insert went through `add`.
    pub fn next_id(&self) -> i64 {
        self.records.iter().map(|r| r.id).max().map_or(1, |m| m + 1)
    }

    pub fn resolve(&self, id: i64) -> StoreResult<&ApplicationRecord> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    pub fn add(&mut self, draft: Draft) -> StoreResult<ApplicationRecord> {
        let timestamp = validate(&draft)?;
        let record = ApplicationRecord {
            id: self.next_id(),
            date: draft.date,
            company: draft.company,
            job: draft.job,
            description: draft.description.trim().to_string(),
            status: draft.status,
            timestamp,
        };
        self.records.push(record.clone());
        self.save()?;
        Ok(record)
    }

    /// Replace every field of the record with `id` except the id
    /// itself. The timestamp is recomputed from the new date.
    pub fn edit(&mut self, id: i64, draft: Draft) -> StoreResult<ApplicationRecord> {
        let timestamp = validate(&draft)?;
        let slot = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        *slot = ApplicationRecord {
            id,
            date: draft.date,
            company: draft.company,
            job: draft.job,
            description: draft.description.trim().to_string(),
            status: draft.status,
            timestamp,
        };
        let record = slot.clone();
        self.save()?;
        Ok(record)
    }

    /// Remove every record whose id is in `ids`. Absent ids are
    /// ignored. An empty set does nothing, not even a save.
    pub fn remove(&mut self, ids: &[i64]) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let before = self.records.len();
        self.records.retain(|r| !ids.contains(&r.id));
        let removed = before - self.records.len();
        self.save()?;
        Ok(removed)
    }

    /// Write the whole collection, replacing the file in one rename so
    /// a crash mid-write never leaves a half-written file behind.
    pub fn save(&self) -> StoreResult<()> {
        let persist = |detail: String| StoreError::Persist {
            path: self.path.clone(),
            detail,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| persist(e.to_string()))?;
            }
        }

        let json = serde_json::to_string_pretty(&self.records).map_err(|e| persist(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| persist(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| persist(e.to_string()))?;
        Ok(())
    }
}

fn validate(draft: &Draft) -> StoreResult<f64> {
    if draft.date.trim().is_empty() {
        return Err(StoreError::EmptyField("date"));
    }
    if draft.company.trim().is_empty() {
        return Err(StoreError::EmptyField("company"));
    }
    if draft.job.trim().is_empty() {
        return Err(StoreError::EmptyField("job"));
    }
    if draft.description.trim().is_empty() {
        return Err(StoreError::EmptyField("description"));
    }
    let date = parse_date(&draft.date).ok_or_else(|| StoreError::BadDate(draft.date.clone()))?;
    Ok(date_timestamp(date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn draft(date: &str, company: &str, job: &str, status: Status) -> Draft {
        Draft {
            date: date.to_string(),
            company: company.to_string(),
            job: job.to_string(),
            description: format!("{job} at {company}"),
            status,
        }
    }

    fn scratch() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::empty(dir.path().join("applications.json"));
        (dir, store)
    }

    #[test]
    fn add_assigns_sequential_ids_and_timestamps() {
        let (_dir, mut store) = scratch();
        let a = store
            .add(draft("01/01/2024", "Acme", "Engineer", Status::Pending))
            .unwrap();
        let b = store
            .add(draft("15/06/2024", "Globex", "Analyst", Status::Pending))
            .unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.timestamp, 1704067200.0);
        assert!(b.timestamp > a.timestamp);
    }

    #[test]
    fn next_id_is_max_plus_one() {
        let (_dir, mut store) = scratch();
        assert_eq!(store.next_id(), 1);
        for i in 0..3 {
            store
                .add(draft("01/01/2024", "Acme", &format!("Role {i}"), Status::Pending))
                .unwrap();
        }
        store.remove(&[2]).unwrap();
        // A gap in the middle must not resurrect an old id.
        assert_eq!(store.next_id(), 4);
        let d = store
            .add(draft("02/01/2024", "Acme", "Role 3", Status::Pending))
            .unwrap();
        assert_eq!(d.id, 4);
        let ids: Vec<i64> = store.all().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[test]
    fn add_rejects_empty_fields() {
        let (_dir, mut store) = scratch();
        let mut d = draft("01/01/2024", "Acme", "Engineer", Status::Pending);
        d.company = "  ".to_string();
        let err = store.add(d).unwrap_err();
        assert!(matches!(err, StoreError::EmptyField("company")));
        assert_eq!(err.field(), Some("company"));
        assert!(store.all().is_empty());
    }

    #[test]
    fn add_rejects_unparseable_date() {
        let (_dir, mut store) = scratch();
        let err = store
            .add(draft("2024-01-01", "Acme", "Engineer", Status::Pending))
            .unwrap_err();
        assert!(matches!(err, StoreError::BadDate(_)));
        assert_eq!(err.field(), Some("date"));
        assert!(store.all().is_empty());
    }

    #[test]
    fn edit_replaces_fields_and_keeps_id() {
        let (_dir, mut store) = scratch();
        let a = store
            .add(draft("01/01/2024", "Acme", "Engineer", Status::Pending))
            .unwrap();
        let mut d = draft("01/01/2024", "Acme", "Engineer", Status::Interview);
        d.description = a.description.clone();
        store.edit(a.id, d).unwrap();

        let got = store.resolve(a.id).unwrap();
        assert_eq!(got.id, 1);
        assert_eq!(got.status, Status::Interview);
        // Same date, same timestamp.
        assert_eq!(got.timestamp, a.timestamp);
    }

    #[test]
    fn edit_recomputes_timestamp_on_date_change() {
        let (_dir, mut store) = scratch();
        let a = store
            .add(draft("01/01/2024", "Acme", "Engineer", Status::Pending))
            .unwrap();
        store
            .edit(a.id, draft("15/06/2024", "Acme", "Engineer", Status::Pending))
            .unwrap();
        let got = store.resolve(a.id).unwrap();
        assert!(got.timestamp > a.timestamp);
    }

    #[test]
    fn edit_unknown_id_is_not_found() {
        let (_dir, mut store) = scratch();
        let err = store
            .edit(42, draft("01/01/2024", "Acme", "Engineer", Status::Pending))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(42)));
    }

    #[test]
    fn remove_is_idempotent() {
        let (_dir, mut store) = scratch();
        store
            .add(draft("01/01/2024", "Acme", "Engineer", Status::Pending))
            .unwrap();
        store
            .add(draft("15/06/2024", "Globex", "Analyst", Status::Pending))
            .unwrap();

        assert_eq!(store.remove(&[1]).unwrap(), 1);
        assert_eq!(store.all().len(), 1);
        assert_eq!(store.all()[0].id, 2);

        // Second removal of the same id is a quiet no-op.
        assert_eq!(store.remove(&[1]).unwrap(), 0);
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn remove_empty_set_does_not_touch_disk() {
        let (_dir, mut store) = scratch();
        assert_eq!(store.remove(&[]).unwrap(), 0);
        assert!(!store.path().exists());
    }

    #[test]
    fn save_and_open_round_trip() {
        let (dir, mut store) = scratch();
        store
            .add(draft("01/01/2024", "Acme", "Engineer", Status::Pending))
            .unwrap();
        store
            .add(draft("15/06/2024", "Globex", "Analyst", Status::Offer))
            .unwrap();

        let reopened = Store::open(dir.path().join("applications.json")).unwrap();
        assert_eq!(reopened.all(), store.all());
    }

    #[test]
    fn open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("nope.json")).unwrap();
        assert!(store.all().is_empty());
    }

    #[test]
    fn open_corrupt_file_is_load_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("applications.json");
        fs::write(&path, "{ not json").unwrap();
        let err = Store::open(path.clone()).unwrap_err();
        assert!(matches!(err, StoreError::Load { .. }));
        // The corrupt file is left alone for the user to inspect.
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn open_backfills_legacy_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("applications.json");
        fs::write(
            &path,
            r#"[{"date": "20/03/2023", "company": "Acme", "job": "Engineer",
                "description": "old entry", "status": "pending"}]"#,
        )
        .unwrap();

        let store = Store::open(path).unwrap();
        let record = &store.all()[0];
        assert_eq!(record.id, 0);
        assert_eq!(
            record.timestamp,
            date_timestamp(parse_date("20/03/2023").unwrap())
        );
    }

    #[test]
    fn open_backfills_unparseable_date_with_clock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("applications.json");
        fs::write(
            &path,
            r#"[{"date": "sometime", "company": "Acme", "job": "Engineer",
                "description": "old entry", "status": "pending"}]"#,
        )
        .unwrap();

        let store = Store::open(path).unwrap();
        let now = Utc::now().timestamp() as f64;
        assert!((store.all()[0].timestamp - now).abs() < 5.0);
    }

    #[test]
    fn failed_save_keeps_in_memory_change() {
        let dir = TempDir::new().unwrap();
        // The destination is an existing directory, so the final rename fails.
        let path = dir.path().join("applications.json");
        fs::create_dir(&path).unwrap();

        let mut store = Store::empty(path);
        let err = store
            .add(draft("01/01/2024", "Acme", "Engineer", Status::Pending))
            .unwrap_err();
        assert!(matches!(err, StoreError::Persist { .. }));
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn resolve_is_unaffected_by_mutations_of_other_records() {
        let (_dir, mut store) = scratch();
        let a = store
            .add(draft("01/01/2024", "Acme", "Engineer", Status::Pending))
            .unwrap();
        let b = store
            .add(draft("15/06/2024", "Globex", "Analyst", Status::Pending))
            .unwrap();

        store
            .edit(b.id, draft("15/06/2024", "Globex", "Analyst", Status::Offer))
            .unwrap();
        assert_eq!(store.resolve(a.id).unwrap(), &a);
    }

    #[test]
    fn resolve_unknown_id_is_not_found() {
        let (_dir, store) = scratch();
        assert!(matches!(store.resolve(7), Err(StoreError::NotFound(7))));
    }
}
