use clap::ValueEnum;

use crate::models::ApplicationRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    /// Most recent application date first.
    #[default]
    NewToOld,
    OldToNew,
    Company,
    Job,
    Status,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::NewToOld,
        SortKey::OldToNew,
        SortKey::Company,
        SortKey::Job,
        SortKey::Status,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::NewToOld => "New to Old",
            SortKey::OldToNew => "Old to New",
            SortKey::Company => "Company A-Z",
            SortKey::Job => "Job Title A-Z",
            SortKey::Status => "Status A-Z",
        }
    }

    pub fn next(&self) -> SortKey {
        let at = Self::ALL.iter().position(|k| k == self).unwrap_or(0);
        Self::ALL[(at + 1) % Self::ALL.len()]
    }
}

// clap renders defaults through Display, so write the flag spelling.
impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SortKey::NewToOld => "new-to-old",
            SortKey::OldToNew => "old-to-new",
            SortKey::Company => "company",
            SortKey::Job => "job",
            SortKey::Status => "status",
        })
    }
}

/// Stable sort: records comparing equal keep their insertion order.
pub fn sorted(records: &[ApplicationRecord], key: SortKey) -> Vec<&ApplicationRecord> {
    let mut rows: Vec<&ApplicationRecord> = records.iter().collect();
    match key {
        SortKey::NewToOld => rows.sort_by(|a, b| b.timestamp.total_cmp(&a.timestamp)),
        SortKey::OldToNew => rows.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp)),
        SortKey::Company => rows.sort_by_cached_key(|r| r.company.to_lowercase()),
        SortKey::Job => rows.sort_by_cached_key(|r| r.job.to_lowercase()),
        SortKey::Status => rows.sort_by_cached_key(|r| r.status.as_str()),
    }
    rows
}

/// Case-insensitive substring match over company, job, description and
/// status. Empty text keeps everything.
pub fn filtered<'a>(rows: Vec<&'a ApplicationRecord>, text: &str) -> Vec<&'a ApplicationRecord> {
    if text.is_empty() {
        return rows;
    }
    let needle = text.to_lowercase();
    rows.into_iter().filter(|r| matches(r, &needle)).collect()
}

fn matches(record: &ApplicationRecord, needle: &str) -> bool {
    record.company.to_lowercase().contains(needle)
        || record.job.to_lowercase().contains(needle)
        || record.description.to_lowercase().contains(needle)
        || record.status.as_str().contains(needle)
}

/// The display sequence: sort, then filter. Each row carries the
/// record's id so a selection can be resolved against the store no
/// matter where the row ended up on screen.
pub fn view<'a>(
    records: &'a [ApplicationRecord],
    key: SortKey,
    text: &str,
) -> Vec<(i64, &'a ApplicationRecord)> {
    filtered(sorted(records, key), text)
        .into_iter()
        .map(|r| (r.id, r))
        .collect()
}
