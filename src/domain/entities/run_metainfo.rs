use std::collections::BTreeMap;

/// Bucket for projects skipped because of an invalid target name.
pub const BUCKET_INVALID: &str = "invalid";

/// Bucket for projects whose target already had every ref.
pub const BUCKET_UP_TO_DATE: &str = "uptodate";

/// Outcome counters for one mirror target within a run.
///
/// Passed by `&mut` through the push pipeline so there is exactly one
/// writer at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncRunMetainfo {
    pub total: usize,
    pub fail: BTreeMap<String, Vec<String>>,
}

impl SyncRunMetainfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, bucket: &str, name: impl Into<String>) {
        self.fail.entry(bucket.to_string()).or_default().push(name.into());
    }

    pub fn record_invalid(&mut self, name: impl Into<String>) {
        self.record(BUCKET_INVALID, name);
    }

    pub fn record_up_to_date(&mut self, name: impl Into<String>) {
        self.record(BUCKET_UP_TO_DATE, name);
    }

    pub fn increment_total(&mut self) {
        self.total += 1;
    }

    pub fn bucket(&self, bucket: &str) -> &[String] {
        self.fail.get(bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn invalid(&self) -> &[String] {
        self.bucket(BUCKET_INVALID)
    }

    pub fn up_to_date(&self) -> &[String] {
        self.bucket(BUCKET_UP_TO_DATE)
    }
}
