use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use csv::{ReaderBuilder, WriterBuilder};

use crate::record::CommissionRecord;

pub const HEADER: [&str; 4] = ["id", "address", "Nawrocki", "Trzaskowski"];

/// Writes round snapshots as CSV.
///
/// Every write replaces the whole file: it goes to a sibling `.tmp` file that
/// is then renamed over the target, so readers never see a half-written
/// checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointWriter {
    output_dir: PathBuf,
}

impl CheckpointWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// `<output>/<round>/results_batch_<n>.csv`, `n` counting from 1.
    pub fn batch_path(&self, round: &str, batch_number: usize) -> PathBuf {
        self.output_dir
            .join(round)
            .join(format!("results_batch_{batch_number}.csv"))
    }

    pub fn final_path(&self, round: &str) -> PathBuf {
        self.output_dir
            .join(format!("election_results_{round}_FINAL.csv"))
    }

    pub async fn write(&self, records: &[CommissionRecord], path: &Path) -> anyhow::Result<()> {
        let bytes = to_csv(records)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("failed to move {} into place", path.display()))?;
        Ok(())
    }
}

/// Serialises `records` in the given order, header first even when empty.
pub fn to_csv(records: &[CommissionRecord]) -> anyhow::Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(vec![]);
    writer.write_record(HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow!("failed to flush csv buffer: {}", e.error()))
}

pub fn read_records(path: &Path) -> anyhow::Result<Vec<CommissionRecord>> {
    let mut reader = ReaderBuilder::new()
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let records = reader
        .deserialize()
        .collect::<Result<Vec<CommissionRecord>, _>>()
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(records)
}
