//! Render Report
//!
//! A JSON record of what a pipeline run produced, including a checksum of
//! the exported audio so later runs can confirm the file is intact.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::Result;
use crate::looping::{LoopPlan, LoopSpec};

/// Summary of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderReport {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub input: PathBuf,
    pub sample_rate: u32,
    pub channels: usize,
    pub spec: LoopSpec,
    pub plan: LoopPlan,
    /// Duration of the exported audio, after any trim
    pub final_duration_ms: u64,
    pub audio_output: PathBuf,
    /// SHA-256 of the exported audio file
    pub audio_sha256: String,
    pub video_output: Option<PathBuf>,
}

impl RenderReport {
    /// Write the report as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// SHA-256 of a file as lowercase hex
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
