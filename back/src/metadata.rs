use arcade_protocol::PROTOCOL_VERSION;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use time::OffsetDateTime;

/// Published by a running back so local clients can find and join it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonMetadata {
    pub host: String,
    pub port: u16,
    pub secret: String,
    pub pid: u32,
    pub schema_version: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl DaemonMetadata {
    pub fn new(host: String, port: u16, secret: String, pid: u32) -> Self {
        Self {
            host,
            port,
            secret,
            pid,
            schema_version: PROTOCOL_VERSION,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub fn write_atomic(&self, path: &Path) -> anyhow::Result<()> {
        write_json_atomic(path, self)
    }

    pub fn is_compatible(&self) -> bool {
        self.schema_version == PROTOCOL_VERSION
    }

    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

/// Writes `value` as pretty JSON next to `path`, syncs it, then renames it
/// into place so readers never see a partial file.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        let data = serde_json::to_vec_pretty(value)?;
        file.write_all(&data)?;
        file.sync_all()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}
