//! Listing normalization: raw bridge output in, `DeviceRecord`s out.
//!
//! `parse_listing` is a pure function — identical input always yields an
//! identical, order-preserving record list. All I/O lives in
//! `DeviceCatalog::refresh`, which absorbs backend errors into an empty
//! snapshot plus advisory text instead of propagating them.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use phonepilot_core::{BackendKind, DeviceRecord, DeviceStatus};

use crate::backend::Backend;

/// Sentinel the alternate bridge prints when no targets are attached.
const EMPTY_SENTINEL: &str = "[Empty]";

/// Parse one raw listing into normalized records. IDs are unique within
/// one snapshot: a serial listed twice (as happens mid USB/TCP reconnect)
/// keeps its first occurrence only.
pub fn parse_listing(kind: BackendKind, raw: &str) -> Vec<DeviceRecord> {
    let records = match kind {
        BackendKind::Adb => parse_tabbed(raw),
        // The remote endpoint normalizes its HTTP response to plain ID
        // lines, so both share the plain-line rule.
        BackendKind::Hdc | BackendKind::Remote => parse_plain(kind, raw),
    };

    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}

/// `id<TAB>status` lines under a discarded header. Lines without a tab are
/// skipped.
fn parse_tabbed(raw: &str) -> Vec<DeviceRecord> {
    raw.lines()
        .skip(1)
        .filter_map(|line| {
            let line = line.trim();
            let (id, status) = line.split_once('\t')?;
            let id = id.trim();
            if id.is_empty() {
                return None;
            }
            Some(DeviceRecord::new(
                id,
                BackendKind::Adb,
                DeviceStatus::from_listing(status.trim()),
            ))
        })
        .collect()
}

/// Plain newline-delimited IDs, no header. The verbatim `[Empty]` sentinel
/// means "no devices", not a device named `[Empty]`.
fn parse_plain(kind: BackendKind, raw: &str) -> Vec<DeviceRecord> {
    raw.lines()
        .filter_map(|line| {
            let id = line.trim();
            if id.is_empty() || id == EMPTY_SENTINEL {
                return None;
            }
            Some(DeviceRecord::new(id, kind, DeviceStatus::Device))
        })
        .collect()
}

/// One refresh result: a fresh immutable snapshot plus an optional advisory
/// when the backend could not be listed.
#[derive(Debug, Clone)]
pub struct ListingSnapshot {
    pub devices: Vec<DeviceRecord>,
    pub advisory: Option<String>,
}

/// Discovery front-end over one backend.
pub struct DeviceCatalog {
    backend: Arc<dyn Backend>,
    list_timeout: Duration,
}

impl DeviceCatalog {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            list_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_list_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout = timeout;
        self
    }

    /// List devices and probe info for the connected ones. Listing errors
    /// are non-fatal: the snapshot comes back empty with the error as
    /// advisory text for display.
    pub async fn refresh(&self) -> ListingSnapshot {
        let raw = match self.backend.list_devices(self.list_timeout).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(backend = %self.backend.kind(), error = %e, "device listing failed");
                return ListingSnapshot {
                    devices: Vec::new(),
                    advisory: Some(e.to_string()),
                };
            }
        };

        let mut devices = parse_listing(self.backend.kind(), &raw);
        debug!(backend = %self.backend.kind(), count = devices.len(), "parsed device listing");

        // Info probes only for connected devices; each probe is internally
        // best-effort and bounded, so a hung device cannot stall a refresh
        // beyond its sub-query timeouts.
        let mut probes = tokio::task::JoinSet::new();
        for (idx, record) in devices.iter().enumerate() {
            if record.status != DeviceStatus::Device {
                continue;
            }
            let backend = Arc::clone(&self.backend);
            let id = record.id.clone();
            probes.spawn(async move { (idx, backend.fetch_info(&id).await) });
        }
        while let Some(joined) = probes.join_next().await {
            if let Ok((idx, info)) = joined {
                devices[idx].info = Some(info);
            }
        }

        ListingSnapshot {
            devices,
            advisory: None,
        }
    }
}
