//! Upload-wait telemetry: counts of fence/queue-idle/device-idle waits the
//! backend incurred servicing uploads, drained atomically.

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadWaitStats {
    pub fence_wait_count: u64,
    pub queue_wait_idle_count: u64,
    pub device_wait_idle_count: u64,
}

impl UploadWaitStats {
    pub fn is_zero(&self) -> bool {
        *self == UploadWaitStats::default()
    }
}
