//! Pool-wide tunables and the snapshot metrics derived from them.

/// Configuration for the pool's capacity behaviour.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Soft threshold that arms the background collector. When
    /// `limited_capacity` is also set, this becomes a hard ceiling.
    pub capacity: usize,
    /// When `true`, `capacity` is a hard ceiling: requests for an unseen
    /// path block until the table shrinks below it, rather than growing
    /// past it.
    pub limited_capacity: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 500,
            limited_capacity: false,
        }
    }
}

/// A point-in-time snapshot of the pool's counters and sizes.
#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    pub hits: u64,
    pub requests: u64,
    pub max_used_capacity: usize,
    pub table_size: usize,
    pub idle_size: usize,
    pub capacity: usize,
    pub limited_capacity: bool,
}

impl PoolStats {
    /// `hits / requests`, rounded to three decimal places. Defined as
    /// `1.0` when `requests == 0`.
    pub fn efficiency(&self) -> f64 {
        if self.requests == 0 {
            return 1.0;
        }
        let raw = self.hits as f64 / self.requests as f64;
        (raw * 1000.0).round() / 1000.0
    }
}
