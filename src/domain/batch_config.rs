use std::{num::NonZeroUsize, time::Duration};

use serde::Deserialize;

pub const DEFAULT_BATCH_SIZE: NonZeroUsize = NonZeroUsize::new(10).unwrap();
pub const DEFAULT_PAUSE_BETWEEN_BATCHES: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_PAUSE_BETWEEN_SENDS: Duration = Duration::from_secs(2);

/// Batching overrides as they arrive on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchConfigData {
    pub batch_size: Option<i64>,
    pub pause_between_batches_ms: Option<u64>,
    pub pause_between_sends_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub batch_size: NonZeroUsize,
    pub pause_between_batches: Duration,
    pub pause_between_sends: Duration,
}

impl BatchConfig {
    /// Applies request overrides on top of `defaults`.
    ///
    /// A batch size of zero or below is coerced to the default batch size.
    pub fn resolve(data: BatchConfigData, defaults: &BatchConfig) -> BatchConfig {
        let batch_size = match data.batch_size {
            None => defaults.batch_size,
            Some(size) => match usize::try_from(size).ok().and_then(NonZeroUsize::new) {
                Some(size) => size,
                None => {
                    tracing::warn!(
                        requested = size,
                        coerced = defaults.batch_size.get(),
                        "Batch size must be positive, falling back to the default"
                    );
                    defaults.batch_size
                }
            },
        };

        Self {
            batch_size,
            pause_between_batches: data
                .pause_between_batches_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.pause_between_batches),
            pause_between_sends: data
                .pause_between_sends_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.pause_between_sends),
        }
    }

    pub fn batch_count(&self, recipients: usize) -> usize {
        recipients.div_ceil(self.batch_size.get())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            pause_between_batches: DEFAULT_PAUSE_BETWEEN_BATCHES,
            pause_between_sends: DEFAULT_PAUSE_BETWEEN_SENDS,
        }
    }
}
