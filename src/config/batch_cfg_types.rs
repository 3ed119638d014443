use super::stream_cfg_types::positive_duration;
use crate::from_env_var;
use std::time::Duration;

from_env_var!(
    /// How many records a batch may hold before it is published
    let name = BatchSize;
    let default: usize = 10;
    let (env_var, allowed_values) = ("BATCH_SIZE", "a positive number".to_string());
    let from_str = |s| s.parse().ok().filter(|n| *n > 0);
);
from_env_var!(
    /// How long the oldest record may wait in a batch before it is published
    let name = BatchAge;
    let default: Duration = Duration::from_millis(1000);
    let (env_var, allowed_values) = ("BATCH_AGE", "a positive number of milliseconds".to_string());
    let from_str = |s| positive_duration(s, Duration::from_millis);
);
from_env_var!(
    /// How many unpublished batches are held while the queue is unavailable
    let name = MaxHeldBatches;
    let default: usize = 100;
    let (env_var, allowed_values) = ("MAX_HELD_BATCHES", "a number".to_string());
    let from_str = |s| s.parse().ok();
);
