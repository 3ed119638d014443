use super::batch_cfg_types::*;
use super::EnvVar;
use crate::err::FatalErr;

#[derive(Debug, Default, Clone)]
pub struct BatchConfig {
    pub size: BatchSize,
    pub age: BatchAge,
    pub max_held: MaxHeldBatches,
}

impl BatchConfig {
    const NO_HOLD_WARNING: &'static str = "MAX_HELD_BATCHES is 0; the consumer will fail as soon \
                                           as one batch cannot be published.";

    pub(crate) fn from_env(env: &EnvVar) -> Result<Self, FatalErr> {
        let cfg = BatchConfig {
            size: BatchSize::default().maybe_update(env.get("BATCH_SIZE"))?,
            age: BatchAge::default().maybe_update(env.get("BATCH_AGE"))?,
            max_held: MaxHeldBatches::default().maybe_update(env.get("MAX_HELD_BATCHES"))?,
        };

        if *cfg.max_held == 0 {
            log::warn!("{}", Self::NO_HOLD_WARNING);
        }
        log::info!("Batch configuration:\n{:#?}", &cfg);
        Ok(cfg)
    }
}
