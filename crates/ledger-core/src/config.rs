use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD, HASH_HEX_SIZE};
use crate::error::ConfigError;

/// Tunables for a [`Ledger`](crate::chain::Ledger).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Leading zero hex characters required of every mined block hash.
    pub difficulty: usize,
    pub mining_reward: i64,
    /// Mining threads; `None` uses rayon's global pool.
    pub workers: Option<usize>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            mining_reward: DEFAULT_MINING_REWARD,
            workers: None,
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mining_reward <= 0 {
            return Err(ConfigError::NonPositiveReward(self.mining_reward));
        }
        if self.difficulty > HASH_HEX_SIZE {
            return Err(ConfigError::DifficultyTooHigh {
                difficulty: self.difficulty,
                max: HASH_HEX_SIZE,
            });
        }
        if self.workers == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = LedgerConfig::default();
        assert_eq!(config.difficulty, 4);
        assert_eq!(config.mining_reward, 100);
        assert_eq!(config.workers, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unusable_settings() {
        let zero_reward = LedgerConfig {
            mining_reward: 0,
            ..Default::default()
        };
        assert_eq!(
            zero_reward.validate(),
            Err(ConfigError::NonPositiveReward(0))
        );

        let impossible = LedgerConfig {
            difficulty: 65,
            ..Default::default()
        };
        assert!(matches!(
            impossible.validate(),
            Err(ConfigError::DifficultyTooHigh { difficulty: 65, .. })
        ));

        let no_workers = LedgerConfig {
            workers: Some(0),
            ..Default::default()
        };
        assert_eq!(no_workers.validate(), Err(ConfigError::ZeroWorkers));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: LedgerConfig = serde_json::from_str(r#"{"difficulty":2}"#).unwrap();
        assert_eq!(config.difficulty, 2);
        assert_eq!(config.mining_reward, 100);
    }
}
