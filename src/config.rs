//! Session configuration.

use serde::{Deserialize, Serialize};
use std::{env, str::FromStr, time::Duration};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Environment variable set but not parsable
    #[error("{name} must be a valid {expected}, got {value:?}")]
    InvalidVar {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    /// Value out of its allowed range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Cards every participant holds at the start of a voting phase (default: 10)
    pub hand_size: usize,

    /// Score that ends the game (default: 10)
    pub winning_score: u32,

    /// Pause between `starting` and the first `voting` phase (default: 3s)
    pub start_delay: Duration,

    /// Voting countdown before unvoted hands are auto-filled (default: 60s)
    pub voting_duration: Duration,

    /// Length of session and participant IDs (default: 5)
    pub id_length: usize,

    /// Connected participants needed to start (default: 2)
    pub min_participants: usize,

    /// Actor mailbox capacity (default: 100)
    pub mailbox_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hand_size: 10,
            winning_score: 10,
            start_delay: Duration::from_secs(3),
            voting_duration: Duration::from_secs(60),
            id_length: 5,
            min_participants: 2,
            mailbox_capacity: 100,
        }
    }
}

impl SessionConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables, all optional:
    /// - `KADO_HAND_SIZE`: Cards per hand (default: 10)
    /// - `KADO_WINNING_SCORE`: Score that ends the game (default: 10)
    /// - `KADO_START_DELAY_MS`: Start delay in milliseconds (default: 3000)
    /// - `KADO_VOTING_DURATION_MS`: Voting countdown in milliseconds (default: 60000)
    /// - `KADO_ID_LENGTH`: ID length (default: 5)
    /// - `KADO_MIN_PARTICIPANTS`: Participants needed to start (default: 2)
    /// - `KADO_MAILBOX_CAPACITY`: Actor mailbox capacity (default: 100)
    ///
    /// # Returns
    ///
    /// * `Result<SessionConfig, ConfigError>` - Validated configuration
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            hand_size: var_or("KADO_HAND_SIZE", "usize", defaults.hand_size)?,
            winning_score: var_or("KADO_WINNING_SCORE", "u32", defaults.winning_score)?,
            start_delay: Duration::from_millis(var_or(
                "KADO_START_DELAY_MS",
                "u64",
                defaults.start_delay.as_millis() as u64,
            )?),
            voting_duration: Duration::from_millis(var_or(
                "KADO_VOTING_DURATION_MS",
                "u64",
                defaults.voting_duration.as_millis() as u64,
            )?),
            id_length: var_or("KADO_ID_LENGTH", "usize", defaults.id_length)?,
            min_participants: var_or(
                "KADO_MIN_PARTICIPANTS",
                "usize",
                defaults.min_participants,
            )?,
            mailbox_capacity: var_or(
                "KADO_MAILBOX_CAPACITY",
                "usize",
                defaults.mailbox_capacity,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hand_size == 0 {
            return Err(ConfigError::Invalid("hand size must be positive".to_string()));
        }

        if self.winning_score == 0 {
            return Err(ConfigError::Invalid(
                "winning score must be positive".to_string(),
            ));
        }

        // Shorter IDs collide too often within one session
        if self.id_length < 3 {
            return Err(ConfigError::Invalid(
                "ID length must be at least 3".to_string(),
            ));
        }

        if self.min_participants < 2 {
            return Err(ConfigError::Invalid(
                "a round needs a master and at least one voter".to_string(),
            ));
        }

        if self.mailbox_capacity == 0 {
            return Err(ConfigError::Invalid(
                "mailbox capacity must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn var_or<T: FromStr>(name: &'static str, expected: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::InvalidVar {
            name,
            expected,
            value,
        }),
        Err(_) => Ok(default),
    }
}
