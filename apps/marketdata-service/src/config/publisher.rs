//! Event publisher configuration.

use serde::{Deserialize, Serialize};

/// Event publisher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Topic pattern; must contain `{symbol}`.
    #[serde(default = "default_topic_pattern")]
    pub topic_pattern: String,
    /// Broadcast channel capacity per subscriber.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            topic_pattern: default_topic_pattern(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_topic_pattern() -> String {
    "prices.{symbol}".to_string()
}

const fn default_channel_capacity() -> usize {
    1_024
}
