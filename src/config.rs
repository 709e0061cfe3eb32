use crate::{
    control::ForwardingFlags, name::Name, packet::MAX_PACKET_SIZE,
    transport::DEFAULT_MAX_QUEUE_BYTES,
};

pub const LOCALHOST_COMMAND_PREFIX: &str = "/localhost/nfd";
pub const LOCALHOP_COMMAND_PREFIX: &str = "/localhop/nfd";

/// Tunables of a face. Also loadable from TOML, where every key is optional:
///
/// ```toml
/// default_interest_lifetime_ms = 4000
/// command_prefix = "/localhop/nfd"
/// forwarding_flags = { child_inherit = true, capture = false }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields, default))]
pub struct FaceConfig {
    /// Lifetime given to Interests that do not carry one.
    pub default_interest_lifetime_ms: u64,
    /// Lifetime of registration commands.
    pub command_interest_lifetime_ms: u64,
    /// Where registration commands are sent, `/localhost/nfd` unless the
    /// forwarder is remote.
    pub command_prefix: String,
    pub forwarding_flags: ForwardingFlags,
    pub max_send_queue_bytes: usize,
    pub max_packet_size: usize,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            default_interest_lifetime_ms: 4000,
            command_interest_lifetime_ms: 4000,
            command_prefix: LOCALHOST_COMMAND_PREFIX.to_string(),
            forwarding_flags: ForwardingFlags::default(),
            max_send_queue_bytes: DEFAULT_MAX_QUEUE_BYTES,
            max_packet_size: MAX_PACKET_SIZE,
        }
    }
}

impl FaceConfig {
    pub fn with_default_interest_lifetime_ms(mut self, lifetime_ms: u64) -> Self {
        self.default_interest_lifetime_ms = lifetime_ms;
        self
    }

    pub fn with_command_interest_lifetime_ms(mut self, lifetime_ms: u64) -> Self {
        self.command_interest_lifetime_ms = lifetime_ms;
        self
    }

    pub fn with_command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.command_prefix = prefix.into();
        self
    }

    pub fn with_forwarding_flags(mut self, flags: ForwardingFlags) -> Self {
        self.forwarding_flags = flags;
        self
    }

    pub fn with_max_send_queue_bytes(mut self, max: usize) -> Self {
        self.max_send_queue_bytes = max;
        self
    }

    pub fn with_max_packet_size(mut self, max: usize) -> Self {
        self.max_packet_size = max;
        self
    }

    pub fn command_prefix_name(&self) -> Name {
        Name::from_uri(&self.command_prefix)
    }
}

#[cfg(feature = "serde")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(feature = "serde")]
impl FaceConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
