//! # Runtime Configuration Module
//!
//! Environment-driven settings for the `may` coroutine runtime.
//!
//! ## `RESTTREE_STACK_SIZE`
//!
//! Stack size of request coroutines. Accepts decimal (`65536`) or hexadecimal
//! (`0x10000`). Default: `0x10000` (64 KB).
//!
//! Memory use is roughly `stack_size × concurrent requests`. Handlers with deep call
//! chains or large locals need more; a stack overflow aborts the process.
//!
//! ```rust
//! use resttree::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! assert!(config.stack_size > 0);
//! ```

use std::env;

use tracing::info;

/// Default coroutine stack size in bytes.
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let stack_size = env::var("RESTTREE_STACK_SIZE")
            .ok()
            .and_then(|val| parse_size(&val))
            .unwrap_or(DEFAULT_STACK_SIZE);
        RuntimeConfig { stack_size }
    }

    /// Apply to the global `may` configuration. Call before starting the server.
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
        info!(stack_size = self.stack_size, "Coroutine runtime configured");
    }
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    let size = match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok()?,
        None => val.parse().ok()?,
    };
    (size > 0).then_some(size)
}
