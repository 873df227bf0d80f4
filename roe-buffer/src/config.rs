// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use serde::{Deserialize, Serialize};

/// Tunables for a [`crate::Buffer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum number of actions kept in the undo log (0 = unlimited).
    pub max_history: usize,
    /// Largest size the cached piece may reach through in-place edits before
    /// further typing starts a fresh piece. The fresh piece still joins the
    /// open action, so undo granularity does not change.
    pub max_coalesce_bytes: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_history: 1000,
            max_coalesce_bytes: 4096,
        }
    }
}

impl BufferConfig {
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn with_max_coalesce_bytes(mut self, max_coalesce_bytes: usize) -> Self {
        self.max_coalesce_bytes = max_coalesce_bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BufferConfig::default();
        assert_eq!(config.max_history, 1000);
        assert_eq!(config.max_coalesce_bytes, 4096);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: BufferConfig = serde_json::from_str(r#"{ "max_history": 5 }"#).unwrap();
        assert_eq!(config.max_history, 5);
        assert_eq!(config.max_coalesce_bytes, 4096);
    }

    #[test]
    fn test_builders() {
        let config = BufferConfig::default()
            .with_max_history(0)
            .with_max_coalesce_bytes(16);
        assert_eq!(config.max_history, 0);
        assert_eq!(config.max_coalesce_bytes, 16);
    }
}
