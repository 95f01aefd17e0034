// src/config/defaults.rs
use crate::config::app::{HelperConfig, OutputConfig, WorkspaceConfig};
use crate::consts::{DEFAULT_HELPER_TIMEOUT_SECS, DEFAULT_OUTPUT_FILE, DEFAULT_TEMP_PREFIX};

pub const DEFAULT_CONFIG_FILE: &str = "keychain-editor.toml";
pub const DEFAULT_EXPECT_BINARY: &str = "expect";

pub fn default_helper() -> HelperConfig {
    HelperConfig {
        binary: None,
        use_expect: default_use_expect(),
        expect_binary: default_expect_binary(),
        timeout_secs: default_timeout_secs(),
    }
}

pub fn default_workspace() -> WorkspaceConfig {
    WorkspaceConfig {
        temp_prefix: default_temp_prefix(),
    }
}

pub fn default_output() -> OutputConfig {
    OutputConfig {
        file_name: default_output_file(),
    }
}

pub fn default_use_expect() -> bool {
    true
}

pub fn default_expect_binary() -> String {
    DEFAULT_EXPECT_BINARY.into()
}

pub fn default_timeout_secs() -> u64 {
    DEFAULT_HELPER_TIMEOUT_SECS
}

pub fn default_temp_prefix() -> String {
    DEFAULT_TEMP_PREFIX.into()
}

pub fn default_output_file() -> String {
    DEFAULT_OUTPUT_FILE.into()
}
