// src/consts.rs
//! Shared constants for the helper protocol and working-area layout

/// Fields whose name starts with this character are decryption metadata,
/// not keychain attributes
pub const INTERNAL_FIELD_MARKER: char = '_';

/// Key holding the plaintext persistent reference in a dumped record
pub const PERSISTREF_FIELD: &str = "persistref";

/// Composite persistent reference inside a container entry
pub const CONTAINER_REF_FIELD: &str = "v_PersistentRef";

/// Encrypted payload inside a container entry
pub const CONTAINER_DATA_FIELD: &str = "v_Data";

/// Backup domain that holds the keychain container
pub const KEYCHAIN_DOMAIN: &str = "KeychainDomain";

/// Container file name inside the restored keychain domain
pub const KEYCHAIN_CONTAINER_FILE: &str = "keychain-backup.plist";

/// Working-area file names
pub const DUMP_FILE: &str = "keys.json";
pub const UPDATED_DUMP_FILE: &str = "keys-updated.json";
pub const FRAGMENT_FILE: &str = "keys-updated.plist";

/// Default helper executable name (looked up on PATH)
pub const DEFAULT_HELPER_BINARY: &str = "irestore";

/// Env var that points at the helper executable
pub const HELPER_BINARY_ENV: &str = "IRESTORE_BIN";

/// Helper installed as a local node module
pub const LOCAL_HELPER_PATH: &str = "node_modules/irestore/bin/irestore";

/// Asked for its global prefix when the helper is not installed locally
pub const NPM_BINARY: &str = "npm";

/// Seconds the helper may take before the expect wrapper gives up
// dumpkeys on a large backup can take well over a minute
pub const DEFAULT_HELPER_TIMEOUT_SECS: u64 = 120;

/// Prompt, failure and completion markers printed by the helper
pub const HELPER_PASSWORD_PROMPT: &str = "Backup Password: ";
pub const HELPER_BAD_PASSWORD: &str = "Bad password";
pub const HELPER_DONE: &str = "irestore done.";

/// Exit codes produced by the expect wrapper
pub const EXIT_BAD_PASSWORD: i32 = 1;
pub const EXIT_TIMEOUT: i32 = 2;

/// Default prefix for per-request temporary directories
pub const DEFAULT_TEMP_PREFIX: &str = "kbe-";

/// Default name for the updated container written by the CLI
pub const DEFAULT_OUTPUT_FILE: &str = "keychain-backup.plist";
