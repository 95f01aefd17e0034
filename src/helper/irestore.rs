// src/helper/irestore.rs
//! `irestore` subprocess bridge
//!
//! `irestore` asks for the backup password on a terminal, so by default each
//! call runs under an `expect` script that answers the prompt and turns the
//! outcome into an exit code. The password travels through the child's
//! environment, never its argument list.

use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Duration;

use tracing::{debug, info};

use super::{HelperResult, KeychainHelper};
use crate::aliases::ExposeSecret;
use crate::config::HelperConfig;
use crate::consts::{
    DEFAULT_HELPER_BINARY, EXIT_BAD_PASSWORD, EXIT_TIMEOUT, HELPER_BAD_PASSWORD,
    HELPER_BINARY_ENV, HELPER_DONE, HELPER_PASSWORD_PROMPT, LOCAL_HELPER_PATH, NPM_BINARY,
};
use crate::error::HelperError;
use crate::request::BackupRequest;

const PASSWORD_ENV: &str = "KBE_HELPER_PASSWORD";
const EXIT_HELPER_FAILED: i32 = 3;

#[derive(Debug, Clone)]
pub struct IRestore {
    program: PathBuf,
    use_expect: bool,
    expect_program: String,
    timeout: Duration,
}

impl IRestore {
    pub fn from_config(config: &HelperConfig) -> Self {
        Self {
            program: Self::locate(config.binary.as_deref()),
            use_expect: config.use_expect,
            expect_program: config.expect_binary.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Configured path, then `$IRESTORE_BIN`, then a local node module, then
    /// the global npm prefix, then PATH
    pub fn locate(configured: Option<&Path>) -> PathBuf {
        if let Some(path) = configured {
            return path.to_path_buf();
        }
        if let Some(path) = std::env::var_os(HELPER_BINARY_ENV) {
            return PathBuf::from(path);
        }
        let local = PathBuf::from(LOCAL_HELPER_PATH);
        if local.exists() {
            return local;
        }
        npm_global_helper().unwrap_or_else(|| PathBuf::from(DEFAULT_HELPER_BINARY))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn helper_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    fn run(&self, backup: &BackupRequest, args: &[&OsStr]) -> HelperResult<String> {
        let mut full_args: Vec<OsString> = vec![backup.path().as_os_str().to_owned()];
        full_args.extend(args.iter().map(|a| a.to_os_string()));
        info!(helper = %self.program.display(), args = ?args, "running backup helper");

        if self.use_expect {
            self.run_with_expect(backup, &full_args)
        } else {
            self.run_with_stdin(backup, &full_args)
        }
    }

    /// Tcl program driving the helper; the password comes from the environment
    pub fn expect_script(&self, args: &[OsString]) -> String {
        let mut command = tcl_word(&self.program.to_string_lossy());
        for arg in args {
            command.push(' ');
            command.push_str(&tcl_word(&arg.to_string_lossy()));
        }
        format!(
            r#"
set timeout {timeout}
spawn {command}
expect {{
  "{prompt}" {{
    send -- "$env({PASSWORD_ENV})\r"
    exp_continue
  }}
  "{bad}" {{
    exit {EXIT_BAD_PASSWORD}
  }}
  "{done}" {{
    exit 0
  }}
  eof {{
    set status [wait]
    exit [expr {{[lindex $status 3] == 0 ? 0 : {EXIT_HELPER_FAILED}}}]
  }}
  timeout {{
    exit {EXIT_TIMEOUT}
  }}
}}
"#,
            timeout = self.timeout.as_secs(),
            prompt = HELPER_PASSWORD_PROMPT,
            bad = HELPER_BAD_PASSWORD,
            done = HELPER_DONE,
        )
    }

    fn run_with_expect(&self, backup: &BackupRequest, args: &[OsString]) -> HelperResult<String> {
        let output = Command::new(&self.expect_program)
            .arg("-c")
            .arg(self.expect_script(args))
            .env(PASSWORD_ENV, backup.password.expose_secret())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| HelperError::Spawn {
                program: self.expect_program.clone(),
                source,
            })?;
        self.interpret(output, true)
    }

    fn run_with_stdin(&self, backup: &BackupRequest, args: &[OsString]) -> HelperResult<String> {
        let spawn_err = |source: std::io::Error| HelperError::Spawn {
            program: self.program.display().to_string(),
            source,
        };
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        if let Some(mut stdin) = child.stdin.take() {
            // a helper that exits before reading its prompt closes the pipe;
            // its exit status says what went wrong
            let _ = writeln!(stdin, "{}", backup.password.expose_secret());
        }
        let output = child.wait_with_output().map_err(spawn_err)?;
        self.interpret(output, false)
    }

    fn interpret(&self, output: Output, via_expect: bool) -> HelperResult<String> {
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let code = output.status.code().unwrap_or(-1);
        debug!(code, "helper exited");

        match code {
            0 => Ok(stdout),
            // expect itself exits 1 on a Tcl error, so the marker must be there too
            EXIT_BAD_PASSWORD if via_expect && stdout.contains(HELPER_BAD_PASSWORD) => {
                Err(HelperError::BadCredential)
            }
            EXIT_TIMEOUT if via_expect => Err(HelperError::Timeout {
                helper: self.helper_name(),
            }),
            _ if !via_expect && stdout.contains(HELPER_BAD_PASSWORD) => {
                Err(HelperError::BadCredential)
            }
            code => {
                let text = if stderr.trim().is_empty() { stdout } else { stderr };
                Err(HelperError::Failed {
                    helper: self.helper_name(),
                    code,
                    output: text.trim().to_owned(),
                })
            }
        }
    }
}

impl KeychainHelper for IRestore {
    fn dump_keys(&self, backup: &BackupRequest, out: &Path) -> HelperResult<()> {
        self.run(backup, &[OsStr::new("dumpkeys"), out.as_os_str()])
            .map(drop)
    }

    fn restore_domain(&self, backup: &BackupRequest, domain: &str, dest: &Path) -> HelperResult<()> {
        self.run(backup, &[OsStr::new("restore"), OsStr::new(domain), dest.as_os_str()])
            .map(drop)
    }

    fn encrypt_keys(&self, backup: &BackupRequest, input: &Path, output: &Path) -> HelperResult<()> {
        self.run(
            backup,
            &[OsStr::new("encryptkeys"), input.as_os_str(), output.as_os_str()],
        )
        .map(drop)
    }
}

/// `$(npm prefix -g)/bin/irestore`, when npm is installed and the file exists
fn npm_global_helper() -> Option<PathBuf> {
    let output = Command::new(NPM_BINARY)
        .args(["prefix", "-g"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let prefix = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    let path = Path::new(&prefix).join("bin").join(DEFAULT_HELPER_BINARY);
    debug!(path = %path.display(), "checked global npm prefix for helper");
    path.exists().then_some(path)
}

/// Quote one word for a Tcl command line
pub fn tcl_word(word: &str) -> String {
    let mut quoted = String::with_capacity(word.len() + 2);
    quoted.push('"');
    for c in word.chars() {
        if matches!(c, '\\' | '"' | '$' | '[' | ']') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
