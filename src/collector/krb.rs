//! Kerberos session handling
//!
//! Models the authenticated actor as an owned [`KrbSession`] value: a parsed
//! principal plus a credential source (password or keytab) and a private
//! credential cache. `login` is explicit and re-runnable, so callers decide
//! when to (re-)authenticate instead of relying on ambient client state.
//!
//! Ticket acquisition drives the system `kinit` into the session's private
//! cache; the SPNEGO token for the HTTP exchange is then produced through a
//! GSSAPI security context against the service principal `HTTP/<fqdn>`.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use libgssapi::context::{ClientCtx, CtxFlags};
use libgssapi::credential::{Cred, CredUsage};
use libgssapi::name::Name;
use libgssapi::oid::{OidSet, GSS_MECH_SPNEGO, GSS_NT_HOSTBASED_SERVICE, GSS_NT_KRB5_PRINCIPAL};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::FetchError;

/// Fixed system path of the Kerberos realm configuration
pub const KRB5_CONF_PATH: &str = "/etc/krb5.conf";

/// A Kerberos principal split into user and realm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// User part, before the `@`
    pub user: String,
    /// Realm part, after the `@`
    pub realm: String,
}

impl Principal {
    /// Parse `user@REALM`. Exactly one `@` is required; anything else is
    /// [`FetchError::MalformedPrincipal`], never a partial result.
    pub fn parse(principal: &str) -> Result<Self, FetchError> {
        let parts: Vec<&str> = principal.split('@').collect();
        match parts.as_slice() {
            [user, realm] if !user.is_empty() && !realm.is_empty() => Ok(Self {
                user: user.to_string(),
                realm: realm.to_string(),
            }),
            _ => Err(FetchError::MalformedPrincipal(principal.to_string())),
        }
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.user, self.realm)
    }
}

/// Minimal view of the system krb5 configuration.
#[derive(Debug, Clone, Default)]
pub struct RealmConfig {
    /// `default_realm` from `[libdefaults]`, when present
    pub default_realm: Option<String>,
}

impl RealmConfig {
    /// Load from the fixed system path
    pub fn load_system() -> io::Result<Self> {
        Self::load(Path::new(KRB5_CONF_PATH))
    }

    /// Load and parse a krb5.conf-style file.
    ///
    /// Only `[libdefaults] default_realm` is extracted; the Kerberos
    /// libraries read the full file themselves.
    pub fn load(path: &Path) -> io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut in_libdefaults = false;
        let mut default_realm = None;

        for line in text.lines() {
            let line = line.trim();
            if line.starts_with('[') {
                in_libdefaults = line == "[libdefaults]";
                continue;
            }
            if in_libdefaults {
                if let Some((key, value)) = line.split_once('=') {
                    if key.trim() == "default_realm" {
                        default_realm = Some(value.trim().to_string());
                    }
                }
            }
        }

        Ok(Self { default_realm })
    }
}

/// Where the session's Kerberos key comes from.
#[derive(Debug, Clone)]
enum CredentialSource {
    Password(String),
    Keytab(PathBuf),
}

/// An authenticated Kerberos actor.
///
/// Holds the parsed principal, the credential source, and a private
/// credential cache path derived from the process id. Reusable across
/// polls; reference behavior logs in once per fetch.
#[derive(Debug, Clone)]
pub struct KrbSession {
    principal: Principal,
    source: CredentialSource,
    ccache: PathBuf,
}

impl KrbSession {
    /// Build a session around a password credential. Does not log in yet.
    pub fn with_password(principal: &str, password: &str) -> Result<Self, FetchError> {
        Ok(Self {
            principal: Principal::parse(principal)?,
            source: CredentialSource::Password(password.to_string()),
            ccache: private_ccache_path(),
        })
    }

    /// Build a session around a keytab credential. Does not log in yet.
    pub fn with_keytab(path: &Path, principal: &str) -> Result<Self, FetchError> {
        Ok(Self {
            principal: Principal::parse(principal)?,
            source: CredentialSource::Keytab(path.to_path_buf()),
            ccache: private_ccache_path(),
        })
    }

    /// Parsed principal
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Acquire (or re-acquire) a ticket-granting ticket into the session's
    /// private cache. Explicit and re-runnable; call again on expiry.
    #[instrument(skip(self), fields(principal = %self.principal))]
    pub async fn login(&self) -> Result<(), FetchError> {
        // Surface a missing system realm configuration as a login failure
        // for this fetch instead of a process abort.
        RealmConfig::load_system().map_err(|e| self.login_error(format!(
            "cannot read {}: {}",
            KRB5_CONF_PATH, e
        )))?;

        let mut cmd = Command::new("kinit");
        cmd.arg("-c")
            .arg(&self.ccache)
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        match &self.source {
            CredentialSource::Keytab(path) => {
                cmd.arg("-kt").arg(path);
                cmd.stdin(Stdio::null());
            }
            CredentialSource::Password(_) => {
                cmd.stdin(Stdio::piped());
            }
        }
        cmd.arg(self.principal.to_string());

        let mut child = cmd
            .spawn()
            .map_err(|e| self.login_error(format!("failed to run kinit: {}", e)))?;

        if let CredentialSource::Password(password) = &self.source {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| self.login_error("kinit stdin unavailable".to_string()))?;
            stdin
                .write_all(format!("{}\n", password).as_bytes())
                .await
                .map_err(|e| self.login_error(format!("failed to send password: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.login_error(format!("kinit did not exit: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.login_error(stderr.trim().to_string()));
        }

        debug!(ccache = %self.ccache.display(), "Kerberos login complete");
        Ok(())
    }

    /// Produce the initial SPNEGO token for `spn` (`HTTP/<fqdn>`) from the
    /// session's credential cache.
    ///
    /// GSSAPI locates the cache through `KRB5CCNAME`; the binary exports
    /// the process-private path once at startup, before any runtime thread
    /// exists. This function never touches the environment.
    pub fn negotiate_token(&self, spn: &str) -> Result<Vec<u8>, FetchError> {
        let negotiation_error = |reason: String| FetchError::Negotiation {
            spn: spn.to_string(),
            reason,
        };

        // Hostbased service form of the SPN: HTTP@fqdn.
        let hostbased = spn.replacen('/', "@", 1);
        let service = Name::new(hostbased.as_bytes(), Some(&GSS_NT_HOSTBASED_SERVICE))
            .map_err(|e| negotiation_error(format!("bad service name: {}", e)))?;

        let client = Name::new(
            self.principal.to_string().as_bytes(),
            Some(&GSS_NT_KRB5_PRINCIPAL),
        )
        .map_err(|e| negotiation_error(format!("bad client name: {}", e)))?;

        let mut mechs = OidSet::new().map_err(|e| negotiation_error(e.to_string()))?;
        mechs
            .add(&GSS_MECH_SPNEGO)
            .map_err(|e| negotiation_error(e.to_string()))?;

        let cred = Cred::acquire(Some(&client), None, CredUsage::Initiate, Some(&mechs))
            .map_err(|e| negotiation_error(format!("no usable credential: {}", e)))?;

        let mut ctx = ClientCtx::new(
            Some(cred),
            service,
            CtxFlags::GSS_C_MUTUAL_FLAG,
            Some(&GSS_MECH_SPNEGO),
        );

        let token = ctx
            .step(None, None)
            .map_err(|e| negotiation_error(e.to_string()))?
            .ok_or_else(|| negotiation_error("context produced no token".to_string()))?;

        Ok(Vec::from(&*token))
    }

    fn login_error(&self, reason: String) -> FetchError {
        FetchError::Login {
            principal: self.principal.to_string(),
            reason,
        }
    }
}

/// Process-private credential cache path, stable for the process lifetime.
///
/// Every [`KrbSession`] logs into this cache, and the binary points
/// `KRB5CCNAME` at it once at startup.
pub fn private_ccache_path() -> PathBuf {
    std::env::temp_dir().join(format!("krb5cc_hadoop_exporter_{}", std::process::id()))
}
