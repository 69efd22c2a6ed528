//! Caller-owned IBM Quantum credentials and sessions.
//!
//! An [`IbmAccount`] holds a token and the `hub/group/project` instance. It
//! can be persisted with an [`AccountStore`]; nothing touches the disk unless
//! the caller asks the store to. An [`IbmSession`] is the authenticated
//! context built from an account: it lists the instance's devices and hands
//! out [`IbmBackend`]s.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::api::{BackendInfo, DEFAULT_ENDPOINT, IbmClient};
use crate::backend::IbmBackend;
use crate::error::{IbmError, IbmResult};

/// Hub used when none is given.
pub const DEFAULT_HUB: &str = "ibm-q";
/// Group used when none is given.
pub const DEFAULT_GROUP: &str = "open";
/// Project used when none is given.
pub const DEFAULT_PROJECT: &str = "main";

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_hub() -> String {
    DEFAULT_HUB.to_string()
}

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

fn default_project() -> String {
    DEFAULT_PROJECT.to_string()
}

/// IBM Quantum credentials plus the instance jobs run under.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IbmAccount {
    /// API token.
    pub token: String,
    /// API endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Hub of the instance.
    #[serde(default = "default_hub")]
    pub hub: String,
    /// Group of the instance.
    #[serde(default = "default_group")]
    pub group: String,
    /// Project of the instance.
    #[serde(default = "default_project")]
    pub project: String,
}

impl IbmAccount {
    /// An account on the default endpoint and the `ibm-q/open/main` instance.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            endpoint: default_endpoint(),
            hub: default_hub(),
            group: default_group(),
            project: default_project(),
        }
    }

    /// Set the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set hub, group and project. `None` keeps the current value.
    #[must_use]
    pub fn with_instance(
        mut self,
        hub: Option<&str>,
        group: Option<&str>,
        project: Option<&str>,
    ) -> Self {
        if let Some(hub) = hub {
            self.hub = hub.to_string();
        }
        if let Some(group) = group {
            self.group = group.to_string();
        }
        if let Some(project) = project {
            self.project = project.to_string();
        }
        self
    }

    /// The `hub/group/project` string.
    pub fn instance(&self) -> String {
        format!("{}/{}/{}", self.hub, self.group, self.project)
    }

    /// Read the token from `IBM_QUANTUM_TOKEN`.
    pub fn from_env() -> IbmResult<Self> {
        let token = std::env::var("IBM_QUANTUM_TOKEN").map_err(|_| IbmError::MissingToken)?;
        Ok(Self::new(token))
    }
}

impl fmt::Debug for IbmAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbmAccount")
            .field("token", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("hub", &self.hub)
            .field("group", &self.group)
            .field("project", &self.project)
            .finish()
    }
}

/// File-backed storage for one [`IbmAccount`].
#[derive(Debug, Clone)]
pub struct AccountStore {
    path: PathBuf,
}

impl AccountStore {
    /// A store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.qcat/ibm_account.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".qcat").join("ibm_account.json"))
    }

    /// A store at [`AccountStore::default_path`].
    pub fn open_default() -> IbmResult<Self> {
        Self::default_path().map(Self::new).ok_or_else(|| {
            IbmError::InvalidParameter("could not determine home directory".into())
        })
    }

    /// Location of the account file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> IbmError {
        IbmError::AccountStore {
            path: self.path.clone(),
            source,
        }
    }

    /// Load the saved account. `Ok(None)` when nothing was saved.
    pub fn load(&self) -> IbmResult<Option<IbmAccount>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Save `account`, replacing any previous one.
    #[instrument(skip(self, account), fields(path = %self.path.display()))]
    pub fn save(&self, account: &IbmAccount) -> IbmResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(account)?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&self.path)
                .map_err(|e| self.io_error(e))?
                .permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&self.path, perms).map_err(|e| self.io_error(e))?;
        }

        info!("saved IBM Quantum account");
        Ok(())
    }

    /// Remove the saved account, if any.
    pub fn delete(&self) -> IbmResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// Pick the operational real device with the fewest pending jobs.
///
/// Simulators and offline devices are skipped; ties go to the
/// alphabetically first name.
pub fn least_busy(backends: &[BackendInfo]) -> Option<&BackendInfo> {
    backends
        .iter()
        .filter(|b| b.status.operational && !b.simulator)
        .min_by(|a, b| {
            let pending = |info: &BackendInfo| info.status.pending_jobs.unwrap_or(u32::MAX);
            pending(a)
                .cmp(&pending(b))
                .then_with(|| a.name.cmp(&b.name))
        })
}

/// An authenticated IBM Quantum context.
#[derive(Debug, Clone)]
pub struct IbmSession {
    client: Arc<IbmClient>,
    account: IbmAccount,
}

impl IbmSession {
    /// Build a session for `account`. No request is sent yet.
    pub fn open(account: IbmAccount) -> IbmResult<Self> {
        let client =
            IbmClient::new(account.endpoint.clone(), &account.token)?.with_instance(account.instance());
        Ok(Self {
            client: Arc::new(client),
            account,
        })
    }

    /// The account this session was opened with.
    pub fn account(&self) -> &IbmAccount {
        &self.account
    }

    /// Devices visible to the instance.
    pub async fn backends(&self) -> IbmResult<Vec<BackendInfo>> {
        self.client.list_backends().await
    }

    /// Backend for `name`, or the least-busy device when `name` is `None`.
    #[instrument(skip(self))]
    pub async fn backend(&self, name: Option<&str>) -> IbmResult<IbmBackend> {
        let info = match name {
            Some(name) => self.client.get_backend(name).await?,
            None => {
                let backends = self.backends().await?;
                least_busy(&backends)
                    .cloned()
                    .ok_or_else(|| IbmError::NoDeviceAvailable(self.account.instance()))?
            }
        };
        debug!(
            "selected IBM backend {} ({} pending jobs)",
            info.name,
            info.status.pending_jobs.unwrap_or(0)
        );
        Ok(IbmBackend::from_info(Arc::clone(&self.client), info))
    }
}
