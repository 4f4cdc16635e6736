//! Remote instance identity and endpoint layout.

pub mod state;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use state::{
    InstanceState, ModuleInfo, ModuleSnapshot, ModuleState, ServiceInfo, ServiceSnapshot,
    ServiceState,
};

const PACKAGE_MANAGER_SERVICE: &str = "/crx/packmgr/service";
const PACKAGE_MANAGER_LIST: &str = "/crx/packmgr/list.jsp";
const SYSTEM_CONSOLE: &str = "/system/console";

/// Role of an instance in the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstanceKind {
    #[default]
    Author,
    Publish,
}

impl InstanceKind {
    /// Guess the role from a conventional name such as `local-publish`.
    pub fn from_name(name: &str) -> Self {
        if name.ends_with("publish") {
            InstanceKind::Publish
        } else {
            InstanceKind::Author
        }
    }
}

/// One configured remote server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    name: String,
    url: String,
    user: String,
    password: String,
    environment: String,
    kind: InstanceKind,
}

impl Instance {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let kind = InstanceKind::from_name(&name);
        Self {
            name,
            url: url.into().trim_end_matches('/').to_string(),
            user: user.into(),
            password: password.into(),
            environment: "local".to_string(),
            kind,
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_kind(mut self, kind: InstanceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL without trailing slash
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn kind(&self) -> InstanceKind {
        self.kind
    }

    pub fn endpoints(&self) -> Endpoints<'_> {
        Endpoints { base: &self.url }
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

/// Management endpoint URLs of an instance.
#[derive(Debug, Clone, Copy)]
pub struct Endpoints<'a> {
    base: &'a str,
}

impl Endpoints<'_> {
    pub fn json_service(&self) -> String {
        format!("{}{}/.json", self.base, PACKAGE_MANAGER_SERVICE)
    }

    pub fn html_service(&self) -> String {
        format!("{}{}/.html", self.base, PACKAGE_MANAGER_SERVICE)
    }

    pub fn upload(&self) -> String {
        format!("{}/?cmd=upload", self.json_service())
    }

    pub fn install(&self, path: &str) -> String {
        format!("{}{}/?cmd=install", self.html_service(), path)
    }

    pub fn activate(&self, path: &str) -> String {
        format!("{}{}/?cmd=replicate", self.json_service(), path)
    }

    pub fn build(&self, path: &str) -> String {
        format!("{}{}/?cmd=build", self.json_service(), path)
    }

    pub fn delete(&self, path: &str) -> String {
        format!("{}{}/?cmd=delete", self.html_service(), path)
    }

    pub fn uninstall(&self, path: &str) -> String {
        format!("{}{}/?cmd=uninstall", self.html_service(), path)
    }

    pub fn list_packages(&self) -> String {
        format!("{}{}", self.base, PACKAGE_MANAGER_LIST)
    }

    pub fn bundles(&self) -> String {
        format!("{}{}/bundles.json", self.base, SYSTEM_CONSOLE)
    }

    pub fn components(&self) -> String {
        format!("{}{}/components.json", self.base, SYSTEM_CONSOLE)
    }

    pub fn vm_stat(&self) -> String {
        format!("{}{}/vmstat", self.base, SYSTEM_CONSOLE)
    }
}
