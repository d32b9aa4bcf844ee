use std::path::Path;

use crate::worker::executor::Invocation;

/// Fixed unprivileged identity the external binaries run as.
///
/// The switch is `sudo -u <user> -n --`: non-interactive, with the option
/// list terminated so the wrapped command cannot be parsed as sudo flags.
#[derive(Debug, Clone)]
pub struct PrivilegeContext {
    service_user: String,
}

impl PrivilegeContext {
    pub fn new(service_user: impl Into<String>) -> Self {
        Self {
            service_user: service_user.into(),
        }
    }

    /// Open a scope for one external invocation.
    ///
    /// Every invocation gets its own scope; scopes are never shared
    /// between concurrent jobs.
    pub fn enter(&self, host_id: i64) -> PrivilegeScope {
        tracing::debug!(host_id, service_user = %self.service_user, "entering privilege scope");
        PrivilegeScope {
            service_user: self.service_user.clone(),
            host_id,
        }
    }
}

/// Live privilege scope for a single invocation.
///
/// Dropping the scope is the release, so it runs on every exit path —
/// normal completion, launch failure, and forced timeout kills alike.
#[derive(Debug)]
pub struct PrivilegeScope {
    service_user: String,
    host_id: i64,
}

impl PrivilegeScope {
    /// Wrap `binary` and `args` in the scoped identity switch.
    pub fn wrap(&self, binary: &Path, args: &[String]) -> Invocation {
        let mut wrapped = vec![
            "-u".to_string(),
            self.service_user.clone(),
            "-n".to_string(),
            "--".to_string(),
            binary.display().to_string(),
        ];
        wrapped.extend(args.iter().cloned());
        Invocation::new("sudo", wrapped)
    }
}

impl Drop for PrivilegeScope {
    fn drop(&mut self) {
        tracing::debug!(host_id = self.host_id, "privilege scope released");
    }
}
