//! Remote command sessions to network devices.
//!
//! The backup workflow only depends on the [`SessionClient`] and
//! [`DeviceSession`] traits; [`ssh::SshClient`] is the production
//! implementation.

pub mod identity;
pub mod ssh;

use crate::groups::{Dialect, IdentityPolicy, SHOW_RUN_COMMAND};
use crate::inventory::DeviceRecord;
use crate::utils::SessionError;

pub use identity::{resolve_identity, sanitize_identity};
pub use ssh::SshClient;

/// An authenticated interactive session to one device.
pub trait DeviceSession {
    /// Enter privileged mode using the device's enable secret.
    fn elevate(&mut self) -> Result<(), SessionError>;

    /// Run a command and return its output without echo or trailing prompt.
    fn send(&mut self, command: &str) -> Result<String, SessionError>;

    /// The prompt currently shown by the device, e.g. `core-sw1#`.
    fn prompt(&mut self) -> Result<String, SessionError>;

    /// Filename-safe device identity discovered per `policy`.
    fn identity(&mut self, policy: IdentityPolicy) -> Result<String, SessionError> {
        resolve_identity(self, policy)
    }
}

/// Opens sessions. Implementations are blocking and are driven from a
/// blocking task by the group runner.
pub trait SessionClient: Send + Sync {
    fn connect(
        &self,
        dialect: Dialect,
        device: &DeviceRecord,
    ) -> Result<Box<dyn DeviceSession>, SessionError>;
}

/// Running configuration and the identity it will be filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedConfig {
    pub identity: String,
    pub config: String,
}

/// Connect, elevate, pull the running configuration and resolve the identity.
pub fn fetch_running_config(
    client: &dyn SessionClient,
    dialect: Dialect,
    policy: IdentityPolicy,
    device: &DeviceRecord,
) -> Result<FetchedConfig, SessionError> {
    let mut session = client.connect(dialect, device)?;
    session.elevate()?;
    let config = session.send(SHOW_RUN_COMMAND)?;
    let identity = session.identity(policy)?;

    Ok(FetchedConfig { identity, config })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::UPTIME_COMMAND;
    use std::sync::{Arc, Mutex};

    struct ScriptedSession {
        log: Arc<Mutex<Vec<String>>>,
        elevated: bool,
    }

    impl DeviceSession for ScriptedSession {
        fn elevate(&mut self) -> Result<(), SessionError> {
            self.log.lock().unwrap().push("enable".into());
            self.elevated = true;
            Ok(())
        }

        fn send(&mut self, command: &str) -> Result<String, SessionError> {
            self.log.lock().unwrap().push(command.to_string());
            if !self.elevated {
                return Err(SessionError::Protocol("not privileged".into()));
            }
            match command {
                SHOW_RUN_COMMAND => Ok("hostname edge-rtr\n!\nend\n".into()),
                UPTIME_COMMAND => Ok("edge-rtr uptime is 4 weeks, 2 days\n".into()),
                other => Err(SessionError::Protocol(format!("unexpected {other}"))),
            }
        }

        fn prompt(&mut self) -> Result<String, SessionError> {
            Ok("edge-sw#".into())
        }
    }

    struct ScriptedClient {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl SessionClient for ScriptedClient {
        fn connect(
            &self,
            _dialect: Dialect,
            _device: &DeviceRecord,
        ) -> Result<Box<dyn DeviceSession>, SessionError> {
            Ok(Box::new(ScriptedSession {
                log: self.log.clone(),
                elevated: false,
            }))
        }
    }

    fn device() -> DeviceRecord {
        DeviceRecord {
            address: "192.0.2.1".into(),
            username: "admin".into(),
            password: "pw".into(),
            enable_secret: "en".into(),
            label: "edge".into(),
        }
    }

    #[test]
    fn test_fetch_elevates_before_show_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let client = ScriptedClient { log: log.clone() };

        let fetched =
            fetch_running_config(&client, Dialect::Ios, IdentityPolicy::UptimeToken, &device())
                .unwrap();

        assert_eq!(fetched.identity, "edge-rtr");
        assert!(fetched.config.starts_with("hostname edge-rtr"));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["enable", SHOW_RUN_COMMAND, UPTIME_COMMAND]
        );
    }

    #[test]
    fn test_fetch_with_prompt_identity() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let client = ScriptedClient { log: log.clone() };

        let fetched =
            fetch_running_config(&client, Dialect::NxOs, IdentityPolicy::PromptStrip, &device())
                .unwrap();

        assert_eq!(fetched.identity, "edge-sw");
        assert_eq!(log.lock().unwrap().len(), 2);
    }
}
