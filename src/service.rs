//! Best-effort reload of the target application's service after generation.

use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

/// Service names to try, most specific first
pub fn reload_candidates(app: &str, explicit: Option<&str>) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    if let Some(name) = explicit.filter(|n| !n.trim().is_empty()) {
        candidates.push(name.trim().to_string());
    }
    for name in [
        format!("gunicorn-{}.service", app),
        format!("gunicorn-{}", app),
        format!("gunicorn@{}", app),
        format!("gunicorn@{}.service", app),
        "gunicorn@default".to_string(),
        "gunicorn.service".to_string(),
        "gunicorn".to_string(),
    ] {
        if !candidates.contains(&name) {
            candidates.push(name);
        }
    }
    candidates
}

/// Runs one service-manager action; true on success
pub trait ServiceManager {
    fn run(&self, action: &str, service: &str, timeout: Duration) -> bool;
}

/// `systemctl <action> <service>` with a hard timeout
#[derive(Debug, Clone, Default)]
pub struct Systemctl;

impl ServiceManager for Systemctl {
    fn run(&self, action: &str, service: &str, timeout: Duration) -> bool {
        let mut child = match Command::new("systemctl")
            .arg(action)
            .arg(service)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                debug!(error = %e, "Could not start systemctl");
                return false;
            }
        };

        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return status.success(),
                Ok(None) if started.elapsed() >= timeout => {
                    warn!(service, action, "systemctl timed out");
                    let _ = child.kill();
                    let _ = child.wait();
                    return false;
                }
                Ok(None) => thread::sleep(Duration::from_millis(50)),
                Err(e) => {
                    debug!(error = %e, "Waiting on systemctl failed");
                    return false;
                }
            }
        }
    }
}

/// Reload, then restart, each candidate until one succeeds.
///
/// Returns the service that took the action, or `None` when every candidate
/// failed. Never fails the run.
pub fn reload_service(
    manager: &dyn ServiceManager,
    app: &str,
    explicit: Option<&str>,
    timeout: Duration,
) -> Option<String> {
    for service in reload_candidates(app, explicit) {
        for action in ["reload", "restart"] {
            if manager.run(action, &service, timeout) {
                info!(service = %service, action, "Service refreshed");
                return Some(service);
            }
            debug!(service = %service, action, "Service action failed");
        }
    }
    warn!(app, "No suitable service found to reload");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder {
        calls: RefCell<Vec<String>>,
        succeed_on: Option<&'static str>,
    }

    impl ServiceManager for Recorder {
        fn run(&self, action: &str, service: &str, _timeout: Duration) -> bool {
            let call = format!("{} {}", action, service);
            self.calls.borrow_mut().push(call.clone());
            self.succeed_on == Some(call.as_str())
        }
    }

    #[test]
    fn test_candidates_order() {
        let c = reload_candidates("ventas", Some("ventas-web"));
        assert_eq!(c[0], "ventas-web");
        assert_eq!(c[1], "gunicorn-ventas.service");
        assert_eq!(c.last().map(String::as_str), Some("gunicorn"));
        assert_eq!(reload_candidates("ventas", None).len(), 7);
    }

    #[test]
    fn test_restart_after_failed_reload() {
        let rec = Recorder {
            calls: RefCell::new(Vec::new()),
            succeed_on: Some("restart gunicorn-ventas"),
        };
        let hit = reload_service(&rec, "ventas", None, Duration::from_secs(1));
        assert_eq!(hit.as_deref(), Some("gunicorn-ventas"));
        assert_eq!(
            rec.calls.borrow().as_slice(),
            [
                "reload gunicorn-ventas.service",
                "restart gunicorn-ventas.service",
                "reload gunicorn-ventas",
                "restart gunicorn-ventas",
            ]
        );
    }

    #[test]
    fn test_exhaustion_is_none() {
        let rec = Recorder {
            calls: RefCell::new(Vec::new()),
            succeed_on: None,
        };
        assert_eq!(reload_service(&rec, "ventas", None, Duration::from_secs(1)), None);
        assert_eq!(rec.calls.borrow().len(), 14);
    }
}
