use std::process::Command;

use log::{debug, warn};

use crate::engine::ConcurrencyBudget;
use crate::error::{Error, ProbeError};

/// Source of the host's safe concurrency ceiling.
pub trait ResourceLimitProbe {
    fn discover_limit(&self) -> Result<usize, ProbeError>;
    fn name(&self) -> String;
}

/// Asks the shell for the open file descriptor limit (`ulimit -n`).
#[derive(Clone, Debug)]
pub struct UlimitProbe {
    shell: String,
}

impl Default for UlimitProbe {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl UlimitProbe {
    const SCRIPT: &'static str = "ulimit -n";

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    fn command(&self) -> String {
        format!("{} -c '{}'", self.shell, Self::SCRIPT)
    }
}

pub fn parse_ulimit(output: &str) -> Result<usize, ProbeError> {
    let value = output.trim();
    if value == "unlimited" {
        return Err(ProbeError::Unbounded);
    }
    value.parse::<usize>().map_err(|_| ProbeError::Parse {
        output: value.to_string(),
    })
}

impl ResourceLimitProbe for UlimitProbe {
    fn discover_limit(&self) -> Result<usize, ProbeError> {
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(Self::SCRIPT)
            .output()
            .map_err(|source| ProbeError::Command {
                command: self.command(),
                source,
            })?;
        if !output.status.success() {
            return Err(ProbeError::Status {
                command: self.command(),
                status: output.status.to_string(),
            });
        }
        parse_ulimit(&String::from_utf8_lossy(&output.stdout))
    }

    fn name(&self) -> String {
        return "ulimit".to_string()
    }
}

/// Available cores times a small multiplier. Never fails.
#[derive(Clone, Copy, Debug)]
pub struct CpuProbe {
    pub multiplier: usize,
}

impl Default for CpuProbe {
    fn default() -> Self {
        Self { multiplier: 4 }
    }
}

impl ResourceLimitProbe for CpuProbe {
    fn discover_limit(&self) -> Result<usize, ProbeError> {
        Ok(num_cpus::get().saturating_mul(self.multiplier))
    }

    fn name(&self) -> String {
        return "cpu".to_string()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedLimit(pub usize);

impl ResourceLimitProbe for FixedLimit {
    fn discover_limit(&self) -> Result<usize, ProbeError> {
        Ok(self.0)
    }

    fn name(&self) -> String {
        return "fixed".to_string()
    }
}

/// What to do when the probe cannot report a limit.
#[derive(Clone, Copy, Debug)]
pub enum ProbePolicy {
    /// The run cannot continue without a reported limit.
    Strict,
    /// Warn and fall back to a CPU-derived limit.
    Fallback(CpuProbe),
}

pub fn resolve_budget(
    probe: &dyn ResourceLimitProbe,
    policy: ProbePolicy,
) -> Result<ConcurrencyBudget, Error> {
    let limit = match (probe.discover_limit(), policy) {
        (Ok(limit), _) => {
            debug!("{} probe reported a limit of {}", probe.name(), limit);
            limit
        }
        (Err(err), ProbePolicy::Strict) => return Err(err.into()),
        (Err(err), ProbePolicy::Fallback(fallback)) => {
            let limit = fallback.discover_limit()?;
            warn!(
                "{} probe failed ({}), falling back to {} x cores = {}",
                probe.name(),
                err,
                fallback.multiplier,
                limit
            );
            limit
        }
    };
    ConcurrencyBudget::new(limit).map_err(|_| {
        Error::InvalidBudget(format!("{} probe reported a limit of {}", probe.name(), limit))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl ResourceLimitProbe for Broken {
        fn discover_limit(&self) -> Result<usize, ProbeError> {
            Err(ProbeError::Unbounded)
        }

        fn name(&self) -> String {
            "broken".to_string()
        }
    }

    #[test]
    fn parses_ulimit_output() {
        assert_eq!(parse_ulimit("1024\n").unwrap(), 1024);
        assert!(matches!(parse_ulimit("unlimited\n"), Err(ProbeError::Unbounded)));
        assert!(matches!(parse_ulimit("lots"), Err(ProbeError::Parse { .. })));
        assert!(matches!(parse_ulimit("-1"), Err(ProbeError::Parse { .. })));
    }

    #[test]
    fn fixed_limit_becomes_budget() {
        let budget = resolve_budget(&FixedLimit(16), ProbePolicy::Strict).unwrap();
        assert_eq!(budget.get(), 16);
    }

    #[test]
    fn zero_limit_is_invalid_budget() {
        let result = resolve_budget(&FixedLimit(0), ProbePolicy::Fallback(CpuProbe::default()));
        assert!(matches!(result, Err(Error::InvalidBudget(_))));
    }

    #[test]
    fn strict_policy_fails_loudly() {
        let result = resolve_budget(&Broken, ProbePolicy::Strict);
        assert!(matches!(result, Err(Error::Probe(ProbeError::Unbounded))));
    }

    #[test]
    fn fallback_policy_uses_cores() {
        let fallback = CpuProbe { multiplier: 2 };
        let budget = resolve_budget(&Broken, ProbePolicy::Fallback(fallback)).unwrap();
        assert_eq!(budget.get(), num_cpus::get() * 2);
    }

    #[test]
    fn missing_shell_is_a_command_error() {
        let probe = UlimitProbe::with_shell("/nonexistent/shell-for-pixbright");
        assert!(matches!(
            probe.discover_limit(),
            Err(ProbeError::Command { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn ulimit_probe_reports_a_limit() {
        match UlimitProbe::default().discover_limit() {
            Ok(limit) => assert!(limit > 0),
            Err(ProbeError::Unbounded) => {}
            Err(err) => panic!("unexpected probe failure: {err}"),
        }
    }
}
