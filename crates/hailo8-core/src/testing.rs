//! Scripted [`CommandRunner`] for tests.
//!
//! Replies are chosen by argv prefix; the most recently added matching rule
//! wins. Every invocation is recorded so tests can assert on exactly which
//! commands ran.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::ports::{CommandOutput, CommandRunner, CommandSpec};

/// `/etc/os-release` of an Ubuntu 22.04 host.
pub const UBUNTU_OS_RELEASE: &str = "NAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\nID=ubuntu\nID_LIKE=debian\nPRETTY_NAME=\"Ubuntu 22.04.4 LTS\"\n";

struct Rule {
    prefix: Vec<String>,
    queued: VecDeque<CommandOutput>,
    then: CommandOutput,
}

impl Rule {
    fn matches(&self, argv: &[&str]) -> bool {
        argv.len() >= self.prefix.len() && self.prefix.iter().zip(argv).all(|(p, a)| p == a)
    }

    fn next(&mut self) -> CommandOutput {
        self.queued.pop_front().unwrap_or_else(|| self.then.clone())
    }
}

/// A fake command runner driven by argv-prefix rules.
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<CommandSpec>>,
    fallback: CommandOutput,
}

impl ScriptedRunner {
    /// Unmatched commands succeed with empty output.
    pub fn succeeding() -> Self {
        Self::with_fallback(CommandOutput::ok(""))
    }

    /// Unmatched commands fail with exit code 1.
    pub fn failing() -> Self {
        Self::with_fallback(CommandOutput::failed("command failed"))
    }

    fn with_fallback(fallback: CommandOutput) -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            fallback,
        }
    }

    /// An Ubuntu x86_64 host with apt, a visible Hailo device and the
    /// driver loaded. Everything else succeeds.
    pub fn healthy_host() -> Self {
        let runner = Self::succeeding();
        runner
            .on(&["cat", "/etc/os-release"], CommandOutput::ok(UBUNTU_OS_RELEASE))
            .on(&["uname", "-s"], CommandOutput::ok("Linux\n"))
            .on(&["uname", "-r"], CommandOutput::ok("5.15.0-91-generic\n"))
            .on(&["uname", "-m"], CommandOutput::ok("x86_64\n"))
            .on(&["which", "yum"], CommandOutput::failed(""))
            .on(&["which", "dnf"], CommandOutput::failed(""))
            .on(
                &["lsmod"],
                CommandOutput::ok("Module  Size  Used by\nhailo_pci  118784  0\n"),
            )
            .on(
                &["lspci", "-d"],
                CommandOutput::ok(
                    "01:00.0 Co-processor: Hailo Technologies Ltd. Hailo-8 AI Processor (rev 01)\n",
                ),
            )
            .on(&["systemctl", "is-active"], CommandOutput::ok("active\n"))
            .on(&["nvidia-smi"], CommandOutput::failed("not found"));
        runner
    }

    /// Always reply to commands starting with `prefix` with `output`.
    pub fn on(&self, prefix: &[&str], output: CommandOutput) -> &Self {
        self.on_sequence(prefix, Vec::new(), output)
    }

    /// Reply with `queued` in order, then with `then` forever.
    pub fn on_sequence(
        &self,
        prefix: &[&str],
        queued: Vec<CommandOutput>,
        then: CommandOutput,
    ) -> &Self {
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Rule {
                prefix: prefix.iter().map(|s| (*s).to_string()).collect(),
                queued: queued.into(),
                then,
            });
        self
    }

    /// Every recorded invocation.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded invocations rendered as command lines.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of invocations whose argv starts with `prefix`.
    pub fn count_matching(&self, prefix: &[&str]) -> usize {
        self.calls()
            .iter()
            .filter(|spec| {
                let argv = spec.argv();
                argv.len() >= prefix.len() && prefix.iter().zip(&argv).all(|(p, a)| p == a)
            })
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> CommandOutput {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(spec.clone());

        let argv = spec.argv();
        let mut rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
        rules
            .iter_mut()
            .rev()
            .find(|rule| rule.matches(&argv))
            .map_or_else(|| self.fallback.clone(), Rule::next)
    }
}
