//! Bridge backed by an external command.
//!
//! The command is invoked as `<program> <args...> <verb> <codename> [name]`.
//! Resource content, when there is any, is written to stdin. A zero exit
//! status means success; stdout is returned to the caller.

use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;

use super::{ActivationBridge, BridgeError, ThemeBridge, ThemeResource, ThemeResourceKind};

#[derive(Debug, Clone)]
pub struct CommandBridge {
    program: String,
    args: Vec<String>,
}

impl CommandBridge {
    /// Build from a configured argv. Empty argv means no bridge.
    pub fn from_argv(argv: &[String]) -> Result<Self, BridgeError> {
        let (program, args) = argv.split_first().ok_or(BridgeError::NotConfigured)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn run(&self, verb: &str, trailing: &[&str], stdin: Option<&[u8]>) -> Result<String, BridgeError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(verb)
            .args(trailing)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(command = %self.display(), verb, "invoking bridge");
        let spawn_err = |source| BridgeError::Spawn {
            command: self.display(),
            source,
        };
        let mut child = command.spawn().map_err(spawn_err)?;
        let pipe = child.stdin.take();

        // stdin is fed from its own thread while stdout and stderr drain,
        // so neither side can fill a pipe and stall the other.
        let (output, written) = thread::scope(|scope| {
            let writer = stdin
                .zip(pipe)
                .map(|(bytes, mut pipe)| scope.spawn(move || pipe.write_all(bytes)));
            let output = child.wait_with_output();
            let written = match writer {
                Some(handle) => handle
                    .join()
                    .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked"))),
                None => Ok(()),
            };
            (output, written)
        });

        let output = output.map_err(spawn_err)?;
        if !output.status.success() {
            return Err(BridgeError::Failed {
                command: self.display(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        // A command may exit successfully without reading all of its input.
        if let Err(err) = written
            && err.kind() != io::ErrorKind::BrokenPipe
        {
            return Err(spawn_err(err));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl ThemeBridge for CommandBridge {
    fn push(&self, codename: &str, resource: &ThemeResource) -> Result<(), BridgeError> {
        let verb = format!("push-{}", resource.kind.as_str());
        self.run(&verb, &[codename, &resource.name], Some(&resource.content))
            .map(|_| ())
    }

    fn retract(
        &self,
        codename: &str,
        kind: ThemeResourceKind,
        name: &str,
    ) -> Result<(), BridgeError> {
        let verb = format!("remove-{}", kind.as_str());
        self.run(&verb, &[codename, name], None).map(|_| ())
    }
}

impl ActivationBridge for CommandBridge {
    fn activate(&self, codename: &str) -> Result<String, BridgeError> {
        self.run("activate", &[codename], None)
    }

    fn deactivate(&self, codename: &str) -> Result<String, BridgeError> {
        self.run("deactivate", &[codename], None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_argv_is_not_configured() {
        assert!(matches!(
            CommandBridge::from_argv(&[]),
            Err(BridgeError::NotConfigured)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn activate_returns_stdout() {
        let bridge = CommandBridge::from_argv(&["echo".to_string(), "bridge".to_string()])
            .expect("bridge");
        let out = bridge.activate("widget").expect("echo should succeed");
        assert_eq!(out, "bridge activate widget");
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_reports_status() {
        let bridge = CommandBridge::from_argv(&["false".to_string()]).expect("bridge");
        assert!(matches!(
            bridge.deactivate("widget"),
            Err(BridgeError::Failed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn push_sends_content_on_stdin() {
        let bridge = CommandBridge::from_argv(&[
            "sh".to_string(),
            "-c".to_string(),
            "cat >/dev/null".to_string(),
        ])
        .expect("bridge");
        let resource = ThemeResource {
            kind: ThemeResourceKind::Stylesheet,
            name: "global.css".to_string(),
            content: b"body {}".to_vec(),
        };
        bridge.push("dark", &resource).expect("push should succeed");
    }

    #[cfg(unix)]
    #[test]
    fn large_output_before_reading_input_does_not_stall() {
        let bridge = CommandBridge::from_argv(&[
            "sh".to_string(),
            "-c".to_string(),
            "head -c 262144 /dev/zero | tr '\\0' x; cat >/dev/null".to_string(),
        ])
        .expect("bridge");
        let resource = ThemeResource {
            kind: ThemeResourceKind::Template,
            name: "header/welcome".to_string(),
            content: vec![b'a'; 1 << 20],
        };
        bridge.push("dark", &resource).expect("push should succeed");
    }
}
