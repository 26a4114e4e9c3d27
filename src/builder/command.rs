//! Builders that run a configured command line.

use std::collections::BTreeMap;

use crate::builder::external::{BuildError, BuildKind, BuildOutput, BuildRequest, ExternalBuilder};
use crate::util::config::BuilderCommand;
use crate::util::process::{resolve_program, ProcessBuilder};

/// Runs `[builders.<kind>]` from the configuration.
///
/// `{name}`, `{source_dir}`, `{output_dir}`, `{platform}`, `{classpath}`,
/// `{processors}` and `{language_version}` in arguments and environment
/// values are replaced from the request. An argument that is exactly
/// `{source_dirs}` expands to one argument per source directory.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    kind: BuildKind,
    command: BuilderCommand,
    name: String,
}

impl CommandBuilder {
    pub fn new(kind: BuildKind, command: BuilderCommand) -> Self {
        let name = format!("{}:{} {}", kind, command.program, command.args.join(" "));
        CommandBuilder { kind, command, name }
    }

    fn variables(request: &BuildRequest) -> BTreeMap<&'static str, String> {
        let separator = if cfg!(windows) { ";" } else { ":" };
        let join =
            |paths: &mut dyn Iterator<Item = String>| paths.collect::<Vec<_>>().join(separator);

        let mut classpath = request
            .inputs
            .iter()
            .map(|h| h.path.display().to_string())
            .chain(request.libraries.iter().map(|p| p.display().to_string()));
        let mut processors = request.processors.iter().map(|p| p.display().to_string());

        BTreeMap::from([
            ("name", request.node.name().to_string()),
            (
                "source_dir",
                request
                    .source_dirs
                    .first()
                    .unwrap_or(&request.base_dir)
                    .display()
                    .to_string(),
            ),
            ("output_dir", request.options.output_dir.display().to_string()),
            (
                "platform",
                request.options.platform.map(|p| p.to_string()).unwrap_or_default(),
            ),
            ("classpath", join(&mut classpath)),
            ("processors", join(&mut processors)),
            (
                "language_version",
                request
                    .options
                    .language_version
                    .map(|v| v.min.to_string())
                    .unwrap_or_default(),
            ),
        ])
    }

    fn expand(template: &str, vars: &BTreeMap<&'static str, String>) -> String {
        let mut out = template.to_string();
        for (key, value) in vars {
            out = out.replace(&format!("{{{}}}", key), value);
        }
        out
    }
}

impl ExternalBuilder for CommandBuilder {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError> {
        let program = resolve_program(&self.command.program).ok_or_else(|| {
            BuildError::Other(format!(
                "{} builder program `{}` not found",
                self.kind, self.command.program
            ))
        })?;

        let output_dir = &request.options.output_dir;
        std::fs::create_dir_all(output_dir).map_err(|source| BuildError::Io {
            path: output_dir.clone(),
            source,
        })?;

        let vars = Self::variables(request);
        let mut cmd = ProcessBuilder::new(program).cwd(&request.base_dir);
        for arg in &self.command.args {
            if arg == "{source_dirs}" {
                cmd = cmd.args(request.source_dirs.iter());
            } else {
                cmd = cmd.arg(Self::expand(arg, &vars));
            }
        }
        for (key, value) in &self.command.env {
            cmd = cmd.env(key, Self::expand(value, &vars));
        }
        cmd = cmd.envs(&request.options.env);

        tracing::debug!("running {}", cmd.display_command());
        let output = cmd.exec().map_err(|e| BuildError::Other(format!("{:#}", e)))?;
        if !output.status.success() {
            return Err(BuildError::Tool {
                command: cmd.display_command(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        for result in &request.options.results {
            let path = output_dir.join(result);
            if !path.exists() {
                return Err(BuildError::MissingOutput { path });
            }
        }

        BuildOutput::scan(output_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::external::BuildOptions;
    use crate::core::entity_id::EntityId;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn request(tmp: &TempDir, results: Vec<String>) -> BuildRequest {
        BuildRequest {
            node: EntityId::new("demo", "cext"),
            kind: BuildKind::Native,
            base_dir: tmp.path().to_path_buf(),
            source_dirs: vec![tmp.path().join("src")],
            inputs: vec![],
            libraries: vec![],
            processors: vec![],
            options: BuildOptions {
                output_dir: tmp.path().join("out"),
                results,
                ..Default::default()
            },
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_templated_command() {
        let tmp = TempDir::new().unwrap();
        let builder = CommandBuilder::new(
            BuildKind::Native,
            BuilderCommand {
                program: "sh".into(),
                args: vec!["-c".into(), "printf %s \"$GREETING\" > {output_dir}/{name}.txt".into()],
                env: BTreeMap::from([("GREETING".to_string(), "hello {name}".to_string())]),
            },
        );

        let output = builder.build(&request(&tmp, vec!["cext.txt".into()])).unwrap();
        assert_eq!(output.files, [PathBuf::from("cext.txt")]);
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("out/cext.txt")).unwrap(),
            "hello cext"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_and_missing_result() {
        let tmp = TempDir::new().unwrap();
        let failing = CommandBuilder::new(
            BuildKind::Native,
            BuilderCommand {
                program: "sh".into(),
                args: vec!["-c".into(), "echo broken >&2; exit 3".into()],
                env: BTreeMap::new(),
            },
        );
        match failing.build(&request(&tmp, vec![])).unwrap_err() {
            BuildError::Tool { stderr, .. } => assert_eq!(stderr.trim(), "broken"),
            other => panic!("unexpected error {:?}", other),
        }

        let silent = CommandBuilder::new(
            BuildKind::Native,
            BuilderCommand {
                program: "true".into(),
                args: vec![],
                env: BTreeMap::new(),
            },
        );
        assert!(matches!(
            silent.build(&request(&tmp, vec!["libcext.so".into()])),
            Err(BuildError::MissingOutput { .. })
        ));
    }

    #[test]
    fn test_unknown_program() {
        let tmp = TempDir::new().unwrap();
        let builder = CommandBuilder::new(
            BuildKind::Managed,
            BuilderCommand {
                program: "quay-no-such-compiler".into(),
                args: vec![],
                env: BTreeMap::new(),
            },
        );
        assert!(matches!(builder.build(&request(&tmp, vec![])), Err(BuildError::Other(_))));
    }
}
