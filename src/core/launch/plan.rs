use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::core::instance::safe_path_str;

use super::classpath::join_classpath;

/// How the runtime is told what to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Invocation {
    /// `-jar <archive>`.
    Archive(PathBuf),
    /// `-cp <classpath> <class>`.
    MainClass(String),
}

/// Compatibility state chosen once per launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatMode {
    #[default]
    Modern,
    Legacy,
}

/// Fully resolved invocation, owned by exactly one launch attempt.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchPlan {
    pub runtime: PathBuf,
    pub instance_dir: PathBuf,
    pub jvm_args: Vec<String>,
    /// Absolute, de-duplicated, in load order.
    pub classpath: Vec<PathBuf>,
    pub invocation: Invocation,
    /// Entry point the client starts in, whether named by the archive
    /// manifest or resolved from the classpath.
    pub entry_class: String,
    /// The archive treated as the game client, if one was identified.
    pub game_archive: Option<PathBuf>,
    pub game_args: Vec<String>,
    /// Extra environment for the child process.
    pub env: BTreeMap<String, String>,
    pub mode: CompatMode,
    /// Substitutions and fallbacks taken while resolving.
    pub notes: Vec<String>,
}

impl LaunchPlan {
    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }

    /// Arguments selecting what to run, placed between JVM and game args.
    pub fn invocation_args(&self) -> Vec<String> {
        match &self.invocation {
            Invocation::Archive(path) => vec!["-jar".into(), safe_path_str(path)],
            Invocation::MainClass(class) => vec![
                "-cp".into(),
                join_classpath(&self.classpath),
                class.clone(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(invocation: Invocation) -> LaunchPlan {
        LaunchPlan {
            runtime: "java".into(),
            instance_dir: "/inst".into(),
            jvm_args: Vec::new(),
            classpath: vec!["/inst/a.jar".into(), "/inst/b.jar".into()],
            invocation,
            entry_class: "a.Main".into(),
            game_archive: None,
            game_args: Vec::new(),
            env: BTreeMap::new(),
            mode: CompatMode::Modern,
            notes: Vec::new(),
        }
    }

    #[test]
    fn archive_invocation_ignores_classpath() {
        let args = plan(Invocation::Archive("/inst/client.jar".into())).invocation_args();
        assert_eq!(args, vec!["-jar".to_string(), "/inst/client.jar".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn class_invocation_joins_classpath() {
        let args = plan(Invocation::MainClass("a.Main".into())).invocation_args();
        assert_eq!(args, vec!["-cp", "/inst/a.jar:/inst/b.jar", "a.Main"]);
    }
}
