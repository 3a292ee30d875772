// ─── Process Orchestrator ───
// Spawns the resolved plan, streams both output pipes line by line and waits
// for exit or cancellation. Cancellation takes down the whole process tree.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::{Pid, System};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::arguments::apply_heap_bounds;
use super::plan::LaunchPlan;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::{safe_path_str, InstanceLayout};
use crate::core::manifest::RouteSpec;
use crate::core::settings::LaunchSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn tag(self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

/// One line of child output, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

/// Receives output lines; called from the reader tasks.
pub type LineSink = Arc<dyn Fn(OutputLine) + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct LaunchOutcome {
    /// `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    pub runtime: PathBuf,
    pub started_at: DateTime<Utc>,
    pub exited_at: DateTime<Utc>,
}

type Reader = JoinHandle<io::Result<()>>;

pub struct ProcessOrchestrator {
    heap: (u32, u32),
    drain_timeout: Duration,
}

impl ProcessOrchestrator {
    pub fn new(settings: &LaunchSettings) -> Self {
        Self {
            heap: settings.heap_bounds(),
            drain_timeout: Duration::from_millis(settings.output_drain_timeout_ms),
        }
    }

    /// Arguments after the runtime: heap bounds, JVM args, invocation, game args.
    pub fn command_line(&self, plan: &LaunchPlan) -> Vec<String> {
        let mut args = plan.jvm_args.clone();
        apply_heap_bounds(&mut args, self.heap.0, self.heap.1);
        args.extend(plan.invocation_args());
        args.extend(plan.game_args.iter().cloned());
        args
    }

    #[instrument(skip_all, fields(runtime = ?plan.runtime, server = %route.address))]
    pub async fn launch(
        &self,
        plan: &LaunchPlan,
        route: &RouteSpec,
        on_line: LineSink,
        cancel: &CancellationToken,
    ) -> LauncherResult<LaunchOutcome> {
        if cancel.is_cancelled() {
            return Err(LauncherError::Cancelled);
        }

        let args = self.command_line(plan);
        let mut cmd = Command::new(&plan.runtime);
        cmd.args(&args)
            .current_dir(&plan.instance_dir)
            .envs(&plan.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        configure_native_library_env(&mut cmd, plan);

        info!("Launching {:?} in {:?}", plan.runtime, plan.instance_dir);
        debug!("Command (copy/paste): {}", format_command_for_logs(&plan.runtime, &args));

        let mut child = cmd.spawn().map_err(|source| LauncherError::ProcessSpawn {
            executable: plan.runtime.clone(),
            source,
        })?;
        let started_at = Utc::now();

        let mut readers: Vec<Reader> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(pump_lines(stdout, OutputStream::Stdout, on_line.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(pump_lines(stderr, OutputStream::Stderr, on_line)));
        }

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                terminate(&mut child, &readers).await;
                return Err(LauncherError::Cancelled);
            }
            status = child.wait() => status.map_err(|source| LauncherError::io(&plan.runtime, source))?,
        };
        let exited_at = Utc::now();
        let exit_code = status.code().unwrap_or(-1);
        info!("Process exited with {:?}", status);

        let drained = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            drained = tokio::time::timeout(self.drain_timeout, drain_readers(&mut readers)) => Some(drained.is_ok()),
        };
        match drained {
            Some(true) => {}
            Some(false) => {
                warn!(
                    "Output not drained within {:?}; dropping the rest",
                    self.drain_timeout
                );
                abort_readers(&readers);
            }
            None => {
                abort_readers(&readers);
                return Err(LauncherError::Cancelled);
            }
        }

        Ok(LaunchOutcome {
            exit_code,
            runtime: plan.runtime.clone(),
            started_at,
            exited_at,
        })
    }
}

// ── Output ──────────────────────────────────────────

/// Forward `reader` to `sink` one line at a time. Lines end at `\n` with an
/// optional preceding `\r`; trailing content without a terminator is
/// delivered at end of stream.
async fn pump_lines<R>(reader: R, stream: OutputStream, sink: LineSink) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let mut line = buf.as_slice();
        if let Some(rest) = line.strip_suffix(b"\n") {
            line = rest;
        }
        if let Some(rest) = line.strip_suffix(b"\r") {
            line = rest;
        }
        let text = String::from_utf8_lossy(line).into_owned();
        debug!("[{}] {}", stream.tag(), text);
        sink(OutputLine { stream, text });
    }
    Ok(())
}

async fn drain_readers(readers: &mut [Reader]) {
    for reader in readers.iter_mut() {
        match reader.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!("Output reader stopped: {}", err),
            Err(err) if err.is_cancelled() => {}
            Err(err) => warn!("Output reader failed: {}", err),
        }
    }
}

fn abort_readers(readers: &[Reader]) {
    for reader in readers {
        reader.abort();
    }
}

// ── Termination ─────────────────────────────────────

async fn terminate(child: &mut Child, readers: &[Reader]) {
    warn!("Launch cancelled; terminating process tree");
    if let Some(pid) = child.id() {
        if let Err(err) = tokio::task::spawn_blocking(move || kill_process_tree(pid)).await {
            warn!("Process tree kill did not complete: {}", err);
        }
    }
    if let Err(err) = child.start_kill() {
        debug!("Direct kill after tree kill: {}", err);
    }
    if let Err(err) = child.wait().await {
        warn!("Could not reap cancelled process: {}", err);
    }
    abort_readers(readers);
}

/// Kill `root` and every descendant, deepest first.
fn kill_process_tree(root: u32) {
    let mut system = System::new_all();
    system.refresh_all();

    let mut tree = vec![Pid::from_u32(root)];
    let mut next = 0;
    while next < tree.len() {
        let parent = tree[next];
        for (pid, process) in system.processes() {
            if process.parent() == Some(parent) && !tree.contains(pid) {
                tree.push(*pid);
            }
        }
        next += 1;
    }

    for pid in tree.iter().rev() {
        if let Some(process) = system.process(*pid) {
            if !process.kill() {
                debug!("Kill signal not delivered to {}", pid);
            }
        }
    }
    debug!("Signalled {} process(es) rooted at {}", tree.len(), root);
}

// ── Environment ─────────────────────────────────────

/// Prepend `<instance>/natives` to the platform library search path unless
/// the plan already sets it.
fn configure_native_library_env(cmd: &mut Command, plan: &LaunchPlan) {
    let natives_dir = InstanceLayout::new(&plan.instance_dir).natives_dir();
    if !natives_dir.is_dir() {
        return;
    }
    let var_name = if cfg!(target_os = "windows") {
        "PATH"
    } else if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH"
    } else {
        "LD_LIBRARY_PATH"
    };
    if plan.env.contains_key(var_name) {
        return;
    }
    cmd.env(var_name, append_env_path(var_name, &safe_path_str(&natives_dir)));
}

fn append_env_path(var_name: &str, value: &str) -> String {
    let separator = if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    };
    match std::env::var(var_name) {
        Ok(existing) if !existing.trim().is_empty() => {
            format!("{}{}{}", value, separator, existing)
        }
        _ => value.to_string(),
    }
}

fn format_command_for_logs(program: &Path, args: &[String]) -> String {
    let mut rendered = shell_escape(&safe_path_str(program));
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&shell_escape(arg));
    }
    rendered
}

/// POSIX single-quoting; tokens made only of safe characters stay bare.
fn shell_escape(raw: &str) -> String {
    let bare = !raw.is_empty()
        && raw.chars().all(|ch| {
            ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '=' | '+' | ',')
        });
    if bare {
        return raw.to_string();
    }
    format!("'{}'", raw.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;
    use crate::core::launch::plan::{CompatMode, Invocation};

    fn plan(runtime: PathBuf, instance: &Path) -> LaunchPlan {
        LaunchPlan {
            runtime,
            instance_dir: instance.to_path_buf(),
            jvm_args: vec!["-Xmx8G".into(), "-Dfoo=1".into(), "-Xms4G".into()],
            classpath: Vec::new(),
            invocation: Invocation::Archive(instance.join("client.jar")),
            entry_class: "a.Main".into(),
            game_archive: None,
            game_args: vec!["--demo".into()],
            env: BTreeMap::new(),
            mode: CompatMode::Modern,
            notes: Vec::new(),
        }
    }

    fn orchestrator(drain_ms: u64) -> ProcessOrchestrator {
        ProcessOrchestrator::new(&LaunchSettings {
            min_memory_mb: 256,
            max_memory_mb: 1024,
            output_drain_timeout_ms: drain_ms,
            ..Default::default()
        })
    }

    fn collector() -> (LineSink, Arc<Mutex<Vec<OutputLine>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = lines.clone();
        let sink: LineSink = Arc::new(move |line: OutputLine| sink_lines.lock().unwrap().push(line));
        (sink, lines)
    }

    #[test]
    fn heap_bounds_lead_the_command_line() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan("java".into(), dir.path());
        let args = orchestrator(2000).command_line(&plan);

        assert_eq!(
            args,
            vec![
                "-Xms256M".to_string(),
                "-Xmx1024M".to_string(),
                "-Dfoo=1".to_string(),
                "-jar".to_string(),
                safe_path_str(&dir.path().join("client.jar")),
                "--demo".to_string(),
            ]
        );
    }

    #[test]
    fn logged_command_quotes_only_what_the_shell_would_split() {
        let rendered = format_command_for_logs(
            Path::new("/opt/jdk/bin/java"),
            &[
                "-Xmx1024M".into(),
                "Ivan Petrov".into(),
                "it's".into(),
                "$HOME".into(),
                String::new(),
            ],
        );
        assert_eq!(
            rendered,
            r#"/opt/jdk/bin/java -Xmx1024M 'Ivan Petrov' 'it'\''s' '$HOME' ''"#
        );
    }

    #[tokio::test]
    async fn lines_split_on_lf_and_crlf_with_trailing_partial() {
        let (sink, lines) = collector();
        let input: &[u8] = b"first\r\nsecond\n\nlast";
        pump_lines(input, OutputStream::Stderr, sink).await.unwrap();

        let texts: Vec<String> = lines.lock().unwrap().iter().map(|l| l.text.clone()).collect();
        assert_eq!(texts, vec!["first", "second", "", "last"]);
        assert!(lines
            .lock()
            .unwrap()
            .iter()
            .all(|l| l.stream == OutputStream::Stderr));
    }

    #[tokio::test]
    async fn missing_runtime_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan(dir.path().join("no-such-runtime"), dir.path());
        let (sink, _) = collector();
        let route = RouteSpec::new("h", 1).unwrap();

        let err = orchestrator(2000)
            .launch(&plan, &route, sink, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::ProcessSpawn { .. }));
    }

    #[cfg(unix)]
    fn fake_runtime(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-java");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_code_and_both_streams_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = fake_runtime(
            dir.path(),
            "echo hello\nprintf 'no newline'\necho oops 1>&2\nexit 3",
        );
        let plan = plan(runtime.clone(), dir.path());
        let (sink, lines) = collector();
        let route = RouteSpec::new("h", 1).unwrap();

        let outcome = orchestrator(2000)
            .launch(&plan, &route, sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.runtime, runtime);
        let lines = lines.lock().unwrap();
        let stdout: Vec<&str> = lines
            .iter()
            .filter(|l| l.stream == OutputStream::Stdout)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(stdout, vec!["hello", "no newline"]);
        assert!(lines
            .iter()
            .any(|l| l.stream == OutputStream::Stderr && l.text == "oops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn environment_and_working_directory_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = fake_runtime(dir.path(), "echo \"$LAUNCH_MARKER\"\npwd");
        let mut plan = plan(runtime, dir.path());
        plan.env.insert("LAUNCH_MARKER".into(), "marked".into());
        let (sink, lines) = collector();
        let route = RouteSpec::new("h", 1).unwrap();

        orchestrator(2000)
            .launch(&plan, &route, sink, &CancellationToken::new())
            .await
            .unwrap();

        let lines = lines.lock().unwrap();
        assert_eq!(lines[0].text, "marked");
        let cwd = std::fs::canonicalize(&lines[1].text).unwrap();
        assert_eq!(cwd, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancellation_kills_the_tree() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = fake_runtime(dir.path(), "echo started\nsleep 30 &\nwait");
        let plan = plan(runtime, dir.path());
        let (sink, _) = collector();
        let route = RouteSpec::new("h", 1).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = orchestrator(2000)
            .launch(&plan, &route, sink, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(20));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn lingering_output_holder_does_not_stall_exit() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = fake_runtime(dir.path(), "echo bye\nsleep 20 &\nexit 0");
        let plan = plan(runtime, dir.path());
        let (sink, lines) = collector();
        let route = RouteSpec::new("h", 1).unwrap();

        let started = std::time::Instant::now();
        let outcome = orchestrator(300)
            .launch(&plan, &route, sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.exit_code, 0);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(lines.lock().unwrap()[0].text, "bye");
    }
}
