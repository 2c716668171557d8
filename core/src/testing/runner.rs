use std::{
    collections::HashMap,
    ffi::OsStr,
    io,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use anyhow::Context as _;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    process::Command,
    time::Instant,
};

use super::{batch::EngineError, result::*, testcase::AsyncTestcase};
use crate::str_interp::{interp, InterpError};

/// Runs one program against one testcase at a time.
///
/// The program is executed directly unless a run command is set, in which case the
/// interpolated command is passed to `shell -c`.
#[derive(Debug, Clone)]
pub struct TestRunner {
    program_file: PathBuf,
    run_cmd: Option<String>,
    shell: PathBuf,
    time_limit: Duration,
}

impl TestRunner {
    const DEFAULT_SHELL: &str = "/bin/sh";
    pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(5);

    /// How long to keep reading pipes after killing a timed out process.
    const DRAIN_GRACE: Duration = Duration::from_millis(50);

    pub fn new(program_file: impl Into<PathBuf>) -> Self {
        Self {
            program_file: program_file.into(),
            run_cmd: None,
            shell: Self::DEFAULT_SHELL.into(),
            time_limit: Self::DEFAULT_TIME_LIMIT,
        }
    }

    pub fn shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    /// Sets the run command; `#{filePath}` etc. are replaced with parts of the program path.
    pub fn run_command(mut self, template: &str) -> std::result::Result<Self, InterpError> {
        let vars = Self::make_cmd_interp_vars(&self.program_file);
        self.run_cmd = Some(interp(template, &vars)?);
        Ok(self)
    }

    fn make_cmd_interp_vars(filepath: &Path) -> HashMap<&'static str, &OsStr> {
        let mut m: HashMap<_, &OsStr> = HashMap::new();
        m.insert("filePath", filepath.as_os_str());
        m.insert(
            "fileName",
            filepath.file_name().unwrap_or(filepath.as_os_str()),
        );
        m.insert(
            "fileDir",
            filepath.parent().unwrap_or(Path::new(".")).as_os_str(),
        );
        m.insert("fileStem", filepath.file_stem().unwrap_or_default());
        m.insert("fileExt", filepath.extension().unwrap_or_default());
        m
    }

    pub fn program_file(&self) -> &Path {
        &self.program_file
    }

    pub fn get_run_command(&self) -> Option<&str> {
        self.run_cmd.as_deref()
    }

    pub fn get_time_limit(&self) -> Duration {
        self.time_limit
    }

    /// Human readable form of what gets spawned.
    pub fn describe(&self) -> String {
        match &self.run_cmd {
            Some(cmd) => format!("'{} -c {}'", self.shell.to_string_lossy(), cmd),
            None => format!("'{}'", self.program_file.to_string_lossy()),
        }
    }

    pub fn ensure_program_exists(&self) -> std::result::Result<(), EngineError> {
        if self.program_file.is_file() {
            Ok(())
        } else {
            Err(EngineError::ProgramNotFound(self.program_file.clone()))
        }
    }

    fn command(&self) -> Command {
        let mut c = match &self.run_cmd {
            Some(cmd) => {
                let mut c = Command::new(&self.shell);
                c.args(["-c", cmd]);
                c
            }
            None => Command::new(&self.program_file),
        };
        // own group, so that processes forked by the shell can be killed with it
        #[cfg(unix)]
        c.process_group(0);
        c
    }

    /// Runs one testcase. Never fails: every failure is turned into a verdict.
    pub async fn run<T>(&self, sample_index: usize, testcase: &T) -> ExecutionResult
    where
        T: AsyncTestcase + ?Sized,
    {
        match self.try_run(sample_index, testcase).await {
            Ok(res) => res,
            Err(e) => {
                log::warn!("Testcase {}: {:#}", testcase.name(), e);
                ExecutionResult::execution_error(sample_index, testcase.name(), format!("{:#}", e))
            }
        }
    }

    async fn try_run<T>(&self, sample_index: usize, testcase: &T) -> anyhow::Result<ExecutionResult>
    where
        T: AsyncTestcase + ?Sized,
    {
        let (input, expected_output) = tokio::try_join!(
            testcase.current_input(),
            testcase.current_expected_output()
        )?;

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let mut proc = self
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.describe()))?;
        let start_at = Instant::now();
        let mut group = ProcessGroupGuard(proc.id());

        let mut stdin = proc.stdin.take().context("Failed to open stdin")?;
        let mut stdout = proc.stdout.take().context("Failed to open stdout")?;
        let mut stderr = proc.stderr.take().context("Failed to open stderr")?;

        let res = {
            let fut_stdin = async move {
                let res = stdin.write_all(input.as_bytes()).await;
                drop(stdin); // EOF for the child
                match res {
                    // the program finished without reading all of its input
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                    res => res,
                }
            };
            let fut_stdout = stdout.read_to_end(&mut stdout_buf);
            let fut_stderr = stderr.read_to_end(&mut stderr_buf);
            let fut_exit_status = proc.wait();

            tokio::time::timeout(self.time_limit, async {
                tokio::try_join!(fut_stdin, fut_stdout, fut_stderr, fut_exit_status)
            })
            .await
        };

        let execution_time = start_at.elapsed();

        let (verdict, actual_output, error_output, exit_status) = match res {
            Err(_) => {
                group.kill();
                proc.kill()
                    .await
                    .unwrap_or_else(|e| log::warn!("Failed to kill TLE process: {:#}", e));
                let _ = tokio::time::timeout(Self::DRAIN_GRACE, async {
                    tokio::join!(
                        stdout.read_to_end(&mut stdout_buf),
                        stderr.read_to_end(&mut stderr_buf)
                    )
                })
                .await;
                log::debug!(
                    "Testcase {}: drained {}B stdout / {}B stderr after kill",
                    testcase.name(),
                    stdout_buf.len(),
                    stderr_buf.len()
                );

                let limit_ms = self.time_limit.as_millis();
                let mut error_output = format!("Killed after {}ms time limit", limit_ms);
                if !stderr_buf.is_empty() {
                    error_output.push('\n');
                    error_output += &String::from_utf8_lossy(&stderr_buf);
                }
                (
                    Verdict::TimedOut,
                    format!("Timeout: execution exceeded {}ms", limit_ms),
                    error_output,
                    None,
                )
            }

            Ok(Err(e)) => {
                return Err(e).context("Failed to communicate with subprocess");
            }

            Ok(Ok((_, _, _, exit_status))) => {
                group.disarm();
                let stdout = String::from_utf8_lossy(&stdout_buf);
                let actual_output = stdout.trim_end().to_owned();
                let verdict = if outputs_match(&actual_output, &expected_output) {
                    Verdict::Passed
                } else {
                    Verdict::Failed
                };
                (
                    verdict,
                    actual_output,
                    String::from_utf8_lossy(&stderr_buf).into_owned(),
                    exit_status.code(),
                )
            }
        };

        Ok(ExecutionResult {
            sample_index,
            name: testcase.name().to_owned(),
            actual_output,
            error_output,
            expected_output,
            verdict,
            exit_status,
            execution_time,
        })
    }
}

/// Kills the whole process group led by the child when dropped, unless disarmed.
struct ProcessGroupGuard(Option<u32>);

impl ProcessGroupGuard {
    fn kill(&mut self) {
        if let Some(pgid) = self.0.take() {
            kill_process_group(pgid);
        }
    }

    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: kill(2) only sends a signal; a negative pid addresses the group.
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } == -1 {
        log::debug!(
            "Failed to kill process group {}: {}",
            pgid,
            io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::OnMemoryTestcase;

    struct X {
        input: &'static str,
        expected: &'static str,
        shell_cmd: &'static str,
        want_verdict: Verdict,
        want_actual: &'static str,
        want_stderr: &'static str,
        want_exit_status: Option<i32>,
    }

    async fn run_test(x: X) {
        let t = OnMemoryTestcase::new("sample testcase", x.input, x.expected);
        let r = TestRunner::new("main.sh")
            .run_command(x.shell_cmd)
            .unwrap()
            .time_limit(Duration::from_millis(300));

        let res = dbg!(r.run(0, &t).await);
        assert_eq!(res.verdict, x.want_verdict);
        assert_eq!(res.actual_output, x.want_actual);
        assert_eq!(res.error_output, x.want_stderr);
        assert_eq!(res.exit_status, x.want_exit_status);
        assert_eq!(res.expected_output, x.expected);
    }

    #[tokio::test]
    async fn should_pass() {
        run_test(X {
            input: "123\n",
            expected: "hello_123\n",
            shell_cmd: r#"read x; echo "hello_$x""#,
            want_verdict: Verdict::Passed,
            want_actual: "hello_123",
            want_stderr: "",
            want_exit_status: Some(0),
        })
        .await;
    }

    #[tokio::test]
    async fn should_pass_ignoring_case() {
        run_test(X {
            input: "",
            expected: "hello",
            shell_cmd: "echo HELLO",
            want_verdict: Verdict::Passed,
            want_actual: "HELLO",
            want_stderr: "",
            want_exit_status: Some(0),
        })
        .await;
    }

    #[tokio::test]
    async fn should_pass_even_if_stdin_is_not_read() {
        let input: &'static str = Box::leak("9".repeat(1 << 20).into_boxed_str());
        run_test(X {
            input,
            expected: "hello_123\n",
            shell_cmd: "echo hello_123",
            want_verdict: Verdict::Passed,
            want_actual: "hello_123",
            want_stderr: "",
            want_exit_status: Some(0),
        })
        .await;
    }

    #[tokio::test]
    async fn should_fail_if_answer_is_on_stderr() {
        run_test(X {
            input: "123\n",
            expected: "hello_123\n",
            shell_cmd: "echo hello_123 >&2",
            want_verdict: Verdict::Failed,
            want_actual: "",
            want_stderr: "hello_123\n",
            want_exit_status: Some(0),
        })
        .await;
    }

    #[tokio::test]
    async fn should_fail_on_inner_whitespace_difference() {
        run_test(X {
            input: "",
            expected: "1 2\n",
            shell_cmd: "echo '1  2'",
            want_verdict: Verdict::Failed,
            want_actual: "1  2",
            want_stderr: "",
            want_exit_status: Some(0),
        })
        .await;
    }

    #[tokio::test]
    async fn exit_status_does_not_affect_verdict() {
        run_test(X {
            input: "",
            expected: "hello_123\n",
            shell_cmd: "echo hello_123; exit 42",
            want_verdict: Verdict::Passed,
            want_actual: "hello_123",
            want_stderr: "",
            want_exit_status: Some(42),
        })
        .await;
    }

    #[tokio::test]
    async fn should_time_out() {
        run_test(X {
            input: "",
            expected: "hello_123\n",
            shell_cmd: "echo partial; exec sleep 3",
            want_verdict: Verdict::TimedOut,
            want_actual: "Timeout: execution exceeded 300ms",
            want_stderr: "Killed after 300ms time limit",
            want_exit_status: None,
        })
        .await;
    }

    #[tokio::test]
    async fn spawn_failure_is_execution_error() {
        let t = OnMemoryTestcase::new("s", "", "");
        let r = TestRunner::new("main.sh")
            .shell("/nonexistent/shell")
            .run_command("echo #{fileName}")
            .unwrap();
        let res = r.run(3, &t).await;
        assert_eq!(res.verdict, Verdict::ExecutionError);
        assert_eq!(res.sample_index, 3);
        assert!(res.error_output.contains("Failed to spawn"), "{}", res.error_output);
    }

    #[tokio::test]
    async fn direct_execution_without_run_command() {
        let t = OnMemoryTestcase::new("s", "Hello\n", "hello");
        let res = TestRunner::new("/bin/cat").run(0, &t).await;
        assert_eq!(res.verdict, Verdict::Passed);
        assert_eq!(res.actual_output, "Hello");
    }

    #[tokio::test]
    async fn non_executable_program_is_execution_error() {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut script, b"print(input())\n").unwrap();

        let t = OnMemoryTestcase::new("s", "1\n", "1\n");
        let res = TestRunner::new(script.path()).run(0, &t).await;
        assert_eq!(res.verdict, Verdict::ExecutionError);
        assert_eq!(res.exit_status, None);
        assert!(res.error_output.contains("Permission denied"), "{}", res.error_output);
    }

    #[cfg(target_os = "linux")]
    fn is_alive(pid: &str) -> bool {
        // a zombie is as good as gone
        std::fs::read_to_string(format!("/proc/{}/stat", pid))
            .map(|stat| !stat.contains(") Z "))
            .unwrap_or(false)
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn timeout_kills_processes_forked_by_shell() {
        let tmp = tempfile::tempdir().unwrap();
        let pidfile = tmp.path().join("pid");
        // the trailing `true` makes the shell fork instead of exec
        let cmd = format!(
            "sh -c 'echo $$ > \"$0\"; exec sleep 30' '{}'; true",
            pidfile.display()
        );
        let r = TestRunner::new("/bin/cat")
            .run_command(&cmd)
            .unwrap()
            .time_limit(Duration::from_millis(500));

        let res = r.run(0, &OnMemoryTestcase::new("s", "", "")).await;
        assert_eq!(res.verdict, Verdict::TimedOut);

        let pid = std::fs::read_to_string(&pidfile).unwrap();
        let pid = pid.trim();
        let deadline = Instant::now() + Duration::from_secs(2);
        while is_alive(pid) && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!is_alive(pid), "sleep {} survived the timeout", pid);
    }

    #[test]
    fn run_command_is_interpolated() {
        let r = TestRunner::new("work/395C.py")
            .run_command("cd #{fileDir} && python3 #{fileName} # #{fileStem}.#{fileExt}")
            .unwrap();
        assert_eq!(
            r.get_run_command(),
            Some("cd work && python3 395C.py # 395C.py")
        );
        assert!(TestRunner::new("a.py").run_command("#{nope}").is_err());
    }

    #[test]
    fn missing_program_is_reported() {
        let r = TestRunner::new("/nonexistent/395C.py");
        assert!(matches!(
            r.ensure_program_exists(),
            Err(EngineError::ProgramNotFound(_))
        ));
        assert!(TestRunner::new("/bin/cat").ensure_program_exists().is_ok());
    }
}
