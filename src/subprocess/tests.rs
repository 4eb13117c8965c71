use super::*;

#[test]
fn test_production_runner_success() {
    let runner = SystemProcessRunner;
    let command = ProcessCommandBuilder::new("echo")
        .arg("hello world")
        .build();

    let output = runner.run(command).unwrap();
    assert!(output.status.success());
    assert_eq!(output.stdout.trim(), "hello world");
    assert!(output.stderr.is_empty());
}

#[test]
fn test_production_runner_failure() {
    let runner = SystemProcessRunner;
    let command = ProcessCommandBuilder::new("false").build();

    let output = runner.run(command).unwrap();
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_production_runner_command_not_found() {
    let runner = SystemProcessRunner;
    let command = ProcessCommandBuilder::new("nonexistent-command-12345").build();

    let result = runner.run(command);
    assert!(matches!(result, Err(ProcessError::CommandNotFound(_))));
}

#[test]
fn test_production_runner_keeps_undecodable_output() {
    let runner = SystemProcessRunner;
    let command = ProcessCommandBuilder::new("sh")
        .args(["-c", "printf 'temp 25\\260C\\n'; exit 2"])
        .build();

    let output = runner.run(command).unwrap();
    assert_eq!(output.status, ExitStatus::Error(2));
    assert_eq!(output.stdout, "temp 25\u{FFFD}C\n");
}

#[test]
fn test_production_runner_captures_stderr() {
    let runner = SystemProcessRunner;
    let command = ProcessCommandBuilder::new("sh")
        .args(["-c", "echo out; echo err >&2; exit 3"])
        .build();

    let output = runner.run(command).unwrap();
    assert_eq!(output.status, ExitStatus::Error(3));
    assert_eq!(output.combined(), "out\nerr\n");
}

#[test]
fn test_mock_runner_basic() {
    let mut mock = MockProcessRunner::new();

    mock.expect_command("sh")
        .with_args(|args| args.len() == 1)
        .returns_stdout("done\n")
        .returns_success()
        .finish();

    let output = mock
        .run(ProcessCommandBuilder::new("sh").arg("/tmp/script.sh").build())
        .unwrap();

    assert!(output.status.success());
    assert_eq!(output.stdout, "done\n");
    assert!(mock.verify_called("sh", 1));
}

#[test]
fn test_mock_runner_times_limit() {
    let mut mock = MockProcessRunner::new();

    mock.expect_command("sh").returns_success().times(2).finish();

    let command = || ProcessCommandBuilder::new("sh").arg("script.sh").build();
    assert!(mock.run(command()).is_ok());
    assert!(mock.run(command()).is_ok());
    assert!(mock.run(command()).is_err());
}

#[test]
fn test_mock_runner_unexpected_command() {
    let mock = MockProcessRunner::new();
    let result = mock.run(ProcessCommandBuilder::new("cdo").build());
    assert!(matches!(result, Err(ProcessError::MockExpectationNotMet(_))));
}

#[test]
fn test_subprocess_manager() {
    let (manager, mut mock) = SubprocessManager::mock();

    mock.expect_command("sh")
        .returns_stderr("module: command not found\n")
        .returns_exit_code(127)
        .finish();

    let output = manager
        .run(ProcessCommandBuilder::new("sh").arg("job.sh").build())
        .unwrap();

    assert_eq!(output.status.code(), Some(127));
    assert_eq!(mock.get_call_history()[0].args, vec!["job.sh"]);
}

#[test]
fn test_process_command_builder() {
    let command = ProcessCommandBuilder::new("sh")
        .arg("job.sh")
        .args(["-x", "-e"])
        .build();

    assert_eq!(command.program, "sh");
    assert_eq!(command.args, vec!["job.sh", "-x", "-e"]);
    assert_eq!(command.display(), "sh job.sh -x -e");
}
