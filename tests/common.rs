use assert_cmd::Command;

/// Runs the real binary with the given arguments and optional stdin, and
/// asserts on its stdout.
pub fn run_test(input: Option<&str>, args: &[&str], output: &str) {
    let mut cmd = Command::cargo_bin("hawk").unwrap();
    cmd.args(args);
    if let Some(input) = input {
        cmd.write_stdin(input);
    }
    cmd.assert().success().stdout(output.to_owned());
}
