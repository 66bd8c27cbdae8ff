use anyhow::Context;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a command from an array inside `workdir`, collecting its trimmed stdout.
pub fn run_command_at<'a, Args: AsRef<[&'a str]>>(
    args: Args,
    workdir: &Path,
) -> anyhow::Result<String> {
    let args = args.as_ref();
    let mut cmd = Command::new(args[0]);
    cmd.args(&args[1..]).current_dir(workdir);
    tracing::debug!("+ {cmd:?}");

    let out = cmd
        .output()
        .with_context(|| format!("cannot spawn `{cmd:?}`"))?;
    let stdout = String::from_utf8_lossy(out.stdout.trim_ascii()).to_string();
    if !out.status.success() {
        let stderr = String::from_utf8_lossy(out.stderr.trim_ascii());
        return Err(anyhow::anyhow!(
            "Command `{cmd:?}` failed with exit code {:?}. STDOUT:\n{stdout}\nSTDERR:\n{stderr}",
            out.status.code()
        ));
    }
    Ok(stdout)
}

/// Like [`run_command_at`], but streams stdout/stderr to the terminal.
pub fn stream_command_at<'a, Args: AsRef<[&'a str]>>(
    args: Args,
    workdir: &Path,
) -> anyhow::Result<()> {
    let args = args.as_ref();
    let mut cmd = Command::new(args[0]);
    cmd.args(&args[1..])
        .current_dir(workdir)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    tracing::debug!("+ {cmd:?}");

    let status = cmd
        .status()
        .with_context(|| format!("cannot spawn `{cmd:?}`"))?;
    if !status.success() {
        return Err(anyhow::anyhow!(
            "Command `{cmd:?}` failed with exit code {:?}",
            status.code()
        ));
    }
    Ok(())
}

/// Ask a yes/no question on the terminal. An empty answer picks `default`.
pub fn prompt(message: &str, default: bool) -> bool {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    print!("{message} {hint} ");
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    match std::io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => default,
        Ok(_) => parse_answer(&line, default),
    }
}

fn parse_answer(line: &str, default: bool) -> bool {
    match line.trim().to_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers() {
        assert!(parse_answer("y\n", false));
        assert!(parse_answer("  YES ", false));
        assert!(!parse_answer("n", true));
        assert!(!parse_answer("maybe", true));
        assert!(parse_answer("\n", true));
        assert!(!parse_answer("", false));
    }

    #[test]
    fn failing_command_is_an_error() {
        let dir = std::env::current_dir().unwrap();
        assert!(run_command_at(["git", "definitely-not-a-subcommand"], &dir).is_err());
    }
}
