use std::process::Command;

pub fn get_command_str(cmd: &Command) -> String {
    let prog = cmd.get_program().to_string_lossy();
    let args = cmd.get_args().map(|x| x.to_string_lossy());
    std::iter::once(prog)
        .chain(args)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a command from a program followed by its arguments.
pub fn build_command<S: AsRef<std::ffi::OsStr>>(argv: &[S]) -> anyhow::Result<Command> {
    let (prog, args) = argv
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("empty command line"))?;
    let mut cmd = Command::new(prog);
    cmd.args(args);
    Ok(cmd)
}

/// Run `cmd` to completion and return its stdout.
pub fn get_command_output(mut cmd: Command) -> anyhow::Result<String> {
    let cmd_str = get_command_str(&cmd);
    log::debug!("executing command: {}", cmd_str);

    let result = cmd.output()?;

    if !result.status.success() {
        return match result.status.code() {
            Some(code) => Err(anyhow::anyhow!(
                "Exited with code: {}, cmd: {}",
                code,
                cmd_str
            )),
            None => Err(anyhow::anyhow!(
                "Process terminated by signal, cmd: {}",
                cmd_str,
            )),
        };
    }

    Ok(std::str::from_utf8(&result.stdout)?.to_owned())
}
