use std::borrow::Cow;

/// Quote an argument for display if the shell would split it
fn quote_arg(arg: Cow<'_, str>) -> Cow<'_, str> {
    if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
        Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
    } else {
        arg
    }
}

pub fn command_to_string(cmd: &std::process::Command) -> String {
    let program = cmd.get_program().to_string_lossy();
    let args = cmd
        .get_args()
        .map(|arg| quote_arg(arg.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ");
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_command_to_string() {
        let mut cmd = Command::new("quast.py");
        cmd.arg("/out/contigs.fa").arg("-o").arg("my dir");
        assert_eq!(command_to_string(&cmd), "quast.py /out/contigs.fa -o 'my dir'");
        assert_eq!(command_to_string(&Command::new("fastp")), "fastp");
    }
}
