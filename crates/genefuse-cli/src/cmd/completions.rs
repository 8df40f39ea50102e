use anyhow::{Context, Result};
use clap::{Args, Command};
use clap_complete::{Shell, generate};
use std::io::{self, Write};

/// Arguments for `gf completions`.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Print the completion script for `shell` on stdout.
///
/// # Errors
///
/// Fails when stdout cannot be flushed.
pub fn run_completions(shell: Shell, command: &mut Command) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_completions(shell, command, &mut out);
    out.flush().context("Failed to write completions")
}

/// Completions are registered under the command's own name so they follow
/// any rename of the binary.
fn write_completions(shell: Shell, command: &mut Command, out: &mut dyn Write) {
    let bin = command.get_name().to_string();
    generate(shell, command, bin, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn script(shell: Shell) -> String {
        let mut buf = Vec::new();
        write_completions(shell, &mut crate::Cli::command(), &mut buf);
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn zsh_script_registers_gf() {
        let out = script(Shell::Zsh);
        assert!(out.starts_with("#compdef gf"));
        assert!(out.contains("combine"));
        assert!(out.contains("evaluate"));
    }

    #[test]
    fn bash_script_offers_report_kinds() {
        let out = script(Shell::Bash);
        assert!(out.contains("range-histogram"));
        assert!(out.contains("--keep-seeds"));
    }
}
