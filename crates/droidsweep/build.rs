// Renders man pages and shell completion scripts into OUT_DIR so packagers
// can pick them up from the build directory.

use std::error::Error;
use std::fs;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::Shell;

// cli.rs only depends on clap and clap_complete, so it compiles here on its own.
#[path = "src/cli.rs"]
mod cli;

const BIN_NAME: &str = "droidsweep";

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir = std::env::var_os("OUT_DIR").ok_or("OUT_DIR not set by Cargo")?;
    let out_dir = Path::new(&out_dir);

    let mut cmd = cli::Cli::command();
    write_man_pages(&cmd, &out_dir.join("man"))?;
    write_completions(&mut cmd, &out_dir.join("completions"))?;
    Ok(())
}

/// One page per visible command: `droidsweep.1`, `droidsweep-config-init.1`, ...
fn write_man_pages(root: &clap::Command, dir: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(dir)?;

    let mut pending = vec![root.clone()];
    while let Some(cmd) = pending.pop() {
        let name = cmd.get_name().to_owned();
        pending.extend(
            cmd.get_subcommands()
                .filter(|sub| !sub.is_hide_set())
                .map(|sub| sub.clone().name(format!("{name}-{}", sub.get_name()))),
        );

        let mut page = Vec::new();
        clap_mangen::Man::new(cmd)
            .render(&mut page)
            .map_err(|e| format!("rendering man page for `{name}`: {e}"))?;
        fs::write(dir.join(format!("{name}.1")), page)?;
    }
    Ok(())
}

fn write_completions(cmd: &mut clap::Command, dir: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(dir)?;
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        clap_complete::generate_to(shell, cmd, BIN_NAME, dir)?;
    }
    Ok(())
}
