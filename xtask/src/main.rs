use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for overdrive")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fmt, clippy (with and without the GL backend), tests and docs
    Check,
    /// cargo fmt --check
    Fmt,
    /// Clippy over the workspace, then over the GL backend
    Clippy,
    /// Workspace tests
    Test,
    /// Rustdoc for the workspace
    Doc,
}

/// One cargo invocation with a label for the log.
struct Step {
    label: &'static str,
    args: &'static [&'static str],
}

const FMT: &[Step] = &[Step {
    label: "cargo fmt --check",
    args: &["fmt", "--all", "--", "--check"],
}];

const CLIPPY: &[Step] = &[
    Step {
        label: "cargo clippy",
        args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    },
    Step {
        label: "cargo clippy (gl backend)",
        args: &["clippy", "-p", "overdrive-gpu", "--features", "gl", "--", "-D", "warnings"],
    },
];

const TEST: &[Step] = &[Step {
    label: "cargo test",
    args: &["test", "--workspace"],
}];

const DOC: &[Step] = &[Step {
    label: "cargo doc",
    args: &["doc", "--workspace", "--no-deps"],
}];

fn run(steps: &[Step]) -> Result<()> {
    for step in steps {
        println!("==> {}", step.label);
        let status = Command::new("cargo").args(step.args).status()?;
        if !status.success() {
            anyhow::bail!("{} failed", step.label);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            for steps in [FMT, CLIPPY, TEST, DOC] {
                run(steps)?;
            }
        }
        Commands::Fmt => run(FMT)?,
        Commands::Clippy => run(CLIPPY)?,
        Commands::Test => run(TEST)?,
        Commands::Doc => run(DOC)?,
    }

    Ok(())
}
