use anyhow::{
    Context,
    Result,
    ensure,
};
use clap::{
    Parser,
    Subcommand,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    process::Command,
};

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Dice poker helper tasks (ABI check, clippy, tests)",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompile generated_abi and print the hash deployment records are checked against
    Abi,
    /// Run clippy for the entire workspace with warnings-as-errors
    Clippy,
    /// Run the HTTP-level integration tests
    Test {
        /// Run every crate's tests, not just integration-tests
        #[arg(long)]
        workspace: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = repo_root()?;

    match cli.command {
        Commands::Abi => {
            build_generated_abi(&root)?;
            println!("ABI hash: {}", deployments::compute_abi_hash(generated_abi::DICE_POKER_ABI));
        }
        Commands::Clippy => run_clippy(&root)?,
        Commands::Test { workspace } => run_tests(&root, workspace)?,
    }

    Ok(())
}

fn repo_root() -> Result<PathBuf> {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .context("xtask has no parent directory")
}

fn build_generated_abi(root: &Path) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("check")
        .arg("-p")
        .arg("generated_abi")
        .arg("--quiet")
        .current_dir(root);
    run_command(cmd, "cargo check -p generated_abi")
}

fn run_clippy(root: &Path) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("clippy")
        .arg("--workspace")
        .arg("--all-targets")
        .arg("--all-features")
        .arg("--")
        .arg("-D")
        .arg("warnings")
        .current_dir(root);
    run_command(cmd, "cargo clippy")
}

fn run_tests(root: &Path, workspace: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("test").current_dir(root);
    let label = if workspace {
        cmd.arg("--workspace").arg("--all-features");
        "cargo test --workspace"
    } else {
        cmd.arg("-p").arg("integration-tests");
        "cargo test -p integration-tests"
    };
    run_command(cmd, label)
}

fn run_command(mut cmd: Command, label: &str) -> Result<()> {
    println!("Running: {label}");
    let status = cmd
        .status()
        .with_context(|| format!("failed to run {label}"))?;
    ensure!(status.success(), "{label} failed with status {status}");
    Ok(())
}
