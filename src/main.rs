#[cfg(not(target_arch = "wasm32"))]
use anyhow::{Context, Result};
#[cfg(not(target_arch = "wasm32"))]
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(not(target_arch = "wasm32"))]
use nanobanana_runner::core::config::Config;
#[cfg(not(target_arch = "wasm32"))]
use nanobanana_runner::core::state::{FormState, RunOutcome};
#[cfg(not(target_arch = "wasm32"))]
use nanobanana_runner::services::runner::Runner;
#[cfg(not(target_arch = "wasm32"))]
use nanobanana_runner::utils::report::format_outcome;
#[cfg(not(target_arch = "wasm32"))]
use std::io::{IsTerminal, Read};
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = Config::load()?;
    let runner = Runner::over_http(config.backend);

    let mut state = FormState::new();
    state.set_input(read_storyboard()?);
    if !state.can_submit() {
        anyhow::bail!("Storyboard is empty, nothing to run.");
    }

    let input = state.input.clone();
    let ticket = state.begin();

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.yellow} {msg} [{elapsed}]")?);
    pb.set_message("Procesando...");
    pb.enable_steady_tick(Duration::from_millis(120));

    let token = ticket.token().clone();
    let outcome = tokio::select! {
        outcome = runner.submit_until_cancelled(&input, &token) => outcome,
        _ = tokio::signal::ctrl_c() => {
            token.cancel();
            None
        }
    };
    pb.finish_and_clear();

    let Some(outcome) = outcome else {
        state.cancel();
        eprintln!("Run cancelled.");
        std::process::exit(130);
    };

    let failed = matches!(outcome, RunOutcome::Failure(_));
    print!("{}", format_outcome(&outcome));
    state.complete(&ticket, outcome);

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Storyboard source: a path argument, `-`/piped stdin, or an editor prompt.
#[cfg(not(target_arch = "wasm32"))]
fn read_storyboard() -> Result<String> {
    match std::env::args().nth(1).as_deref() {
        Some("-") => read_stdin(),
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))
        }
        None if !std::io::stdin().is_terminal() => read_stdin(),
        None => inquire::Editor::new("Pega aquí el JSON del storyboard (NanoBananaPro):")
            .with_file_extension(".json")
            .prompt()
            .context("Failed to read storyboard from editor"),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read storyboard from stdin")?;
    Ok(buf)
}
