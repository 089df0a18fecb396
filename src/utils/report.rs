use crate::core::state::{RunOutcome, RunResult};

pub const EMPTY_STATE_MESSAGE: &str =
    "No hay resultados que mostrar. Pega un JSON y presiona \"Ejecutar Pipeline\".";

/// Plain-text rendering of one result card.
pub fn format_result(result: &RunResult) -> String {
    let mut out = format!("== {}\n", result.title());
    out.push_str(&format!("   imagen:  {}\n", result.image_url));
    out.push_str(&format!("   prompt:  {}\n", result.final_prompt));
    if let Some(negative) = result.final_negative_prompt.as_deref().filter(|s| !s.is_empty()) {
        out.push_str(&format!("   negative: {}\n", negative));
    }
    let assets = result.assets();
    if !assets.is_empty() {
        out.push_str("   assets / references:\n");
        for asset in assets {
            out.push_str(&format!("     [{}] {}\n", asset.ref_id, asset.resolved_url));
        }
    }
    out
}

pub fn format_outcome(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Failure(err) => format!("Error\n  {}\n", err),
        RunOutcome::Success(results) if results.is_empty() => format!("{}\n", EMPTY_STATE_MESSAGE),
        RunOutcome::Success(results) => {
            let mut out = format!("Resultados ({})\n", results.len());
            for result in results {
                out.push_str(&format_result(result));
            }
            out
        }
    }
}
