use anyhow::Result;
use async_trait::async_trait;
use nanobanana_runner::core::config::BackendConfig;
use nanobanana_runner::core::state::FormState;
use nanobanana_runner::services::backend::{Backend, BackendReply};
use nanobanana_runner::services::runner::Runner;
use nanobanana_runner::utils::report::format_outcome;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Answers each POST with the next scripted reply and records what was sent.
struct ScriptedBackend {
    replies: Mutex<Vec<BackendReply>>,
    sent: Mutex<Vec<(String, Value)>>,
}

impl ScriptedBackend {
    fn new(replies: Vec<(u16, Value)>) -> Self {
        let mut replies: Vec<BackendReply> = replies
            .into_iter()
            .map(|(status, body)| BackendReply {
                status,
                body: body.to_string(),
            })
            .collect();
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn post_json(&self, url: &str, body: &Value) -> Result<BackendReply> {
        self.sent.lock().unwrap().push((url.to_string(), body.clone()));
        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| anyhow::anyhow!("no scripted reply left"))
    }
}

fn storyboard() -> Value {
    json!({
        "project": {
            "project_id": "PRJ_DEMO",
            "title": "Demo",
            "output": { "aspect_ratio": "16:9", "resolution_px": [1920, 1080], "image_format": "png" }
        },
        "asset_library": { "CHAR_A": { "file": "char_a.png" } },
        "image_tasks": [
            { "task_id": "IMG_01", "refs": ["CHAR_A"], "prompt": "hero on a rooftop" }
        ]
    })
}

#[tokio::test]
async fn test_consecutive_runs_replace_outcome() -> Result<()> {
    let backend = Arc::new(ScriptedBackend::new(vec![
        (
            200,
            json!({
                "status": "OK",
                "results": [
                    { "task_id": "IMG_01", "variant": 1, "image_url": "https://studio.example.com/assets/1.png",
                      "final_prompt": "hero on a rooftop",
                      "assets_sent": [ { "ref_id": "CHAR_A", "resolved_url": "https://studio.example.com/assets/char_a.png" } ] },
                    { "task_id": "IMG_01", "variant": 2, "image_url": "https://studio.example.com/assets/2.png",
                      "final_prompt": "hero on a rooftop" }
                ]
            }),
        ),
        (500, json!({ "detail": "KIE quota exceeded" })),
    ]));
    let runner = Runner::new(
        BackendConfig::for_page("studio.example.com", "https:"),
        backend.clone(),
    );

    let mut state = FormState::new();
    state.set_input(serde_json::to_string_pretty(&storyboard())?);

    assert!(runner.run(&mut state).await);
    let titles: Vec<String> = state.results().iter().map(|r| r.title()).collect();
    assert_eq!(titles, vec!["IMG_01", "IMG_01 (v2)"]);
    assert!(state.error().is_none());

    assert!(runner.run(&mut state).await);
    assert!(state.results().is_empty());
    let error = state.error().unwrap_or_default();
    assert!(error.contains("500"));
    assert!(error.contains("KIE quota exceeded"));

    let sent = backend.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "https://studio.example.com/nanobanana/run-full");
    assert_eq!(sent[0].1, storyboard());
    Ok(())
}

#[tokio::test]
async fn test_invalid_input_keeps_backend_idle() -> Result<()> {
    let backend = Arc::new(ScriptedBackend::new(vec![]));
    let runner = Runner::new(BackendConfig::default(), backend.clone());

    let mut state = FormState::new();
    state.set_input("{ \"image_tasks\": [ }");
    assert!(runner.run(&mut state).await);

    assert!(state.error().unwrap_or_default().starts_with("JSON inválido"));
    assert!(!state.in_flight());
    assert!(backend.sent.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_report_for_application_error() -> Result<()> {
    let backend = Arc::new(ScriptedBackend::new(vec![(
        200,
        json!({ "status": "ERROR", "error": "boom" }),
    )]));
    let runner = Runner::new(BackendConfig::default(), backend);

    let outcome = runner.submit(&storyboard().to_string()).await;
    assert_eq!(format_outcome(&outcome), "Error\n  boom\n");
    Ok(())
}
