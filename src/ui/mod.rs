use leptos::*;
use crate::core::config::BackendConfig;
use crate::core::state::{FormState, RunResult};
use crate::services::runner::Runner;
use crate::utils::report::EMPTY_STATE_MESSAGE;

#[component]
pub fn App(backend: BackendConfig) -> impl IntoView {
    let runner = Runner::over_http(backend);
    let state = create_rw_signal(FormState::new());

    // Unmounting abandons the pending request so it cannot write into a dead form.
    on_cleanup(move || {
        state.try_update_untracked(|s| s.cancel());
    });

    let on_run = move |_| {
        if !state.with_untracked(|s| s.can_submit()) {
            return;
        }
        let input = state.with_untracked(|s| s.input.clone());
        let Some(ticket) = state.try_update(|s| s.begin()) else {
            return;
        };
        let runner = runner.clone();
        spawn_local(async move {
            if let Some(outcome) = runner.submit_until_cancelled(&input, ticket.token()).await {
                state.try_update(|s| s.complete(&ticket, outcome));
            }
        });
    };

    view! {
        <div class="runner-container">
            <header class="header">
                <h1>"NanoBanana Runner"</h1>
                <p>"Generación de imágenes con control absoluto."</p>
            </header>

            <main class="runner-main">
                <section class="glass-panel">
                    <div class="input-label">"INPUT_SPEC.JSON"</div>
                    <textarea
                        prop:value=move || state.with(|s| s.input.clone())
                        on:input=move |ev| state.update(|s| s.set_input(event_target_value(&ev)))
                        placeholder="Pega aquí el JSON del storyboard (NanoBananaPro)..."
                        spellcheck="false"
                    />
                    <div class="controls">
                        <button on:click=on_run disabled=move || !state.with(|s| s.can_submit())>
                            {move || if state.with(|s| s.in_flight()) {
                                view! { <div class="spinner"></div><span>"Procesando..."</span> }.into_view()
                            } else {
                                view! { <span>"Ejecutar Pipeline"</span> }.into_view()
                            }}
                        </button>
                    </div>

                    {move || state.with(|s| s.error().map(str::to_string)).map(|message| view! {
                        <div class="error-message">
                            <strong>"Error"</strong>
                            <p>{message}</p>
                        </div>
                    })}
                </section>

                <section class="results-section">
                    <h2>"Resultados"</h2>
                    {move || {
                        let results = state.with(|s| s.results().to_vec());
                        if !results.is_empty() {
                            view! {
                                <div class="results-grid">
                                    {results.into_iter().map(|result| view! { <ResultCard result=result/> }).collect_view()}
                                </div>
                            }.into_view()
                        } else if state.with(|s| s.shows_empty_state()) {
                            view! {
                                <div class="no-results">
                                    <p>{EMPTY_STATE_MESSAGE}</p>
                                </div>
                            }.into_view()
                        } else {
                            ().into_view()
                        }
                    }}
                </section>
            </main>

            <footer class="footer">
                <p>"NanoBananaPro Engine Runner"</p>
            </footer>
        </div>
    }
}

#[component]
pub fn ResultCard(result: RunResult) -> impl IntoView {
    let title = result.title();
    let assets = result.assets().to_vec();

    view! {
        <div class="glass-panel task-card">
            <div class="task-card-header">
                <h3>{title}</h3>
                <a href=result.image_url.clone() target="_blank" rel="noreferrer" class="asset-badge">"↗"</a>
            </div>

            <div class="image-preview">
                <img src=result.image_url.clone() alt=result.task_id.clone() loading="lazy"/>
            </div>

            <div class="prompt-box">{result.final_prompt.clone()}</div>

            {(!assets.is_empty()).then(move || view! {
                <div class="assets-section">
                    <p class="assets-label">"Assets / References"</p>
                    <div class="assets-list">
                        {assets.into_iter().map(|asset| view! {
                            <a
                                href=asset.resolved_url.clone()
                                target="_blank"
                                rel="noreferrer"
                                class="asset-badge"
                                title=asset.resolved_url
                            >
                                {asset.ref_id}
                            </a>
                        }).collect_view()}
                    </div>
                </div>
            })}
        </div>
    }
}
