pub mod core;
pub mod services;
pub mod utils;
#[cfg(target_arch = "wasm32")]
pub mod ui;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use leptos::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).unwrap_or(());

    let backend = match crate::core::config::BackendConfig::from_location() {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("Could not read page location, falling back to defaults: {:#}", e);
            Default::default()
        }
    };

    leptos::mount_to_body(move || {
        use crate::ui::App;
        view! { <App backend=backend/> }
    });
}
