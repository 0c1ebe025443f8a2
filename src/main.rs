//! Jump-scare entry point
//!
//! Wires the page's elements to the core and starts the ambient dust.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_page {
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::spawn_local;
    use web_sys::Element;

    use jumpscare::ScareConfig;
    use jumpscare::audio::AudioPlaybackEngine;
    use jumpscare::schedule::Scheduler;
    use jumpscare::ui::{UNLOCK_EVENT, UiController, UiParts};
    use jumpscare::web::{
        CssDurations, DomControls, DomCountdown, DomEffects, NavigatorClipboard, Page,
        TimeoutScheduler, WebAudioBackend, start_dust,
    };

    type Ui = Rc<UiController<WebAudioBackend>>;

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Jump scare page starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");
        let config = ScareConfig::load();

        let page = match Page::lookup(&document) {
            Ok(page) => page,
            Err(e) => {
                log::error!("Page not wired: {}", e);
                return;
            }
        };

        let backend = WebAudioBackend::new(
            page.scream.clone(),
            page.suspense.clone(),
            page.audio_hint.clone(),
        );
        let engine = Rc::new(AudioPlaybackEngine::new(backend, &config));

        // Single best-effort fetch + decode of the scream
        {
            let engine = engine.clone();
            spawn_local(async move {
                engine.initialize().await;
            });
        }

        let scheduler: Rc<dyn Scheduler> = Rc::new(TimeoutScheduler);
        let ui: Ui = Rc::new(UiController::new(
            UiParts {
                engine: engine.clone(),
                scheduler,
                durations: Rc::new(CssDurations),
                controls: Rc::new(DomControls::new(&page)),
                countdown_view: Rc::new(DomCountdown::new(&page, engine.clone())),
                effects: Rc::new(DomEffects::new(&page, engine.clone())),
            },
            &config,
        ));

        setup_start_button(&page, ui.clone());
        setup_sound_controls(&page, ui.clone());
        setup_copy_link(&page, ui.clone());
        setup_gesture_unlock(&document, ui.clone());
        setup_focus_on_load(&document, ui);

        let seed = js_sys::Date::now() as u64;
        start_dust(&page.dust, &page.app, config.particle_count, seed);

        log::info!("Jump scare page ready");
    }

    fn on_click(el: &Element, handler: impl FnMut(web_sys::MouseEvent) + 'static) {
        let closure = Closure::<dyn FnMut(web_sys::MouseEvent)>::new(handler);
        let _ = el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_start_button(page: &Page, ui: Ui) {
        on_click(&page.start, move |_event| {
            // Inside the gesture: let the audio context start
            let engine = ui.engine().clone();
            spawn_local(async move {
                engine.prime().await;
            });
            ui.start();
        });
    }

    fn setup_sound_controls(page: &Page, ui: Ui) {
        if let Some(btn) = &page.sound_toggle {
            let ui = ui.clone();
            on_click(btn, move |_event| {
                ui.toggle_sound();
            });
        }
        if let Some(btn) = &page.mute_toggle {
            on_click(btn, move |_event| {
                ui.toggle_mute();
            });
        }
    }

    fn setup_copy_link(page: &Page, ui: Ui) {
        let Some(btn) = &page.copy_link else {
            return;
        };
        on_click(btn, move |_event| {
            let ui = ui.clone();
            spawn_local(async move {
                let url = web_sys::window()
                    .and_then(|w| w.location().href().ok())
                    .unwrap_or_default();
                let _ = ui.copy_link(&NavigatorClipboard, &url).await;
            });
        });
    }

    /// Any tap spends a pending "tap to hear" unlock
    fn setup_gesture_unlock(document: &web_sys::Document, ui: Ui) {
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
            if !ui.engine().needs_second_gesture() {
                return;
            }
            let ui = ui.clone();
            spawn_local(async move {
                if let Some(outcome) = ui.page_tapped().await {
                    log::info!("Unlock retry: {:?}", outcome);
                }
            });
        });
        let _ = document
            .add_event_listener_with_callback(UNLOCK_EVENT, closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_focus_on_load(document: &web_sys::Document, ui: Ui) {
        if document.ready_state() == "complete" {
            ui.page_ready();
            return;
        }
        let closure = Closure::once(move |_event: web_sys::Event| {
            ui.page_ready();
        });
        if let Some(window) = web_sys::window() {
            let _ =
                window.add_event_listener_with_callback("load", closure.as_ref().unchecked_ref());
        }
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_page::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::rc::Rc;

    use jumpscare::ScareConfig;
    use jumpscare::countdown::CountdownController;
    use jumpscare::schedule::ManualScheduler;
    use jumpscare::sequence::{EffectAction, EffectSink, SequenceDirector};
    use jumpscare::timing::StyleMap;

    env_logger::init();
    log::info!("Jump scare (native) starting...");
    log::info!("Native mode only previews the timeline - run with `trunk serve` for the page");

    struct PrintSink(Rc<ManualScheduler>);

    impl EffectSink for PrintSink {
        fn apply(&self, action: EffectAction) {
            println!("  {:>6.0} ms  {:?}", self.0.now_ms(), action);
        }
    }

    let config = ScareConfig::load();
    let countdown = CountdownController::from_config(&config);
    let director = SequenceDirector::from_config(&config);
    let sched = Rc::new(ManualScheduler::new());

    println!(
        "\nCountdown: {} steps, {:.0} ms",
        config.countdown_steps.len(),
        countdown.total_ms()
    );
    println!("Scare sequence with stock page timings:");
    director.run(
        &StyleMap::page_defaults(),
        sched.as_ref(),
        Rc::new(PrintSink(sched.clone())),
    );
    sched.run_until_idle();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
