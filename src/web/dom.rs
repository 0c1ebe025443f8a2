//! DOM-side implementations of the core's seams

use std::rc::Rc;

use js_sys::{Array, Function, Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{Element, HtmlElement};

use super::{Page, WebAudioBackend, js_error_text};
use crate::audio::AudioPlaybackEngine;
use crate::countdown::CountdownView;
use crate::error::ClipboardError;
use crate::schedule::{Job, Scheduler};
use crate::sequence::{EffectAction, EffectSink};
use crate::timing::DurationSource;
use crate::ui::{Clipboard, ControlsView};

type Engine = Rc<AudioPlaybackEngine<WebAudioBackend>>;

fn add_class(el: &Element, class: &str) {
    let _ = el.class_list().add_1(class);
}

fn remove_class(el: &Element, class: &str) {
    let _ = el.class_list().remove_1(class);
}

fn set_display(el: &HtmlElement, value: &str) {
    let _ = el.style().set_property("display", value);
}

/// Stage durations from the document element's computed style
pub struct CssDurations;

impl DurationSource for CssDurations {
    fn raw(&self, name: &str) -> Option<String> {
        let window = web_sys::window()?;
        let root = window.document()?.document_element()?;
        let style = window.get_computed_style(&root).ok()??;
        style.get_property_value(name).ok()
    }
}

/// `setTimeout`-backed scheduler
pub struct TimeoutScheduler;

impl Scheduler for TimeoutScheduler {
    fn defer(&self, delay_ms: f64, job: Job) {
        let Some(window) = web_sys::window() else {
            log::error!("No window, dropping scheduled job");
            return;
        };
        let delay = delay_ms.max(0.0).round().min(i32::MAX as f64) as i32;
        let closure = Closure::once(move || job());
        if window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                delay,
            )
            .is_err()
        {
            log::warn!("setTimeout failed ({} ms job dropped)", delay);
        }
        closure.forget();
    }
}

/// Effect classes on the page, plus the scream and the vibration motor
pub struct DomEffects {
    app: Element,
    flash: Element,
    glitch_layers: Vec<Element>,
    monster: Element,
    blood: Element,
    cta: Element,
    engine: Engine,
}

impl DomEffects {
    pub fn new(page: &Page, engine: Engine) -> Self {
        Self {
            app: page.app.clone().into(),
            flash: page.flash.clone(),
            glitch_layers: page.glitch_layers.clone(),
            monster: page.monster.clone(),
            blood: page.blood.clone(),
            cta: page.cta.clone(),
            engine,
        }
    }

    fn set_glitch(&self, on: bool) {
        for layer in &self.glitch_layers {
            if on {
                add_class(layer, "glitch-on");
            } else {
                remove_class(layer, "glitch-on");
            }
        }
    }
}

impl EffectSink for DomEffects {
    fn apply(&self, action: EffectAction) {
        match action {
            EffectAction::EnableFlash => add_class(&self.flash, "flash-on"),
            EffectAction::DisableFlash => remove_class(&self.flash, "flash-on"),
            EffectAction::EnableGlitch => self.set_glitch(true),
            EffectAction::DisableGlitch => self.set_glitch(false),
            EffectAction::EnableShake => add_class(&self.app, "shake"),
            EffectAction::DisableShake => remove_class(&self.app, "shake"),
            EffectAction::RevealMonster => add_class(&self.monster, "reveal"),
            EffectAction::TriggerAudio => {
                let engine = self.engine.clone();
                spawn_local(async move {
                    let outcome = engine.play_scream().await;
                    log::info!("Scream: {:?}", outcome);
                });
            }
            EffectAction::RevealBlood => add_class(&self.blood, "blood-on"),
            EffectAction::RevealCta => {
                let _ = self.cta.set_attribute("aria-hidden", "false");
                add_class(&self.cta, "cta-show");
                self.engine.dismiss_unlock_hint();
            }
        }
    }

    fn vibrate(&self, pattern: &[u32]) -> bool {
        let Some(window) = web_sys::window() else {
            return false;
        };
        let navigator = window.navigator();
        if !Reflect::has(&navigator, &JsValue::from_str("vibrate")).unwrap_or(false) {
            return false;
        }
        let pattern: Array = pattern.iter().map(|&ms| JsValue::from(ms)).collect();
        navigator.vibrate_with_pattern(&pattern)
    }
}

/// The countdown overlay
pub struct DomCountdown {
    overlay: HtmlElement,
    text: Element,
    engine: Engine,
}

impl DomCountdown {
    pub fn new(page: &Page, engine: Engine) -> Self {
        Self {
            overlay: page.countdown.clone(),
            text: page.count_text.clone(),
            engine,
        }
    }
}

impl CountdownView for DomCountdown {
    fn show_step(&self, text: &str) {
        set_display(&self.overlay, "flex");
        self.text.set_text_content(Some(text));
    }

    fn hide(&self) {
        set_display(&self.overlay, "none");
        self.text.set_text_content(None);
    }

    fn start_ambience(&self) {
        let engine = self.engine.clone();
        spawn_local(async move {
            engine.play_suspense().await;
        });
    }
}

/// Start button, intro panel, sound/mute buttons, copy feedback
pub struct DomControls {
    start: HtmlElement,
    intro: Option<HtmlElement>,
    sound_toggle: Option<Element>,
    mute_toggle: Option<Element>,
    copy_feedback: Option<Element>,
}

impl DomControls {
    pub fn new(page: &Page) -> Self {
        Self {
            start: page.start.clone(),
            intro: page.intro.clone(),
            sound_toggle: page.sound_toggle.clone(),
            mute_toggle: page.mute_toggle.clone(),
            copy_feedback: page.copy_feedback.clone(),
        }
    }
}

impl ControlsView for DomControls {
    fn set_start_enabled(&self, enabled: bool) {
        if enabled {
            let _ = self.start.remove_attribute("disabled");
        } else {
            let _ = self.start.set_attribute("disabled", "");
        }
    }

    fn hide_intro(&self) {
        if let Some(intro) = &self.intro {
            set_display(intro, "none");
        }
    }

    fn blur_active(&self) {
        let active = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.active_element())
            .and_then(|el| el.dyn_into::<HtmlElement>().ok());
        if let Some(el) = active {
            let _ = el.blur();
        }
    }

    fn focus_start(&self) {
        let _ = self.start.focus();
    }

    fn show_sound_state(&self, enabled: bool, hard_muted: bool) {
        if let Some(el) = &self.sound_toggle {
            el.set_text_content(Some(if enabled { "Sound: on" } else { "Sound: off" }));
            let _ = el.set_attribute("aria-pressed", if enabled { "true" } else { "false" });
        }
        if let Some(el) = &self.mute_toggle {
            el.set_text_content(Some(if hard_muted { "Unmute" } else { "Mute" }));
            let _ = el.set_attribute("aria-pressed", if hard_muted { "true" } else { "false" });
        }
    }

    fn show_copy_feedback(&self, message: Option<&str>) {
        if let Some(el) = &self.copy_feedback {
            el.set_text_content(message);
        }
    }
}

/// `navigator.clipboard.writeText`, looked up at call time
pub struct NavigatorClipboard;

impl Clipboard for NavigatorClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let navigator = web_sys::window()
            .ok_or(ClipboardError::Unavailable)?
            .navigator();
        let clipboard = Reflect::get(&navigator, &JsValue::from_str("clipboard"))
            .ok()
            .filter(|c| !c.is_undefined() && !c.is_null())
            .ok_or(ClipboardError::Unavailable)?;
        let write: Function = Reflect::get(&clipboard, &JsValue::from_str("writeText"))
            .ok()
            .and_then(|f| f.dyn_into().ok())
            .ok_or(ClipboardError::Unavailable)?;

        let rejected = |e: JsValue| ClipboardError::Rejected(js_error_text(&e));
        let promise: Promise = write
            .call1(&clipboard, &JsValue::from_str(text))
            .map_err(rejected)?
            .dyn_into()
            .map_err(rejected)?;
        JsFuture::from(promise).await.map(|_| ()).map_err(rejected)
    }
}
