//! Browser glue
//!
//! Implements the core's seams on top of the DOM:
//! - `audio`: Web Audio + media-element backend
//! - `dom`: CSS durations, effect classes, countdown overlay, controls
//! - `dust`: Canvas painter and the animation loop

pub mod audio;
pub mod dom;
pub mod dust;

pub use audio::WebAudioBackend;
pub use dom::{
    CssDurations, DomControls, DomCountdown, DomEffects, NavigatorClipboard, TimeoutScheduler,
};
pub use dust::start_dust;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlAudioElement, HtmlCanvasElement, HtmlElement};

/// Every element the page hands to the core
pub struct Page {
    pub app: HtmlElement,
    pub start: HtmlElement,
    pub intro: Option<HtmlElement>,
    pub monster: Element,
    pub flash: Element,
    pub blood: Element,
    pub glitch_layers: Vec<Element>,
    pub cta: Element,
    pub audio_hint: Option<HtmlElement>,
    pub countdown: HtmlElement,
    pub count_text: Element,
    pub scream: Option<HtmlAudioElement>,
    pub suspense: Option<HtmlAudioElement>,
    pub dust: HtmlCanvasElement,
    pub sound_toggle: Option<Element>,
    pub mute_toggle: Option<Element>,
    pub copy_link: Option<Element>,
    pub copy_feedback: Option<Element>,
}

impl Page {
    /// Look up the page's elements. Errors name the first required one missing.
    pub fn lookup(document: &Document) -> Result<Self, String> {
        let glitch_layers = match document.query_selector_all(".glitch-layer, .glitch-layer--2") {
            Ok(list) => (0..list.length())
                .filter_map(|i| list.item(i))
                .filter_map(|node| node.dyn_into::<Element>().ok())
                .collect(),
            Err(_) => Vec::new(),
        };

        Ok(Self {
            app: required(document, "#app")?,
            start: required(document, "#start")?,
            intro: optional(document, ".hero"),
            monster: required(document, "#monster")?,
            flash: required(document, "#flash")?,
            blood: required(document, "#blood")?,
            glitch_layers,
            cta: required(document, "#cta")?,
            audio_hint: optional(document, "#audioHint"),
            countdown: required(document, "#countdown")?,
            count_text: required(document, "#countText")?,
            scream: optional(document, "#screamEl"),
            suspense: optional(document, "#suspenseEl"),
            dust: required(document, "#dust")?,
            sound_toggle: optional(document, "#soundToggle"),
            mute_toggle: optional(document, "#muteToggle"),
            copy_link: optional(document, "#copyLink"),
            copy_feedback: optional(document, "#copyFeedback"),
        })
    }
}

fn optional<T: JsCast>(document: &Document, selector: &str) -> Option<T> {
    document
        .query_selector(selector)
        .ok()
        .flatten()
        .and_then(|el| el.dyn_into::<T>().ok())
}

fn required<T: JsCast>(document: &Document, selector: &str) -> Result<T, String> {
    optional(document, selector).ok_or_else(|| format!("missing element {}", selector))
}

/// Best-effort text for a thrown JS value
pub(crate) fn js_error_text(e: &JsValue) -> String {
    e.as_string()
        .or_else(|| {
            js_sys::Reflect::get(e, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", e))
}

/// `name` of a DOMException-like value (e.g. "NotAllowedError")
pub(crate) fn js_error_name(e: &JsValue) -> Option<String> {
    js_sys::Reflect::get(e, &JsValue::from_str("name"))
        .ok()
        .and_then(|n| n.as_string())
}
