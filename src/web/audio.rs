//! Web Audio backend
//!
//! One `AudioContext` with a single gain node into the destination, plus the
//! page's two `<audio>` elements for the fallback and suspense tracks.

use js_sys::ArrayBuffer;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AudioBuffer, AudioContext, AudioContextState, GainNode, HtmlAudioElement, HtmlElement, Response,
};

use super::{js_error_name, js_error_text};
use crate::audio::{AudioBackend, ContextState, MediaTrack};
use crate::error::AudioError;

pub struct WebAudioBackend {
    ctx: Option<AudioContext>,
    gain: Option<GainNode>,
    scream: Option<HtmlAudioElement>,
    suspense: Option<HtmlAudioElement>,
    hint: Option<HtmlElement>,
}

impl WebAudioBackend {
    pub fn new(
        scream: Option<HtmlAudioElement>,
        suspense: Option<HtmlAudioElement>,
        hint: Option<HtmlElement>,
    ) -> Self {
        // May fail outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - low-latency scream disabled");
        }
        let gain = ctx.as_ref().and_then(|ctx| {
            let gain = ctx.create_gain().ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;
            Some(gain)
        });
        Self {
            ctx,
            gain,
            scream,
            suspense,
            hint,
        }
    }

    fn media(&self, track: MediaTrack) -> Option<&HtmlAudioElement> {
        match track {
            MediaTrack::Scream => self.scream.as_ref(),
            MediaTrack::Suspense => self.suspense.as_ref(),
        }
    }

    fn graph(&self) -> Result<(&AudioContext, &GainNode), AudioError> {
        match (&self.ctx, &self.gain) {
            (Some(ctx), Some(gain)) => Ok((ctx, gain)),
            _ => Err(AudioError::ContextUnavailable),
        }
    }
}

impl AudioBackend for WebAudioBackend {
    type Bytes = ArrayBuffer;
    type Buffer = AudioBuffer;

    fn context_state(&self) -> ContextState {
        match self.graph() {
            Err(_) => ContextState::Unavailable,
            Ok((ctx, _)) => match ctx.state() {
                AudioContextState::Running => ContextState::Running,
                AudioContextState::Closed => ContextState::Closed,
                _ => ContextState::Suspended,
            },
        }
    }

    async fn resume(&self) -> Result<(), AudioError> {
        let (ctx, _) = self.graph()?;
        let promise = ctx
            .resume()
            .map_err(|e| AudioError::Resume(js_error_text(&e)))?;
        JsFuture::from(promise)
            .await
            .map(|_| ())
            .map_err(|e| AudioError::Resume(js_error_text(&e)))
    }

    async fn fetch(&self, url: &str) -> Result<ArrayBuffer, AudioError> {
        let fetch_err = |reason: String| AudioError::Fetch {
            url: url.to_string(),
            reason,
        };
        let window = web_sys::window().ok_or_else(|| fetch_err("no window".into()))?;

        let response: Response = JsFuture::from(window.fetch_with_str(url))
            .await
            .map_err(|e| fetch_err(js_error_text(&e)))?
            .dyn_into()
            .map_err(|_| fetch_err("not a Response".into()))?;
        if !response.ok() {
            return Err(fetch_err(format!("HTTP {}", response.status())));
        }

        let body = response
            .array_buffer()
            .map_err(|e| fetch_err(js_error_text(&e)))?;
        JsFuture::from(body)
            .await
            .map_err(|e| fetch_err(js_error_text(&e)))?
            .dyn_into()
            .map_err(|_| fetch_err("body is not an ArrayBuffer".into()))
    }

    async fn decode(&self, bytes: ArrayBuffer) -> Result<AudioBuffer, AudioError> {
        let (ctx, _) = self.graph()?;
        let promise = ctx
            .decode_audio_data(&bytes)
            .map_err(|e| AudioError::Decode(js_error_text(&e)))?;
        JsFuture::from(promise)
            .await
            .map_err(|e| AudioError::Decode(js_error_text(&e)))?
            .dyn_into()
            .map_err(|_| AudioError::Decode("not an AudioBuffer".into()))
    }

    fn current_time(&self) -> f64 {
        self.ctx.as_ref().map_or(0.0, |ctx| ctx.current_time())
    }

    fn cancel_gain_ramps(&self, from: f64) {
        if let Some(gain) = &self.gain {
            gain.gain().cancel_scheduled_values(from).ok();
        }
    }

    fn set_gain_at(&self, value: f32, at: f64) {
        if let Some(gain) = &self.gain {
            gain.gain().set_value_at_time(value, at).ok();
        }
    }

    fn ramp_gain_to(&self, value: f32, at: f64) {
        if let Some(gain) = &self.gain {
            gain.gain().linear_ramp_to_value_at_time(value, at).ok();
        }
    }

    fn start_buffer(&self, buffer: &AudioBuffer) -> Result<(), AudioError> {
        let (ctx, gain) = self.graph()?;
        let playback = |e: wasm_bindgen::JsValue| AudioError::Playback(js_error_text(&e));

        let source = ctx.create_buffer_source().map_err(playback)?;
        source.set_buffer(Some(buffer));
        source.connect_with_audio_node(gain).map_err(playback)?;
        source.start().map_err(playback)?;
        Ok(())
    }

    async fn play_media(&self, track: MediaTrack, volume: f32) -> Result<(), AudioError> {
        let el = self
            .media(track)
            .ok_or_else(|| AudioError::Playback(format!("no {:?} element", track)))?;
        el.set_current_time(0.0);
        el.set_volume(volume as f64);

        let classify = |e: wasm_bindgen::JsValue| {
            if js_error_name(&e).as_deref() == Some("NotAllowedError") {
                AudioError::PlaybackBlocked
            } else {
                AudioError::Playback(js_error_text(&e))
            }
        };
        let promise = el.play().map_err(classify)?;
        JsFuture::from(promise).await.map(|_| ()).map_err(classify)
    }

    fn stop_media(&self, track: MediaTrack) {
        if let Some(el) = self.media(track) {
            el.pause().ok();
            el.set_current_time(0.0);
        }
    }

    fn set_unlock_hint(&self, visible: bool) {
        if let Some(hint) = &self.hint {
            hint.set_hidden(!visible);
        }
    }
}
