//! Canvas dust loop

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement};

use crate::particles::{DustPainter, ParticleField};

struct CanvasPainter {
    ctx: CanvasRenderingContext2d,
}

impl DustPainter for CanvasPainter {
    fn clear(&mut self, width: f32, height: f32) {
        self.ctx.clear_rect(0.0, 0.0, width as f64, height as f64);
    }

    fn dot(&mut self, pos: Vec2, radius: f32, alpha: f32) {
        self.ctx.begin_path();
        self.ctx
            .set_fill_style_str(&format!("rgba(255,255,255,{})", alpha));
        self.ctx
            .arc(
                pos.x as f64,
                pos.y as f64,
                radius as f64,
                0.0,
                std::f64::consts::TAU,
            )
            .ok();
        self.ctx.fill();
    }
}

struct Dust {
    field: ParticleField,
    painter: CanvasPainter,
    canvas: HtmlCanvasElement,
    container: HtmlElement,
}

impl Dust {
    /// Match the canvas to the container; particles keep their positions
    fn fit_canvas(&mut self) {
        let w = self.container.client_width().max(0) as u32;
        let h = self.container.client_height().max(0) as u32;
        self.canvas.set_width(w);
        self.canvas.set_height(h);
        self.field.resize(w as f32, h as f32);
    }
}

/// Size the canvas, seed the dust and start the frame loop. Runs for the
/// life of the page.
pub fn start_dust(canvas: &HtmlCanvasElement, container: &HtmlElement, count: usize, seed: u64) {
    let ctx = match canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
    {
        Some(ctx) => ctx,
        None => {
            log::warn!("No 2D context on dust canvas - ambience disabled");
            return;
        }
    };

    let mut dust = Dust {
        field: ParticleField::new(0.0, 0.0, seed),
        painter: CanvasPainter { ctx },
        canvas: canvas.clone(),
        container: container.clone(),
    };
    dust.fit_canvas();
    dust.field.initialize(count);
    let dust = Rc::new(RefCell::new(dust));

    // Resize
    {
        let dust = dust.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            dust.borrow_mut().fit_canvas();
        });
        if let Some(window) = web_sys::window() {
            let options = web_sys::AddEventListenerOptions::new();
            options.set_passive(true);
            let _ = window.add_event_listener_with_callback_and_add_event_listener_options(
                "resize",
                closure.as_ref().unchecked_ref(),
                &options,
            );
        }
        closure.forget();
    }

    request_animation_frame(dust);
    log::info!("Dust running ({} particles)", count);
}

fn request_animation_frame(dust: Rc<RefCell<Dust>>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let closure = Closure::once(move |_time: f64| {
        frame(dust);
    });
    let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
    closure.forget();
}

fn frame(dust: Rc<RefCell<Dust>>) {
    {
        let mut d = dust.borrow_mut();
        let Dust { field, painter, .. } = &mut *d;
        field.tick();
        field.draw(painter);
    }

    request_animation_frame(dust);
}
