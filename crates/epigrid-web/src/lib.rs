#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result, ensure};
use epigrid_core::{
    EngineState, EventLog, LayoutConfig, LayoutEngine, ParamsSeed, PointerUpdate, SeriesFrame,
};
use epigrid_render::RgbaCanvas;
use js_sys::Uint8ClampedArray;
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

/// Largest canvas edge accepted from the page.
const MAX_CANVAS_EDGE: u32 = 4096;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct InitOptions {
    layout: LayoutConfig,
    width: u32,
    height: u32,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            width: 400,
            height: 400,
        }
    }
}

struct GridHost {
    engine: LayoutEngine<RgbaCanvas, EventLog>,
}

impl GridHost {
    fn new(options: InitOptions) -> Result<Self> {
        ensure!(
            options.width <= MAX_CANVAS_EDGE && options.height <= MAX_CANVAS_EDGE,
            "canvas must be at most {MAX_CANVAS_EDGE} pixels per side"
        );
        let canvas = RgbaCanvas::new(options.width, options.height)?;
        let engine = LayoutEngine::with_observer(options.layout, canvas, EventLog::default())
            .context("invalid layout configuration")?;
        Ok(Self { engine })
    }

    fn update(&mut self, pointer: &PointerUpdate) -> Option<epigrid_core::BandSizes> {
        self.engine.on_update(pointer)
    }
}

/// Handle owned by the page; one per canvas.
#[wasm_bindgen]
pub struct GridHandle {
    inner: Rc<RefCell<GridHost>>,
}

#[wasm_bindgen]
impl GridHandle {
    /// Install a layout from `{seed, mode?, hybrid?}`.
    #[wasm_bindgen(js_name = onParams)]
    pub fn on_params_js(&self, params: JsValue) -> Result<(), JsValue> {
        let params: ParamsSeed = from_value(params).map_err(js_error)?;
        self.inner.borrow_mut().engine.on_params(params);
        Ok(())
    }

    /// Store a series `{t, S, I, R?, E?, D?, V?}`; returns its length.
    #[wasm_bindgen(js_name = onSimData)]
    pub fn on_sim_data_js(&self, series: JsValue) -> Result<u32, JsValue> {
        let series: SeriesFrame = from_value(series).map_err(js_error)?;
        let mut host = self.inner.borrow_mut();
        host.engine.on_sim_data(series).map_err(js_error)?;
        let len = host.engine.series().map_or(0, SeriesFrame::len);
        u32::try_from(len).map_err(js_error)
    }

    /// Paint `{idx}` or `{proportions}`. Returns band sizes, or `null` when
    /// the canvas was cleared instead.
    #[wasm_bindgen(js_name = onUpdate)]
    pub fn on_update_js(&self, pointer: JsValue) -> Result<JsValue, JsValue> {
        let pointer: PointerUpdate = from_value(pointer).map_err(js_error)?;
        let sizes = self.inner.borrow_mut().update(&pointer);
        match sizes {
            Some(sizes) => to_value(&sizes).map_err(js_error),
            None => Ok(JsValue::NULL),
        }
    }

    /// RGBA bytes ready for `new ImageData(pixels, width, height)`.
    #[wasm_bindgen(js_name = pixels)]
    pub fn pixels_js(&self) -> Uint8ClampedArray {
        Uint8ClampedArray::from(self.inner.borrow().engine.surface().as_raw())
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.borrow().engine.surface().width()
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.borrow().engine.surface().height()
    }

    #[wasm_bindgen(getter)]
    pub fn seeded(&self) -> bool {
        self.inner.borrow().engine.state() == EngineState::Seeded
    }

    /// Compartment symbol shown at grid cell `cell` in the last frame.
    #[wasm_bindgen(js_name = compartmentAt)]
    pub fn compartment_at_js(&self, cell: u32) -> Option<String> {
        self.inner
            .borrow()
            .engine
            .compartment_of(cell as usize)
            .map(|c| c.symbol().to_owned())
    }

    /// Events emitted since the last drain, oldest first.
    #[wasm_bindgen(js_name = drainEvents)]
    pub fn drain_events_js(&self) -> Result<JsValue, JsValue> {
        let mut host = self.inner.borrow_mut();
        let events = to_value(host.engine.observer().events()).map_err(js_error)?;
        host.engine.observer_mut().clear();
        Ok(events)
    }
}

#[wasm_bindgen]
pub fn init_grid(options: JsValue) -> Result<GridHandle, JsValue> {
    let options = if options.is_null() || options.is_undefined() {
        InitOptions::default()
    } else {
        from_value::<InitOptions>(options).map_err(js_error)?
    };
    let host = GridHost::new(options).map_err(js_error)?;
    Ok(GridHandle {
        inner: Rc::new(RefCell::new(host)),
    })
}

#[wasm_bindgen]
pub fn version() -> String {
    format!("epigrid-web {}", env!("CARGO_PKG_VERSION"))
}

#[wasm_bindgen]
pub fn default_init_options() -> Result<JsValue, JsValue> {
    to_value(&InitOptions::default()).map_err(js_error)
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsError::new(&err.to_string()).into()
}
