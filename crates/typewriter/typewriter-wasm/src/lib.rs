use js_sys::{Function, Math, Reflect};
use serde::Serialize;
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use typewriter_core::{
    AnimationHandle, AnimationRequest, AnimatorError, CharacterAnimator, Config, Context, Document,
    Engine, Host, Inputs, NodeId, Outputs, PlayerOptions, VideoError, VideoPlayer,
};

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

/// Read an optional function property from the callbacks object.
fn callback(obj: &JsValue, name: &str) -> Result<Option<Function>, JsError> {
    if jsvalue_is_undefined_or_null(obj) {
        return Ok(None);
    }
    let val = Reflect::get(obj, &JsValue::from_str(name))
        .map_err(|e| JsError::new(&format!("callbacks.{name}: {e:?}")))?;
    if jsvalue_is_undefined_or_null(&val) {
        return Ok(None);
    }
    val.dyn_into::<Function>()
        .map(Some)
        .map_err(|_| JsError::new(&format!("callbacks.{name} must be a function")))
}

fn call_bool(f: &Option<Function>, default: bool) -> bool {
    match f {
        Some(f) => f
            .call0(&JsValue::UNDEFINED)
            .map(|v| v.as_bool().unwrap_or(false))
            .unwrap_or(false),
        None => default,
    }
}

/// Accept only whole numbers that fit a `u32` handle.
fn handle_from(n: f64) -> Option<AnimationHandle> {
    if n >= 0.0 && n <= f64::from(u32::MAX) && n.fract() == 0.0 {
        Some(AnimationHandle(n as u32))
    } else {
        None
    }
}

/// Character animator backed by JS callbacks:
/// `start(request) -> number` and `destroy(handle)`.
struct JsAnimator {
    start: Option<Function>,
    destroy: Option<Function>,
    is_available: Option<Function>,
}

impl CharacterAnimator for JsAnimator {
    fn is_available(&self) -> bool {
        self.start.is_some() && call_bool(&self.is_available, true)
    }

    fn start(
        &mut self,
        _doc: &mut Document,
        request: &AnimationRequest,
    ) -> Result<AnimationHandle, AnimatorError> {
        let f = self.start.as_ref().ok_or(AnimatorError::Unavailable)?;
        let arg = swb::to_value(request).map_err(|e| AnimatorError::Rejected(e.to_string()))?;
        let val = f
            .call1(&JsValue::UNDEFINED, &arg)
            .map_err(|e| AnimatorError::Rejected(format!("{e:?}")))?;
        val.as_f64()
            .and_then(handle_from)
            .ok_or_else(|| {
                AnimatorError::Rejected("start must return an integer handle in 0..=2^32-1".into())
            })
    }

    fn destroy(&mut self, handle: AnimationHandle) -> Result<(), AnimatorError> {
        let Some(f) = &self.destroy else {
            return Ok(());
        };
        f.call1(&JsValue::UNDEFINED, &JsValue::from(handle.0))
            .map(|_| ())
            .map_err(|e| AnimatorError::Rejected(format!("{e:?}")))
    }
}

/// Layout callback `measure(nodeId) -> number`; jitter from `Math.random()`.
struct JsHost {
    measure: Option<Function>,
}

impl Host for JsHost {
    fn rendered_height(&self, _doc: &Document, node: NodeId) -> f32 {
        let Some(f) = &self.measure else {
            return 0.0;
        };
        // A throwing `measure` marks the node unmeasurable.
        match f.call1(&JsValue::UNDEFINED, &JsValue::from(node.0)) {
            Ok(v) => v
                .as_f64()
                .filter(|h| h.is_finite() && *h > 0.0)
                .map_or(0.0, |h| h as f32),
            Err(_) => f32::NAN,
        }
    }

    fn jitter(&mut self) -> f64 {
        Math::random()
    }
}

#[derive(Serialize)]
struct MountRequest<'a> {
    container: NodeId,
    options: &'a PlayerOptions,
}

/// Video player callbacks: `mountVideo({ container, options })` and an
/// optional `videoAvailable() -> bool`.
struct JsPlayer {
    mount: Option<Function>,
    is_available: Option<Function>,
}

impl VideoPlayer for JsPlayer {
    fn is_available(&self) -> bool {
        self.mount.is_some() && call_bool(&self.is_available, true)
    }

    fn mount(
        &mut self,
        _doc: &Document,
        container: NodeId,
        options: &PlayerOptions,
    ) -> Result<(), VideoError> {
        let Some(f) = &self.mount else {
            return Err(VideoError::Rejected("no mountVideo callback".into()));
        };
        let arg = swb::to_value(&MountRequest { container, options })
            .map_err(|e| VideoError::Rejected(e.to_string()))?;
        f.call1(&JsValue::UNDEFINED, &arg)
            .map(|_| ())
            .map_err(|e| VideoError::Rejected(format!("{e:?}")))
    }
}

#[wasm_bindgen]
pub struct WasmTypewriter {
    core: Engine<JsAnimator, JsHost>,
    player: JsPlayer,
}

#[wasm_bindgen]
impl WasmTypewriter {
    /// Create an engine. `config` is a JSON object (or undefined/null for
    /// defaults); `callbacks` holds `start`, `destroy`, and optionally
    /// `isAvailable`, `measure`, `mountVideo`, `videoAvailable`.
    /// Example:
    ///   new WasmTypewriter({ default_speed: 60 }, { start, destroy })
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue, callbacks: JsValue) -> Result<WasmTypewriter, JsError> {
        console_error_panic_hook::set_once();

        let cfg: Config = if jsvalue_is_undefined_or_null(&config) {
            Config::default()
        } else if let Some(raw) = config.as_string() {
            Config::from_json(&raw).map_err(|e| JsError::new(&format!("config error: {e}")))?
        } else {
            swb::from_value(config).map_err(|e| JsError::new(&format!("config error: {e}")))?
        };
        cfg.validate()
            .map_err(|e| JsError::new(&format!("config error: {e}")))?;

        let animator = JsAnimator {
            start: callback(&callbacks, "start")?,
            destroy: callback(&callbacks, "destroy")?,
            is_available: callback(&callbacks, "isAvailable")?,
        };
        let host = JsHost {
            measure: callback(&callbacks, "measure")?,
        };
        let player = JsPlayer {
            mount: callback(&callbacks, "mountVideo")?,
            is_available: callback(&callbacks, "videoAvailable")?,
        };

        Ok(WasmTypewriter {
            core: Engine::new(cfg, Context::default(), animator, host),
            player,
        })
    }

    /// Parse markup into the document body. Returns the new top-level node ids.
    #[wasm_bindgen(js_name = load_markup)]
    pub fn load_markup(&mut self, markup: &str) -> Result<Vec<u32>, JsError> {
        let body = self.core.document().body();
        let nodes = self
            .core
            .document_mut()
            .parse_fragment(body, markup)
            .map_err(|e| JsError::new(&format!("load_markup error: {e}")))?;
        Ok(nodes.into_iter().map(|n| n.0).collect())
    }

    pub fn body(&self) -> u32 {
        self.core.document().body().0
    }

    #[wasm_bindgen(js_name = inner_html)]
    pub fn inner_html(&self, node: u32) -> String {
        self.core.document().inner_html(NodeId(node))
    }

    #[wasm_bindgen(js_name = outer_html)]
    pub fn outer_html(&self, node: u32) -> String {
        self.core.document().outer_html(NodeId(node))
    }

    #[wasm_bindgen(js_name = set_suppressed)]
    pub fn set_suppressed(&mut self, suppressed: bool) {
        self.core.context_mut().suppressed = suppressed;
    }

    /// Inject the stylesheet and register sections. Returns Outputs.
    pub fn start(&mut self) -> Result<JsValue, JsError> {
        to_js(self.core.start())
    }

    #[wasm_bindgen(js_name = start_section)]
    pub fn start_section(&mut self, node: u32) -> Result<JsValue, JsError> {
        to_js(self.core.start_section(NodeId(node)))
    }

    /// Step the engine by dt (milliseconds) with an Inputs object. Returns Outputs.
    pub fn update(&mut self, dt: f64, inputs: JsValue) -> Result<JsValue, JsError> {
        let inputs: Inputs = if jsvalue_is_undefined_or_null(&inputs) {
            Inputs::default()
        } else {
            swb::from_value(inputs).map_err(|e| JsError::new(&format!("inputs error: {e}")))?
        };
        if !self.core.pending_video_embeds().is_empty() {
            self.core.retry_video_embeds(&mut self.player);
        }
        to_js(self.core.update(millis(dt), inputs))
    }

    /// Same as `update` with JSON strings in and out.
    #[wasm_bindgen(js_name = update_json)]
    pub fn update_json(&mut self, dt: f64, inputs_json: &str) -> Result<String, JsError> {
        let inputs: Inputs = if inputs_json.trim().is_empty() {
            Inputs::default()
        } else {
            serde_json::from_str(inputs_json)
                .map_err(|e| JsError::new(&format!("inputs error: {e}")))?
        };
        let out: &Outputs = self.core.update(millis(dt), inputs);
        serde_json::to_string(out).map_err(|e| JsError::new(&format!("outputs error: {e}")))
    }

    pub fn teardown(&mut self) -> Result<JsValue, JsError> {
        to_js(self.core.teardown())
    }

    /// Replace `iframe[data-vimeo-id]` embeds. Returns the new container ids.
    #[wasm_bindgen(js_name = upgrade_video_embeds)]
    pub fn upgrade_video_embeds(&mut self) -> Result<Vec<u32>, JsError> {
        let created = self
            .core
            .upgrade_video_embeds(&mut self.player)
            .map_err(|e| JsError::new(&format!("video embed error: {e}")))?;
        Ok(created.into_iter().map(|n| n.0).collect())
    }

    #[wasm_bindgen(js_name = registry_len)]
    pub fn registry_len(&self) -> u32 {
        self.core.driver().registry().len() as u32
    }
}

fn millis(dt: f64) -> u64 {
    if dt.is_finite() && dt > 0.0 {
        dt.round() as u64
    } else {
        0
    }
}

fn to_js(out: &Outputs) -> Result<JsValue, JsError> {
    swb::to_value(out).map_err(|e| JsError::new(&format!("outputs error: {e}")))
}

/// Numeric ABI version for compatibility checks at init.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    1
}
