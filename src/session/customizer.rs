use std::sync::Arc;

use crate::assets::decode::{DecodedImage, Upload, decode_upload};
use crate::compose::compositor::{Compositor, Pass};
use crate::compose::stack::LayerStack;
use crate::compose::transform::{DecalTransform, TransformPatch, clamp_scale};
use crate::foundation::core::{Bitmap, Point, Rgb8, SurfaceSize};
use crate::foundation::error::{DecalError, DecalResult};
use crate::render::cpu::CpuSurface;
use crate::session::opts::CustomizerOpts;
use crate::sink::texture::{TextureSink, TextureUpdate};

/// What a pointer drag on the preview does to the active layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GestureMode {
    /// Drag translates the layer.
    #[default]
    Move,
    /// Drag grows or shrinks the layer.
    Scale,
    /// Drag spins the layer.
    Rotate,
}

/// Placement of the preview surface inside its container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviewLayout {
    /// Preview surface size in pixels; same aspect ratio as the template.
    pub size: SurfaceSize,
    /// Horizontal offset of the surface inside the container.
    pub offset_x: f64,
    /// Vertical offset of the surface inside the container.
    pub offset_y: f64,
}

impl PreviewLayout {
    /// Largest template-shaped box that fits `container_w x container_h`, centered.
    pub fn fit(template: SurfaceSize, container_w: f64, container_h: f64) -> DecalResult<Self> {
        if !(container_w.is_finite() && container_h.is_finite())
            || container_w <= 0.0
            || container_h <= 0.0
        {
            return Err(DecalError::validation(format!(
                "preview container must be positive, got {container_w}x{container_h}"
            )));
        }
        let aspect = template.w() / template.h();
        let (w, h) = if container_w / container_h > aspect {
            (container_h * aspect, container_h)
        } else {
            (container_w, container_w / aspect)
        };
        let size = SurfaceSize::new((w.floor() as u32).max(1), (h.floor() as u32).max(1))?;
        Ok(Self {
            size,
            offset_x: (container_w - w) / 2.0,
            offset_y: (container_h - h) / 2.0,
        })
    }
}

/// An editor session: the layer compositor plus everything around it that UI events touch.
///
/// Every call that changes what the garment shows re-renders the preview (once a template is
/// loaded) and the texture (once the model is ready too), then binds the texture to the sink
/// before returning. Calls that change nothing render nothing, and a call whose render or bind
/// fails restores the state it started from.
pub struct Customizer<S: TextureSink> {
    compositor: Compositor,
    opts: CustomizerOpts,
    template: Option<Arc<DecodedImage>>,
    model_ready: bool,
    layout: Option<PreviewLayout>,
    mode: GestureMode,
    drag_from: Option<Point>,
    preview_surface: Option<CpuSurface>,
    texture_surface: Option<CpuSurface>,
    last_preview: Option<Arc<Bitmap>>,
    last_texture: Option<Arc<Bitmap>>,
    revision: u64,
    sink: S,
}

impl<S: TextureSink> Customizer<S> {
    /// New session with no template, no layers and the model not yet loaded.
    pub fn new(opts: CustomizerOpts, sink: S) -> Self {
        let compositor = Compositor::new(opts.default_fill, opts.highlight)
            .with_duplicate_offset(opts.duplicate_offset);
        Self {
            compositor,
            opts,
            template: None,
            model_ready: false,
            layout: None,
            mode: GestureMode::default(),
            drag_from: None,
            preview_surface: None,
            texture_surface: None,
            last_preview: None,
            last_texture: None,
            revision: 0,
            sink,
        }
    }

    /// The layer stack.
    pub fn layers(&self) -> &LayerStack {
        self.compositor.stack()
    }

    /// The underlying compositor.
    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Options this session was built with.
    pub fn opts(&self) -> &CustomizerOpts {
        &self.opts
    }

    /// Current fill color.
    pub fn fill(&self) -> Rgb8 {
        self.compositor.fill_color()
    }

    /// The reference template, once loaded.
    pub fn template(&self) -> Option<&Arc<DecodedImage>> {
        self.template.as_ref()
    }

    /// Return `true` once [`Customizer::mark_model_ready`] was called.
    pub fn is_model_ready(&self) -> bool {
        self.model_ready
    }

    /// Current gesture mode.
    pub fn mode(&self) -> GestureMode {
        self.mode
    }

    /// Last computed preview layout.
    pub fn preview_layout(&self) -> Option<PreviewLayout> {
        self.layout
    }

    /// Size the preview renders at: the laid-out size, else the template size.
    pub fn preview_size(&self) -> Option<SurfaceSize> {
        self.layout
            .map(|l| l.size)
            .or_else(|| self.template.as_ref().map(|t| t.size()))
    }

    /// Most recent preview render.
    pub fn last_preview(&self) -> Option<&Arc<Bitmap>> {
        self.last_preview.as_ref()
    }

    /// Most recent texture render.
    pub fn last_texture(&self) -> Option<&Arc<Bitmap>> {
        self.last_texture.as_ref()
    }

    /// Number of textures rendered and bound so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The texture sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the texture sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// End the session, returning the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Set the reference template; its size becomes the texture size.
    pub fn load_template(&mut self, template: Arc<DecodedImage>) -> DecalResult<()> {
        let saved = self.checkpoint();
        if let Some(layout) = self.layout {
            // Keep the container, re-fit to the new aspect ratio.
            let cw = layout.size.w() + 2.0 * layout.offset_x;
            let ch = layout.size.h() + 2.0 * layout.offset_y;
            self.layout = Some(PreviewLayout::fit(template.size(), cw, ch)?);
        }
        tracing::debug!(
            width = template.width,
            height = template.height,
            "template loaded"
        );
        self.template = Some(template);
        self.refresh_or_restore(saved)
    }

    /// Record that the garment model finished loading. Uploads are accepted from now on.
    pub fn mark_model_ready(&mut self) -> DecalResult<()> {
        if self.model_ready {
            return Ok(());
        }
        let saved = self.checkpoint();
        self.model_ready = true;
        self.refresh_or_restore(saved)
    }

    /// Validate, decode and append an uploaded image as a new active layer.
    ///
    /// On error the session is unchanged.
    pub fn upload(&mut self, upload: &Upload) -> DecalResult<usize> {
        if !upload.is_image() {
            tracing::warn!(name = %upload.name, mime = %upload.mime, "rejected non-image upload");
            return Err(DecalError::invalid_input(format!(
                "'{}' is not an image file ({})",
                upload.name, upload.mime
            )));
        }
        if !self.model_ready || self.template.is_none() {
            tracing::warn!(name = %upload.name, "rejected upload before model/template load");
            return Err(DecalError::missing_prerequisite(
                "wait for the garment model and UV template to load before uploading",
            ));
        }
        let image = decode_upload(upload).inspect_err(|e| {
            tracing::warn!(name = %upload.name, error = %e, "failed to decode upload");
        })?;
        let saved = self.checkpoint();
        let index = self
            .compositor
            .add_layer(Arc::new(image), DecalTransform::default());
        self.refresh_or_restore(saved)?;
        Ok(index)
    }

    /// Duplicate the active layer. Returns the new layer's index.
    pub fn duplicate(&mut self) -> DecalResult<Option<usize>> {
        let saved = self.checkpoint();
        let index = self.compositor.duplicate_active();
        if index.is_some() {
            self.refresh_or_restore(saved)?;
        }
        Ok(index)
    }

    /// Remove layer `index`. Returns whether a layer was removed.
    pub fn remove(&mut self, index: usize) -> DecalResult<bool> {
        let saved = self.checkpoint();
        if self.compositor.remove_layer(index).is_none() {
            return Ok(false);
        }
        if self.compositor.stack().is_empty() {
            self.drag_from = None;
        }
        self.refresh_or_restore(saved)?;
        Ok(true)
    }

    /// Make layer `index` active. Returns whether the selection changed.
    pub fn select(&mut self, index: usize) -> DecalResult<bool> {
        let saved = self.checkpoint();
        if !self.compositor.set_active(index) {
            return Ok(false);
        }
        self.refresh_or_restore(saved)?;
        Ok(true)
    }

    /// Apply slider input to the active layer. Returns whether its transform changed.
    pub fn apply_patch(&mut self, patch: &TransformPatch) -> DecalResult<bool> {
        let Some(before) = self.compositor.stack().active().map(|l| l.transform) else {
            return Ok(false);
        };
        if before.merge(patch) == before {
            return Ok(false);
        }
        let saved = self.checkpoint();
        self.compositor.update_active_transform(patch);
        self.refresh_or_restore(saved)?;
        Ok(true)
    }

    /// Change the garment fill color. Returns whether it changed.
    pub fn set_fill(&mut self, color: Rgb8) -> DecalResult<bool> {
        let saved = self.checkpoint();
        if !self.compositor.set_fill_color(color) {
            return Ok(false);
        }
        self.refresh_or_restore(saved)?;
        Ok(true)
    }

    /// Change the garment fill color from `#rrggbb` text.
    pub fn set_fill_hex(&mut self, hex: &str) -> DecalResult<bool> {
        let color: Rgb8 = hex.parse()?;
        self.set_fill(color)
    }

    /// Choose what subsequent drags do.
    pub fn set_mode(&mut self, mode: GestureMode) {
        self.mode = mode;
    }

    /// Start a drag at `p` (preview pixels). Ignored, returning `false`, when there are no
    /// layers.
    pub fn pointer_down(&mut self, p: Point) -> bool {
        if self.compositor.stack().is_empty() {
            return false;
        }
        self.drag_from = Some(p);
        true
    }

    /// Continue a drag. Pointer travel is normalized by the preview size and applied to the
    /// active layer according to the gesture mode. Returns whether the layer changed.
    pub fn pointer_move(&mut self, p: Point) -> DecalResult<bool> {
        let Some(from) = self.drag_from else {
            return Ok(false);
        };
        let Some(t) = self.compositor.stack().active().map(|l| l.transform) else {
            return Ok(false);
        };
        let Some(size) = self.preview_size() else {
            return Ok(false);
        };
        let dx = (p.x - from.x) / size.w();
        let dy = (p.y - from.y) / size.h();
        let drag = self.opts.drag;
        let patch = match self.mode {
            GestureMode::Move => TransformPatch {
                x: Some(t.x + dx),
                y: Some(t.y + dy),
                ..TransformPatch::default()
            },
            GestureMode::Scale => TransformPatch {
                scale: Some(clamp_scale(t.scale + (dx + dy) * drag.scale_gain)),
                ..TransformPatch::default()
            },
            GestureMode::Rotate => TransformPatch {
                rotation: Some(t.rotation + (dx + dy) * drag.rotate_gain_deg),
                ..TransformPatch::default()
            },
        };
        let changed = self.apply_patch(&patch)?;
        self.drag_from = Some(p);
        Ok(changed)
    }

    /// End the drag.
    pub fn pointer_up(&mut self) {
        self.drag_from = None;
    }

    /// Fit the preview into a `container_w x container_h` box and re-render it at the new size.
    pub fn resize_preview(
        &mut self,
        container_w: f64,
        container_h: f64,
    ) -> DecalResult<PreviewLayout> {
        let template = self.template.clone().ok_or_else(|| {
            DecalError::missing_prerequisite("load a UV template before sizing the preview")
        })?;
        let layout = PreviewLayout::fit(template.size(), container_w, container_h)?;
        if self.layout == Some(layout) {
            return Ok(layout);
        }
        let saved = self.checkpoint();
        self.layout = Some(layout);
        if let Err(e) = self.render_preview(&template) {
            self.restore(saved);
            return Err(e);
        }
        Ok(layout)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            compositor: self.compositor.clone(),
            template: self.template.clone(),
            model_ready: self.model_ready,
            layout: self.layout,
            drag_from: self.drag_from,
            last_preview: self.last_preview.clone(),
            last_texture: self.last_texture.clone(),
            revision: self.revision,
        }
    }

    fn restore(&mut self, saved: Checkpoint) {
        self.compositor = saved.compositor;
        self.template = saved.template;
        self.model_ready = saved.model_ready;
        self.layout = saved.layout;
        self.drag_from = saved.drag_from;
        self.last_preview = saved.last_preview;
        self.last_texture = saved.last_texture;
        self.revision = saved.revision;
    }

    /// Re-render after a mutation; on failure roll back to `saved` and return the error.
    fn refresh_or_restore(&mut self, saved: Checkpoint) -> DecalResult<()> {
        if let Err(e) = self.refresh() {
            tracing::warn!(error = %e, "render failed, restoring previous state");
            self.restore(saved);
            return Err(e);
        }
        Ok(())
    }

    fn refresh(&mut self) -> DecalResult<()> {
        let Some(template) = self.template.clone() else {
            return Ok(());
        };
        self.render_preview(&template)?;
        if self.model_ready {
            self.render_texture(&template)?;
        }
        Ok(())
    }

    fn render_preview(&mut self, template: &Arc<DecodedImage>) -> DecalResult<()> {
        let size = self.preview_size().unwrap_or_else(|| template.size());
        let surface = reuse_surface(&mut self.preview_surface, size)?;
        let mut live = self.compositor.live_image_ids();
        live.push(template.id());
        surface.retain_images(live);

        let pass = Pass::Preview {
            template,
            highlight: self.compositor.stack().active_index(),
        };
        let preview = self.compositor.render(surface, pass)?;
        self.last_preview = Some(Arc::new(preview));
        Ok(())
    }

    fn render_texture(&mut self, template: &Arc<DecodedImage>) -> DecalResult<()> {
        let surface = reuse_surface(&mut self.texture_surface, template.size())?;
        surface.retain_images(self.compositor.live_image_ids());

        let texture = Arc::new(self.compositor.render(surface, Pass::Texture)?);
        self.revision += 1;
        self.sink.bind(TextureUpdate {
            texture: Arc::clone(&texture),
            fill: self.compositor.fill_color(),
            revision: self.revision,
        })?;
        self.last_texture = Some(texture);
        Ok(())
    }
}

/// Session state a failed render rolls back to. Layers and images are shared `Arc`s, so taking
/// one is cheap.
struct Checkpoint {
    compositor: Compositor,
    template: Option<Arc<DecodedImage>>,
    model_ready: bool,
    layout: Option<PreviewLayout>,
    drag_from: Option<Point>,
    last_preview: Option<Arc<Bitmap>>,
    last_texture: Option<Arc<Bitmap>>,
    revision: u64,
}

// A failed resize keeps the cached surface and its image paints.
fn reuse_surface(
    slot: &mut Option<CpuSurface>,
    size: SurfaceSize,
) -> DecalResult<&mut CpuSurface> {
    match slot {
        Some(surface) => {
            surface.resize(size)?;
            Ok(surface)
        }
        None => Ok(slot.insert(CpuSurface::new(size)?)),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/customizer.rs"]
mod tests;
