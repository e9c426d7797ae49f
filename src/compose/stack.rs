use std::sync::Arc;

use crate::assets::decode::DecodedImage;
use crate::compose::transform::{DecalTransform, TransformPatch};

/// One user-placed decal: a shared decoded image and its placement.
#[derive(Clone, Debug)]
pub struct Layer {
    /// Decoded pixels, shared between duplicates.
    pub image: Arc<DecodedImage>,
    /// Placement in normalized surface space.
    pub transform: DecalTransform,
}

impl Layer {
    /// Build a layer; the transform's scale is clamped.
    pub fn new(image: Arc<DecodedImage>, transform: DecalTransform) -> Self {
        Self {
            image,
            transform: transform.clamped(),
        }
    }
}

/// Ordered decal layers plus the active (selected) index.
///
/// Paint order is list order. The active index is `None` exactly when the stack is empty and is
/// always in bounds otherwise. Index arguments outside the stack are ignored rather than
/// reported.
#[derive(Clone, Debug, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
    active: Option<usize>,
}

impl LayerStack {
    /// Empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Return `true` when there are no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers in paint order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Layer at `index`.
    pub fn get(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    /// Index of the active layer.
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// The active layer.
    pub fn active(&self) -> Option<&Layer> {
        self.active.and_then(|i| self.layers.get(i))
    }

    fn active_mut(&mut self) -> Option<&mut Layer> {
        self.active.and_then(|i| self.layers.get_mut(i))
    }

    /// Append a layer and make it active. Returns its index.
    pub fn add_layer(&mut self, image: Arc<DecodedImage>, transform: DecalTransform) -> usize {
        self.layers.push(Layer::new(image, transform));
        let index = self.layers.len() - 1;
        self.active = Some(index);
        tracing::debug!(index, len = self.layers.len(), "layer added");
        index
    }

    /// Copy the active layer, shifted by `(offset, offset)`, onto the top of the stack and make
    /// the copy active. The image is shared, not copied.
    pub fn duplicate_active(&mut self, offset: f64) -> Option<usize> {
        let src = self.active()?;
        let image = Arc::clone(&src.image);
        let transform = src.transform.offset(offset, offset);
        Some(self.add_layer(image, transform))
    }

    /// Remove the layer at `index`.
    ///
    /// Removing the active layer activates index 0 if any layers remain. Removing a layer
    /// below the active one shifts the active index down so it keeps naming the same layer.
    pub fn remove_layer(&mut self, index: usize) -> Option<Layer> {
        if index >= self.layers.len() {
            return None;
        }
        let removed = self.layers.remove(index);
        self.active = match self.active {
            _ if self.layers.is_empty() => None,
            Some(a) if a == index => Some(0),
            Some(a) if a > index => Some(a - 1),
            other => other,
        };
        tracing::debug!(index, active = ?self.active, len = self.layers.len(), "layer removed");
        Some(removed)
    }

    /// Select `index` if it is in bounds. Returns whether anything changed.
    pub fn set_active(&mut self, index: usize) -> bool {
        if index >= self.layers.len() || self.active == Some(index) {
            return false;
        }
        self.active = Some(index);
        true
    }

    /// Merge `patch` into the active layer's transform. Returns whether a layer was updated.
    pub fn update_active_transform(&mut self, patch: &TransformPatch) -> bool {
        let Some(layer) = self.active_mut() else {
            return false;
        };
        layer.transform = layer.transform.merge(patch);
        true
    }

    /// Replace the active layer's transform wholesale (scale is clamped).
    pub fn set_active_transform(&mut self, transform: DecalTransform) -> bool {
        self.update_active_transform(&TransformPatch::all(transform))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/stack.rs"]
mod tests;
