use log::debug;
use uuid::Uuid;

use crate::error::RestageError;
use crate::models::{GhostCause, GhostMarker, OverlayObject};

/// Identifies one loaded base image. Bumped on every [`OverlayStore::reset`]
/// so detection runs started against an older image can be recognized and
/// discarded when they finally complete.
pub type Generation = u64;

/// The editable scene state: live overlay objects plus the ghost markers
/// left behind where objects used to be.
///
/// Lookup is linear over the object sequence; scenes hold tens of objects.
#[derive(Default)]
pub struct OverlayStore {
    generation: Generation,
    objects: Vec<OverlayObject>,
    markers: Vec<GhostMarker>,
}

impl OverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Objects in insertion order (also the render order).
    pub fn objects(&self) -> &[OverlayObject] {
        &self.objects
    }

    /// Markers in insertion order (also the render order).
    pub fn markers(&self) -> &[GhostMarker] {
        &self.markers
    }

    pub fn object(&self, id: Uuid) -> Option<&OverlayObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Clear the scene for a new base image and return the new generation.
    pub fn reset(&mut self) -> Generation {
        self.objects.clear();
        self.markers.clear();
        self.generation += 1;
        self.generation
    }

    /// Replace the scene wholesale with a completed extraction batch.
    ///
    /// Returns `false` and leaves the store untouched when the batch was
    /// produced against an older image generation.
    pub fn populate(&mut self, generation: Generation, objects: Vec<OverlayObject>) -> bool {
        if generation != self.generation {
            debug!(
                "discarding stale detection batch (generation {generation}, current {})",
                self.generation
            );
            return false;
        }
        self.objects = objects;
        self.markers.clear();
        true
    }

    /// Move an object to a new position. The first time an object is
    /// displaced, a Relocated marker is left at its original coordinates;
    /// later moves keep that single marker.
    pub fn move_object(&mut self, id: Uuid, new_x: f32, new_y: f32) -> Result<(), RestageError> {
        let has_removed_marker = self
            .markers
            .iter()
            .any(|m| m.id == id && m.cause == GhostCause::Removed);
        let Some(object) = self.objects.iter_mut().find(|o| o.id == id) else {
            return Err(RestageError::InvalidObjectReference(id));
        };
        if has_removed_marker {
            // A live object shadowed by a Removed marker means the
            // object/marker bookkeeping is broken.
            debug_assert!(false, "object {id} coexists with a Removed marker");
            return Err(RestageError::InvalidObjectReference(id));
        }
        object.x = new_x;
        object.y = new_y;
        if !self.markers.iter().any(|m| m.id == id) {
            self.markers.push(GhostMarker {
                id,
                x: object.original_x,
                y: object.original_y,
                width: object.width,
                height: object.height,
                cause: GhostCause::Relocated,
            });
        }
        Ok(())
    }

    /// Delete an object. Any existing marker for it is replaced by a Removed
    /// marker anchored at the object's original coordinates, not wherever it
    /// was last dragged. Deleting an id twice is an error.
    pub fn delete_object(&mut self, id: Uuid) -> Result<(), RestageError> {
        let Some(index) = self.objects.iter().position(|o| o.id == id) else {
            return Err(RestageError::InvalidObjectReference(id));
        };
        let object = self.objects.remove(index);
        self.markers.retain(|m| m.id != id);
        self.markers.push(GhostMarker {
            id,
            x: object.original_x,
            y: object.original_y,
            width: object.width,
            height: object.height,
            cause: GhostCause::Removed,
        });
        Ok(())
    }
}
