//! Outbox of map-surface commands.
//!
//! DESIGN
//! ======
//! Pins and overlay views are drawn by an external map renderer that the
//! engine treats as opaque. The engine never calls into it directly; each
//! mutation appends the commands needed to bring the rendered map in line
//! with the session state, and the renderer drains them in order. Order
//! matters: a pin evicted from a key is always detached before its
//! replacement is attached.

use crate::geo::{CoordinateKey, LatLng};

/// Which of a marker's two overlay views a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// Expanded view: topic, main comment, and vote controls.
    Info,
    /// Collapsed view: topic only.
    Preview,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    AttachPin { key: CoordinateKey, position: LatLng, icon: &'static str },
    DetachPin { key: CoordinateKey },
    SetPinVisible { key: CoordinateKey, visible: bool },
    OpenView { key: CoordinateKey, view: ViewKind },
    CloseView { key: CoordinateKey, view: ViewKind },
    /// Remove both overlay views of a marker from the map.
    DetachViews { key: CoordinateKey },
    PanTo(LatLng),
    SetZoom(u8),
    SetDropRadiusVisible(bool),
}

#[derive(Debug, Default)]
pub struct Surface {
    ops: Vec<SurfaceOp>,
}

impl Surface {
    pub fn push(&mut self, op: SurfaceOp) {
        self.ops.push(op);
    }

    /// Take every pending command, oldest first.
    pub fn drain(&mut self) -> Vec<SurfaceOp> {
        std::mem::take(&mut self.ops)
    }

    #[must_use]
    pub fn pending(&self) -> &[SurfaceOp] {
        &self.ops
    }
}
