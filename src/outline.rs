//! Access glyph outlines.
//!
//! This module is used to access the outlines of glyphs as a series of foundational drawing
//! instruction callbacks on implementors of the `OutlineSink` trait. Outlines are produced by
//! interpreting Type 1 and Type 2 charstrings, either from a CFF font or from a set of Type 1
//! charstrings.
//!
//! ### Example
//!
//! ```
//! use std::fmt::Write;
//!
//! use fontprogram::charstring::{interpret, CharStringContext, Format, InterpreterOptions};
//! use fontprogram::outline::OutlineSink;
//! use fontprogram::pathfinder_geometry::line_segment::LineSegment2F;
//! use fontprogram::pathfinder_geometry::vector::Vector2F;
//!
//! struct DebugSink {
//!     outlines: String,
//! }
//!
//! impl OutlineSink for DebugSink {
//!     fn move_to(&mut self, to: Vector2F) {
//!         writeln!(&mut self.outlines, "move_to({}, {})", to.x(), to.y()).unwrap();
//!     }
//!
//!     fn line_to(&mut self, to: Vector2F) {
//!         writeln!(&mut self.outlines, "line_to({}, {})", to.x(), to.y()).unwrap();
//!     }
//!
//!     fn quadratic_curve_to(&mut self, _control: Vector2F, _to: Vector2F) {}
//!
//!     fn cubic_curve_to(&mut self, control: LineSegment2F, to: Vector2F) {
//!         writeln!(
//!             &mut self.outlines,
//!             "curve_to({}, {}, {}, {}, {}, {})",
//!             control.from_x(),
//!             control.from_y(),
//!             control.to_x(),
//!             control.to_y(),
//!             to.x(),
//!             to.y()
//!         )
//!         .unwrap();
//!     }
//!
//!     fn close(&mut self) {
//!         writeln!(&mut self.outlines, "close()").unwrap();
//!     }
//! }
//!
//! // 10 20 rmoveto 30 0 rlineto endchar
//! let program = [149, 159, 21, 169, 139, 5, 14];
//! let context = CharStringContext::new(Format::Type2);
//! let mut sink = DebugSink { outlines: String::new() };
//! let glyph = interpret(&program, &context, &InterpreterOptions::default(), &mut sink).unwrap();
//!
//! assert_eq!(sink.outlines, "move_to(10, 20)\nline_to(40, 20)\nclose()\n");
//! assert_eq!(glyph.bbox.x_max, 40.0);
//! ```

use std::fmt;

use pathfinder_geometry::line_segment::LineSegment2F;
use pathfinder_geometry::rect::RectF;
use pathfinder_geometry::vector::{vec2f, Vector2F};

use crate::charstring::{GlyphResult, InterpreterOptions};

/// Trait for visiting a glyph outline and delivering drawing commands to an `OutlineSink`.
pub trait OutlineBuilder {
    type Error: std::error::Error;

    /// The number of glyphs that can be visited.
    fn num_glyphs(&self) -> usize;

    /// Visit the outline of `glyph_index`, returning its metrics.
    fn visit<S: OutlineSink>(
        &mut self,
        glyph_index: u16,
        options: &InterpreterOptions,
        sink: &mut S,
    ) -> Result<GlyphResult, Self::Error>;
}

// `OutlineSink` is from font-kit, font-kit/src/outline.rs:
//
// Copyright © 2020 The Pathfinder Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// A trait for visiting a glyph outline
pub trait OutlineSink {
    /// Moves the pen to a point.
    fn move_to(&mut self, to: Vector2F);
    /// Draws a line to a point.
    fn line_to(&mut self, to: Vector2F);
    /// Draws a quadratic Bézier curve to a point.
    fn quadratic_curve_to(&mut self, ctrl: Vector2F, to: Vector2F);
    /// Draws a cubic Bézier curve to a point.
    fn cubic_curve_to(&mut self, ctrl: LineSegment2F, to: Vector2F);
    /// Closes the path, returning to the first point in it.
    fn close(&mut self);
}

/// An `OutlineSink` that discards everything, for when only metrics are wanted.
pub struct NullSink;

impl OutlineSink for NullSink {
    fn move_to(&mut self, _to: Vector2F) {}

    fn line_to(&mut self, _to: Vector2F) {}

    fn quadratic_curve_to(&mut self, _ctrl: Vector2F, _to: Vector2F) {}

    fn cubic_curve_to(&mut self, _ctrl: LineSegment2F, _to: Vector2F) {}

    fn close(&mut self) {}
}

/// Glyph space bounding box.
///
/// A new box is empty: its minimums are `f64::MAX` and its maximums `f64::MIN` until a
/// point is added.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

/// What to do with a bounding box that has no area.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DegenerateBBox {
    /// Replace the box with `BBox::zero()`.
    #[default]
    Zero,
    /// Keep the accumulated box. An empty box still becomes `BBox::zero()`.
    Keep,
}

impl BBox {
    pub fn empty() -> Self {
        BBox {
            x_min: f64::MAX,
            y_min: f64::MAX,
            x_max: f64::MIN,
            y_max: f64::MIN,
        }
    }

    pub fn zero() -> Self {
        BBox {
            x_min: 0.0,
            y_min: 0.0,
            x_max: 0.0,
            y_max: 0.0,
        }
    }

    /// Returns true if no point has been added.
    pub fn is_empty(&self) -> bool {
        self.x_min > self.x_max || self.y_min > self.y_max
    }

    /// Returns true if the box has no area on at least one axis.
    pub fn is_degenerate(&self) -> bool {
        self.x_min >= self.x_max || self.y_min >= self.y_max
    }

    pub fn extend_by(&mut self, x: f64, y: f64) {
        self.x_min = self.x_min.min(x);
        self.y_min = self.y_min.min(y);
        self.x_max = self.x_max.max(x);
        self.y_max = self.y_max.max(y);
    }

    /// Grow this box to cover `other`.
    pub fn union(&mut self, other: &BBox) {
        if !other.is_empty() {
            self.extend_by(other.x_min, other.y_min);
            self.extend_by(other.x_max, other.y_max);
        }
    }

    /// Apply `policy` to an accumulated box.
    pub fn normalize(self, policy: DegenerateBBox) -> BBox {
        if self.is_empty() {
            return BBox::zero();
        }
        match policy {
            DegenerateBBox::Zero if self.is_degenerate() => BBox::zero(),
            DegenerateBBox::Zero | DegenerateBBox::Keep => self,
        }
    }

    pub fn to_rect(&self) -> RectF {
        if self.is_empty() {
            return RectF::default();
        }
        RectF::from_points(
            vec2f(self.x_min as f32, self.y_min as f32),
            vec2f(self.x_max as f32, self.y_max as f32),
        )
    }
}

impl Default for BBox {
    fn default() -> Self {
        BBox::empty()
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "[empty]")
        } else {
            write!(
                f,
                "[{} {} {} {}]",
                self.x_min, self.y_min, self.x_max, self.y_max
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bbox() {
        let bbox = BBox::empty();
        assert!(bbox.is_empty());
        assert!(bbox.is_degenerate());
        assert_eq!(bbox.normalize(DegenerateBBox::Keep), BBox::zero());
    }

    #[test]
    fn degenerate_bbox_policy() {
        let mut bbox = BBox::empty();
        bbox.extend_by(10.0, 5.0);
        bbox.extend_by(10.0, 50.0);
        assert!(!bbox.is_empty());
        assert!(bbox.is_degenerate());
        assert_eq!(bbox.normalize(DegenerateBBox::Zero), BBox::zero());
        assert_eq!(bbox.normalize(DegenerateBBox::Keep).y_max, 50.0);
    }

    #[test]
    fn union() {
        let mut a = BBox::empty();
        a.extend_by(0.0, 0.0);
        a.extend_by(10.0, 10.0);
        let mut b = BBox::empty();
        b.extend_by(-5.0, 2.0);
        b.extend_by(3.0, 20.0);
        a.union(&b);
        a.union(&BBox::empty());
        assert_eq!(
            a,
            BBox {
                x_min: -5.0,
                y_min: 0.0,
                x_max: 10.0,
                y_max: 20.0
            }
        );
    }
}
