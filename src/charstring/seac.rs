//! Composite glyphs.
//!
//! A Type 1 `seac` (or Type 2 `endchar` with four operands) draws a glyph as a base character
//! with an accent character placed on top of it. The two component programs are merged into a
//! single program so the composite can be written out as an ordinary glyph.

use crate::outline::OutlineSink;

use super::program::{self, Instruction};
use super::{GlyphResult, InterpreterOptions};

/// Merge the programs of a base and an accent glyph into one program.
///
/// Hints are dropped from both inputs, and each is cut at its first `EndChar`. The accent is
/// moved so its origin lands at `(dx, dy)` relative to the base origin. A missing component is
/// treated as an empty program.
pub fn merge_seac(
    base: Option<&[Instruction]>,
    accent: Option<&[Instruction]>,
    dx: f64,
    dy: f64,
) -> Vec<Instruction> {
    let base = program::until_end(base.unwrap_or_default());
    let accent = program::until_end(accent.unwrap_or_default());

    let mut merged = Vec::with_capacity(base.len() + accent.len() + 2);
    merged.extend(base.iter().filter(|i| !i.is_hint()).cloned());

    let (pen_x, pen_y) = program::pen_position(base);
    merged.push(Instruction::MoveTo(dx - pen_x, dy - pen_y));

    merged.extend(accent.iter().filter(|i| !i.is_hint()).cloned());
    merged.push(Instruction::EndChar);
    merged
}

/// Replace the outline of a seac glyph with its merged components.
///
/// The merged path is drawn into `sink` and the bounding box recomputed from it. The width
/// and seac reference of `glyph` are kept.
pub fn compose<S: OutlineSink>(
    glyph: GlyphResult,
    base: Option<&[Instruction]>,
    accent: Option<&[Instruction]>,
    options: &InterpreterOptions,
    sink: &mut S,
) -> GlyphResult {
    let (dx, dy) = glyph.seac.map_or((0.0, 0.0), |seac| (seac.dx, seac.dy));
    let merged = merge_seac(base, accent, dx, dy);
    let bbox = program::replay(&merged, sink).normalize(options.degenerate_bbox);
    GlyphResult {
        bbox,
        program: options.build_program.then_some(merged),
        ..glyph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::charstring::program::Stem;
    use crate::charstring::Seac;
    use crate::outline::{BBox, NullSink};

    fn square(size: f64) -> Vec<Instruction> {
        vec![
            Instruction::HStem(vec![Stem {
                edge: 0.0,
                width: size,
            }]),
            Instruction::MoveTo(0.0, 0.0),
            Instruction::LineTo(size, 0.0),
            Instruction::LineTo(0.0, size),
            Instruction::LineTo(-size, 0.0),
            Instruction::EndChar,
            // Never reached.
            Instruction::LineTo(1000.0, 1000.0),
        ]
    }

    #[test]
    fn merge_strips_hints_and_offsets_accent() {
        let base = square(100.0);
        let accent = square(10.0);
        let merged = merge_seac(Some(&base[..]), Some(&accent[..]), 45.0, 200.0);
        assert_eq!(
            merged,
            vec![
                Instruction::MoveTo(0.0, 0.0),
                Instruction::LineTo(100.0, 0.0),
                Instruction::LineTo(0.0, 100.0),
                Instruction::LineTo(-100.0, 0.0),
                // The base pen ends at (0, 100).
                Instruction::MoveTo(45.0, 100.0),
                Instruction::MoveTo(0.0, 0.0),
                Instruction::LineTo(10.0, 0.0),
                Instruction::LineTo(0.0, 10.0),
                Instruction::LineTo(-10.0, 0.0),
                Instruction::EndChar,
            ]
        );
        assert_eq!(
            program::bbox(&merged),
            BBox {
                x_min: 0.0,
                y_min: 0.0,
                x_max: 100.0,
                y_max: 210.0
            }
        );
    }

    #[test]
    fn missing_components_are_empty() {
        let accent = square(10.0);
        let merged = merge_seac(None, Some(&accent[..]), 5.0, 7.0);
        assert_eq!(merged[0], Instruction::MoveTo(5.0, 7.0));
        assert_eq!(merged.len(), 6);

        assert_eq!(
            merge_seac(None, None, 1.0, 2.0),
            vec![Instruction::MoveTo(1.0, 2.0), Instruction::EndChar]
        );
    }

    #[test]
    fn compose_keeps_width() {
        let glyph = GlyphResult {
            width: Some(600.0),
            bbox: BBox::zero(),
            seac: Some(Seac {
                base_code: 65,
                accent_code: 194,
                dx: 0.0,
                dy: 300.0,
            }),
            program: None,
        };
        let base = square(100.0);
        let accent = square(20.0);
        let options = InterpreterOptions {
            build_program: true,
            ..InterpreterOptions::default()
        };
        let composed = compose(
            glyph,
            Some(&base[..]),
            Some(&accent[..]),
            &options,
            &mut NullSink,
        );
        assert_eq!(composed.width, Some(600.0));
        assert_eq!(composed.bbox.y_max, 320.0);
        assert!(composed.seac.is_some());
        assert_eq!(composed.program.map(|p| p.len()), Some(10));
    }
}
