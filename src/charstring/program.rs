//! Normalized glyph programs.
//!
//! A program is the sequence of hint and path instructions recovered from a charstring, with all
//! subroutine calls, arithmetic and format specific shorthand expanded. Path deltas are relative
//! to the previous point, starting at the glyph origin. Programs can be replayed into an
//! `OutlineSink` or encoded as Type 2 charstrings.

use crate::binary::write::{WriteBinary, WriteBuffer, WriteContext};
use crate::binary::{I16Be, I32Be, U8};
use crate::error::WriteError;
use crate::outline::{BBox, NullSink, OutlineSink};

use super::builder::PathBuilder;

/// Most operands a Type 2 operator may take.
const MAX_ARGS: usize = 48;

/// A hinted stem, as absolute edge position and width.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stem {
    pub edge: f64,
    pub width: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    HStem(Vec<Stem>),
    VStem(Vec<Stem>),
    HintMask(Vec<u8>),
    CntrMask(Vec<u8>),
    MoveTo(f64, f64),
    LineTo(f64, f64),
    CurveTo([f64; 6]),
    EndChar,
}

/// Width values from the private dictionary a program is encoded against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Widths {
    pub default_width_x: f64,
    pub nominal_width_x: f64,
}

impl Default for Widths {
    fn default() -> Self {
        Widths {
            default_width_x: 0.0,
            nominal_width_x: 0.0,
        }
    }
}

impl Instruction {
    /// Returns true for stem declarations and masks.
    pub fn is_hint(&self) -> bool {
        matches!(
            self,
            Instruction::HStem(_)
                | Instruction::VStem(_)
                | Instruction::HintMask(_)
                | Instruction::CntrMask(_)
        )
    }
}

/// Instructions up to, but not including, the first `EndChar`.
pub fn until_end(instructions: &[Instruction]) -> &[Instruction] {
    let end = instructions
        .iter()
        .position(|instruction| *instruction == Instruction::EndChar)
        .unwrap_or(instructions.len());
    &instructions[..end]
}

/// The pen position after running `instructions` from the origin.
pub fn pen_position(instructions: &[Instruction]) -> (f64, f64) {
    until_end(instructions)
        .iter()
        .fold((0.0, 0.0), |(x, y), instruction| match instruction {
            Instruction::MoveTo(dx, dy) | Instruction::LineTo(dx, dy) => (x + dx, y + dy),
            Instruction::CurveTo(d) => (x + d[0] + d[2] + d[4], y + d[1] + d[3] + d[5]),
            _ => (x, y),
        })
}

/// Draw `instructions` into `sink`, returning the bounding box of the path.
pub fn replay<S: OutlineSink>(instructions: &[Instruction], sink: &mut S) -> BBox {
    let mut builder = PathBuilder::new(sink, false);
    for instruction in until_end(instructions) {
        match *instruction {
            Instruction::MoveTo(dx, dy) => builder.move_to(dx, dy),
            Instruction::LineTo(dx, dy) => builder.line_to(dx, dy),
            Instruction::CurveTo([dx1, dy1, dx2, dy2, dx3, dy3]) => {
                builder.curve_to(dx1, dy1, dx2, dy2, dx3, dy3)
            }
            _ => {}
        }
    }
    builder.end();
    builder.finish().0
}

/// Bounding box of the path described by `instructions`.
pub fn bbox(instructions: &[Instruction]) -> BBox {
    replay(instructions, &mut NullSink)
}

/// Encode `instructions` as a Type 2 charstring.
///
/// The width is written relative to `nominal_width_x`, and left out when it equals
/// `default_width_x`. Stems use the `hm` operators when the program contains masks.
pub fn to_type2(
    instructions: &[Instruction],
    width: Option<f64>,
    widths: &Widths,
) -> Result<Vec<u8>, WriteError> {
    let mut encoder = Encoder {
        buffer: WriteBuffer::new(),
        width: width
            .filter(|&width| width != widths.default_width_x)
            .map(|width| width - widths.nominal_width_x),
        has_masks: instructions
            .iter()
            .any(|i| matches!(i, Instruction::HintMask(_) | Instruction::CntrMask(_))),
    };

    let instructions = until_end(instructions);
    let mut i = 0;
    while i < instructions.len() {
        match &instructions[i] {
            Instruction::HStem(stems) => encoder.stems(stems, true)?,
            Instruction::VStem(stems) => encoder.stems(stems, false)?,
            Instruction::HintMask(mask) => encoder.mask(HINTMASK, mask)?,
            Instruction::CntrMask(mask) => encoder.mask(CNTRMASK, mask)?,
            Instruction::MoveTo(..) => {
                let (mut dx, mut dy) = (0.0, 0.0);
                while let Some(Instruction::MoveTo(x, y)) = instructions.get(i) {
                    dx += x;
                    dy += y;
                    i += 1;
                }
                encoder.move_to(dx, dy)?;
                continue;
            }
            Instruction::LineTo(..) => {
                let mut args = Vec::new();
                while let Some(Instruction::LineTo(dx, dy)) = instructions.get(i) {
                    args.extend_from_slice(&[*dx, *dy]);
                    i += 1;
                }
                encoder.path(RLINETO, &args, 2)?;
                continue;
            }
            Instruction::CurveTo(..) => {
                let mut args = Vec::new();
                while let Some(Instruction::CurveTo(d)) = instructions.get(i) {
                    args.extend_from_slice(d);
                    i += 1;
                }
                encoder.path(RRCURVETO, &args, 6)?;
                continue;
            }
            Instruction::EndChar => {}
        }
        i += 1;
    }

    if encoder.width.is_some() {
        // A lone operand before endchar is not read as a width, so it goes on an empty move.
        encoder.move_to(0.0, 0.0)?;
    }
    U8::write(&mut encoder.buffer, ENDCHAR)?;
    Ok(encoder.buffer.into_inner())
}

const HSTEM: u8 = 1;
const VSTEM: u8 = 3;
const VMOVETO: u8 = 4;
const RLINETO: u8 = 5;
const RRCURVETO: u8 = 8;
const ENDCHAR: u8 = 14;
const HSTEMHM: u8 = 18;
const HINTMASK: u8 = 19;
const CNTRMASK: u8 = 20;
const RMOVETO: u8 = 21;
const HMOVETO: u8 = 22;
const VSTEMHM: u8 = 23;

struct Encoder {
    buffer: WriteBuffer,
    /// Width operand still to be written before the first stack clearing operator.
    width: Option<f64>,
    has_masks: bool,
}

impl Encoder {
    fn width_prefix(&mut self) -> Result<(), WriteError> {
        match self.width.take() {
            Some(width) => write_number(&mut self.buffer, width),
            None => Ok(()),
        }
    }

    fn stems(&mut self, stems: &[Stem], horizontal: bool) -> Result<(), WriteError> {
        let op = match (horizontal, self.has_masks) {
            (true, false) => HSTEM,
            (true, true) => HSTEMHM,
            (false, false) => VSTEM,
            (false, true) => VSTEMHM,
        };
        // One slot is kept free for the width.
        for chunk in stems.chunks((MAX_ARGS - 1) / 2) {
            self.width_prefix()?;
            let mut end = 0.0;
            for stem in chunk {
                write_number(&mut self.buffer, stem.edge - end)?;
                write_number(&mut self.buffer, stem.width)?;
                end = stem.edge + stem.width;
            }
            U8::write(&mut self.buffer, op)?;
        }
        Ok(())
    }

    fn mask(&mut self, op: u8, mask: &[u8]) -> Result<(), WriteError> {
        self.width_prefix()?;
        U8::write(&mut self.buffer, op)?;
        self.buffer.write_bytes(mask)
    }

    fn move_to(&mut self, dx: f64, dy: f64) -> Result<(), WriteError> {
        self.width_prefix()?;
        if dy == 0.0 {
            write_number(&mut self.buffer, dx)?;
            U8::write(&mut self.buffer, HMOVETO)
        } else if dx == 0.0 {
            write_number(&mut self.buffer, dy)?;
            U8::write(&mut self.buffer, VMOVETO)
        } else {
            write_number(&mut self.buffer, dx)?;
            write_number(&mut self.buffer, dy)?;
            U8::write(&mut self.buffer, RMOVETO)
        }
    }

    fn path(&mut self, op: u8, args: &[f64], group: usize) -> Result<(), WriteError> {
        if self.width.is_some() {
            // Drawing operators cannot carry the width, so an empty move is added for it.
            self.move_to(0.0, 0.0)?;
        }
        let per_op = (MAX_ARGS / group) * group;
        for chunk in args.chunks(per_op) {
            for &arg in chunk {
                write_number(&mut self.buffer, arg)?;
            }
            U8::write(&mut self.buffer, op)?;
        }
        Ok(())
    }
}

/// Write a Type 2 operand in its shortest encoding.
///
/// Integers use the one, two and three byte forms; anything else is written as 16.16 fixed.
pub fn write_number<C: WriteContext>(ctxt: &mut C, value: f64) -> Result<(), WriteError> {
    if value.fract() == 0.0 && (f64::from(i16::MIN)..=f64::from(i16::MAX)).contains(&value) {
        let n = value as i32;
        match n {
            -107..=107 => U8::write(ctxt, (n + 139) as u8),
            108..=1131 => {
                let n = n - 108;
                U8::write(ctxt, ((n >> 8) + 247) as u8)?;
                U8::write(ctxt, (n & 0xFF) as u8)
            }
            -1131..=-108 => {
                let n = -n - 108;
                U8::write(ctxt, ((n >> 8) + 251) as u8)?;
                U8::write(ctxt, (n & 0xFF) as u8)
            }
            _ => {
                U8::write(ctxt, 28)?;
                I16Be::write(ctxt, n as i16)
            }
        }
    } else {
        let fixed = (value * 65536.0).round();
        if !fixed.is_finite() || fixed < f64::from(i32::MIN) || fixed > f64::from(i32::MAX) {
            return Err(WriteError::BadValue);
        }
        U8::write(ctxt, 255)?;
        I32Be::write(ctxt, fixed as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::charstring::{interpret, CharStringContext, Format, InterpreterOptions};
    use crate::tests::writer::{self, TtfType::*};

    fn reinterpret(data: &[u8], nominal_width_x: f64) -> crate::charstring::GlyphResult {
        let mut context = CharStringContext::new(Format::Type2);
        context.nominal_width_x = nominal_width_x;
        let options = InterpreterOptions {
            build_program: true,
            ..InterpreterOptions::default()
        };
        interpret(data, &context, &options, &mut NullSink).unwrap()
    }

    #[test]
    fn number_encodings() {
        let mut buffer = WriteBuffer::new();
        for n in [0, 107, -107, 108, -108, 1131, -1131, 1132, -32768] {
            write_number(&mut buffer, f64::from(n)).unwrap();
        }
        let expected = writer::convert(&[
            CFFInt(0),
            CFFInt(107),
            CFFInt(-107),
            CFFInt(108),
            CFFInt(-108),
            CFFInt(1131),
            CFFInt(-1131),
            CFFInt(1132),
            CFFInt(-32768),
        ]);
        assert_eq!(buffer.bytes(), expected.as_slice());
    }

    #[test]
    fn fractions_use_fixed() {
        let mut buffer = WriteBuffer::new();
        write_number(&mut buffer, 1.5).unwrap();
        write_number(&mut buffer, 40000.0).unwrap_err();
        assert_eq!(buffer.bytes(), writer::convert(&[Fixed(1.5)]).as_slice());
    }

    #[test]
    fn width_only_glyph() {
        let widths = Widths {
            default_width_x: 500.0,
            nominal_width_x: 600.0,
        };
        let data = to_type2(&[Instruction::EndChar], Some(250.0), &widths).unwrap();
        assert_eq!(
            data,
            writer::convert(&[CFFInt(-350), CFFInt(0), UInt8(HMOVETO), UInt8(ENDCHAR)])
        );
        assert_eq!(reinterpret(&data, 600.0).width, Some(250.0));
        let data = to_type2(&[], Some(500.0), &widths).unwrap();
        assert_eq!(data, [ENDCHAR]);
    }

    #[test]
    fn encodes_width_and_path() {
        let program = vec![
            Instruction::HStem(vec![
                Stem {
                    edge: 10.0,
                    width: 20.0,
                },
                Stem {
                    edge: 100.0,
                    width: 20.0,
                },
            ]),
            Instruction::MoveTo(10.0, 20.0),
            Instruction::LineTo(30.0, 0.0),
            Instruction::LineTo(0.0, 30.0),
            Instruction::CurveTo([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            Instruction::EndChar,
        ];
        let widths = Widths::default();
        let data = to_type2(&program, Some(400.0), &widths).unwrap();
        let expected = writer::convert(&[
            CFFInt(400),
            CFFInt(10),
            CFFInt(20),
            CFFInt(70),
            CFFInt(20),
            UInt8(HSTEM),
            CFFInt(10),
            CFFInt(20),
            UInt8(RMOVETO),
            CFFInt(30),
            CFFInt(0),
            CFFInt(0),
            CFFInt(30),
            UInt8(RLINETO),
            CFFInt(1),
            CFFInt(2),
            CFFInt(3),
            CFFInt(4),
            CFFInt(5),
            CFFInt(6),
            UInt8(RRCURVETO),
            UInt8(ENDCHAR),
        ]);
        assert_eq!(data, expected);

        let glyph = reinterpret(&data, 0.0);
        assert_eq!(glyph.width, Some(400.0));
        assert_eq!(glyph.program.as_deref(), Some(program.as_slice()));
    }

    #[test]
    fn width_before_line_gets_a_move() {
        let program = vec![Instruction::LineTo(5.0, 5.0), Instruction::EndChar];
        let data = to_type2(&program, Some(300.0), &Widths::default()).unwrap();
        let glyph = reinterpret(&data, 0.0);
        assert_eq!(glyph.width, Some(300.0));
        assert_eq!(glyph.bbox.x_max, 5.0);
    }

    #[test]
    fn many_stems_are_split() {
        let stems = (0..30)
            .map(|i| Stem {
                edge: f64::from(i) * 10.0,
                width: 5.0,
            })
            .collect::<Vec<_>>();
        let program = vec![
            Instruction::VStem(stems.clone()),
            Instruction::HintMask(vec![0xFF, 0xFF, 0xFF, 0xFC]),
            Instruction::MoveTo(1.0, 1.0),
            Instruction::EndChar,
        ];
        let data = to_type2(&program, None, &Widths::default()).unwrap();
        let glyph = reinterpret(&data, 0.0);
        let decoded = glyph.program.unwrap();
        let decoded_stems = decoded
            .iter()
            .filter_map(|i| match i {
                Instruction::VStem(stems) => Some(stems.clone()),
                _ => None,
            })
            .flatten()
            .collect::<Vec<_>>();
        assert_eq!(decoded_stems, stems);
        assert!(decoded.contains(&Instruction::HintMask(vec![0xFF, 0xFF, 0xFF, 0xFC])));
    }

    #[test]
    fn pen_position_stops_at_endchar() {
        let program = [
            Instruction::MoveTo(10.0, 10.0),
            Instruction::CurveTo([1.0, 1.0, 1.0, 1.0, 1.0, 1.0]),
            Instruction::EndChar,
            Instruction::LineTo(100.0, 100.0),
        ];
        assert_eq!(pen_position(&program), (13.0, 13.0));
        assert_eq!(bbox(&program).x_max, 13.0);
    }
}
