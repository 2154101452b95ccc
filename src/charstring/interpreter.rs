//! The charstring virtual machine.

use std::mem;

use log::{debug, warn};

use crate::error::CharStringError;
use crate::outline::OutlineSink;

use super::argstack::ArgumentsStack;
use super::builder::PathBuilder;
use super::lexer::{Lexer, Token};
use super::operator::Op;
use super::program::{Instruction, Stem};
use super::{CharStringContext, Format, GlyphResult, InterpreterOptions, Seac};

/// Deepest subroutine nesting allowed.
pub(crate) const MAX_SUBR_DEPTH: usize = 10;

const TRANSIENT_ARRAY_LEN: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Running,
    AwaitingSubrReturn,
    Ended,
}

/// Points collected by a Type 1 flex sequence.
struct Flex {
    start: (f64, f64),
    points: Vec<(f64, f64)>,
}

pub(crate) struct Interpreter<'a, 'c, 's, S: OutlineSink> {
    context: &'c CharStringContext<'a>,
    options: &'c InterpreterOptions,
    state: State,
    lexer: Lexer<'a>,
    /// Callers waiting for a subroutine to return.
    frames: Vec<Lexer<'a>>,
    stack: ArgumentsStack,
    builder: PathBuilder<'s, S>,
    width: Option<f64>,
    width_parsed: bool,
    stems_len: usize,
    seac: Option<Seac>,
    /// Type 1 side bearing point.
    side_bearing: (f64, f64),
    flex: Option<Flex>,
    /// Results of Type 1 `callothersubr`, read back by `pop`.
    ps_stack: Vec<f64>,
    transient: [f64; TRANSIENT_ARRAY_LEN],
    seed: u32,
}

impl<'a, 'c, 's, S: OutlineSink> Interpreter<'a, 'c, 's, S> {
    pub fn new(
        program: &'a [u8],
        context: &'c CharStringContext<'a>,
        options: &'c InterpreterOptions,
        sink: &'s mut S,
    ) -> Self {
        Interpreter {
            context,
            options,
            state: State::Running,
            lexer: Lexer::new(program, context.format),
            frames: Vec::new(),
            stack: ArgumentsStack::new(options.max_stack_len),
            builder: PathBuilder::new(sink, options.build_program),
            width: None,
            width_parsed: false,
            stems_len: 0,
            seac: None,
            side_bearing: (0.0, 0.0),
            flex: None,
            ps_stack: Vec::new(),
            transient: [0.0; TRANSIENT_ARRAY_LEN],
            seed: 1,
        }
    }

    pub fn run(mut self) -> Result<GlyphResult, CharStringError> {
        while self.state != State::Ended {
            match self.lexer.next_token() {
                Token::Operand(value) => self.stack.push(value)?,
                Token::Operator(code) => {
                    let op = Op::lookup(self.context.format, code)
                        .ok_or(CharStringError::UnknownOperator(code))?;
                    self.execute(op)?;
                }
                // Running off the end of a subroutine returns from it.
                Token::End => self.return_from_subr(),
            }
        }

        let (bbox, program) = self.builder.finish();
        Ok(GlyphResult {
            width: self.width,
            bbox: bbox.normalize(self.options.degenerate_bbox),
            seac: self.seac,
            program,
        })
    }

    fn format(&self) -> Format {
        self.context.format
    }

    fn execute(&mut self, op: Op) -> Result<(), CharStringError> {
        if op.clears_stack() {
            self.take_width(op);
        }

        match op {
            Op::HStem | Op::HStemHm => self.stem_hints(op, true)?,
            Op::VStem | Op::VStemHm => self.stem_hints(op, false)?,
            Op::HStem3 => {
                self.expect_args(op, 6)?;
                self.declare_stems(true);
            }
            Op::VStem3 => {
                self.expect_args(op, 6)?;
                self.declare_stems(false);
            }
            Op::HintMask | Op::CntrMask => self.hint_mask(op)?,
            Op::RMoveTo | Op::HMoveTo | Op::VMoveTo => self.move_to(op)?,
            Op::RLineTo => self.builder.parse_line_to(&mut self.stack)?,
            Op::HLineTo => self
                .builder
                .parse_alternating_line_to(&mut self.stack, true)?,
            Op::VLineTo => self
                .builder
                .parse_alternating_line_to(&mut self.stack, false)?,
            Op::RRCurveTo => self.builder.parse_curve_to(&mut self.stack)?,
            Op::RCurveLine => self.builder.parse_curve_line(&mut self.stack)?,
            Op::RLineCurve => self.builder.parse_line_curve(&mut self.stack)?,
            Op::HhCurveTo => self.builder.parse_hh_curve_to(&mut self.stack)?,
            Op::VvCurveTo => self.builder.parse_vv_curve_to(&mut self.stack)?,
            Op::HvCurveTo => self
                .builder
                .parse_alternating_curve_to(&mut self.stack, true)?,
            Op::VhCurveTo => self
                .builder
                .parse_alternating_curve_to(&mut self.stack, false)?,
            Op::Flex => {
                self.expect_args(op, 13)?;
                self.builder.parse_flex(&mut self.stack)?;
            }
            Op::Flex1 => {
                self.expect_args(op, 11)?;
                self.builder.parse_flex1(&mut self.stack)?;
            }
            Op::HFlex => {
                self.expect_args(op, 7)?;
                self.builder.parse_hflex(&mut self.stack)?;
            }
            Op::HFlex1 => {
                self.expect_args(op, 9)?;
                self.builder.parse_hflex1(&mut self.stack)?;
            }
            Op::ClosePath => {
                self.discard_leftovers(op);
                self.builder.close_path();
            }
            Op::DotSection => self.discard_leftovers(op),
            Op::EndChar => {
                if self.format() == Format::Type2 && self.stack.len() >= 4 {
                    self.expect_args(op, 4)?;
                    let seac = Seac {
                        base_code: seac_code(self.stack.at(2))?,
                        accent_code: seac_code(self.stack.at(3))?,
                        dx: self.stack.at(0),
                        dy: self.stack.at(1),
                    };
                    self.seac = Some(seac);
                }
                self.discard_leftovers(op);
                self.end_glyph();
            }
            Op::CallSubr => self.call_subroutine(false)?,
            Op::CallGsubr => self.call_subroutine(true)?,
            Op::Return => self.return_from_subr(),

            // Type 1 only
            Op::HSbw => {
                self.expect_args(op, 2)?;
                let (sbx, wx) = (self.stack.at(0), self.stack.at(1));
                self.set_side_bearing(sbx, 0.0, wx);
            }
            Op::Sbw => {
                self.expect_args(op, 4)?;
                let (sbx, sby, wx) = (self.stack.at(0), self.stack.at(1), self.stack.at(2));
                self.set_side_bearing(sbx, sby, wx);
            }
            Op::Seac => {
                // asb adx ady bchar achar
                self.expect_args(op, 5)?;
                let seac = Seac {
                    base_code: seac_code(self.stack.at(3))?,
                    accent_code: seac_code(self.stack.at(4))?,
                    dx: self.stack.at(1) - self.stack.at(0) + self.side_bearing.0,
                    dy: self.stack.at(2),
                };
                self.seac = Some(seac);
                self.stack.clear();
                self.end_glyph();
            }
            Op::SetCurrentPoint => {
                self.expect_args(op, 2)?;
                let (x, y) = (self.stack.at(0), self.stack.at(1));
                self.builder.set_current_point(x, y);
                self.stack.clear();
            }
            Op::CallOtherSubr => self.call_other_subr()?,
            Op::Pop => {
                let value = self.ps_stack.pop().ok_or(CharStringError::StackUnderflow)?;
                self.stack.push(value)?;
            }

            // Arithmetic and storage
            Op::Abs => {
                let a = self.stack.pop()?;
                self.stack.push(a.abs())?;
            }
            Op::Add => self.binary(|a, b| a + b)?,
            Op::Sub => self.binary(|a, b| a - b)?,
            Op::Mul => self.binary(|a, b| a * b)?,
            Op::Div => self.binary(|a, b| if b == 0.0 { 0.0 } else { a / b })?,
            Op::Neg => {
                let a = self.stack.pop()?;
                self.stack.push(-a)?;
            }
            Op::Sqrt => {
                let a = self.stack.pop()?;
                self.stack.push(if a < 0.0 { 0.0 } else { a.sqrt() })?;
            }
            Op::Random => {
                let value = self.random();
                self.stack.push(value)?;
            }
            Op::And => self.binary(|a, b| truth(a != 0.0 && b != 0.0))?,
            Op::Or => self.binary(|a, b| truth(a != 0.0 || b != 0.0))?,
            Op::Eq => self.binary(|a, b| truth(a == b))?,
            Op::Not => {
                let a = self.stack.pop()?;
                self.stack.push(truth(a == 0.0))?;
            }
            Op::IfElse => {
                let (v1, v2) = self.stack.pop2()?;
                let (s1, s2) = self.stack.pop2()?;
                self.stack.push(if v1 <= v2 { s1 } else { s2 })?;
            }
            Op::Drop => {
                self.stack.pop()?;
            }
            Op::Dup => self.stack.dup()?,
            Op::Exch => self.stack.exch()?,
            Op::Index => {
                let i = self.stack.pop()?;
                self.stack.index(i as isize)?;
            }
            Op::Roll => {
                let (n, j) = self.stack.pop2()?;
                if n < 0.0 {
                    return Err(CharStringError::InvalidArgumentsStackLength);
                }
                self.stack.roll(n as usize, j as isize)?;
            }
            Op::Put => {
                let (value, i) = self.stack.pop2()?;
                let slot = transient_index(i)?;
                self.transient[slot] = value;
            }
            Op::Get => {
                let i = self.stack.pop()?;
                let value = self.transient[transient_index(i)?];
                self.stack.push(value)?;
            }
        }

        Ok(())
    }

    /// Decide whether the first stack clearing operator of a Type 2 glyph carries a width.
    fn take_width(&mut self, op: Op) {
        if self.format() != Format::Type2 || self.width_parsed {
            return;
        }
        self.width_parsed = true;

        let len = self.stack.len();
        let has_width = match op {
            Op::HStem | Op::VStem | Op::HStemHm | Op::VStemHm | Op::HintMask | Op::CntrMask => {
                len % 2 == 1
            }
            Op::RMoveTo => len > 2,
            Op::HMoveTo | Op::VMoveTo => len > 1,
            // A lone operand before endchar is not a width.
            Op::EndChar => len == 5,
            _ => false,
        };
        if has_width {
            self.width = Some(self.context.nominal_width_x + self.stack.at(0));
            self.stack.drop_bottom(1);
        }
    }

    /// Check `op` has at least `n` operands, dropping any extra from the bottom of the stack.
    fn expect_args(&mut self, op: Op, n: usize) -> Result<(), CharStringError> {
        let len = self.stack.len();
        if len < n {
            return Err(CharStringError::StackUnderflow);
        }
        if len > n {
            warn!(
                "{}: discarding {} unused operand(s)",
                op.mnemonic(),
                len - n
            );
            self.stack.keep_top(n);
        }
        Ok(())
    }

    fn discard_leftovers(&mut self, op: Op) {
        if !self.stack.is_empty() {
            warn!(
                "{}: discarding {} unused operand(s)",
                op.mnemonic(),
                self.stack.len()
            );
            self.stack.clear();
        }
    }

    fn end_glyph(&mut self) {
        self.builder.end();
        self.state = State::Ended;
    }

    fn stem_hints(&mut self, op: Op, horizontal: bool) -> Result<(), CharStringError> {
        match self.format() {
            Format::Type1 => self.expect_args(op, 2)?,
            Format::Type2 => {
                if self.stack.len() % 2 == 1 {
                    warn!("{}: discarding 1 unused operand", op.mnemonic());
                    self.stack.drop_bottom(1);
                }
            }
        }
        self.declare_stems(horizontal);
        Ok(())
    }

    /// Count the stem pairs on the stack, recording them when no path has been drawn yet.
    fn declare_stems(&mut self, horizontal: bool) {
        let side_bearing = if horizontal {
            self.side_bearing.1
        } else {
            self.side_bearing.0
        };
        let mut stems = Vec::with_capacity(self.stack.len() / 2);
        let mut end = 0.0;
        for pair in self.stack.all().chunks_exact(2) {
            // Type 1 stems are absolute, Type 2 stems follow on from the previous one.
            let edge = match self.context.format {
                Format::Type1 => pair[0] + side_bearing,
                Format::Type2 => end + pair[0],
            };
            end = edge + pair[1];
            stems.push(Stem {
                edge,
                width: pair[1],
            });
        }
        self.stack.clear();

        self.stems_len += stems.len();
        if !stems.is_empty() && !self.builder.has_drawn() {
            self.builder.record(if horizontal {
                Instruction::HStem(stems)
            } else {
                Instruction::VStem(stems)
            });
        }
    }

    fn hint_mask(&mut self, op: Op) -> Result<(), CharStringError> {
        if self.stack.len() % 2 == 1 {
            warn!("{}: discarding 1 unused operand", op.mnemonic());
            self.stack.drop_bottom(1);
        }
        // Operands left before a mask are vertical stems.
        if !self.stack.is_empty() {
            self.declare_stems(false);
        }

        let mask = self.lexer.read_bytes((self.stems_len + 7) / 8).to_vec();
        self.builder.record(match op {
            Op::CntrMask => Instruction::CntrMask(mask),
            _ => Instruction::HintMask(mask),
        });
        Ok(())
    }

    fn move_to(&mut self, op: Op) -> Result<(), CharStringError> {
        let args = if op == Op::RMoveTo { 2 } else { 1 };
        self.expect_args(op, args)?;
        if self.flex.is_some() {
            // Inside a Type 1 flex the moves only collect points.
            let (dx, dy) = match op {
                Op::RMoveTo => (self.stack.at(0), self.stack.at(1)),
                Op::HMoveTo => (self.stack.at(0), 0.0),
                _ => (0.0, self.stack.at(0)),
            };
            self.builder
                .set_current_point(self.builder.x + dx, self.builder.y + dy);
            self.stack.clear();
            return Ok(());
        }
        match op {
            Op::RMoveTo => self.builder.parse_move_to(&mut self.stack, 0),
            Op::HMoveTo => self.builder.parse_horizontal_move_to(&mut self.stack, 0),
            _ => self.builder.parse_vertical_move_to(&mut self.stack, 0),
        }
    }

    fn set_side_bearing(&mut self, sbx: f64, sby: f64, wx: f64) {
        self.side_bearing = (sbx, sby);
        self.width = Some(wx);
        self.width_parsed = true;
        self.builder.set_current_point(sbx, sby);
        self.stack.clear();
    }

    fn call_subroutine(&mut self, global: bool) -> Result<(), CharStringError> {
        let operand = self.stack.pop()?;
        let context = self.context;
        let subrs = if global {
            &context.global_subrs
        } else {
            context
                .local_subrs
                .as_ref()
                .ok_or(CharStringError::NoLocalSubroutines)?
        };
        let program = subrs.get(operand)?;
        if self.frames.len() >= MAX_SUBR_DEPTH {
            return Err(CharStringError::SubroutineStackOverflow);
        }

        debug!(
            "call {} subroutine {} at depth {}",
            if global { "global" } else { "local" },
            operand,
            self.frames.len() + 1
        );
        let caller = mem::replace(&mut self.lexer, Lexer::new(program, self.context.format));
        self.frames.push(caller);
        self.state = State::AwaitingSubrReturn;
        Ok(())
    }

    /// Resume the caller of the current subroutine, or end the glyph at the top level.
    fn return_from_subr(&mut self) {
        match self.frames.pop() {
            Some(caller) => {
                self.lexer = caller;
                if self.frames.is_empty() {
                    self.state = State::Running;
                }
            }
            None => self.end_glyph(),
        }
    }

    fn call_other_subr(&mut self) -> Result<(), CharStringError> {
        // arg1 ... argn n othersubr# callothersubr
        let (n, othersubr) = self.stack.pop2()?;
        let len = self.stack.len();
        let n = if n > 0.0 { n as usize } else { 0 };
        if n > len {
            return Err(CharStringError::StackUnderflow);
        }
        let args = self.stack.all()[len - n..].to_vec();
        self.stack.truncate(len - n);

        match othersubr as i32 {
            0 => {
                let (x, y) = match self.flex.take() {
                    Some(flex) => self.end_flex(flex)?,
                    None if args.len() >= 3 => (args[1], args[2]),
                    None => return Err(CharStringError::InvalidArgumentsStackLength),
                };
                // Read back by `pop pop setcurrentpoint`.
                self.ps_stack.push(y);
                self.ps_stack.push(x);
            }
            1 => {
                self.flex = Some(Flex {
                    start: (self.builder.x, self.builder.y),
                    points: Vec::with_capacity(7),
                });
            }
            2 => {
                let point = (self.builder.x, self.builder.y);
                if let Some(flex) = self.flex.as_mut() {
                    flex.points.push(point);
                }
            }
            _ => {
                // Other subroutines, hint replacement included, return their arguments.
                self.ps_stack.extend(args.iter().rev());
            }
        }
        Ok(())
    }

    /// Draw the two curves of a Type 1 flex, returning the end point.
    fn end_flex(&mut self, flex: Flex) -> Result<(f64, f64), CharStringError> {
        // The first point is the reference point, which is not drawn.
        let points = match flex.points.get(..7) {
            Some(points) => points,
            None => return Err(CharStringError::InvalidArgumentsStackLength),
        };
        self.builder.set_current_point(flex.start.0, flex.start.1);
        let [_, c1, c2, mid, c3, c4, end] = [
            points[0], points[1], points[2], points[3], points[4], points[5], points[6],
        ];
        self.builder
            .curve_to_abs(c1.0, c1.1, c2.0, c2.1, mid.0, mid.1);
        self.builder
            .curve_to_abs(c3.0, c3.1, c4.0, c4.1, end.0, end.1);
        Ok(end)
    }

    fn binary(&mut self, f: impl FnOnce(f64, f64) -> f64) -> Result<(), CharStringError> {
        let (a, b) = self.stack.pop2()?;
        self.stack.push(f(a, b))
    }

    /// A pseudo random number in (0, 1].
    fn random(&mut self) -> f64 {
        self.seed = self.seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
        f64::from((self.seed >> 16) & 0x7FFF) / 32768.0 + 1.0 / 32768.0
    }
}

fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn transient_index(i: f64) -> Result<usize, CharStringError> {
    if i >= 0.0 && (i as usize) < TRANSIENT_ARRAY_LEN {
        Ok(i as usize)
    } else {
        Err(CharStringError::InvalidArgumentsStackLength)
    }
}

fn seac_code(value: f64) -> Result<u8, CharStringError> {
    if value.fract() == 0.0 && (0.0..=255.0).contains(&value) {
        Ok(value as u8)
    } else {
        Err(CharStringError::InvalidSeacCode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::charstring::{interpret, Subroutines};
    use crate::outline::{BBox, NullSink};
    use crate::tests::common::{PathEvent, RecordingSink};
    use crate::tests::writer::{self, TtfType::*};

    const HSTEM: u8 = 1;
    const RMOVETO: u8 = 21;
    const HMOVETO: u8 = 22;
    const RLINETO: u8 = 5;
    const RRCURVETO: u8 = 8;
    const CALLSUBR: u8 = 10;
    const RETURN: u8 = 11;
    const HSBW: u8 = 13;
    const ENDCHAR: u8 = 14;
    const HSTEMHM: u8 = 18;
    const HINTMASK: u8 = 19;
    const CALLGSUBR: u8 = 29;
    const CLOSEPATH: u8 = 9;

    fn options() -> InterpreterOptions {
        InterpreterOptions {
            build_program: true,
            ..InterpreterOptions::default()
        }
    }

    fn run(format: Format, data: &[u8]) -> Result<GlyphResult, CharStringError> {
        interpret(data, &CharStringContext::new(format), &options(), &mut NullSink)
    }

    #[test]
    fn lone_operand_before_endchar() {
        let glyph = run(Format::Type2, &[139, ENDCHAR]).unwrap();
        assert_eq!(glyph.width, None);
        assert_eq!(glyph.bbox, BBox::zero());
        assert_eq!(glyph.seac, None);
    }

    #[test]
    fn bbox_of_absolute_path() {
        let data = writer::convert(&[
            CFFInt(10),
            CFFInt(20),
            UInt8(RMOVETO),
            CFFInt(100),
            CFFInt(0),
            CFFInt(0),
            CFFInt(200),
            UInt8(RLINETO),
            CFFInt(-50),
            CFFInt(50),
            CFFInt(-50),
            CFFInt(-300),
            CFFInt(0),
            CFFInt(0),
            UInt8(RRCURVETO),
            UInt8(ENDCHAR),
        ]);
        let mut sink = RecordingSink::default();
        let glyph =
            interpret(&data, &CharStringContext::new(Format::Type2), &options(), &mut sink)
                .unwrap();

        // Absolute points: (10,20) (110,20) (110,220) then controls (60,270) (10,-30), end (10,-30)
        assert_eq!(
            glyph.bbox,
            BBox {
                x_min: 10.0,
                y_min: -30.0,
                x_max: 110.0,
                y_max: 270.0
            }
        );
        assert_eq!(
            sink.events,
            vec![
                PathEvent::MoveTo(10.0, 20.0),
                PathEvent::LineTo(110.0, 20.0),
                PathEvent::LineTo(110.0, 220.0),
                PathEvent::CurveTo(60.0, 270.0, 10.0, -30.0, 10.0, -30.0),
                PathEvent::Close,
            ]
        );
        assert_eq!(glyph.width, None);
    }

    #[test]
    fn width_from_first_clearing_operator() {
        let mut context = CharStringContext::new(Format::Type2);
        context.nominal_width_x = 500.0;
        let data = writer::convert(&[
            CFFInt(-20),
            CFFInt(10),
            CFFInt(20),
            UInt8(RMOVETO),
            UInt8(ENDCHAR),
        ]);
        let glyph = interpret(&data, &context, &options(), &mut NullSink).unwrap();
        assert_eq!(glyph.width, Some(480.0));
        assert_eq!(
            glyph.program.unwrap(),
            vec![Instruction::MoveTo(10.0, 20.0), Instruction::EndChar]
        );

        let data = writer::convert(&[CFFInt(30), CFFInt(10), UInt8(HMOVETO), UInt8(ENDCHAR)]);
        let glyph = interpret(&data, &context, &options(), &mut NullSink).unwrap();
        assert_eq!(glyph.width, Some(530.0));
    }

    #[test]
    fn width_decided_once() {
        // 10 20 rmoveto 5 1 2 rmoveto endchar: the second move has an extra operand, not a width
        let data = writer::convert(&[
            CFFInt(10),
            CFFInt(20),
            UInt8(RMOVETO),
            CFFInt(5),
            CFFInt(1),
            CFFInt(2),
            UInt8(RMOVETO),
            UInt8(ENDCHAR),
        ]);
        let glyph = run(Format::Type2, &data).unwrap();
        assert_eq!(glyph.width, None);
        assert_eq!(
            glyph.program.unwrap(),
            vec![
                Instruction::MoveTo(10.0, 20.0),
                Instruction::MoveTo(1.0, 2.0),
                Instruction::EndChar
            ]
        );
    }

    #[test]
    fn hintmask_skips_mask_bytes() {
        // 4 operands to hstemhm declare 2 stems, so the mask is one byte. 0xEE would be read as
        // an unknown operand if it were not skipped.
        let data = writer::convert(&[
            CFFInt(10),
            CFFInt(20),
            CFFInt(30),
            CFFInt(40),
            UInt8(HSTEMHM),
            UInt8(HINTMASK),
            UInt8(0xC0),
            CFFInt(0),
            CFFInt(0),
            UInt8(RMOVETO),
            UInt8(ENDCHAR),
        ]);
        let glyph = run(Format::Type2, &data).unwrap();
        let program = glyph.program.unwrap();
        assert_eq!(program[1], Instruction::HintMask(vec![0xC0]));
        assert_eq!(
            program[0],
            Instruction::HStem(vec![
                Stem {
                    edge: 10.0,
                    width: 20.0
                },
                Stem {
                    edge: 60.0,
                    width: 40.0
                }
            ])
        );
    }

    #[test]
    fn hintmask_implicit_vstems() {
        // hstemhm 1 stem, then 2 vstem operand pairs before the mask: 3 stems, 1 mask byte
        let data = writer::convert(&[
            CFFInt(0),
            CFFInt(10),
            UInt8(HSTEMHM),
            CFFInt(5),
            CFFInt(5),
            CFFInt(10),
            CFFInt(5),
            UInt8(HINTMASK),
            UInt8(0xE0),
            UInt8(ENDCHAR),
        ]);
        let glyph = run(Format::Type2, &data).unwrap();
        let program = glyph.program.unwrap();
        assert_eq!(
            program[1],
            Instruction::VStem(vec![
                Stem {
                    edge: 5.0,
                    width: 5.0
                },
                Stem {
                    edge: 20.0,
                    width: 5.0
                }
            ])
        );
        assert_eq!(program[2], Instruction::HintMask(vec![0xE0]));
    }

    fn nested_subrs(depth: usize) -> (Vec<Vec<u8>>, Vec<u8>) {
        // Subr i calls subr i + 1, the last one draws a line.
        let bias = 107;
        let mut subrs = Vec::new();
        for i in 0..depth - 1 {
            subrs.push(writer::convert(&[
                CFFInt(i as i32 + 1 - bias),
                UInt8(CALLSUBR),
                UInt8(RETURN),
            ]));
        }
        subrs.push(writer::convert(&[
            CFFInt(5),
            CFFInt(5),
            UInt8(RLINETO),
            UInt8(RETURN),
        ]));
        let glyph = writer::convert(&[
            CFFInt(0),
            CFFInt(0),
            UInt8(RMOVETO),
            CFFInt(-bias),
            UInt8(CALLSUBR),
            UInt8(ENDCHAR),
        ]);
        (subrs, glyph)
    }

    fn run_with_subrs(subrs: &[Vec<u8>], glyph: &[u8]) -> Result<GlyphResult, CharStringError> {
        let mut context = CharStringContext::new(Format::Type2);
        context.local_subrs = Some(Subroutines::new(
            Format::Type2,
            subrs.iter().map(Vec::as_slice).collect(),
        ));
        interpret(glyph, &context, &options(), &mut NullSink)
    }

    #[test]
    fn subroutine_nesting_of_ten() {
        let (subrs, glyph) = nested_subrs(10);
        let result = run_with_subrs(&subrs, &glyph).unwrap();
        assert_eq!(result.bbox.x_max, 5.0);
    }

    #[test]
    fn subroutine_nesting_of_eleven() {
        let (subrs, glyph) = nested_subrs(11);
        assert_eq!(
            run_with_subrs(&subrs, &glyph),
            Err(CharStringError::SubroutineStackOverflow)
        );
    }

    #[test]
    fn recursive_subroutine() {
        let subrs = vec![writer::convert(&[CFFInt(-107), UInt8(CALLSUBR)])];
        let glyph = writer::convert(&[CFFInt(-107), UInt8(CALLSUBR), UInt8(ENDCHAR)]);
        assert_eq!(
            run_with_subrs(&subrs, &glyph),
            Err(CharStringError::SubroutineStackOverflow)
        );
    }

    #[test]
    fn subroutine_errors() {
        let glyph = writer::convert(&[CFFInt(0), UInt8(CALLSUBR)]);
        assert_eq!(
            run(Format::Type2, &glyph),
            Err(CharStringError::NoLocalSubroutines)
        );
        let glyph = writer::convert(&[CFFInt(0), UInt8(CALLGSUBR)]);
        assert_eq!(
            run(Format::Type2, &glyph),
            Err(CharStringError::SubroutineNotFound)
        );
    }

    #[test]
    fn subroutine_may_end_glyph() {
        let subrs = vec![writer::convert(&[
            CFFInt(10),
            CFFInt(10),
            UInt8(RMOVETO),
            UInt8(ENDCHAR),
        ])];
        let glyph = writer::convert(&[CFFInt(-107), UInt8(CALLSUBR), Raw(&[0])]);
        let result = run_with_subrs(&subrs, &glyph).unwrap();
        assert_eq!(result.bbox, BBox::zero());
        assert_eq!(
            result.program.unwrap(),
            vec![Instruction::MoveTo(10.0, 10.0), Instruction::EndChar]
        );
    }

    #[test]
    fn unknown_operator_and_underflow() {
        assert_eq!(
            run(Format::Type2, &[0]),
            Err(CharStringError::UnknownOperator(0))
        );
        assert_eq!(
            run(Format::Type2, &[12, 8]),
            Err(CharStringError::UnknownOperator(0x0C08))
        );
        assert_eq!(
            run(Format::Type2, &[139, RLINETO]),
            Err(CharStringError::StackUnderflow)
        );
        // hsbw is Type 1 only
        assert_eq!(
            run(Format::Type2, &[139, 139, HSBW]),
            Err(CharStringError::UnknownOperator(u16::from(HSBW)))
        );
    }

    #[test]
    fn type2_seac() {
        let data = writer::convert(&[
            CFFInt(400),
            CFFInt(100),
            CFFInt(50),
            CFFInt(65),
            CFFInt(194),
            UInt8(ENDCHAR),
        ]);
        let mut context = CharStringContext::new(Format::Type2);
        context.nominal_width_x = 100.0;
        let glyph = interpret(&data, &context, &options(), &mut NullSink).unwrap();
        assert_eq!(glyph.width, Some(500.0));
        assert_eq!(
            glyph.seac,
            Some(Seac {
                base_code: 65,
                accent_code: 194,
                dx: 100.0,
                dy: 50.0
            })
        );
    }

    #[test]
    fn arithmetic() {
        // 10 3 sub 2 mul 7 1 put 1 get rmoveto endchar
        let data = writer::convert(&[
            CFFInt(10),
            CFFInt(3),
            Escape(11),
            CFFInt(2),
            Escape(24),
            CFFInt(7),
            CFFInt(1),
            Escape(20),
            CFFInt(1),
            Escape(21),
            UInt8(RMOVETO),
            UInt8(ENDCHAR),
        ]);
        let glyph = run(Format::Type2, &data).unwrap();
        assert_eq!(
            glyph.program.unwrap()[0],
            Instruction::MoveTo(14.0, 7.0)
        );

        // 1 2 3 3 1 roll → 3 1 2, then exch → 3 2 1, then 2 index → 3 2 1 3
        let data = writer::convert(&[
            CFFInt(1),
            CFFInt(2),
            CFFInt(3),
            CFFInt(3),
            CFFInt(1),
            Escape(30),
            Escape(28),
            CFFInt(2),
            Escape(29),
            UInt8(RLINETO),
            UInt8(ENDCHAR),
        ]);
        let glyph = run(Format::Type2, &data).unwrap();
        assert_eq!(
            glyph.program.unwrap(),
            vec![
                Instruction::MoveTo(0.0, 0.0),
                Instruction::LineTo(3.0, 2.0),
                Instruction::LineTo(1.0, 3.0),
                Instruction::EndChar
            ]
        );
    }

    #[test]
    fn ifelse_and_div() {
        // 10 20 1 2 ifelse → 10; 9 0 div → 0
        let data = writer::convert(&[
            CFFInt(10),
            CFFInt(20),
            CFFInt(1),
            CFFInt(2),
            Escape(22),
            CFFInt(9),
            CFFInt(0),
            Escape(12),
            UInt8(RMOVETO),
            UInt8(ENDCHAR),
        ]);
        let glyph = run(Format::Type2, &data).unwrap();
        assert_eq!(glyph.program.unwrap()[0], Instruction::MoveTo(10.0, 0.0));
    }

    #[test]
    fn type1_hsbw_and_stems() {
        // 20 600 hsbw 0 50 hstem 0 10 rmoveto 100 0 rlineto closepath endchar
        let data = writer::convert(&[
            CFFInt(20),
            CFFInt(600),
            UInt8(HSBW),
            CFFInt(0),
            CFFInt(50),
            UInt8(HSTEM),
            CFFInt(0),
            CFFInt(10),
            UInt8(RMOVETO),
            CFFInt(100),
            CFFInt(10),
            UInt8(RLINETO),
            UInt8(CLOSEPATH),
            UInt8(ENDCHAR),
        ]);
        let glyph = run(Format::Type1, &data).unwrap();
        assert_eq!(glyph.width, Some(600.0));
        assert_eq!(
            glyph.bbox,
            BBox {
                x_min: 20.0,
                y_min: 10.0,
                x_max: 120.0,
                y_max: 20.0
            }
        );
        assert_eq!(
            glyph.program.unwrap(),
            vec![
                Instruction::HStem(vec![Stem {
                    edge: 0.0,
                    width: 50.0
                }]),
                Instruction::MoveTo(20.0, 10.0),
                Instruction::LineTo(100.0, 10.0),
                Instruction::EndChar
            ]
        );
    }

    #[test]
    fn type1_fixed_operand_is_integer() {
        // A 32 bit operand is a plain integer in Type 1.
        let data = writer::convert(&[
            CFFInt(0),
            Raw(&[255, 0x00, 0x01, 0x00, 0x00]),
            UInt8(HSBW),
            UInt8(ENDCHAR),
        ]);
        assert_eq!(run(Format::Type1, &data).unwrap().width, Some(65536.0));
    }

    #[test]
    fn type1_seac() {
        // 10 500 hsbw 30 200 150 65 194 seac
        let data = writer::convert(&[
            CFFInt(10),
            CFFInt(500),
            UInt8(HSBW),
            CFFInt(30),
            CFFInt(200),
            CFFInt(150),
            CFFInt(65),
            CFFInt(194),
            Escape(6),
        ]);
        let glyph = run(Format::Type1, &data).unwrap();
        assert_eq!(
            glyph.seac,
            Some(Seac {
                base_code: 65,
                accent_code: 194,
                dx: 180.0,
                dy: 150.0
            })
        );
        assert_eq!(glyph.width, Some(500.0));
    }

    #[test]
    fn type1_flex() {
        // Flex via othersubrs 1, 2 and 0 as the standard Subrs 0 to 2 do.
        let start = writer::convert(&[CFFInt(0), CFFInt(1), Escape(16)]);
        let point = writer::convert(&[CFFInt(0), CFFInt(2), Escape(16)]);
        let mut data = writer::convert(&[
            CFFInt(0),
            CFFInt(500),
            UInt8(HSBW),
            CFFInt(0),
            CFFInt(0),
            UInt8(RMOVETO),
        ]);
        data.extend(&start);
        let deltas = [
            (50, 0),  // reference point
            (-40, 0), // c1
            (20, 10), // c2
            (20, 0),  // mid
            (20, 0),  // c3
            (20, -10), // c4
            (20, 0),  // end
        ];
        for (dx, dy) in deltas {
            data.extend(writer::convert(&[CFFInt(dx), CFFInt(dy), UInt8(RMOVETO)]));
            data.extend(&point);
        }
        data.extend(writer::convert(&[
            CFFInt(50),
            CFFInt(100),
            CFFInt(0),
            CFFInt(3),
            CFFInt(0),
            Escape(16),
            Escape(17),
            Escape(17),
            Escape(33),
            UInt8(ENDCHAR),
        ]));
        let mut sink = RecordingSink::default();
        let glyph =
            interpret(&data, &CharStringContext::new(Format::Type1), &options(), &mut sink)
                .unwrap();
        assert_eq!(
            sink.events,
            vec![
                PathEvent::MoveTo(0.0, 0.0),
                PathEvent::CurveTo(10.0, 0.0, 30.0, 10.0, 50.0, 10.0),
                PathEvent::CurveTo(70.0, 10.0, 90.0, 0.0, 110.0, 0.0),
                PathEvent::Close,
            ]
        );
        assert_eq!(glyph.bbox.y_max, 10.0);
    }

    #[test]
    fn type1_othersubr_results_are_popped_in_order() {
        // 7 8 2 5 callothersubr pop pop rmoveto: othersubr 5 returns its args
        let data = writer::convert(&[
            CFFInt(0),
            CFFInt(500),
            UInt8(HSBW),
            CFFInt(7),
            CFFInt(8),
            CFFInt(2),
            CFFInt(5),
            Escape(16),
            Escape(17),
            Escape(17),
            UInt8(RMOVETO),
            UInt8(ENDCHAR),
        ]);
        let glyph = run(Format::Type1, &data).unwrap();
        assert_eq!(glyph.program.unwrap()[0], Instruction::MoveTo(7.0, 8.0));
    }

    #[test]
    fn leftover_operands_are_discarded() {
        // 1 2 3 4 5 6 rmoveto: width 1, then 2 3 4 dropped, move by (5, 6)
        let data = writer::convert(&[
            CFFInt(1),
            CFFInt(2),
            CFFInt(3),
            CFFInt(4),
            CFFInt(5),
            CFFInt(6),
            UInt8(RMOVETO),
            UInt8(ENDCHAR),
        ]);
        let glyph = run(Format::Type2, &data).unwrap();
        assert_eq!(glyph.width, Some(1.0));
        assert_eq!(glyph.program.unwrap()[0], Instruction::MoveTo(5.0, 6.0));
    }

    #[test]
    fn exhausted_program_ends_glyph() {
        let data = writer::convert(&[CFFInt(10), CFFInt(10), UInt8(RMOVETO), CFFInt(5)]);
        let glyph = run(Format::Type2, &data).unwrap();
        assert_eq!(
            glyph.program.unwrap(),
            vec![Instruction::MoveTo(10.0, 10.0), Instruction::EndChar]
        );
    }
}
