use pathfinder_geometry::line_segment::LineSegment2F;
use pathfinder_geometry::vector::Vector2F;

use fontprogram::outline::OutlineSink;

/// A single recorded outline event, in absolute glyph space.
#[allow(dead_code)]
#[derive(Clone, Debug, PartialEq)]
pub enum PathEvent {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    CurveTo(f32, f32, f32, f32, f32, f32),
    Close,
}

/// An `OutlineSink` that records every event it receives.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<PathEvent>,
}

impl OutlineSink for RecordingSink {
    fn move_to(&mut self, to: Vector2F) {
        self.events.push(PathEvent::MoveTo(to.x(), to.y()));
    }

    fn line_to(&mut self, to: Vector2F) {
        self.events.push(PathEvent::LineTo(to.x(), to.y()));
    }

    fn quadratic_curve_to(&mut self, _ctrl: Vector2F, _to: Vector2F) {
        unreachable!("charstrings only contain cubic curves")
    }

    fn cubic_curve_to(&mut self, ctrl: LineSegment2F, to: Vector2F) {
        self.events.push(PathEvent::CurveTo(
            ctrl.from_x(),
            ctrl.from_y(),
            ctrl.to_x(),
            ctrl.to_y(),
            to.x(),
            to.y(),
        ));
    }

    fn close(&mut self) {
        self.events.push(PathEvent::Close);
    }
}

/// An operand or operator of a hand-written charstring.
#[allow(dead_code)]
#[derive(Clone, Copy, Debug)]
pub enum Token {
    Num(f64),
    Op(u8),
    /// Two byte operator, `12 x`.
    Esc(u8),
    Raw(&'static [u8]),
}

/// Assemble a charstring from tokens, encoding numbers in their shortest form.
#[allow(dead_code)]
pub fn charstring(tokens: &[Token]) -> Vec<u8> {
    use fontprogram::binary::write::{WriteBuffer, WriteContext};

    let mut ctxt = WriteBuffer::new();
    for token in tokens {
        match *token {
            Token::Num(n) => fontprogram::charstring::program::write_number(&mut ctxt, n).unwrap(),
            Token::Op(op) => ctxt.write_bytes(&[op]).unwrap(),
            Token::Esc(op) => ctxt.write_bytes(&[12, op]).unwrap(),
            Token::Raw(bytes) => ctxt.write_bytes(bytes).unwrap(),
        }
    }
    ctxt.into_inner()
}

/// Encrypt a Type 1 charstring, prefixing `len_iv` random bytes.
#[allow(dead_code)]
pub fn encrypt_charstring(plain: &[u8], len_iv: usize) -> Vec<u8> {
    let mut r: u16 = fontprogram::charstring::CHARSTRING_KEY;
    std::iter::repeat(0x5a)
        .take(len_iv)
        .chain(plain.iter().copied())
        .map(|p| {
            let c = p ^ (r >> 8) as u8;
            r = u16::from(c)
                .wrapping_add(r)
                .wrapping_mul(52845)
                .wrapping_add(22719);
            c
        })
        .collect()
}
