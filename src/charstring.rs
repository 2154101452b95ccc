//! Type 1 and Type 2 charstring interpretation.
//!
//! A charstring is the bytecode program describing the outline of one glyph. Interpreting it
//! yields the glyph's advance width, bounding box, an optional composite (seac) reference and,
//! when requested, a normalized [Instruction](program::Instruction) stream that can be merged
//! with other glyphs and re-encoded as a Type 2 charstring.
//!
//! Refer to Adobe Technical Note #5177 (The Type 2 Charstring Format) and the Adobe Type 1
//! Font Format.

mod argstack;
mod builder;
mod interpreter;
pub mod lexer;
pub mod operator;
pub mod program;
pub mod seac;

use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;

use crate::cff::standard::{STANDARD_ENCODING, STANDARD_STRINGS};
use crate::error::{CharStringError, ParseError, ReadWriteError};
use crate::outline::{BBox, DegenerateBBox, NullSink, OutlineBuilder, OutlineSink};

use interpreter::Interpreter;
use program::Instruction;

/// Most operands a Type 2 charstring may hold on its stack.
pub const MAX_OPERANDS: usize = 48;

/// Key of the charstring encryption layer of Type 1 fonts.
pub const CHARSTRING_KEY: u16 = 4330;

/// Key of the eexec encryption layer of Type 1 fonts.
pub const EEXEC_KEY: u16 = 55665;

const C1: u16 = 52845;
const C2: u16 = 22719;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Type1,
    Type2,
}

/// A table of local or global subroutines and the bias applied to indices into it.
#[derive(Clone, Debug)]
pub struct Subroutines<'a> {
    subrs: Vec<&'a [u8]>,
    bias: i32,
}

/// Configuration of a charstring interpretation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterpreterOptions {
    /// What to do with bounding boxes without area.
    pub degenerate_bbox: DegenerateBBox,
    /// Record a normalized program in `GlyphResult::program`.
    pub build_program: bool,
    /// Operand stack limit.
    pub max_stack_len: usize,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        InterpreterOptions {
            degenerate_bbox: DegenerateBBox::Zero,
            build_program: false,
            max_stack_len: MAX_OPERANDS,
        }
    }
}

/// Everything a charstring may refer to outside of itself.
#[derive(Clone, Debug)]
pub struct CharStringContext<'a> {
    pub format: Format,
    pub global_subrs: Subroutines<'a>,
    pub local_subrs: Option<Subroutines<'a>>,
    /// Added to the width operand of Type 2 charstrings.
    pub nominal_width_x: f64,
}

/// A composite glyph built from a base and an accent character.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Seac {
    /// StandardEncoding code of the base character.
    pub base_code: u8,
    /// StandardEncoding code of the accent character.
    pub accent_code: u8,
    /// Offset of the accent origin from the base origin.
    pub dx: f64,
    pub dy: f64,
}

/// The result of interpreting a glyph.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphResult {
    /// Advance width, if the charstring carried one.
    ///
    /// Type 2 glyphs without a width operand use the private dictionary's `defaultWidthX`.
    pub width: Option<f64>,
    pub bbox: BBox,
    pub seac: Option<Seac>,
    pub program: Option<Vec<Instruction>>,
}

impl<'a> Subroutines<'a> {
    pub fn new(format: Format, subrs: Vec<&'a [u8]>) -> Self {
        let bias = match format {
            Format::Type1 => 0,
            Format::Type2 => calc_subroutine_bias(subrs.len()),
        };
        Subroutines { subrs, bias }
    }

    pub fn empty(format: Format) -> Self {
        Subroutines::new(format, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.subrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subrs.is_empty()
    }

    pub fn bias(&self) -> i32 {
        self.bias
    }

    /// Look up the subroutine for a biased operand.
    pub fn get(&self, operand: f64) -> Result<&'a [u8], CharStringError> {
        if operand.fract() != 0.0 || !operand.is_finite() {
            return Err(CharStringError::SubroutineNotFound);
        }
        let index = (operand as i64) + i64::from(self.bias);
        usize::try_from(index)
            .ok()
            .and_then(|index| self.subrs.get(index))
            .copied()
            .ok_or(CharStringError::SubroutineNotFound)
    }
}

// Adobe Technical Note #5176, Chapter 16 "Local / Global Subrs INDEXes"
pub fn calc_subroutine_bias(len: usize) -> i32 {
    if len < 1240 {
        107
    } else if len < 33900 {
        1131
    } else {
        32768
    }
}

impl<'a> CharStringContext<'a> {
    /// A context without subroutines.
    pub fn new(format: Format) -> Self {
        CharStringContext {
            format,
            global_subrs: Subroutines::empty(format),
            local_subrs: None,
            nominal_width_x: 0.0,
        }
    }
}

impl GlyphResult {
    /// The glyph substituted for one that failed to interpret.
    pub fn empty() -> Self {
        GlyphResult {
            width: None,
            bbox: BBox::zero(),
            seac: None,
            program: None,
        }
    }
}

/// Interpret `program`, sending its outline to `sink`.
///
/// Errors are fatal for this glyph only.
pub fn interpret<'a, S: OutlineSink>(
    program: &'a [u8],
    context: &CharStringContext<'a>,
    options: &InterpreterOptions,
    sink: &mut S,
) -> Result<GlyphResult, CharStringError> {
    Interpreter::new(program, context, options, sink).run()
}

/// Interpret every glyph of `builder`.
///
/// A glyph that fails is logged and replaced by `GlyphResult::empty()`. `cancel` is checked
/// before each glyph.
pub fn interpret_glyphs<B: OutlineBuilder>(
    builder: &mut B,
    options: &InterpreterOptions,
    cancel: &AtomicBool,
) -> Result<Vec<GlyphResult>, ReadWriteError> {
    let num_glyphs = u16::try_from(builder.num_glyphs()).map_err(|_| ParseError::LimitExceeded)?;
    let mut glyphs = Vec::with_capacity(usize::from(num_glyphs));
    for glyph_index in 0..num_glyphs {
        if cancel.load(Ordering::Relaxed) {
            return Err(ReadWriteError::Cancelled);
        }
        let glyph = builder
            .visit(glyph_index, options, &mut NullSink)
            .unwrap_or_else(|err| {
                warn!("glyph {}: {}, substituting an empty glyph", glyph_index, err);
                GlyphResult::empty()
            });
        glyphs.push(glyph);
    }
    Ok(glyphs)
}

/// Decrypt data encrypted with the Type 1 encryption algorithm, dropping the first `discard`
/// plaintext bytes.
pub fn decrypt(data: &[u8], key: u16, discard: usize) -> Vec<u8> {
    let mut r = key;
    let mut plain = Vec::with_capacity(data.len().saturating_sub(discard));
    for (i, &cipher) in data.iter().enumerate() {
        let byte = cipher ^ (r >> 8) as u8;
        r = u16::from(cipher)
            .wrapping_add(r)
            .wrapping_mul(C1)
            .wrapping_add(C2);
        if i >= discard {
            plain.push(byte);
        }
    }
    plain
}

/// Decrypt a Type 1 charstring. A negative `len_iv` means the charstring is not encrypted.
pub fn decrypt_charstring(data: &[u8], len_iv: i32) -> Vec<u8> {
    match usize::try_from(len_iv) {
        Ok(discard) => decrypt(data, CHARSTRING_KEY, discard),
        Err(_) => data.to_vec(),
    }
}

/// The charstrings of a Type 1 font, with their glyph names.
///
/// Glyph 0 should be `.notdef`.
pub struct Type1Glyphs {
    names: Vec<String>,
    charstrings: Vec<Vec<u8>>,
    subrs: Vec<Vec<u8>>,
}

impl Type1Glyphs {
    /// Collect glyphs, decrypting charstrings and subroutines with `len_iv`.
    pub fn new(glyphs: Vec<(String, Vec<u8>)>, subrs: Vec<Vec<u8>>, len_iv: i32) -> Self {
        let (names, charstrings) = glyphs
            .into_iter()
            .map(|(name, data)| (name, decrypt_charstring(&data, len_iv)))
            .unzip();
        let subrs = subrs
            .iter()
            .map(|data| decrypt_charstring(data, len_iv))
            .collect();
        Type1Glyphs {
            names,
            charstrings,
            subrs,
        }
    }

    pub fn glyph_name(&self, glyph_index: u16) -> Option<&str> {
        self.names.get(usize::from(glyph_index)).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Find the glyph for a StandardEncoding code.
    pub fn seac_code_to_glyph_id(&self, code: u8) -> Option<u16> {
        let sid = *STANDARD_ENCODING.get(usize::from(code))?;
        if sid == 0 {
            return None;
        }
        let name = STANDARD_STRINGS.get(usize::from(sid))?;
        let index = self.names.iter().position(|n| n == name)?;
        u16::try_from(index).ok()
    }

    fn context(&self) -> CharStringContext<'_> {
        let mut context = CharStringContext::new(Format::Type1);
        context.local_subrs = Some(Subroutines::new(
            Format::Type1,
            self.subrs.iter().map(Vec::as_slice).collect(),
        ));
        context
    }

    fn interpret_component(
        &self,
        code: u8,
        context: &CharStringContext<'_>,
        options: &InterpreterOptions,
    ) -> Result<Vec<Instruction>, CharStringError> {
        let glyph_index = self
            .seac_code_to_glyph_id(code)
            .ok_or(CharStringError::InvalidSeacCode)?;
        let data = &self.charstrings[usize::from(glyph_index)];
        let component = interpret(data, context, options, &mut NullSink)?;
        Ok(component.program.unwrap_or_default())
    }
}

impl OutlineBuilder for Type1Glyphs {
    type Error = CharStringError;

    fn num_glyphs(&self) -> usize {
        self.charstrings.len()
    }

    fn visit<S: OutlineSink>(
        &mut self,
        glyph_index: u16,
        options: &InterpreterOptions,
        sink: &mut S,
    ) -> Result<GlyphResult, Self::Error> {
        let data = self
            .charstrings
            .get(usize::from(glyph_index))
            .ok_or(CharStringError::ParseError(ParseError::BadIndex))?;
        let context = self.context();
        let glyph = interpret(data, &context, options, sink)?;
        match glyph.seac {
            Some(seac) => {
                let component_options = InterpreterOptions {
                    build_program: true,
                    ..*options
                };
                let base = self.interpret_component(seac.base_code, &context, &component_options)?;
                let accent =
                    self.interpret_component(seac.accent_code, &context, &component_options)?;
                Ok(seac::compose(
                    glyph,
                    Some(base.as_slice()),
                    Some(accent.as_slice()),
                    options,
                    sink,
                ))
            }
            None => Ok(glyph),
        }
    }
}
