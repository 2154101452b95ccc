//! Glyph outline generation for CFF.

use crate::charstring::program::Instruction;
use crate::charstring::{
    interpret, seac, CharStringContext, Format, GlyphResult, InterpreterOptions, Subroutines,
};
use crate::error::{CharStringError, ParseError};
use crate::outline::{NullSink, OutlineBuilder, OutlineSink};

use super::{Font, CFF};

/// Interprets the glyphs of one font of a CFF font set.
pub struct CFFOutlines<'a, 'data> {
    pub font: &'a Font<'data>,
    /// Subroutines and widths, one per Private DICT.
    contexts: Vec<CharStringContext<'data>>,
}

impl<'a, 'data> CFFOutlines<'a, 'data> {
    pub fn new(cff: &CFF<'data>, font: &'a Font<'data>) -> Self {
        let global_subrs = Subroutines::new(Format::Type2, cff.global_subr_index.iter().collect());
        let contexts = (0..font.num_private_dicts())
            .map(|index| CharStringContext {
                format: Format::Type2,
                global_subrs: global_subrs.clone(),
                local_subrs: font
                    .local_subr_index(index)
                    .map(|subrs| Subroutines::new(Format::Type2, subrs.iter().collect())),
                nominal_width_x: font
                    .private_dict(index)
                    .map_or(0.0, |private_dict| private_dict.nominal_width_x),
            })
            .collect();

        CFFOutlines { font, contexts }
    }

    fn context(&self, glyph_index: u16) -> Result<(usize, &CharStringContext<'data>), CharStringError> {
        let index = self
            .font
            .font_dict_index(glyph_index)
            .ok_or(CharStringError::ParseError(ParseError::BadIndex))?;
        let context = self
            .contexts
            .get(index)
            .ok_or(CharStringError::ParseError(ParseError::BadIndex))?;
        Ok((index, context))
    }

    /// The normalized program of the glyph a seac code refers to.
    fn component(
        &self,
        code: u8,
        options: &InterpreterOptions,
    ) -> Result<Vec<Instruction>, CharStringError> {
        let glyph_index = self
            .font
            .seac_code_to_glyph_id(code)
            .ok_or(CharStringError::InvalidSeacCode)?;
        let char_string = self
            .font
            .char_string(glyph_index)
            .ok_or(CharStringError::InvalidSeacCode)?;
        let (_, context) = self.context(glyph_index)?;
        let glyph = interpret(char_string, context, options, &mut NullSink)?;
        Ok(glyph.program.unwrap_or_default())
    }
}

impl<'a, 'data> OutlineBuilder for CFFOutlines<'a, 'data> {
    type Error = CharStringError;

    fn num_glyphs(&self) -> usize {
        self.font.num_glyphs()
    }

    fn visit<S: OutlineSink>(
        &mut self,
        glyph_index: u16,
        options: &InterpreterOptions,
        sink: &mut S,
    ) -> Result<GlyphResult, Self::Error> {
        let char_string = self
            .font
            .char_string(glyph_index)
            .ok_or(CharStringError::ParseError(ParseError::BadIndex))?;
        let (index, context) = self.context(glyph_index)?;
        let mut glyph = interpret(char_string, context, options, sink)?;

        let default_width_x = self
            .font
            .private_dict(index)
            .map_or(0.0, |private_dict| private_dict.default_width_x);
        glyph.width = Some(glyph.width.unwrap_or(default_width_x));

        match glyph.seac {
            Some(seac) => {
                let component_options = InterpreterOptions {
                    build_program: true,
                    ..*options
                };
                let base = self.component(seac.base_code, &component_options)?;
                let accent = self.component(seac.accent_code, &component_options)?;
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
