//! Writing CFF fonts.
//!
//! A [FontProgram] is the owned, compile-ready form of one font. It is usually built from the
//! interpreted glyphs of an existing font, so the charstrings it holds are flattened: they call
//! no subroutines and carry widths relative to a Private DICT with `nominalWidthX` 0.
//!
//! Compiling happens in two passes. The first writes the Top DICT with every offset set to
//! `OFFSET_PLACEHOLDER` to reserve its space, then writes the rest of the font recording where
//! each part landed. The second writes the Top DICT again with the real offsets into the
//! reserved space. Offsets are always written in the five byte form, so both versions of the
//! DICT have the same size.

use std::convert::TryFrom;
use std::sync::atomic::AtomicBool;

use itertools::Itertools;
use log::debug;

use crate::binary::write::{WriteBinary, WriteBuffer, WriteContext};
use crate::binary::{U16Be, U8};
use crate::charstring::program::{self, Instruction, Widths};
use crate::charstring::{interpret_glyphs, GlyphResult, InterpreterOptions};
use crate::error::{ParseError, ReadWriteError, WriteError};
use crate::outline::BBox;

use super::dict::{
    Dict, DictSchema, FontDict, PrivateDict, StringTable, TopDict, OFFSET_PLACEHOLDER,
};
use super::outline::CFFOutlines;
use super::standard::{standard_sid, EXPERT_CHARSET, EXPERT_SUBSET_CHARSET, ISO_ADOBE_LAST_SID};
use super::{owned, CFFVariant, Encoding, Font, Header, Range, CFF, SID};

/// Options for [FontProgram::compile].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompileOptions {
    /// Refer to a predefined charset instead of writing one when the glyph names allow it.
    pub use_predefined_charsets: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            use_predefined_charsets: true,
        }
    }
}

/// The names or CIDs of every glyph of a font, starting with glyph 0.
#[derive(Clone, Debug, PartialEq)]
pub enum GlyphSet {
    Names(Vec<String>),
    Cids(Vec<u16>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum EncodingTable {
    Standard,
    Expert,
    /// `codes[i]` is the code of glyph `i + 1`. Supplements add more codes for a glyph name.
    Custom {
        codes: Vec<u8>,
        supplements: Vec<(u8, String)>,
    },
}

/// The Font DICT, Private DICT and local subroutines of one group of glyphs of a CID-keyed font.
#[derive(Clone, Debug, PartialEq)]
pub struct FontDictData {
    pub font_dict: FontDict,
    pub private_dict: PrivateDict,
    pub local_subrs: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FontKind {
    Type1 {
        private_dict: PrivateDict,
        local_subrs: Vec<Vec<u8>>,
        encoding: EncodingTable,
    },
    Cid {
        font_dicts: Vec<FontDictData>,
        /// Index into `font_dicts` of each glyph.
        fd_select: Vec<u8>,
    },
}

/// A font ready to be written.
///
/// Offset valued properties of `top_dict` and the Private DICTs are ignored, they are filled in
/// by `compile`.
#[derive(Clone, Debug, PartialEq)]
pub struct FontProgram {
    pub name: String,
    pub top_dict: TopDict,
    pub global_subrs: Vec<Vec<u8>>,
    pub char_strings: Vec<Vec<u8>>,
    pub charset: GlyphSet,
    pub kind: FontKind,
}

impl FontProgram {
    /// Interpret every glyph of `font` and collect the results into a new font.
    ///
    /// Glyphs that fail to interpret are replaced with empty glyphs. Composite glyphs are
    /// merged into plain outlines. `cancel` is checked between glyphs.
    pub fn from_font<'a>(
        cff: &CFF<'a>,
        font: &Font<'a>,
        cancel: &AtomicBool,
    ) -> Result<FontProgram, ReadWriteError> {
        let options = InterpreterOptions {
            build_program: true,
            ..InterpreterOptions::default()
        };
        let glyphs = interpret_glyphs(&mut CFFOutlines::new(cff, font), &options, cancel)?;
        let num_glyphs = u16::try_from(glyphs.len()).map_err(|_| ParseError::LimitExceeded)?;

        let groups = (0..num_glyphs)
            .map(|glyph_id| font.font_dict_index(glyph_id).unwrap_or(0))
            .collect::<Vec<_>>();
        let private_dicts = (0..font.num_private_dicts())
            .map(|index| {
                let private_dict = font.private_dict(index).ok_or(ParseError::BadIndex)?;
                let widths = glyphs
                    .iter()
                    .zip(&groups)
                    .filter(|(_, group)| **group == index)
                    .filter_map(|(glyph, _)| glyph.width);
                Ok(flattened_private_dict(private_dict, widths))
            })
            .collect::<Result<Vec<_>, ParseError>>()?;

        let char_strings = glyphs
            .iter()
            .zip(&groups)
            .map(|(glyph, &group)| {
                let widths = private_dicts.get(group).map_or_else(Widths::default, |private_dict| {
                    Widths {
                        default_width_x: private_dict.default_width_x,
                        nominal_width_x: private_dict.nominal_width_x,
                    }
                });
                encode_glyph(glyph, &widths)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let charset = if font.is_cid_keyed() {
            let cids = (0..num_glyphs)
                .map(|glyph_id| font.charset.id_for_glyph(glyph_id).ok_or(ParseError::BadIndex))
                .collect::<Result<_, _>>()?;
            GlyphSet::Cids(cids)
        } else {
            let names = (0..num_glyphs)
                .map(|glyph_id| {
                    font.glyph_name(glyph_id)
                        .map(str::to_owned)
                        .ok_or(ParseError::BadIndex)
                })
                .collect::<Result<_, _>>()?;
            GlyphSet::Names(names)
        };

        let kind = match &font.data {
            CFFVariant::Type1(type1) => {
                let encoding = match &type1.encoding {
                    Encoding::Standard => EncodingTable::Standard,
                    Encoding::Expert => EncodingTable::Expert,
                    Encoding::Custom(custom) => {
                        let supplements = custom
                            .supplements()
                            .iter()
                            .map(|(code, sid)| Ok((code, cff.read_string(sid)?.to_owned())))
                            .collect::<Result<_, ParseError>>()?;
                        EncodingTable::Custom {
                            codes: custom.codes(),
                            supplements,
                        }
                    }
                };
                FontKind::Type1 {
                    private_dict: private_dicts.into_iter().next().ok_or(ParseError::MissingValue)?,
                    local_subrs: Vec::new(),
                    encoding,
                }
            }
            CFFVariant::CID(cid) => {
                let font_dicts = cid
                    .font_dicts
                    .iter()
                    .cloned()
                    .zip(private_dicts)
                    .map(|(font_dict, private_dict)| FontDictData {
                        font_dict,
                        private_dict,
                        local_subrs: Vec::new(),
                    })
                    .collect();
                let fd_select = groups
                    .iter()
                    .map(|&group| u8::try_from(group))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(ParseError::from)?;
                FontKind::Cid {
                    font_dicts,
                    fd_select,
                }
            }
        };

        Ok(FontProgram {
            name: font.name.clone(),
            top_dict: font.top_dict.clone(),
            global_subrs: Vec::new(),
            char_strings,
            charset,
            kind,
        })
    }

    /// Build a font from interpreted glyphs and their names.
    ///
    /// The glyphs must have been interpreted with `build_program` set. Glyph 0 should be
    /// `.notdef`. The FontBBox is the union of the glyph bounding boxes.
    pub fn from_glyph_results(
        name: &str,
        glyph_names: Vec<String>,
        glyphs: &[GlyphResult],
        private_dict: &PrivateDict,
    ) -> Result<FontProgram, WriteError> {
        if glyph_names.len() != glyphs.len() || glyphs.is_empty() {
            return Err(WriteError::BadValue);
        }

        let private_dict = flattened_private_dict(private_dict, glyphs.iter().filter_map(|g| g.width));
        let widths = Widths {
            default_width_x: private_dict.default_width_x,
            nominal_width_x: private_dict.nominal_width_x,
        };
        let char_strings = glyphs
            .iter()
            .map(|glyph| encode_glyph(glyph, &widths))
            .collect::<Result<_, _>>()?;

        // Glyphs without an outline have a zero box
        let mut bbox = BBox::empty();
        for glyph in glyphs.iter().filter(|glyph| glyph.bbox != BBox::zero()) {
            bbox.union(&glyph.bbox);
        }
        let bbox = bbox.normalize(Default::default());

        let top_dict = TopDict {
            full_name: Some(name.to_owned()),
            font_bbox: vec![
                bbox.x_min.floor(),
                bbox.y_min.floor(),
                bbox.x_max.ceil(),
                bbox.y_max.ceil(),
            ],
            ..TopDict::default()
        };

        Ok(FontProgram {
            name: name.to_owned(),
            top_dict,
            global_subrs: Vec::new(),
            char_strings,
            charset: GlyphSet::Names(glyph_names),
            kind: FontKind::Type1 {
                private_dict,
                local_subrs: Vec::new(),
                encoding: EncodingTable::Standard,
            },
        })
    }

    pub fn num_glyphs(&self) -> usize {
        self.char_strings.len()
    }

    /// Serialise this font as a CFF font set holding just this font.
    pub fn compile(&self, options: &CompileOptions) -> Result<Vec<u8>, WriteError> {
        let num_glyphs = self.num_glyphs();
        if num_glyphs == 0 || self.charset.len() != num_glyphs {
            return Err(WriteError::BadValue);
        }

        let mut top_dict = self.top_dict.clone();
        let predefined_charset = match &self.charset {
            GlyphSet::Names(names) if options.use_predefined_charsets => predefined_charset(names),
            _ => None,
        };
        top_dict.charset = predefined_charset.unwrap_or(OFFSET_PLACEHOLDER);
        top_dict.char_strings = Some(OFFSET_PLACEHOLDER);
        top_dict.synthetic_base = None;
        top_dict.charstring_type = 2.0;
        match &self.kind {
            FontKind::Type1 { encoding, .. } => {
                if top_dict.ros.is_some() {
                    return Err(WriteError::BadValue);
                }
                top_dict.encoding = match encoding {
                    EncodingTable::Standard => 0,
                    EncodingTable::Expert => 1,
                    EncodingTable::Custom { .. } => OFFSET_PLACEHOLDER,
                };
                top_dict.private = Some((OFFSET_PLACEHOLDER, OFFSET_PLACEHOLDER));
                top_dict.fd_array = None;
                top_dict.fd_select = None;
            }
            FontKind::Cid {
                font_dicts,
                fd_select,
            } => {
                if top_dict.ros.is_none() || font_dicts.is_empty() || fd_select.len() != num_glyphs
                {
                    return Err(WriteError::BadValue);
                }
                if fd_select.iter().any(|&fd| usize::from(fd) >= font_dicts.len()) {
                    return Err(WriteError::BadValue);
                }
                top_dict.encoding = 0;
                top_dict.private = None;
                top_dict.fd_array = Some(OFFSET_PLACEHOLDER);
                top_dict.fd_select = Some(OFFSET_PLACEHOLDER);
            }
        }

        // Every string must be interned before the String INDEX is written
        let mut strings = StringTable::new();
        let top_dict_placeholder = dict_index(&top_dict.to_dict(&mut strings)?)?;
        let font_dicts = match &self.kind {
            FontKind::Cid { font_dicts, .. } => font_dicts
                .iter()
                .map(|data| {
                    let mut font_dict = data.font_dict.clone();
                    font_dict.private = Some((OFFSET_PLACEHOLDER, OFFSET_PLACEHOLDER));
                    font_dict.to_dict(&mut strings)?;
                    Ok(font_dict)
                })
                .collect::<Result<Vec<_>, WriteError>>()?,
            FontKind::Type1 { .. } => Vec::new(),
        };
        let glyph_ids = match &self.charset {
            GlyphSet::Names(names) => names
                .iter()
                .map(|name| strings.intern(name))
                .collect::<Result<Vec<_>, _>>()?,
            GlyphSet::Cids(cids) => cids.clone(),
        };
        let supplements = match &self.kind {
            FontKind::Type1 {
                encoding: EncodingTable::Custom { supplements, .. },
                ..
            } => supplements
                .iter()
                .map(|(code, name)| Ok((*code, strings.intern(name)?)))
                .collect::<Result<Vec<_>, WriteError>>()?,
            _ => Vec::new(),
        };

        let mut buffer = WriteBuffer::new();
        Header::write(
            &mut buffer,
            &Header {
                major: 1,
                minor: 0,
                hdr_size: 4,
                off_size: 4,
            },
        )?;
        owned::Index::write(&mut buffer, &owned::Index::new(vec![self.name.clone().into_bytes()]))?;
        let top_dict_index_placeholder =
            buffer.reserve::<owned::Index, _>(top_dict_placeholder.size())?;
        let string_index = owned::Index::new(
            strings
                .strings()
                .iter()
                .map(|string| string.clone().into_bytes())
                .collect(),
        );
        owned::Index::write(&mut buffer, &string_index)?;
        owned::Index::write(&mut buffer, &owned::Index::new(self.global_subrs.clone()))?;

        top_dict.char_strings = Some(buffer.bytes_written());
        debug!("CharStrings at {}", buffer.bytes_written());
        owned::Index::write(&mut buffer, &owned::Index::new(self.char_strings.clone()))?;

        if predefined_charset.is_none() {
            top_dict.charset = buffer.bytes_written();
            debug!("charset at {}", buffer.bytes_written());
            write_charset(&mut buffer, &glyph_ids[1..])?;
        }

        match &self.kind {
            FontKind::Type1 {
                private_dict,
                local_subrs,
                encoding,
            } => {
                if let EncodingTable::Custom { codes, .. } = encoding {
                    if codes.len() >= num_glyphs {
                        return Err(WriteError::BadValue);
                    }
                    top_dict.encoding = buffer.bytes_written();
                    debug!("Encoding at {}", buffer.bytes_written());
                    write_encoding(&mut buffer, codes, &supplements)?;
                }
                top_dict.private = Some(write_private_dict(&mut buffer, private_dict, local_subrs)?);
            }
            FontKind::Cid {
                font_dicts: fd_data,
                fd_select,
            } => {
                top_dict.fd_select = Some(buffer.bytes_written());
                debug!("FDSelect at {}", buffer.bytes_written());
                write_fd_select(&mut buffer, fd_select)?;

                top_dict.fd_array = Some(buffer.bytes_written());
                debug!("FDArray at {}", buffer.bytes_written());
                let font_dict_placeholder = font_dict_index(&font_dicts, &mut strings)?;
                let font_dict_index_placeholder =
                    buffer.reserve::<owned::Index, _>(font_dict_placeholder.size())?;

                let mut font_dicts = font_dicts;
                for (font_dict, data) in font_dicts.iter_mut().zip(fd_data) {
                    font_dict.private = Some(write_private_dict(
                        &mut buffer,
                        &data.private_dict,
                        &data.local_subrs,
                    )?);
                }
                let font_dict_index = font_dict_index(&font_dicts, &mut strings)?;
                buffer.write_placeholder(font_dict_index_placeholder, &font_dict_index)?;
            }
        }

        // Pass 2: fill in the real offsets
        let top_dict_index = dict_index(&top_dict.to_dict(&mut strings)?)?;
        buffer.write_placeholder(top_dict_index_placeholder, &top_dict_index)?;
        debug!("wrote {} byte CFF for {}", buffer.len(), self.name);

        Ok(buffer.into_inner())
    }
}

impl GlyphSet {
    pub fn len(&self) -> usize {
        match self {
            GlyphSet::Names(names) => names.len(),
            GlyphSet::Cids(cids) => cids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Copy of `private_dict` for flattened charstrings whose widths are `widths`.
///
/// `defaultWidthX` becomes the most common width and `nominalWidthX` 0.
fn flattened_private_dict(
    private_dict: &PrivateDict,
    widths: impl Iterator<Item = f64>,
) -> PrivateDict {
    let default_width_x = widths
        .sorted_by(f64::total_cmp)
        .dedup_with_count()
        .max_by_key(|(count, _)| *count)
        .map_or(0.0, |(_, width)| width);

    PrivateDict {
        subrs: None,
        default_width_x,
        nominal_width_x: 0.0,
        ..private_dict.clone()
    }
}

fn encode_glyph(glyph: &GlyphResult, widths: &Widths) -> Result<Vec<u8>, WriteError> {
    match &glyph.program {
        Some(instructions) => program::to_type2(instructions, glyph.width, widths),
        None => program::to_type2(&[Instruction::EndChar], glyph.width, widths),
    }
}

fn dict_index(dict: &Dict) -> Result<owned::Index, WriteError> {
    let mut data = WriteBuffer::new();
    Dict::write(&mut data, dict)?;
    Ok(owned::Index::new(vec![data.into_inner()]))
}

fn font_dict_index(
    font_dicts: &[FontDict],
    strings: &mut StringTable,
) -> Result<owned::Index, WriteError> {
    let data = font_dicts
        .iter()
        .map(|font_dict| {
            let mut data = WriteBuffer::new();
            Dict::write(&mut data, &font_dict.to_dict(strings)?)?;
            Ok(data.into_inner())
        })
        .collect::<Result<_, WriteError>>()?;
    Ok(owned::Index::new(data))
}

/// Write a Private DICT followed by its local subroutines, returning its size and offset.
fn write_private_dict<C: WriteContext>(
    ctxt: &mut C,
    private_dict: &PrivateDict,
    local_subrs: &[Vec<u8>],
) -> Result<(usize, usize), WriteError> {
    let mut private_dict = private_dict.clone();
    // The Private DICT holds no strings
    let mut strings = StringTable::new();
    private_dict.subrs = None;
    if !local_subrs.is_empty() {
        // The Subrs offset is relative to the start of the Private DICT, so the subroutines
        // directly follow it.
        private_dict.subrs = Some(OFFSET_PLACEHOLDER);
        let size = Dict::write(&mut WriteBuffer::new(), &private_dict.to_dict(&mut strings)?)?;
        private_dict.subrs = Some(size);
    }

    let offset = ctxt.bytes_written();
    debug!("Private DICT at {}", offset);
    let size = Dict::write(ctxt, &private_dict.to_dict(&mut strings)?)?;
    if !local_subrs.is_empty() {
        owned::Index::write(ctxt, &owned::Index::new(local_subrs.to_vec()))?;
    }

    Ok((size, offset))
}

/// Returns the id of the predefined charset naming the glyphs `names`, if there is one.
fn predefined_charset(names: &[String]) -> Option<usize> {
    let sids = names
        .iter()
        .map(|name| standard_sid(name))
        .collect::<Option<Vec<_>>>()?;
    let iso_adobe = sids
        .iter()
        .enumerate()
        .all(|(glyph_id, &sid)| usize::from(sid) == glyph_id && sid <= ISO_ADOBE_LAST_SID);
    if iso_adobe {
        Some(0)
    } else if is_prefix_of(&sids, &EXPERT_CHARSET) {
        Some(1)
    } else if is_prefix_of(&sids, &EXPERT_SUBSET_CHARSET) {
        Some(2)
    } else {
        None
    }
}

fn is_prefix_of(sids: &[SID], charset: &[SID]) -> bool {
    sids.len() <= charset.len() && charset.starts_with(sids)
}

/// Group `ids` into runs of consecutive values of at most `max_len` ids.
fn id_ranges(ids: &[u16], max_len: usize) -> Vec<(u16, usize)> {
    let mut ranges: Vec<(u16, usize)> = Vec::new();
    for &id in ids {
        match ranges.last_mut() {
            Some((first, len))
                if *len < max_len && usize::from(*first) + *len == usize::from(id) =>
            {
                *len += 1
            }
            _ => ranges.push((id, 1)),
        }
    }
    ranges
}

/// Write a custom charset for the glyphs after .notdef in the smallest format.
fn write_charset<C: WriteContext>(ctxt: &mut C, ids: &[SID]) -> Result<(), WriteError> {
    let ranges_u8 = id_ranges(ids, 0x100);
    let ranges_u16 = id_ranges(ids, 0x1_0000);
    let format0_size = 2 * ids.len();
    let format1_size = 3 * ranges_u8.len();
    let format2_size = 4 * ranges_u16.len();

    if format0_size <= format1_size && format0_size <= format2_size {
        U8::write(ctxt, 0)?;
        ctxt.write_iter::<U16Be, _>(ids.iter().copied())?;
    } else if format1_size <= format2_size {
        U8::write(ctxt, 1)?;
        for (first, len) in ranges_u8 {
            let n_left = u8::try_from(len - 1)?;
            Range::<SID, u8>::write(ctxt, Range { first, n_left })?;
        }
    } else {
        U8::write(ctxt, 2)?;
        for (first, len) in ranges_u16 {
            let n_left = u16::try_from(len - 1)?;
            Range::<SID, u16>::write(ctxt, Range { first, n_left })?;
        }
    }

    Ok(())
}

fn write_encoding<C: WriteContext>(
    ctxt: &mut C,
    codes: &[u8],
    supplements: &[(u8, SID)],
) -> Result<(), WriteError> {
    let supplement_flag = if supplements.is_empty() { 0 } else { 0x80 };
    let ranges = id_ranges(&codes.iter().map(|&code| u16::from(code)).collect_vec(), 0x100);

    if codes.len() <= 2 * ranges.len() {
        U8::write(ctxt, supplement_flag)?;
        U8::write(ctxt, u8::try_from(codes.len())?)?;
        ctxt.write_bytes(codes)?;
    } else {
        U8::write(ctxt, 1 | supplement_flag)?;
        U8::write(ctxt, u8::try_from(ranges.len())?)?;
        for (first, len) in ranges {
            let range = Range {
                first: u8::try_from(first)?,
                n_left: u8::try_from(len - 1)?,
            };
            Range::<u8, u8>::write(ctxt, range)?;
        }
    }

    if !supplements.is_empty() {
        U8::write(ctxt, u8::try_from(supplements.len())?)?;
        for &(code, sid) in supplements {
            U8::write(ctxt, code)?;
            U16Be::write(ctxt, sid)?;
        }
    }

    Ok(())
}

/// Write a format 3 FDSelect.
fn write_fd_select<C: WriteContext>(ctxt: &mut C, fd_select: &[u8]) -> Result<(), WriteError> {
    let mut ranges: Vec<(u16, u8)> = Vec::new();
    for (glyph_id, &fd) in fd_select.iter().enumerate() {
        if ranges.last().map(|&(_, last_fd)| last_fd) != Some(fd) {
            ranges.push((u16::try_from(glyph_id)?, fd));
        }
    }

    U8::write(ctxt, 3)?;
    U16Be::write(ctxt, u16::try_from(ranges.len())?)?;
    for (first, fd) in ranges {
        U16Be::write(ctxt, first)?;
        U8::write(ctxt, fd)?;
    }
    // Sentinel
    U16Be::write(ctxt, u16::try_from(fd_select.len())?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::binary::read::ReadScope;
    use crate::cff::dict::Ros;
    use crate::cff::Charset;
    use crate::charstring::program::Instruction::*;
    use crate::error::ParseError;

    fn glyph(width: f64, program: Vec<Instruction>) -> GlyphResult {
        GlyphResult {
            width: Some(width),
            bbox: program::bbox(&program),
            seac: None,
            program: Some(program),
        }
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn simple_font(glyph_names: &[&str]) -> FontProgram {
        let glyphs = glyph_names
            .iter()
            .enumerate()
            .map(|(i, _)| {
                glyph(
                    500.0,
                    vec![MoveTo(10.0, 0.0), LineTo(i as f64 * 10.0 + 10.0, 100.0), EndChar],
                )
            })
            .collect_vec();
        FontProgram::from_glyph_results(
            "Test",
            names(glyph_names),
            &glyphs,
            &PrivateDict::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_placeholder_is_widest_offset() {
        // Any offset into a font of up to 10 MB encodes no wider than the placeholder
        let mut strings = StringTable::new();
        let mut top_dict = TopDict {
            char_strings: Some(OFFSET_PLACEHOLDER),
            private: Some((OFFSET_PLACEHOLDER, OFFSET_PLACEHOLDER)),
            ..TopDict::default()
        };
        let placeholder = dict_index(&top_dict.to_dict(&mut strings).unwrap()).unwrap();
        for offset in [0, 1, 107, 108, 1131, 1132, 32767, 32768, 10 * 1024 * 1024] {
            top_dict.char_strings = Some(offset);
            top_dict.private = Some((offset, offset));
            let index = dict_index(&top_dict.to_dict(&mut strings).unwrap()).unwrap();
            assert!(index.size() <= placeholder.size());
        }
    }

    #[test]
    fn test_iso_adobe_names_use_predefined_charset() {
        let font = simple_font(&[".notdef", "space", "exclam", "quotedbl"]);
        let data = font.compile(&CompileOptions::default()).unwrap();
        let cff = ReadScope::new(&data).read::<CFF<'_>>().unwrap();
        let font = cff.font(0).unwrap();
        assert_eq!(font.top_dict.charset, 0);
        assert!(matches!(font.charset, Charset::ISOAdobe));
        assert_eq!(font.glyph_name(3), Some("quotedbl"));
    }

    #[test]
    fn test_predefined_charsets_can_be_disabled() {
        let font = simple_font(&[".notdef", "space", "exclam"]);
        let options = CompileOptions {
            use_predefined_charsets: false,
        };
        let data = font.compile(&options).unwrap();
        let cff = ReadScope::new(&data).read::<CFF<'_>>().unwrap();
        let font = cff.font(0).unwrap();
        assert!(matches!(font.charset, Charset::Custom(_)));
        assert_eq!(font.glyph_name(2), Some("exclam"));
    }

    #[test]
    fn test_predefined_charset() {
        assert_eq!(predefined_charset(&names(&[".notdef", "space"])), Some(0));
        // Out of order
        assert_eq!(predefined_charset(&names(&[".notdef", "exclam"])), None);
        assert_eq!(
            predefined_charset(&names(&[".notdef", "space", "exclamsmall"])),
            Some(1)
        );
        assert_eq!(
            predefined_charset(&names(&[".notdef", "space", "dollaroldstyle"])),
            Some(2)
        );
        assert_eq!(predefined_charset(&names(&[".notdef", "Ferris"])), None);
    }

    #[test]
    fn test_custom_strings_are_interned_once() {
        let font = simple_font(&[".notdef", "Ferris", "Crab", "Ferris.alt"]);
        let data = font.compile(&CompileOptions::default()).unwrap();
        let cff = ReadScope::new(&data).read::<CFF<'_>>().unwrap();
        // "Test" full name and three glyph names
        assert_eq!(cff.string_index.count, 4);
        let font = cff.font(0).unwrap();
        assert_eq!(font.glyph_name(1), Some("Ferris"));
        assert_eq!(font.glyph_name(3), Some("Ferris.alt"));
    }

    #[test]
    fn test_charset_format_selection() {
        let mut ctxt = WriteBuffer::new();
        write_charset(&mut ctxt, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(ctxt.bytes(), &[1, 0, 1, 4]);

        let mut ctxt = WriteBuffer::new();
        write_charset(&mut ctxt, &[7]).unwrap();
        assert_eq!(ctxt.bytes(), &[0, 0, 7]);

        let ids = (1..=300).collect_vec();
        let mut ctxt = WriteBuffer::new();
        write_charset(&mut ctxt, &ids).unwrap();
        assert_eq!(ctxt.bytes(), &[2, 0, 1, 0x01, 0x2B]);
    }

    #[test]
    fn test_custom_encoding() {
        let mut ctxt = WriteBuffer::new();
        write_encoding(&mut ctxt, &[65, 66, 67, 68], &[]).unwrap();
        assert_eq!(ctxt.bytes(), &[1, 1, 65, 3]);

        let mut ctxt = WriteBuffer::new();
        write_encoding(&mut ctxt, &[65, 70], &[(200, 391)]).unwrap();
        assert_eq!(ctxt.bytes(), &[0x80, 2, 65, 70, 1, 200, 0x01, 0x87]);
    }

    #[test]
    fn test_fd_select_format3() {
        let mut ctxt = WriteBuffer::new();
        write_fd_select(&mut ctxt, &[0, 0, 1, 1, 1, 0]).unwrap();
        assert_eq!(
            ctxt.bytes(),
            &[3, 0, 3, 0, 0, 0, 0, 2, 1, 0, 5, 0, 0, 6]
        );
    }

    #[test]
    fn test_most_common_width_is_default() {
        let private_dict = PrivateDict {
            nominal_width_x: 100.0,
            subrs: Some(10),
            ..PrivateDict::default()
        };
        let flat = flattened_private_dict(&private_dict, [500.0, 250.0, 500.0, 0.0].into_iter());
        assert_eq!(flat.default_width_x, 500.0);
        assert_eq!(flat.nominal_width_x, 0.0);
        assert_eq!(flat.subrs, None);
    }

    #[test]
    fn test_local_subrs_follow_private_dict() {
        let mut ctxt = WriteBuffer::new();
        ctxt.write_zeros(3).unwrap();
        let (size, offset) =
            write_private_dict(&mut ctxt, &PrivateDict::default(), &[vec![11]]).unwrap();
        assert_eq!(offset, 3);
        // Subrs operand: 29 + 4 bytes, operator 19
        assert_eq!(size, 6);
        assert_eq!(&ctxt.bytes()[3..], &[29, 0, 0, 0, 6, 19, 0, 1, 1, 1, 2, 11]);
    }

    #[test]
    fn test_cid_font_round_trip() {
        let top_dict = TopDict {
            ros: Some(Ros {
                registry: "Adobe".to_string(),
                ordering: "Identity".to_string(),
                supplement: 0.0,
            }),
            ..TopDict::default()
        };
        let font_dict = |name: &str| FontDictData {
            font_dict: FontDict {
                font_name: Some(name.to_string()),
                ..FontDict::default()
            },
            private_dict: PrivateDict {
                default_width_x: 1000.0,
                ..PrivateDict::default()
            },
            local_subrs: Vec::new(),
        };
        let widths = Widths {
            default_width_x: 1000.0,
            nominal_width_x: 0.0,
        };
        let char_strings = (0..3)
            .map(|_| program::to_type2(&[EndChar], Some(1000.0), &widths).unwrap())
            .collect_vec();
        let program = FontProgram {
            name: "CIDTest".to_string(),
            top_dict,
            global_subrs: Vec::new(),
            char_strings,
            charset: GlyphSet::Cids(vec![0, 1, 5]),
            kind: FontKind::Cid {
                font_dicts: vec![font_dict("CIDTest-One"), font_dict("CIDTest-Two")],
                fd_select: vec![0, 1, 1],
            },
        };

        let data = program.compile(&CompileOptions::default()).unwrap();
        let cff = ReadScope::new(&data).read::<CFF<'_>>().unwrap();
        let font = cff.font(0).unwrap();
        assert!(font.is_cid_keyed());
        assert_eq!(font.num_glyphs(), 3);
        assert_eq!(font.charset.id_for_glyph(2), Some(5));
        assert_eq!(font.font_dict_index(0), Some(0));
        assert_eq!(font.font_dict_index(2), Some(1));
        assert_eq!(font.private_dict(1).map(|p| p.default_width_x), Some(1000.0));
        assert_eq!(font.glyph_name(1), None);
        match &font.data {
            CFFVariant::CID(cid) => {
                assert_eq!(cid.font_dicts[1].font_name.as_deref(), Some("CIDTest-Two"))
            }
            CFFVariant::Type1(_) => panic!("expected a CID-keyed font"),
        }
    }

    #[test]
    fn test_mismatched_glyph_names() {
        let glyphs = vec![GlyphResult::empty()];
        assert_eq!(
            FontProgram::from_glyph_results("Test", Vec::new(), &glyphs, &PrivateDict::default()),
            Err(WriteError::BadValue)
        );
        assert!(matches!(
            ReadScope::new(&[]).read::<CFF<'_>>(),
            Err(ParseError::BadEof)
        ));
    }
}
