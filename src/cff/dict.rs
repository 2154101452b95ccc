//! CFF DICT data.
//!
//! A DICT is a list of operand sequences, each terminated by an operator. The raw form is kept in
//! [Dict]. The dictionaries a font is made of ([TopDict], [FontDict] and [PrivateDict]) map
//! operators onto named properties through a static [Schema] per dictionary shape.
//!
//! Refer to Technical Note #5176, section 4 "DICT Data".

use std::convert::{TryFrom, TryInto};

use lazy_static::lazy_static;
use log::warn;
use rustc_hash::FxHashMap;
use tinyvec::TinyVec;

use crate::binary::read::{ReadBinary, ReadCtxt};
use crate::binary::write::{WriteBinary, WriteContext};
use crate::binary::{I16Be, I32Be, U16Be, U8};
use crate::error::{ParseError, WriteError};

use super::standard::{standard_sid, STANDARD_STRINGS};
use super::{read_string, Index, SID};

/// Most operands an operator may take.
pub const MAX_OPERANDS: usize = 48;

/// Value given to offset properties before the data they point at has been written.
///
/// Offsets are always written in the 5 byte form, so the placeholder and any true offset up to
/// 2 GB occupy the same space.
pub const OFFSET_PLACEHOLDER: usize = i32::MAX as usize;

const END_OF_FLOAT_FLAG: u8 = 0xf;
const FLOAT_BUF_LEN: usize = 64;

/// A DICT as read from a font: each operator with its operands.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Dict {
    dict: Vec<(Operator, Vec<Operand>)>,
}

#[derive(Debug, PartialEq)]
pub(crate) enum Op {
    Operator(Operator),
    Operand(Operand),
}

/// CFF operand to an operator
#[derive(Debug, PartialEq, Clone)]
pub enum Operand {
    Integer(i32),
    /// An integer that is always written in the 5 byte form.
    Offset(i32),
    Real(Real),
}

// Real values in fonts are up to 7 bytes long, so this rarely spills onto the heap.

/// A real number, as its nibble encoding.
///
/// To parse the value into `f64` use the `TryFrom`/`TryInto` impl.
#[derive(Debug, PartialEq, Clone)]
pub struct Real(TinyVec<[u8; 7]>);

#[repr(u16)]
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Operator {
    Version = 0,
    Notice = 1,
    FullName = 2,
    FamilyName = 3,
    Weight = 4,
    FontBBox = 5,
    BlueValues = 6,
    OtherBlues = 7,
    FamilyBlues = 8,
    FamilyOtherBlues = 9,
    StdHW = 10,
    StdVW = 11,
    UniqueID = 13,
    XUID = 14,
    Charset = 15,
    Encoding = 16,
    CharStrings = 17,
    Private = 18,
    Subrs = 19,
    DefaultWidthX = 20,
    NominalWidthX = 21,
    Copyright = op2(0),
    IsFixedPitch = op2(1),
    ItalicAngle = op2(2),
    UnderlinePosition = op2(3),
    UnderlineThickness = op2(4),
    PaintType = op2(5),
    CharstringType = op2(6),
    FontMatrix = op2(7),
    StrokeWidth = op2(8),
    BlueScale = op2(9),
    BlueShift = op2(10),
    BlueFuzz = op2(11),
    StemSnapH = op2(12),
    StemSnapV = op2(13),
    ForceBold = op2(14),
    LanguageGroup = op2(17),
    ExpansionFactor = op2(18),
    InitialRandomSeed = op2(19),
    SyntheticBase = op2(20),
    PostScript = op2(21),
    BaseFontName = op2(22),
    BaseFontBlend = op2(23),
    ROS = op2(30),
    CIDFontVersion = op2(31),
    CIDFontRevision = op2(32),
    CIDFontType = op2(33),
    CIDCount = op2(34),
    UIDBase = op2(35),
    FDArray = op2(36),
    FDSelect = op2(37),
    FontName = op2(38),
}

const fn op2(value: u8) -> u16 {
    (12 << 8) | (value as u16)
}

/// How the operands of a property are laid out.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Kind {
    Number,
    Boolean,
    Array,
    /// An array stored as differences between successive values.
    Delta,
    /// A string, stored as its string id.
    Sid,
    /// A position in the font data.
    Offset,
    /// The size and position of the Private DICT.
    SizeOffset,
    /// Registry, ordering and supplement of a CID font.
    Ros,
}

/// The decoded value of a property.
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Number(f64),
    Array(Vec<f64>),
    String(String),
    Ros(Ros),
}

/// Registry-Ordering-Supplement of a CID-keyed font.
#[derive(Debug, PartialEq, Clone)]
pub struct Ros {
    pub registry: String,
    pub ordering: String,
    pub supplement: f64,
}

/// A named property of a dictionary.
pub struct Field<D> {
    pub operator: Operator,
    pub kind: Kind,
    get: fn(&D) -> Option<Value>,
    set: fn(&mut D, Value) -> Result<(), ParseError>,
    /// Value of the property when the operator is absent. Default values are not written.
    pub default: Option<Value>,
}

/// The properties of one dictionary shape, in the order they are written.
pub struct Schema<D> {
    fields: Vec<Field<D>>,
}

/// A dictionary with named properties.
pub trait DictSchema: Default + Sized + 'static {
    fn schema() -> &'static Schema<Self>;

    /// Decode the properties of `dict`, looking up strings in `string_index`.
    fn from_dict(dict: &Dict, string_index: &Index<'_>) -> Result<Self, ParseError> {
        Self::schema().decode(dict, string_index)
    }

    /// Encode the non-default properties of `self`, interning strings into `strings`.
    fn to_dict(&self, strings: &mut StringTable) -> Result<Dict, WriteError> {
        Self::schema().encode(self, strings)
    }
}

/// Conversion between a property's Rust type and its decoded value.
trait Property: Sized {
    fn to_value(&self) -> Option<Value>;

    fn from_value(value: Value) -> Result<Self, ParseError>;
}

/// The Top DICT of a font.
#[derive(Debug, PartialEq, Clone)]
pub struct TopDict {
    pub ros: Option<Ros>,
    pub version: Option<String>,
    pub notice: Option<String>,
    pub copyright: Option<String>,
    pub full_name: Option<String>,
    pub family_name: Option<String>,
    pub weight: Option<String>,
    pub is_fixed_pitch: bool,
    pub italic_angle: f64,
    pub underline_position: f64,
    pub underline_thickness: f64,
    pub paint_type: f64,
    pub charstring_type: f64,
    pub font_matrix: Vec<f64>,
    pub unique_id: Option<f64>,
    pub font_bbox: Vec<f64>,
    pub stroke_width: f64,
    pub xuid: Option<Vec<f64>>,
    /// Offset to the charset, or a predefined charset id (0 to 2).
    pub charset: usize,
    /// Offset to the encoding, or a predefined encoding id (0 or 1).
    pub encoding: usize,
    pub char_strings: Option<usize>,
    /// Size and offset of the Private DICT.
    pub private: Option<(usize, usize)>,
    pub synthetic_base: Option<f64>,
    pub post_script: Option<String>,
    pub base_font_name: Option<String>,
    pub base_font_blend: Option<Vec<f64>>,
    pub cid_font_version: f64,
    pub cid_font_revision: f64,
    pub cid_font_type: f64,
    pub cid_count: f64,
    pub uid_base: Option<f64>,
    pub fd_array: Option<usize>,
    pub fd_select: Option<usize>,
    pub font_name: Option<String>,
}

/// A Font DICT of the FDArray of a CID-keyed font.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct FontDict {
    pub font_name: Option<String>,
    pub font_matrix: Option<Vec<f64>>,
    pub private: Option<(usize, usize)>,
}

/// A Private DICT.
#[derive(Debug, PartialEq, Clone)]
pub struct PrivateDict {
    pub blue_values: Vec<f64>,
    pub other_blues: Vec<f64>,
    pub family_blues: Vec<f64>,
    pub family_other_blues: Vec<f64>,
    pub blue_scale: f64,
    pub blue_shift: f64,
    pub blue_fuzz: f64,
    pub std_hw: Option<f64>,
    pub std_vw: Option<f64>,
    pub stem_snap_h: Vec<f64>,
    pub stem_snap_v: Vec<f64>,
    pub force_bold: bool,
    pub language_group: f64,
    pub expansion_factor: f64,
    pub initial_random_seed: f64,
    /// Offset to the local subroutines, relative to the start of the Private DICT.
    pub subrs: Option<usize>,
    pub default_width_x: f64,
    pub nominal_width_x: f64,
}

/// Strings collected for the String INDEX of a font being written.
///
/// Standard strings resolve to their predefined SID. Every other string is stored once and
/// numbered from 391 in the order it was first seen.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    strings: Vec<String>,
    sids: FxHashMap<String, SID>,
}

macro_rules! field {
    ($dict:ty, $operator:ident, $kind:ident, $name:ident) => {
        Field::<$dict> {
            operator: Operator::$operator,
            kind: Kind::$kind,
            get: |dict: &$dict| Property::to_value(&dict.$name),
            set: |dict: &mut $dict, value: Value| -> Result<(), ParseError> {
                dict.$name = Property::from_value(value)?;
                Ok(())
            },
            default: None,
        }
    };
}

lazy_static! {
    static ref TOP_DICT_SCHEMA: Schema<TopDict> = Schema::new(vec![
        // ROS must be the first operator of a CID-keyed font
        field!(TopDict, ROS, Ros, ros),
        field!(TopDict, Version, Sid, version),
        field!(TopDict, Notice, Sid, notice),
        field!(TopDict, Copyright, Sid, copyright),
        field!(TopDict, FullName, Sid, full_name),
        field!(TopDict, FamilyName, Sid, family_name),
        field!(TopDict, Weight, Sid, weight),
        field!(TopDict, IsFixedPitch, Boolean, is_fixed_pitch),
        field!(TopDict, ItalicAngle, Number, italic_angle),
        field!(TopDict, UnderlinePosition, Number, underline_position),
        field!(TopDict, UnderlineThickness, Number, underline_thickness),
        field!(TopDict, PaintType, Number, paint_type),
        field!(TopDict, CharstringType, Number, charstring_type),
        field!(TopDict, FontMatrix, Array, font_matrix),
        field!(TopDict, UniqueID, Number, unique_id),
        field!(TopDict, FontBBox, Array, font_bbox),
        field!(TopDict, StrokeWidth, Number, stroke_width),
        field!(TopDict, XUID, Array, xuid),
        field!(TopDict, Charset, Offset, charset),
        field!(TopDict, Encoding, Offset, encoding),
        field!(TopDict, CharStrings, Offset, char_strings),
        field!(TopDict, Private, SizeOffset, private),
        field!(TopDict, SyntheticBase, Number, synthetic_base),
        field!(TopDict, PostScript, Sid, post_script),
        field!(TopDict, BaseFontName, Sid, base_font_name),
        field!(TopDict, BaseFontBlend, Delta, base_font_blend),
        field!(TopDict, CIDFontVersion, Number, cid_font_version),
        field!(TopDict, CIDFontRevision, Number, cid_font_revision),
        field!(TopDict, CIDFontType, Number, cid_font_type),
        field!(TopDict, CIDCount, Number, cid_count),
        field!(TopDict, UIDBase, Number, uid_base),
        field!(TopDict, FDArray, Offset, fd_array),
        field!(TopDict, FDSelect, Offset, fd_select),
        field!(TopDict, FontName, Sid, font_name),
    ]);
    static ref FONT_DICT_SCHEMA: Schema<FontDict> = Schema::new(vec![
        field!(FontDict, FontName, Sid, font_name),
        field!(FontDict, FontMatrix, Array, font_matrix),
        field!(FontDict, Private, SizeOffset, private),
    ]);
    static ref PRIVATE_DICT_SCHEMA: Schema<PrivateDict> = Schema::new(vec![
        field!(PrivateDict, BlueValues, Delta, blue_values),
        field!(PrivateDict, OtherBlues, Delta, other_blues),
        field!(PrivateDict, FamilyBlues, Delta, family_blues),
        field!(PrivateDict, FamilyOtherBlues, Delta, family_other_blues),
        field!(PrivateDict, BlueScale, Number, blue_scale),
        field!(PrivateDict, BlueShift, Number, blue_shift),
        field!(PrivateDict, BlueFuzz, Number, blue_fuzz),
        field!(PrivateDict, StdHW, Number, std_hw),
        field!(PrivateDict, StdVW, Number, std_vw),
        field!(PrivateDict, StemSnapH, Delta, stem_snap_h),
        field!(PrivateDict, StemSnapV, Delta, stem_snap_v),
        field!(PrivateDict, ForceBold, Boolean, force_bold),
        field!(PrivateDict, LanguageGroup, Number, language_group),
        field!(PrivateDict, ExpansionFactor, Number, expansion_factor),
        field!(PrivateDict, InitialRandomSeed, Number, initial_random_seed),
        field!(PrivateDict, Subrs, Offset, subrs),
        field!(PrivateDict, DefaultWidthX, Number, default_width_x),
        field!(PrivateDict, NominalWidthX, Number, nominal_width_x),
    ]);
}

impl ReadBinary for Dict {
    type HostType<'b> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let mut dict = Vec::new();
        let mut operands = Vec::new();

        while ctxt.bytes_available() {
            match Op::read(ctxt)? {
                Op::Operator(operator) => {
                    dict.push((operator, std::mem::take(&mut operands)));
                }
                Op::Operand(operand) => {
                    operands.push(operand);
                    if operands.len() > MAX_OPERANDS {
                        return Err(ParseError::LimitExceeded);
                    }
                }
            }
        }

        Ok(Dict { dict })
    }
}

impl WriteBinary<&Self> for Dict {
    type Output = usize; // The length of the written Dict

    fn write<C: WriteContext>(ctxt: &mut C, dict: &Dict) -> Result<usize, WriteError> {
        let offset = ctxt.bytes_written();
        for (operator, operands) in dict.iter() {
            for operand in operands {
                Operand::write(ctxt, operand)?;
            }
            Operator::write(ctxt, *operator)?;
        }

        Ok(ctxt.bytes_written() - offset)
    }
}

impl ReadBinary for Op {
    type HostType<'b> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let b0 = ctxt.read_u8()?;

        match b0 {
            0..=11 | 13..=21 => ok_operator(u16::from(b0).try_into()?),
            12 => ok_operator(op2(ctxt.read_u8()?).try_into()?),
            28 => ok_int(i32::from(ctxt.read_i16be()?)),
            29 => ok_int(ctxt.read_i32be()?),
            30 => ok_real(ctxt.read_until_nibble(END_OF_FLOAT_FLAG)?),
            32..=246 => ok_int(i32::from(b0) - 139),
            247..=250 => {
                let b1 = ctxt.read_u8()?;
                ok_int((i32::from(b0) - 247) * 256 + i32::from(b1) + 108)
            }
            251..=254 => {
                let b1 = ctxt.read_u8()?;
                ok_int(-(i32::from(b0) - 251) * 256 - i32::from(b1) - 108)
            }
            22..=27 | 31 | 255 => Err(ParseError::BadValue), // reserved
        }
    }
}

impl WriteBinary<Self> for Operator {
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, op: Operator) -> Result<(), WriteError> {
        let value = op as u16;
        if value > 0xFF {
            U16Be::write(ctxt, value)?;
        } else {
            U8::write(ctxt, value as u8)?;
        }

        Ok(())
    }
}

impl WriteBinary<&Self> for Operand {
    type Output = ();

    // Refer to Table 3 Operand Encoding in section 4 of Technical Note #5176 for details on the
    // integer encoding scheme.
    fn write<C: WriteContext>(ctxt: &mut C, op: &Operand) -> Result<(), WriteError> {
        match op {
            Operand::Integer(val) => match *val {
                // NOTE: Casts are safe due to patterns limiting range
                -107..=107 => {
                    U8::write(ctxt, (val + 139) as u8)?;
                }
                108..=1131 => {
                    let val = *val - 108;
                    U8::write(ctxt, ((val >> 8) + 247) as u8)?;
                    U8::write(ctxt, val as u8)?;
                }
                -1131..=-108 => {
                    let val = -*val - 108;
                    U8::write(ctxt, ((val >> 8) + 251) as u8)?;
                    U8::write(ctxt, val as u8)?;
                }
                -32768..=32767 => {
                    U8::write(ctxt, 28)?;
                    I16Be::write(ctxt, *val as i16)?
                }
                _ => {
                    U8::write(ctxt, 29)?;
                    I32Be::write(ctxt, *val)?
                }
            },
            Operand::Offset(val) => {
                U8::write(ctxt, 29)?;
                I32Be::write(ctxt, *val)?;
            }
            Operand::Real(Real(val)) => {
                U8::write(ctxt, 30)?;
                ctxt.write_bytes(val)?;
            }
        }

        Ok(())
    }
}

fn ok_operator(op: Operator) -> Result<Op, ParseError> {
    Ok(Op::Operator(op))
}

fn ok_int(num: i32) -> Result<Op, ParseError> {
    Ok(Op::Operand(Operand::Integer(num)))
}

fn ok_real(slice: &[u8]) -> Result<Op, ParseError> {
    Ok(Op::Operand(Operand::Real(Real(TinyVec::from(slice)))))
}

// Portions of this try_from impl derived from ttf-parser, licenced under Apache-2.0.
// https://github.com/RazrFalcon/ttf-parser/blob/ba2d9c8b9a207951b7b07e9481bc74688762bd21/src/tables/cff/dict.rs#L188
impl TryFrom<&Real> for f64 {
    type Error = ParseError;

    /// Try to parse this `Real` into an `f64`.
    fn try_from(real: &Real) -> Result<Self, Self::Error> {
        let mut buf = [0u8; FLOAT_BUF_LEN];
        let mut used = 0;

        for &byte in real.0.iter() {
            let nibble1 = byte >> 4;
            let nibble2 = byte & 0xF;

            if nibble1 == END_OF_FLOAT_FLAG {
                break;
            }
            parse_float_nibble(nibble1, &mut used, &mut buf)?;
            if nibble2 == END_OF_FLOAT_FLAG {
                break;
            }
            parse_float_nibble(nibble2, &mut used, &mut buf)?;
        }

        let s = std::str::from_utf8(&buf[..used]).map_err(|_| ParseError::BadValue)?;
        s.parse().map_err(|_| ParseError::BadValue)
    }
}

impl TryFrom<Real> for f64 {
    type Error = ParseError;

    fn try_from(real: Real) -> Result<Self, Self::Error> {
        f64::try_from(&real)
    }
}

// Adobe Technical Note #5176, Table 5 Nibble Definitions
fn parse_float_nibble(nibble: u8, idx: &mut usize, data: &mut [u8]) -> Result<(), ParseError> {
    if *idx == FLOAT_BUF_LEN {
        return Err(ParseError::LimitExceeded);
    }

    match nibble {
        0..=9 => {
            data[*idx] = b'0' + nibble;
        }
        10 => {
            data[*idx] = b'.';
        }
        11 => {
            data[*idx] = b'E';
        }
        12 => {
            if *idx + 1 == FLOAT_BUF_LEN {
                return Err(ParseError::LimitExceeded);
            }

            data[*idx] = b'E';
            *idx += 1;
            data[*idx] = b'-';
        }
        14 => {
            data[*idx] = b'-';
        }
        _ => return Err(ParseError::BadValue),
    }

    *idx += 1;
    Ok(())
}

impl Real {
    /// Encode `value` in the fewest nibbles, using exponent form when that is shorter.
    pub fn from_f64(value: f64) -> Result<Real, WriteError> {
        if !value.is_finite() {
            return Err(WriteError::BadValue);
        }
        let plain = float_nibbles(&format!("{}", value))?;
        let exponent = float_nibbles(&format!("{:e}", value))?;
        let nibbles = if exponent.len() < plain.len() {
            exponent
        } else {
            plain
        };

        let bytes = nibbles
            .chunks(2)
            .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(END_OF_FLOAT_FLAG))
            .collect::<TinyVec<[u8; 7]>>();
        Ok(Real(bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Nibbles for a number printed by `format!`, ending with the end of number nibble.
fn float_nibbles(s: &str) -> Result<Vec<u8>, WriteError> {
    // A leading zero before the point is redundant
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s),
    };
    let digits = match digits.strip_prefix("0.") {
        Some(fraction) if !fraction.is_empty() => &digits[1..],
        _ => digits,
    };

    let mut nibbles = Vec::with_capacity(s.len() + 2);
    let mut chars = sign.chars().chain(digits.chars()).peekable();
    while let Some(c) = chars.next() {
        match c {
            '0'..='9' => nibbles.push(c as u8 - b'0'),
            '.' => nibbles.push(0xa),
            'e' | 'E' => {
                if chars.next_if_eq(&'-').is_some() {
                    nibbles.push(0xc);
                } else {
                    nibbles.push(0xb);
                }
            }
            '-' => nibbles.push(0xe),
            _ => return Err(WriteError::BadValue),
        }
    }
    nibbles.push(END_OF_FLOAT_FLAG);

    Ok(nibbles)
}

impl Operand {
    pub fn is_offset(&self) -> bool {
        matches!(self, Operand::Offset(_))
    }

    /// An integer operand when `value` is integral, a real one otherwise.
    pub fn from_f64(value: f64) -> Result<Operand, WriteError> {
        if value.fract() == 0.0 && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
            Ok(Operand::Integer(value as i32))
        } else {
            Real::from_f64(value).map(Operand::Real)
        }
    }

    pub fn to_f64(&self) -> Result<f64, ParseError> {
        match self {
            Operand::Integer(value) | Operand::Offset(value) => Ok(f64::from(*value)),
            Operand::Real(real) => f64::try_from(real),
        }
    }

    fn to_sid(&self) -> Result<SID, ParseError> {
        match self {
            Operand::Integer(value) | Operand::Offset(value) => Ok(SID::try_from(*value)?),
            Operand::Real(_) => Err(ParseError::BadValue),
        }
    }
}

fn offset_operand(value: f64) -> Result<Operand, WriteError> {
    if value.fract() != 0.0 || value < 0.0 || value > f64::from(i32::MAX) {
        return Err(WriteError::BadValue);
    }
    Ok(Operand::Offset(value as i32))
}

impl TryFrom<u16> for Operator {
    type Error = ParseError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if (value & 0xFF00) == (12 << 8) {
            match value as u8 {
                0 => Ok(Operator::Copyright),
                1 => Ok(Operator::IsFixedPitch),
                2 => Ok(Operator::ItalicAngle),
                3 => Ok(Operator::UnderlinePosition),
                4 => Ok(Operator::UnderlineThickness),
                5 => Ok(Operator::PaintType),
                6 => Ok(Operator::CharstringType),
                7 => Ok(Operator::FontMatrix),
                8 => Ok(Operator::StrokeWidth),
                9 => Ok(Operator::BlueScale),
                10 => Ok(Operator::BlueShift),
                11 => Ok(Operator::BlueFuzz),
                12 => Ok(Operator::StemSnapH),
                13 => Ok(Operator::StemSnapV),
                14 => Ok(Operator::ForceBold),
                17 => Ok(Operator::LanguageGroup),
                18 => Ok(Operator::ExpansionFactor),
                19 => Ok(Operator::InitialRandomSeed),
                20 => Ok(Operator::SyntheticBase),
                21 => Ok(Operator::PostScript),
                22 => Ok(Operator::BaseFontName),
                23 => Ok(Operator::BaseFontBlend),
                30 => Ok(Operator::ROS),
                31 => Ok(Operator::CIDFontVersion),
                32 => Ok(Operator::CIDFontRevision),
                33 => Ok(Operator::CIDFontType),
                34 => Ok(Operator::CIDCount),
                35 => Ok(Operator::UIDBase),
                36 => Ok(Operator::FDArray),
                37 => Ok(Operator::FDSelect),
                38 => Ok(Operator::FontName),
                _ => Err(ParseError::BadValue),
            }
        } else {
            match value {
                0 => Ok(Operator::Version),
                1 => Ok(Operator::Notice),
                2 => Ok(Operator::FullName),
                3 => Ok(Operator::FamilyName),
                4 => Ok(Operator::Weight),
                5 => Ok(Operator::FontBBox),
                6 => Ok(Operator::BlueValues),
                7 => Ok(Operator::OtherBlues),
                8 => Ok(Operator::FamilyBlues),
                9 => Ok(Operator::FamilyOtherBlues),
                10 => Ok(Operator::StdHW),
                11 => Ok(Operator::StdVW),
                13 => Ok(Operator::UniqueID),
                14 => Ok(Operator::XUID),
                15 => Ok(Operator::Charset),
                16 => Ok(Operator::Encoding),
                17 => Ok(Operator::CharStrings),
                18 => Ok(Operator::Private),
                19 => Ok(Operator::Subrs),
                20 => Ok(Operator::DefaultWidthX),
                21 => Ok(Operator::NominalWidthX),
                _ => Err(ParseError::BadValue),
            }
        }
    }
}

impl Dict {
    pub fn new() -> Self {
        Dict { dict: Vec::new() }
    }

    pub fn get(&self, key: Operator) -> Option<&[Operand]> {
        self.dict
            .iter()
            .find_map(|(op, args)| (*op == key).then_some(args.as_slice()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Operator, Vec<Operand>)> {
        self.dict.iter()
    }

    pub fn push(&mut self, operator: Operator, operands: Vec<Operand>) {
        self.dict.push((operator, operands))
    }

    /// Returns the first operator of this DICT or `None` if the DICT is empty.
    pub fn first_operator(&self) -> Option<Operator> {
        self.iter().next().map(|(operator, _)| *operator)
    }

    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }
}

impl<D: DictSchema> Schema<D> {
    /// Build a schema, filling in each field's default from `D::default()`.
    ///
    /// Panics if an operator appears twice.
    fn new(mut fields: Vec<Field<D>>) -> Self {
        let defaults = D::default();
        for i in 0..fields.len() {
            let operator = fields[i].operator;
            assert!(
                fields[..i].iter().all(|field| field.operator != operator),
                "operator {:?} appears twice in DICT schema",
                operator
            );
            fields[i].default = (fields[i].get)(&defaults);
        }
        Schema { fields }
    }

    pub fn fields(&self) -> &[Field<D>] {
        &self.fields
    }

    pub fn field(&self, operator: Operator) -> Option<&Field<D>> {
        self.fields.iter().find(|field| field.operator == operator)
    }

    fn decode(&self, dict: &Dict, string_index: &Index<'_>) -> Result<D, ParseError> {
        let mut value = D::default();
        for (operator, operands) in dict.iter() {
            match self.field(*operator) {
                Some(field) => {
                    let decoded = decode_operands(field.kind, operands, string_index)?;
                    (field.set)(&mut value, decoded)?;
                }
                None => warn!("ignoring {:?} in DICT where it does not belong", operator),
            }
        }
        Ok(value)
    }

    fn encode(&self, value: &D, strings: &mut StringTable) -> Result<Dict, WriteError> {
        let mut dict = Dict::new();
        for field in &self.fields {
            let property = match (field.get)(value) {
                Some(property) => property,
                None => continue,
            };
            if field.default.as_ref() == Some(&property) {
                continue;
            }
            dict.push(field.operator, encode_value(field.kind, property, strings)?);
        }
        Ok(dict)
    }
}

fn decode_operands(
    kind: Kind,
    operands: &[Operand],
    string_index: &Index<'_>,
) -> Result<Value, ParseError> {
    match (kind, operands) {
        (Kind::Number | Kind::Boolean | Kind::Offset, [operand]) => {
            operand.to_f64().map(Value::Number)
        }
        (Kind::Array, _) => operands
            .iter()
            .map(Operand::to_f64)
            .collect::<Result<_, _>>()
            .map(Value::Array),
        (Kind::Delta, _) => {
            let mut sum = 0.0;
            operands
                .iter()
                .map(|operand| {
                    sum += operand.to_f64()?;
                    Ok::<f64, ParseError>(sum)
                })
                .collect::<Result<_, _>>()
                .map(Value::Array)
        }
        (Kind::Sid, [sid]) => {
            let string = read_string(string_index, sid.to_sid()?)?;
            Ok(Value::String(string.to_owned()))
        }
        (Kind::SizeOffset, [size, offset]) => Ok(Value::Array(vec![size.to_f64()?, offset.to_f64()?])),
        (Kind::Ros, [registry, ordering, supplement]) => Ok(Value::Ros(Ros {
            registry: read_string(string_index, registry.to_sid()?)?.to_owned(),
            ordering: read_string(string_index, ordering.to_sid()?)?.to_owned(),
            supplement: supplement.to_f64()?,
        })),
        _ => Err(ParseError::BadValue),
    }
}

fn encode_value(
    kind: Kind,
    value: Value,
    strings: &mut StringTable,
) -> Result<Vec<Operand>, WriteError> {
    match (kind, value) {
        (Kind::Number | Kind::Boolean, Value::Number(number)) => Ok(vec![Operand::from_f64(number)?]),
        (Kind::Offset, Value::Number(offset)) => Ok(vec![offset_operand(offset)?]),
        (Kind::Array, Value::Array(numbers)) => numbers.into_iter().map(Operand::from_f64).collect(),
        (Kind::Delta, Value::Array(numbers)) => {
            let mut previous = 0.0;
            numbers
                .into_iter()
                .map(|number| {
                    let delta = number - previous;
                    previous = number;
                    Operand::from_f64(delta)
                })
                .collect()
        }
        (Kind::Sid, Value::String(string)) => {
            Ok(vec![Operand::Integer(i32::from(strings.intern(&string)?))])
        }
        (Kind::SizeOffset, Value::Array(numbers)) => match numbers.as_slice() {
            [size, offset] => Ok(vec![offset_operand(*size)?, offset_operand(*offset)?]),
            _ => Err(WriteError::BadValue),
        },
        (Kind::Ros, Value::Ros(ros)) => Ok(vec![
            Operand::Integer(i32::from(strings.intern(&ros.registry)?)),
            Operand::Integer(i32::from(strings.intern(&ros.ordering)?)),
            Operand::from_f64(ros.supplement)?,
        ]),
        _ => Err(WriteError::BadValue),
    }
}

impl Property for f64 {
    fn to_value(&self) -> Option<Value> {
        Some(Value::Number(*self))
    }

    fn from_value(value: Value) -> Result<Self, ParseError> {
        match value {
            Value::Number(number) => Ok(number),
            _ => Err(ParseError::BadValue),
        }
    }
}

impl Property for bool {
    fn to_value(&self) -> Option<Value> {
        Some(Value::Number(if *self { 1.0 } else { 0.0 }))
    }

    fn from_value(value: Value) -> Result<Self, ParseError> {
        f64::from_value(value).map(|number| number != 0.0)
    }
}

impl Property for usize {
    fn to_value(&self) -> Option<Value> {
        Some(Value::Number(*self as f64))
    }

    fn from_value(value: Value) -> Result<Self, ParseError> {
        let number = f64::from_value(value)?;
        if number.fract() != 0.0 || number < 0.0 || number > f64::from(u32::MAX) {
            return Err(ParseError::BadOffset);
        }
        Ok(number as usize)
    }
}

impl Property for String {
    fn to_value(&self) -> Option<Value> {
        Some(Value::String(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, ParseError> {
        match value {
            Value::String(string) => Ok(string),
            _ => Err(ParseError::BadValue),
        }
    }
}

impl Property for Vec<f64> {
    fn to_value(&self) -> Option<Value> {
        Some(Value::Array(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, ParseError> {
        match value {
            Value::Array(numbers) => Ok(numbers),
            _ => Err(ParseError::BadValue),
        }
    }
}

impl Property for (usize, usize) {
    fn to_value(&self) -> Option<Value> {
        Some(Value::Array(vec![self.0 as f64, self.1 as f64]))
    }

    fn from_value(value: Value) -> Result<Self, ParseError> {
        match value {
            Value::Array(numbers) => match numbers.as_slice() {
                [size, offset] => Ok((
                    usize::from_value(Value::Number(*size))?,
                    usize::from_value(Value::Number(*offset))?,
                )),
                _ => Err(ParseError::BadValue),
            },
            _ => Err(ParseError::BadValue),
        }
    }
}

impl Property for Ros {
    fn to_value(&self) -> Option<Value> {
        Some(Value::Ros(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, ParseError> {
        match value {
            Value::Ros(ros) => Ok(ros),
            _ => Err(ParseError::BadValue),
        }
    }
}

impl<T: Property> Property for Option<T> {
    fn to_value(&self) -> Option<Value> {
        self.as_ref().and_then(Property::to_value)
    }

    fn from_value(value: Value) -> Result<Self, ParseError> {
        T::from_value(value).map(Some)
    }
}

impl Default for TopDict {
    fn default() -> Self {
        TopDict {
            ros: None,
            version: None,
            notice: None,
            copyright: None,
            full_name: None,
            family_name: None,
            weight: None,
            is_fixed_pitch: false,
            italic_angle: 0.0,
            underline_position: -100.0,
            underline_thickness: 50.0,
            paint_type: 0.0,
            charstring_type: 2.0,
            font_matrix: vec![0.001, 0.0, 0.0, 0.001, 0.0, 0.0],
            unique_id: None,
            font_bbox: vec![0.0; 4],
            stroke_width: 0.0,
            xuid: None,
            charset: 0,
            encoding: 0,
            char_strings: None,
            private: None,
            synthetic_base: None,
            post_script: None,
            base_font_name: None,
            base_font_blend: None,
            cid_font_version: 0.0,
            cid_font_revision: 0.0,
            cid_font_type: 0.0,
            cid_count: 8720.0,
            uid_base: None,
            fd_array: None,
            fd_select: None,
            font_name: None,
        }
    }
}

impl Default for PrivateDict {
    fn default() -> Self {
        PrivateDict {
            blue_values: Vec::new(),
            other_blues: Vec::new(),
            family_blues: Vec::new(),
            family_other_blues: Vec::new(),
            blue_scale: 0.039625,
            blue_shift: 7.0,
            blue_fuzz: 1.0,
            std_hw: None,
            std_vw: None,
            stem_snap_h: Vec::new(),
            stem_snap_v: Vec::new(),
            force_bold: false,
            language_group: 0.0,
            expansion_factor: 0.06,
            initial_random_seed: 0.0,
            subrs: None,
            default_width_x: 0.0,
            nominal_width_x: 0.0,
        }
    }
}

impl DictSchema for TopDict {
    fn schema() -> &'static Schema<Self> {
        &TOP_DICT_SCHEMA
    }
}

impl DictSchema for FontDict {
    fn schema() -> &'static Schema<Self> {
        &FONT_DICT_SCHEMA
    }
}

impl DictSchema for PrivateDict {
    fn schema() -> &'static Schema<Self> {
        &PRIVATE_DICT_SCHEMA
    }
}

impl TopDict {
    pub fn is_cid_keyed(&self) -> bool {
        self.ros.is_some()
    }

    /// Set every offset valued property that is present to `OFFSET_PLACEHOLDER`.
    pub fn set_placeholder_offsets(&mut self) {
        if self.charset > 2 {
            self.charset = OFFSET_PLACEHOLDER;
        }
        if self.encoding > 1 {
            self.encoding = OFFSET_PLACEHOLDER;
        }
        for offset in [
            &mut self.char_strings,
            &mut self.fd_array,
            &mut self.fd_select,
        ] {
            if offset.is_some() {
                *offset = Some(OFFSET_PLACEHOLDER);
            }
        }
        if self.private.is_some() {
            self.private = Some((OFFSET_PLACEHOLDER, OFFSET_PLACEHOLDER));
        }
    }
}

impl StringTable {
    pub fn new() -> Self {
        StringTable::default()
    }

    /// Returns the SID of `string`, adding it to the table if needed.
    pub fn intern(&mut self, string: &str) -> Result<SID, WriteError> {
        if let Some(sid) = standard_sid(string) {
            return Ok(sid);
        }
        if let Some(sid) = self.sids.get(string) {
            return Ok(*sid);
        }
        let sid = SID::try_from(STANDARD_STRINGS.len() + self.strings.len())?;
        self.strings.push(string.to_owned());
        self.sids.insert(string.to_owned(), sid);
        Ok(sid)
    }

    /// The custom strings, in SID order.
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
