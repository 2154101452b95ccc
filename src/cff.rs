//! CFF font handling.
//!
//! Refer to [Technical Note #5176](http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/font/pdfs/5176.CFF.pdf)
//! for more information.
//!
//! A [CFF] holds the tables shared by every font of a font set. The fonts themselves are parsed
//! on request with [CFF::font], so a damaged font does not prevent its siblings being read.

use std::convert::{TryFrom, TryInto};
use std::iter;

use byteorder::{BigEndian, ByteOrder};
use itertools::Itertools;
use num_traits as num;

use crate::binary::read::{ReadArray, ReadBinary, ReadBinaryDep, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::write::{WriteBinary, WriteBuffer, WriteContext};
use crate::binary::{U16Be, U24Be, U32Be, U8};
use crate::error::{ParseError, WriteError};

pub mod compile;
pub mod dict;
pub mod outline;
pub mod standard;

use dict::{Dict, DictSchema, FontDict, PrivateDict, TopDict};
use standard::{
    EXPERT_CHARSET, EXPERT_SUBSET_CHARSET, ISO_ADOBE_LAST_SID, STANDARD_ENCODING,
    STANDARD_STRINGS,
};

/// A string id in the font
pub type SID = u16;

/// Top level representation of a CFF font set.
///
/// Refer to Technical Note #5176
#[derive(Clone)]
pub struct CFF<'a> {
    pub header: Header,
    pub name_index: Index<'a>,
    pub top_dict_index: Index<'a>,
    pub string_index: Index<'a>,
    pub global_subr_index: Index<'a>,
    /// The whole font set, which offsets in DICTs are relative to.
    scope: ReadScope<'a>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    pub major: u8,
    pub minor: u8,
    pub hdr_size: u8,
    pub off_size: u8,
}

/// An INDEX: an array of variable sized objects.
#[derive(Clone)]
pub struct Index<'a> {
    pub count: usize,
    off_size: u8,
    offset_array: &'a [u8],
    data_array: &'a [u8],
}

/// One font of a CFF font set.
#[derive(Clone)]
pub struct Font<'a> {
    pub name: String,
    pub top_dict: TopDict,
    pub char_strings_index: Index<'a>,
    pub charset: Charset<'a>,
    pub data: CFFVariant<'a>,
    string_index: Index<'a>,
}

#[derive(Clone)]
pub enum CFFVariant<'a> {
    CID(CIDData<'a>),
    Type1(Type1Data<'a>),
}

#[derive(Clone)]
pub struct CIDData<'a> {
    pub font_dicts: Vec<FontDict>,
    pub private_dicts: Vec<PrivateDict>,
    /// An optional local subroutine index per Private DICT.
    pub local_subr_indices: Vec<Option<Index<'a>>>,
    pub fd_select: FDSelect<'a>,
}

#[derive(Clone)]
pub struct Type1Data<'a> {
    pub encoding: Encoding<'a>,
    pub private_dict: PrivateDict,
    pub local_subr_index: Option<Index<'a>>,
}

// Encoding data is located via the offset operand to the Encoding operator in the Top DICT. Only
// one Encoding operator can be specified per font except for CIDFonts which specify no encoding.
#[derive(Clone)]
pub enum Encoding<'a> {
    Standard,
    Expert,
    Custom(CustomEncoding<'a>),
}

#[derive(Clone)]
pub enum Charset<'a> {
    ISOAdobe,
    Expert,
    ExpertSubset,
    Custom(CustomCharset<'a>),
}

/// Additional code to glyph name mappings of a custom encoding.
pub type Supplements<'a> = ReadArray<'a, (U8, U16Be)>;

#[derive(Clone)]
pub enum CustomEncoding<'a> {
    Format0 {
        codes: ReadArray<'a, U8>,
        supplements: Supplements<'a>,
    },
    Format1 {
        ranges: ReadArray<'a, Range<u8, u8>>,
        supplements: Supplements<'a>,
    },
}

#[derive(Clone)]
pub enum CustomCharset<'a> {
    Format0 {
        glyphs: ReadArray<'a, U16Be>,
    },
    Format1 {
        ranges: ReadArray<'a, Range<SID, u8>>,
    },
    Format2 {
        ranges: ReadArray<'a, Range<SID, u16>>,
    },
}

/// A Range from `first` to `first + n_left`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Range<F, N> {
    pub first: F,
    pub n_left: N,
}

/// Font DICT select as described in Section 19 of Technical Note #5176
#[derive(Clone)]
pub enum FDSelect<'a> {
    Format0 {
        glyph_font_dict_indices: ReadArray<'a, U8>,
    },
    // Formats 1 and 2 are not defined
    Format3 {
        ranges: ReadArray<'a, Range<u16, u8>>,
        sentinel: u16,
    },
}

pub mod owned {
    //! INDEX data built in memory for writing.

    use super::{serialise_offset_array, TryFrom, U16Be, WriteBinary, WriteContext, WriteError, U8};

    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Index {
        pub data: Vec<Vec<u8>>,
    }

    impl WriteBinary<&Self> for Index {
        type Output = ();

        fn write<C: WriteContext>(ctxt: &mut C, index: &Index) -> Result<(), WriteError> {
            let count = u16::try_from(index.data.len())?;
            U16Be::write(ctxt, count)?;
            if count == 0 {
                return Ok(());
            }

            let mut offset = 1; // INDEX offsets start at 1
            let mut offsets = Vec::with_capacity(index.data.len() + 1);
            for data in &index.data {
                offsets.push(offset);
                offset += data.len();
            }
            offsets.push(offset);
            let (off_size, offset_array) = serialise_offset_array(offsets)?;
            U8::write(ctxt, off_size)?;
            ctxt.write_bytes(&offset_array)?;
            for data in &index.data {
                ctxt.write_bytes(data)?;
            }

            Ok(())
        }
    }

    impl Index {
        pub fn new(data: Vec<Vec<u8>>) -> Self {
            Index { data }
        }

        /// The number of bytes this INDEX occupies when written.
        pub fn size(&self) -> usize {
            if self.data.is_empty() {
                return 2;
            }
            let data_len = self.data.iter().map(Vec::len).sum::<usize>();
            let off_size = super::offset_size(data_len + 1).map_or(4, usize::from);
            2 + 1 + off_size * (self.data.len() + 1) + data_len
        }
    }
}

impl<'b> ReadBinary for CFF<'b> {
    type HostType<'a> = CFF<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        // Get a scope that starts at the beginning of the CFF data. This is needed for reading
        // data that is specified as an offset from the start of the data later.
        let scope = ctxt.scope();

        let header = ctxt.read::<Header>()?;
        let name_index = ctxt.read::<Index<'_>>()?;
        let top_dict_index = ctxt.read::<Index<'_>>()?;
        ctxt.check(name_index.count == top_dict_index.count)?;
        let string_index = ctxt.read::<Index<'_>>()?;
        let global_subr_index = ctxt.read::<Index<'_>>()?;

        Ok(CFF {
            header,
            name_index,
            top_dict_index,
            string_index,
            global_subr_index,
            scope,
        })
    }
}

impl<'a> CFF<'a> {
    /// The number of fonts in this font set.
    pub fn num_fonts(&self) -> usize {
        self.name_index.count
    }

    /// Parse the font at `index`.
    ///
    /// Errors are specific to the requested font, other fonts of the set may still be read.
    pub fn font(&self, index: usize) -> Result<Font<'a>, ParseError> {
        let name = self.name_index.read_object(index).ok_or(ParseError::BadIndex)?;
        let name = String::from_utf8_lossy(name).into_owned();
        let dict = self.top_dict_index.read::<Dict>(index)?;
        let top_dict = TopDict::from_dict(&dict, &self.string_index)?;

        // Synthetic fonts are derived from another font of the set by the SyntheticBase
        // operator. Only Type 2 charstrings are supported.
        if top_dict.synthetic_base.is_some() || top_dict.charstring_type != 2.0 {
            return Err(ParseError::NotImplemented);
        }

        let offset = top_dict.char_strings.ok_or(ParseError::MissingValue)?;
        let char_strings_index = self.scope.offset(offset).read::<Index<'_>>()?;
        let n_glyphs = char_strings_index.count;

        // The Top DICT of a CIDFont begins with the ROS operator.
        let data = if top_dict.is_cid_keyed() {
            if dict.first_operator() != Some(dict::Operator::ROS) {
                return Err(ParseError::BadValue);
            }
            CFFVariant::CID(read_cid_data(&self.scope, &self.string_index, &top_dict, n_glyphs)?)
        } else {
            let (private_dict, private_dict_offset) =
                read_private_dict(&self.scope, &self.string_index, top_dict.private)?;
            let local_subr_index =
                read_local_subr_index(&self.scope, &private_dict, private_dict_offset)?;
            let encoding = read_encoding(&self.scope, &top_dict)?;
            CFFVariant::Type1(Type1Data {
                encoding,
                private_dict,
                local_subr_index,
            })
        };

        let charset = read_charset(&self.scope, &top_dict, n_glyphs)?;

        Ok(Font {
            name,
            top_dict,
            char_strings_index,
            charset,
            data,
            string_index: self.string_index.clone(),
        })
    }

    /// Read a string with the given SID from the String INDEX
    pub fn read_string(&self, sid: SID) -> Result<&'a str, ParseError> {
        read_string(&self.string_index, sid)
    }
}

/// Read a string with the given SID, from the standard strings or the String INDEX
pub fn read_string<'a>(string_index: &Index<'a>, sid: SID) -> Result<&'a str, ParseError> {
    let sid = usize::from(sid);
    // When the client needs to determine the string that corresponds to a particular SID it
    // performs the following: test if SID is in standard range then fetch from internal table,
    // otherwise, fetch string from the String INDEX using a value of (SID – nStdStrings) as
    // the index
    if let Some(string) = STANDARD_STRINGS.get(sid) {
        Ok(string)
    } else {
        let bytes = string_index
            .read_object(sid - STANDARD_STRINGS.len())
            .ok_or(ParseError::BadIndex)?;

        std::str::from_utf8(bytes).map_err(|_utf8_err| ParseError::BadValue)
    }
}

impl ReadBinary for Header {
    type HostType<'b> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        // If the major version number is understood by an implementation it can safely proceed
        // with reading the font. The minor version number indicates extensions to the format
        // that are undetectable by implementations that do not support them.
        let major = ctxt.read_u8()?;
        ctxt.check_version(major == 1)?;
        let minor = ctxt.read_u8()?;
        let hdr_size = ctxt.read_u8()?;
        let off_size = ctxt.read_u8()?;

        if hdr_size < 4 {
            return Err(ParseError::BadValue);
        }

        if !(1..=4).contains(&off_size) {
            return Err(ParseError::BadValue);
        }

        let _unknown = ctxt.read_slice(usize::from(hdr_size - 4))?;

        Ok(Header {
            major,
            minor,
            hdr_size,
            off_size,
        })
    }
}

impl WriteBinary<&Self> for Header {
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, header: &Header) -> Result<(), WriteError> {
        U8::write(ctxt, header.major)?;
        U8::write(ctxt, header.minor)?;
        // Any data between the header and the Name INDEX will have been discarded.
        // So the size will always be 4 bytes.
        U8::write(ctxt, 4)?; // hdr_size
        U8::write(ctxt, header.off_size)?;

        Ok(())
    }
}

impl<'b> ReadBinary for Index<'b> {
    type HostType<'a> = Index<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let count = usize::from(ctxt.read_u16be()?);

        if count == 0 {
            return Ok(Index::empty());
        }

        let off_size = ctxt.read_u8()?;
        if !(1..=4).contains(&off_size) {
            return Err(ParseError::BadValue);
        }

        let offset_array_size = (count + 1) * usize::from(off_size);
        let offset_array = ctxt.read_slice(offset_array_size)?;

        // Offsets start at 1 and never decrease
        let mut previous = 1;
        for i in 0..=count {
            let offset = lookup_offset_index(off_size, offset_array, i);
            if (i == 0 && offset != 1) || offset < previous {
                return Err(ParseError::BadOffset);
            }
            previous = offset;
        }

        let data_array_size = previous - 1;
        let data_array = ctxt.read_slice(data_array_size)?;

        Ok(Index {
            count,
            off_size,
            offset_array,
            data_array,
        })
    }
}

impl<'a> WriteBinary<&Self> for Index<'a> {
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, index: &Index<'a>) -> Result<(), WriteError> {
        U16Be::write(ctxt, u16::try_from(index.count)?)?;
        if index.count == 0 {
            return Ok(());
        }

        U8::write(ctxt, index.off_size)?;
        ctxt.write_bytes(index.offset_array)?;
        ctxt.write_bytes(index.data_array)?;

        Ok(())
    }
}

pub(crate) fn offset_size(value: usize) -> Option<u8> {
    match value {
        0..=0xFF => Some(1),
        0x100..=0xFFFF => Some(2),
        0x1_0000..=0xFF_FFFF => Some(3),
        0x100_0000..=0xFFFF_FFFF => Some(4),
        _ => None,
    }
}

impl ReadFrom for Range<u8, u8> {
    type ReadType = (U8, U8);
    fn read_from((first, n_left): (u8, u8)) -> Self {
        Range { first, n_left }
    }
}

impl WriteBinary for Range<u8, u8> {
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, range: Self) -> Result<(), WriteError> {
        U8::write(ctxt, range.first)?;
        U8::write(ctxt, range.n_left)?;

        Ok(())
    }
}

impl ReadFrom for Range<SID, u8> {
    type ReadType = (U16Be, U8);
    fn read_from((first, n_left): (SID, u8)) -> Self {
        Range { first, n_left }
    }
}

impl WriteBinary for Range<SID, u8> {
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, range: Self) -> Result<(), WriteError> {
        U16Be::write(ctxt, range.first)?;
        U8::write(ctxt, range.n_left)?;

        Ok(())
    }
}

impl ReadFrom for Range<SID, u16> {
    type ReadType = (U16Be, U16Be);
    fn read_from((first, n_left): (SID, u16)) -> Self {
        Range { first, n_left }
    }
}

impl WriteBinary for Range<SID, u16> {
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, range: Self) -> Result<(), WriteError> {
        U16Be::write(ctxt, range.first)?;
        U16Be::write(ctxt, range.n_left)?;

        Ok(())
    }
}

impl<F, N> Range<F, N>
where
    N: num::Unsigned + Copy,
    usize: From<N>,
{
    pub fn len(&self) -> usize {
        usize::from(self.n_left) + 1
    }
}

impl<F, N> Range<F, N>
where
    F: Copy,
    N: Copy,
    u32: From<F> + From<N>,
{
    /// The ids covered by this range. Ids past `u16::MAX` are dropped.
    pub fn iter(&self) -> impl Iterator<Item = u16> {
        let first = u32::from(self.first);
        let last = first + u32::from(self.n_left);
        (first..=last).map_while(|id| u16::try_from(id).ok())
    }
}

impl<'b> ReadBinary for CustomEncoding<'b> {
    type HostType<'a> = CustomEncoding<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        // First byte indicates the format of the encoding data. A few fonts have
        // multiply-encoded glyphs, indicated by setting the high-order bit of the format and
        // supplementing the encoding.
        let format = ctxt.read::<U8>()?;
        let encoding = match format & 0x7F {
            0 => {
                let ncodes = ctxt.read::<U8>()?;
                let codes = ctxt.read_array::<U8>(usize::from(ncodes))?;
                let supplements = read_supplements(ctxt, format)?;
                CustomEncoding::Format0 { codes, supplements }
            }
            1 => {
                let nranges = ctxt.read::<U8>()?;
                let ranges = ctxt.read_array::<Range<u8, u8>>(usize::from(nranges))?;
                let supplements = read_supplements(ctxt, format)?;
                CustomEncoding::Format1 {
                    ranges,
                    supplements,
                }
            }
            _ => return Err(ParseError::BadValue),
        };

        Ok(encoding)
    }
}

fn read_supplements<'a>(ctxt: &mut ReadCtxt<'a>, format: u8) -> Result<Supplements<'a>, ParseError> {
    if format & 0x80 == 0 {
        return Ok(ReadArray::empty());
    }
    let nsups = ctxt.read::<U8>()?;
    ctxt.read_array::<(U8, U16Be)>(usize::from(nsups))
}

impl<'a> CustomEncoding<'a> {
    /// Code of each encoded glyph, starting at glyph 1.
    pub fn codes(&self) -> Vec<u8> {
        match self {
            CustomEncoding::Format0 { codes, .. } => codes.to_vec(),
            CustomEncoding::Format1 { ranges, .. } => ranges
                .iter()
                .flat_map(|range| {
                    let first = u16::from(range.first);
                    (first..=first + u16::from(range.n_left)).filter_map(|code| u8::try_from(code).ok())
                })
                .collect(),
        }
    }

    /// Extra (code, SID) mappings.
    pub fn supplements(&self) -> &Supplements<'a> {
        match self {
            CustomEncoding::Format0 { supplements, .. }
            | CustomEncoding::Format1 { supplements, .. } => supplements,
        }
    }
}

impl<'a> Charset<'a> {
    /// Returns the id of the SID (Type 1 font) or CID (CID keyed font) of the name of the supplied glyph
    pub fn id_for_glyph(&self, glyph_id: u16) -> Option<u16> {
        match self {
            // In ISOAdobe glyph ID maps to SID
            Charset::ISOAdobe => {
                if glyph_id <= ISO_ADOBE_LAST_SID {
                    Some(glyph_id)
                } else {
                    None
                }
            }
            Charset::Expert => EXPERT_CHARSET.get(usize::from(glyph_id)).cloned(),
            Charset::ExpertSubset => EXPERT_SUBSET_CHARSET.get(usize::from(glyph_id)).cloned(),
            Charset::Custom(custom) => custom.id_for_glyph(glyph_id),
        }
    }

    /// Returns the glyph id of the supplied string id.
    pub fn sid_to_gid(&self, sid: SID) -> Option<u16> {
        if sid == 0 {
            return Some(0);
        }

        let position = |charset: &[u16]| {
            charset
                .iter()
                .position(|&id| id == sid)
                .and_then(|gid| u16::try_from(gid).ok())
        };
        match self {
            Charset::ISOAdobe => (sid <= ISO_ADOBE_LAST_SID).then_some(sid),
            Charset::Expert => position(&EXPERT_CHARSET),
            Charset::ExpertSubset => position(&EXPERT_SUBSET_CHARSET),
            Charset::Custom(custom) => custom.sid_to_gid(sid),
        }
    }
}

impl<'b> ReadBinaryDep for CustomCharset<'b> {
    type Args<'a> = usize;
    type HostType<'a> = CustomCharset<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        n_glyphs: usize,
    ) -> Result<Self::HostType<'a>, ParseError> {
        // (There is one less element in the charset than nGlyphs because the .notdef glyph name is omitted.)
        let n_glyphs = n_glyphs.checked_sub(1).ok_or(ParseError::BadValue)?;
        match ctxt.read::<U8>()? {
            0 => {
                // The number of glyphs (nGlyphs) is the value of the count field in the
                // CharStrings INDEX.
                let glyphs = ctxt.read_array::<U16Be>(n_glyphs)?;
                Ok(CustomCharset::Format0 { glyphs })
            }
            1 => {
                let ranges = read_range_array(ctxt, n_glyphs)?;
                Ok(CustomCharset::Format1 { ranges })
            }
            2 => {
                let ranges = read_range_array(ctxt, n_glyphs)?;
                Ok(CustomCharset::Format2 { ranges })
            }
            _ => Err(ParseError::BadValue),
        }
    }
}

impl<'a> CustomCharset<'a> {
    pub fn iter(&self) -> Box<dyn Iterator<Item = u16> + 'a> {
        let notdef = iter::once(0);
        match self {
            CustomCharset::Format0 { glyphs } => Box::new(notdef.chain(glyphs.iter())),
            CustomCharset::Format1 { ranges } => {
                Box::new(notdef.chain(ranges.iter().flat_map(|range| range.iter())))
            }
            CustomCharset::Format2 { ranges } => {
                Box::new(notdef.chain(ranges.iter().flat_map(|range| range.iter())))
            }
        }
    }

    /// Returns the SID (Type 1 font) or CID (CID keyed font) of the name of the supplied glyph
    pub fn id_for_glyph(&self, glyph_id: u16) -> Option<u16> {
        // By definition the first glyph (GID 0) is “.notdef” and must be present in all fonts.
        // Consequently the charset arrays always begin with GID 1.
        if glyph_id == 0 {
            return Some(0);
        }

        match self {
            CustomCharset::Format0 { glyphs } => glyphs.get_item(usize::from(glyph_id - 1)),
            CustomCharset::Format1 { ranges } => id_for_glyph_in_ranges(ranges, glyph_id),
            CustomCharset::Format2 { ranges } => id_for_glyph_in_ranges(ranges, glyph_id),
        }
    }

    pub fn sid_to_gid(&self, sid: SID) -> Option<u16> {
        match self {
            CustomCharset::Format0 { glyphs: array } => {
                // First glyph is omitted, so we have to add 1.
                array
                    .iter()
                    .position(|n| n == sid)
                    .and_then(|n| u16::try_from(n + 1).ok())
            }
            CustomCharset::Format1 { ranges } => glyph_id_for_sid_in_ranges(ranges, sid),
            CustomCharset::Format2 { ranges } => glyph_id_for_sid_in_ranges(ranges, sid),
        }
    }
}

fn glyph_id_for_sid_in_ranges<F, N>(ranges: &ReadArray<'_, Range<F, N>>, sid: SID) -> Option<u16>
where
    F: Copy,
    N: Copy,
    u32: From<N> + From<F>,
    Range<F, N>: ReadFrom,
{
    let mut glyph_id = 1u32;
    for range in ranges.iter() {
        let first = u32::from(range.first);
        let last = first + u32::from(range.n_left);
        if (first..=last).contains(&u32::from(sid)) {
            return u16::try_from(glyph_id + u32::from(sid) - first).ok();
        }

        glyph_id += u32::from(range.n_left) + 1;
    }

    None
}

fn id_for_glyph_in_ranges<F, N>(ranges: &ReadArray<'_, Range<F, N>>, glyph_id: u16) -> Option<u16>
where
    F: Copy,
    N: num::Unsigned + Copy,
    usize: From<N> + From<F>,
    Range<F, N>: ReadFrom,
{
    let glyph_id = usize::from(glyph_id);

    ranges
        .iter()
        .scan(0usize, |glyphs_covered, range| {
            *glyphs_covered += range.len();
            Some((*glyphs_covered, range))
        })
        .find(|(glyphs_covered, _range)| glyph_id <= *glyphs_covered)
        .and_then(|(glyphs_covered, range)| {
            (usize::from(range.first) + (glyph_id - (glyphs_covered - range.len()) - 1))
                .try_into()
                .ok()
        })
}

impl<'b> ReadBinaryDep for FDSelect<'b> {
    type Args<'a> = usize;
    type HostType<'a> = FDSelect<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        n_glyphs: usize,
    ) -> Result<Self::HostType<'a>, ParseError> {
        match ctxt.read::<U8>()? {
            0 => {
                let glyph_font_dict_indices = ctxt.read_array::<U8>(n_glyphs)?;
                Ok(FDSelect::Format0 {
                    glyph_font_dict_indices,
                })
            }
            3 => {
                let nranges = usize::from(ctxt.read::<U16Be>()?);
                let ranges = ctxt.read_array(nranges)?;
                let sentinel = ctxt.read::<U16Be>()?;
                Ok(FDSelect::Format3 { ranges, sentinel })
            }
            _ => Err(ParseError::NotImplemented),
        }
    }
}

impl<'a> FDSelect<'a> {
    /// Returns the index of the Font DICT for the supplied `glyph_id`
    pub fn font_dict_index(&self, glyph_id: u16) -> Option<u8> {
        match self {
            FDSelect::Format0 {
                glyph_font_dict_indices,
            } => glyph_font_dict_indices.get_item(usize::from(glyph_id)),
            FDSelect::Format3 { ranges, sentinel } => {
                let range_windows = ranges
                    .iter()
                    .map(|Range { first, n_left }| (first, Some(n_left)))
                    .chain(iter::once((*sentinel, None)))
                    .tuple_windows();

                for ((first, fd_index), (last, _)) in range_windows {
                    if glyph_id >= first && glyph_id < last {
                        return fd_index;
                    }
                }

                None
            }
        }
    }
}

impl<'a> Index<'a> {
    /// An INDEX with no objects.
    pub fn empty() -> Self {
        Index {
            count: 0,
            off_size: 1,
            offset_array: &[],
            data_array: &[],
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn read_object(&self, index: usize) -> Option<&'a [u8]> {
        if index < self.count {
            let start = lookup_offset_index(self.off_size, self.offset_array, index).checked_sub(1)?;
            let end = lookup_offset_index(self.off_size, self.offset_array, index + 1).checked_sub(1)?;
            self.data_array.get(start..end)
        } else {
            None
        }
    }

    pub fn read<T: ReadBinaryDep<Args<'a> = ()>>(
        &self,
        index: usize,
    ) -> Result<T::HostType<'a>, ParseError> {
        let data = self.read_object(index).ok_or(ParseError::BadIndex)?;
        ReadScope::new(data).read_dep::<T>(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        // Offsets were validated when the INDEX was read
        (0..self.count).map(move |i| self.read_object(i).unwrap_or_default())
    }

    /// Returns the size of the data held by this INDEX.
    pub fn data_len(&self) -> usize {
        self.data_array.len()
    }
}

impl<'a> Font<'a> {
    pub fn is_cid_keyed(&self) -> bool {
        match self.data {
            CFFVariant::CID(_) => true,
            CFFVariant::Type1(_) => false,
        }
    }

    pub fn num_glyphs(&self) -> usize {
        self.char_strings_index.count
    }

    /// The charstring of `glyph_id`.
    pub fn char_string(&self, glyph_id: u16) -> Option<&'a [u8]> {
        self.char_strings_index.read_object(usize::from(glyph_id))
    }

    /// Index of the Font DICT, Private DICT and local subroutines that apply to `glyph_id`.
    ///
    /// Always 0 for fonts that are not CID-keyed.
    pub fn font_dict_index(&self, glyph_id: u16) -> Option<usize> {
        match &self.data {
            CFFVariant::CID(cid) => cid
                .fd_select
                .font_dict_index(glyph_id)
                .map(usize::from)
                .filter(|&index| index < cid.private_dicts.len()),
            CFFVariant::Type1(_) => Some(0),
        }
    }

    pub fn private_dict(&self, font_dict_index: usize) -> Option<&PrivateDict> {
        match &self.data {
            CFFVariant::CID(cid) => cid.private_dicts.get(font_dict_index),
            CFFVariant::Type1(type1) => (font_dict_index == 0).then_some(&type1.private_dict),
        }
    }

    pub fn local_subr_index(&self, font_dict_index: usize) -> Option<&Index<'a>> {
        match &self.data {
            CFFVariant::CID(cid) => cid.local_subr_indices.get(font_dict_index)?.as_ref(),
            CFFVariant::Type1(type1) => type1.local_subr_index.as_ref(),
        }
    }

    /// The number of Private DICTs in this font.
    pub fn num_private_dicts(&self) -> usize {
        match &self.data {
            CFFVariant::CID(cid) => cid.private_dicts.len(),
            CFFVariant::Type1(_) => 1,
        }
    }

    /// The name of `glyph_id`. CID-keyed fonts have no glyph names.
    pub fn glyph_name(&self, glyph_id: u16) -> Option<&'a str> {
        if self.is_cid_keyed() {
            return None;
        }
        let sid = self.charset.id_for_glyph(glyph_id)?;
        read_string(&self.string_index, sid).ok()
    }

    /// Find the glyph drawn for a StandardEncoding code by `seac`.
    pub fn seac_code_to_glyph_id(&self, code: u8) -> Option<u16> {
        let sid = STANDARD_ENCODING[usize::from(code)];
        if sid == 0 || self.is_cid_keyed() {
            return None;
        }
        match self.charset {
            Charset::Custom(_) => self.charset.sid_to_gid(SID::from(sid)),
            // Predefined charsets only hold standard strings, which may not be in SID order
            _ => {
                let name = STANDARD_STRINGS[usize::from(sid)];
                (0..self.num_glyphs())
                    .filter_map(|gid| u16::try_from(gid).ok())
                    .find(|&gid| self.glyph_name(gid) == Some(name))
            }
        }
    }
}

fn lookup_offset_index(off_size: u8, offset_array: &[u8], index: usize) -> usize {
    let start = index * usize::from(off_size);
    let buf = match offset_array.get(start..start + usize::from(off_size)) {
        Some(buf) => buf,
        None => return 0,
    };
    match off_size {
        1 => usize::from(buf[0]),
        2 => usize::from(BigEndian::read_u16(buf)),
        3 => BigEndian::read_u24(buf) as usize,
        _ => BigEndian::read_u32(buf) as usize,
    }
}

fn read_range_array<'a, F, N>(
    ctxt: &mut ReadCtxt<'a>,
    n_glyphs: usize,
) -> Result<ReadArray<'a, Range<F, N>>, ParseError>
where
    Range<F, N>: ReadFrom,
    usize: From<N>,
    N: num::Unsigned + Copy,
{
    let mut peek = ctxt.clone();
    let mut range_count = 0;
    let mut glyphs_covered = 0;
    while glyphs_covered < n_glyphs {
        let range = peek.read::<Range<F, N>>()?;
        range_count += 1;
        glyphs_covered += range.len();
    }

    ctxt.read_array::<Range<F, N>>(range_count)
}

// NOTE: Ideally the following read_* functions would ReadBinary or ReadBinaryDep impls.
// However we need to be able to indicate that the borrowed TopDict has a different lifetime
// to the other aspects, which is not currently possible.

fn read_cid_data<'a>(
    scope: &ReadScope<'a>,
    string_index: &Index<'a>,
    top_dict: &TopDict,
    n_glyphs: usize,
) -> Result<CIDData<'a>, ParseError> {
    // The FDArray operator is expected to be present, with a single argument specifying an
    // offset to the Font DICT INDEX. Each Font DICT in this array specifies information unique
    // to a particular group of glyphs in the font.
    let offset = top_dict.fd_array.ok_or(ParseError::MissingValue)?;
    let font_dict_index = scope.offset(offset).read::<Index<'a>>()?;

    let offset = top_dict.fd_select.ok_or(ParseError::MissingValue)?;
    let fd_select = scope.offset(offset).read_dep::<FDSelect<'a>>(n_glyphs)?;

    let mut font_dicts = Vec::with_capacity(font_dict_index.count);
    let mut private_dicts = Vec::with_capacity(font_dict_index.count);
    let mut local_subr_indices = Vec::with_capacity(font_dict_index.count);
    for object in font_dict_index.iter() {
        let dict = ReadScope::new(object).read::<Dict>()?;
        let font_dict = FontDict::from_dict(&dict, string_index)?;
        let (private_dict, private_dict_offset) =
            read_private_dict(scope, string_index, font_dict.private)?;
        let local_subr_index = read_local_subr_index(scope, &private_dict, private_dict_offset)?;

        font_dicts.push(font_dict);
        private_dicts.push(private_dict);
        local_subr_indices.push(local_subr_index);
    }

    Ok(CIDData {
        font_dicts,
        private_dicts,
        local_subr_indices,
        fd_select,
    })
}

/// Read a Private DICT returning it and its offset within `scope` on success.
///
/// A Private DICT is required, but may be specified as having a length of 0 if there are no
/// non-default values to be stored.
fn read_private_dict<'a>(
    scope: &ReadScope<'a>,
    string_index: &Index<'a>,
    private: Option<(usize, usize)>,
) -> Result<(PrivateDict, usize), ParseError> {
    let (length, offset) = private.ok_or(ParseError::MissingValue)?;
    let dict = scope.offset_length(offset, length)?.read::<Dict>()?;
    let private_dict = PrivateDict::from_dict(&dict, string_index)?;
    Ok((private_dict, offset))
}

fn read_encoding<'a>(scope: &ReadScope<'a>, top_dict: &TopDict) -> Result<Encoding<'a>, ParseError> {
    let encoding = match top_dict.encoding {
        0 => Encoding::Standard,
        1 => Encoding::Expert,
        offset => Encoding::Custom(scope.offset(offset).read::<CustomEncoding<'_>>()?),
    };

    Ok(encoding)
}

fn read_charset<'a>(
    scope: &ReadScope<'a>,
    top_dict: &TopDict,
    char_strings_count: usize,
) -> Result<Charset<'a>, ParseError> {
    let charset = match top_dict.charset {
        0 => Charset::ISOAdobe,
        1 => Charset::Expert,
        2 => Charset::ExpertSubset,
        offset => Charset::Custom(
            scope
                .offset(offset)
                .read_dep::<CustomCharset<'_>>(char_strings_count)?,
        ),
    };

    Ok(charset)
}

fn read_local_subr_index<'a>(
    scope: &ReadScope<'a>,
    private_dict: &PrivateDict,
    private_dict_offset: usize,
) -> Result<Option<Index<'a>>, ParseError> {
    // Local subrs are stored in an INDEX structure which is located via the offset operand
    // of the Subrs operator in the Private DICT. A font without local subrs has no Subrs
    // operator in the Private DICT. The local subrs offset is relative to the beginning of
    // the Private DICT data.
    private_dict
        .subrs
        .map(|offset| {
            scope
                .offset(private_dict_offset + offset)
                .read::<Index<'_>>()
        })
        .transpose()
}

/// Serialise the offsets using an optimal `off_size`, returning that and the serialised data.
pub(crate) fn serialise_offset_array(offsets: Vec<usize>) -> Result<(u8, Vec<u8>), WriteError> {
    let last = match offsets.last() {
        Some(last) => *last,
        None => return Ok((1, Vec::new())),
    };

    let off_size = offset_size(last).ok_or(WriteError::BadValue)?;
    let mut offset_array = WriteBuffer::new();
    match off_size {
        1 => offset_array.write_iter::<U8, _>(offsets.into_iter().map(|offset| offset as u8))?,
        2 => offset_array.write_iter::<U16Be, _>(offsets.into_iter().map(|offset| offset as u16))?,
        3 => offset_array.write_iter::<U24Be, _>(offsets.into_iter().map(|offset| offset as u32))?,
        _ => offset_array.write_iter::<U32Be, _>(offsets.into_iter().map(|offset| offset as u32))?,
    }

    Ok((off_size, offset_array.into_inner()))
}
