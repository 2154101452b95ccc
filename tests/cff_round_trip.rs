mod common;

use std::sync::atomic::AtomicBool;

use fontprogram::binary::read::ReadScope;
use fontprogram::cff::compile::{CompileOptions, FontProgram};
use fontprogram::cff::dict::PrivateDict;
use fontprogram::cff::outline::CFFOutlines;
use fontprogram::cff::{Charset, CFF};
use fontprogram::charstring::program::{Instruction, Stem};
use fontprogram::charstring::{
    interpret, interpret_glyphs, CharStringContext, Format, GlyphResult, InterpreterOptions,
};
use fontprogram::error::ReadWriteError;
use fontprogram::outline::NullSink;

use crate::common::{charstring, Token::*};

const RLINETO: u8 = 5;
const RRCURVETO: u8 = 8;
const ENDCHAR: u8 = 14;
const HSTEMHM: u8 = 18;
const HINTMASK: u8 = 19;
const RMOVETO: u8 = 21;
const VSTEMHM: u8 = 23;

fn options() -> InterpreterOptions {
    InterpreterOptions {
        build_program: true,
        ..InterpreterOptions::default()
    }
}

/// Interpret Type 2 charstrings that use no subroutines.
fn interpret_all(char_strings: &[Vec<u8>]) -> Vec<GlyphResult> {
    let context = CharStringContext::new(Format::Type2);
    char_strings
        .iter()
        .map(|data| interpret(data, &context, &options(), &mut NullSink).unwrap())
        .collect()
}

fn source_glyphs() -> Vec<Vec<u8>> {
    vec![
        // .notdef: 500 0 0 rmoveto endchar
        charstring(&[Num(500.0), Num(0.0), Num(0.0), Op(RMOVETO), Op(ENDCHAR)]),
        // space: 250 0 0 rmoveto endchar
        charstring(&[Num(250.0), Num(0.0), Num(0.0), Op(RMOVETO), Op(ENDCHAR)]),
        // exclam: a triangle
        charstring(&[
            Num(500.0),
            Num(10.0),
            Num(0.0),
            Op(RMOVETO),
            Num(480.0),
            Num(0.0),
            Op(RLINETO),
            Num(-240.0),
            Num(700.0),
            Op(RLINETO),
            Op(ENDCHAR),
        ]),
        // quotedbl: a hinted curve with a fractional point
        charstring(&[
            Num(500.0),
            Num(0.0),
            Num(50.0),
            Op(HSTEMHM),
            Num(10.0),
            Num(20.0),
            Op(VSTEMHM),
            Op(HINTMASK),
            Raw(&[0xC0]),
            Num(100.0),
            Num(100.0),
            Op(RMOVETO),
            Num(50.0),
            Num(0.0),
            Num(50.5),
            Num(50.0),
            Num(0.0),
            Num(50.0),
            Op(RRCURVETO),
            Op(ENDCHAR),
        ]),
    ]
}

fn glyph_names() -> Vec<String> {
    [".notdef", "space", "exclam", "quotedbl"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

fn compile_source() -> (FontProgram, Vec<u8>) {
    let glyphs = interpret_all(&source_glyphs());
    let private_dict = PrivateDict {
        blue_values: vec![-20.0, 0.0, 700.0, 720.0],
        std_hw: Some(50.0),
        ..PrivateDict::default()
    };
    let program =
        FontProgram::from_glyph_results("RoundTrip", glyph_names(), &glyphs, &private_dict)
            .unwrap();
    let data = program.compile(&CompileOptions::default()).unwrap();
    (program, data)
}

#[test]
fn test_round_trip() {
    let glyphs = interpret_all(&source_glyphs());
    let (program, data) = compile_source();

    let cff = ReadScope::new(&data).read::<CFF<'_>>().unwrap();
    assert_eq!(cff.num_fonts(), 1);
    let font = cff.font(0).unwrap();
    assert_eq!(font.name, "RoundTrip");
    assert!(!font.is_cid_keyed());
    assert!(matches!(font.charset, Charset::ISOAdobe));
    assert_eq!(font.top_dict.full_name.as_deref(), Some("RoundTrip"));
    assert_eq!(font.top_dict.font_bbox, program.top_dict.font_bbox);
    assert_eq!(font.top_dict.font_bbox, vec![10.0, 0.0, 490.0, 700.0]);

    let private_dict = font.private_dict(0).unwrap();
    assert_eq!(private_dict.blue_values, vec![-20.0, 0.0, 700.0, 720.0]);
    assert_eq!(private_dict.std_hw, Some(50.0));
    assert_eq!(private_dict.default_width_x, 500.0);
    assert_eq!(private_dict.nominal_width_x, 0.0);
    assert_eq!(private_dict.subrs, None);

    for (glyph_id, expected) in program.char_strings.iter().enumerate() {
        assert_eq!(font.char_string(glyph_id as u16), Some(expected.as_slice()));
    }

    let mut outlines = CFFOutlines::new(&cff, &font);
    let cancel = AtomicBool::new(false);
    let read_back = interpret_glyphs(&mut outlines, &options(), &cancel).unwrap();
    for (actual, expected) in read_back.iter().zip(&glyphs) {
        assert_eq!(actual.width, expected.width);
        assert_eq!(actual.bbox, expected.bbox);
        assert_eq!(actual.program, expected.program);
    }
    assert_eq!(
        read_back[3].program.as_ref().map(|program| program[0].clone()),
        Some(Instruction::HStem(vec![Stem {
            edge: 0.0,
            width: 50.0
        }]))
    );
}

#[test]
fn test_rebuild_is_stable() {
    let (_, data) = compile_source();
    let cancel = AtomicBool::new(false);

    let cff = ReadScope::new(&data).read::<CFF<'_>>().unwrap();
    let font = cff.font(0).unwrap();
    let rebuilt = FontProgram::from_font(&cff, &font, &cancel)
        .unwrap()
        .compile(&CompileOptions::default())
        .unwrap();

    assert_eq!(rebuilt, data);
}

#[test]
fn test_rebuild_cancelled() {
    let (_, data) = compile_source();
    let cancel = AtomicBool::new(true);

    let cff = ReadScope::new(&data).read::<CFF<'_>>().unwrap();
    let font = cff.font(0).unwrap();
    assert_eq!(
        FontProgram::from_font(&cff, &font, &cancel),
        Err(ReadWriteError::Cancelled)
    );
}

#[test]
fn test_truncated_font_set() {
    let (_, data) = compile_source();
    // Cut into the CharStrings INDEX, the header and top level indexes are intact
    let cff = ReadScope::new(&data[..data.len() - 20]).read::<CFF<'_>>().unwrap();
    assert!(cff.font(0).is_err());
    assert!(ReadScope::new(&data[..10]).read::<CFF<'_>>().is_err());
}
