mod common;

use std::sync::atomic::AtomicBool;

use fontprogram::binary::read::ReadScope;
use fontprogram::cff::compile::{CompileOptions, FontProgram};
use fontprogram::cff::dict::PrivateDict;
use fontprogram::cff::outline::CFFOutlines;
use fontprogram::cff::CFF;
use fontprogram::charstring::{interpret_glyphs, InterpreterOptions, Seac, Type1Glyphs};
use fontprogram::outline::{BBox, NullSink, OutlineBuilder};

use crate::common::{charstring, encrypt_charstring, Token::*};

const RLINETO: u8 = 5;
const CLOSEPATH: u8 = 9;
const HSBW: u8 = 13;
const ENDCHAR: u8 = 14;
const RMOVETO: u8 = 21;
const SEAC: u8 = 6;

fn glyphs() -> Vec<(String, Vec<u8>)> {
    let notdef = charstring(&[Num(0.0), Num(250.0), Op(HSBW), Op(ENDCHAR)]);
    let a = charstring(&[
        Num(20.0),
        Num(600.0),
        Op(HSBW),
        Num(0.0),
        Num(0.0),
        Op(RMOVETO),
        Num(300.0),
        Num(0.0),
        Op(RLINETO),
        Num(-150.0),
        Num(400.0),
        Op(RLINETO),
        Op(CLOSEPATH),
        Op(ENDCHAR),
    ]);
    let acute = charstring(&[
        Num(0.0),
        Num(600.0),
        Op(HSBW),
        Num(100.0),
        Num(500.0),
        Op(RMOVETO),
        Num(50.0),
        Num(0.0),
        Op(RLINETO),
        Num(0.0),
        Num(50.0),
        Op(RLINETO),
        Op(CLOSEPATH),
        Op(ENDCHAR),
    ]);
    // asb adx ady bchar achar seac
    let aacute = charstring(&[
        Num(20.0),
        Num(600.0),
        Op(HSBW),
        Num(0.0),
        Num(30.0),
        Num(20.0),
        Num(65.0),
        Num(194.0),
        Esc(SEAC),
    ]);

    vec![
        (".notdef".to_string(), notdef),
        ("A".to_string(), a),
        ("acute".to_string(), acute),
        ("Aacute".to_string(), aacute),
    ]
}

fn options() -> InterpreterOptions {
    InterpreterOptions {
        build_program: true,
        ..InterpreterOptions::default()
    }
}

const A_BBOX: BBox = BBox {
    x_min: 20.0,
    y_min: 0.0,
    x_max: 320.0,
    y_max: 400.0,
};

// The accent origin is at (50, 20): adx - asb + the base side bearing, and ady
const AACUTE_BBOX: BBox = BBox {
    x_min: 20.0,
    y_min: 0.0,
    x_max: 320.0,
    y_max: 570.0,
};

#[test]
fn test_type1_glyphs() {
    let mut glyphs = Type1Glyphs::new(glyphs(), Vec::new(), -1);
    assert_eq!(glyphs.seac_code_to_glyph_id(65), Some(1));
    assert_eq!(glyphs.glyph_name(3), Some("Aacute"));

    let cancel = AtomicBool::new(false);
    let results = interpret_glyphs(&mut glyphs, &options(), &cancel).unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].width, Some(250.0));
    assert_eq!(results[0].bbox, BBox::zero());
    assert_eq!(results[1].width, Some(600.0));
    assert_eq!(results[1].bbox, A_BBOX);
    assert_eq!(
        results[3].seac,
        Some(Seac {
            base_code: 65,
            accent_code: 194,
            dx: 50.0,
            dy: 20.0
        })
    );
    assert_eq!(results[3].bbox, AACUTE_BBOX);
}

#[test]
fn test_encrypted_type1_glyphs() {
    let encrypted = glyphs()
        .into_iter()
        .map(|(name, data)| (name, encrypt_charstring(&data, 4)))
        .collect();
    let mut glyphs = Type1Glyphs::new(encrypted, Vec::new(), 4);
    let result = glyphs.visit(1, &options(), &mut NullSink).unwrap();
    assert_eq!(result.width, Some(600.0));
    assert_eq!(result.bbox, A_BBOX);
}

#[test]
fn test_type1_subroutines() {
    // The A outline moved into subroutine 0: callsubr = 10, return = 11
    let subr = charstring(&[
        Num(300.0),
        Num(0.0),
        Op(RLINETO),
        Num(-150.0),
        Num(400.0),
        Op(RLINETO),
        Op(11),
    ]);
    let a = charstring(&[
        Num(20.0),
        Num(600.0),
        Op(HSBW),
        Num(0.0),
        Num(0.0),
        Op(RMOVETO),
        Num(0.0),
        Op(10),
        Op(CLOSEPATH),
        Op(ENDCHAR),
    ]);
    let mut glyphs = Type1Glyphs::new(vec![("A".to_string(), a)], vec![subr], -1);
    let result = glyphs.visit(0, &options(), &mut NullSink).unwrap();
    assert_eq!(result.bbox, A_BBOX);
}

#[test]
fn test_type1_glyphs_to_cff() {
    let mut glyphs = Type1Glyphs::new(glyphs(), Vec::new(), -1);
    let cancel = AtomicBool::new(false);
    let results = interpret_glyphs(&mut glyphs, &options(), &cancel).unwrap();

    let program = FontProgram::from_glyph_results(
        "Type1Test",
        glyphs.names().to_vec(),
        &results,
        &PrivateDict::default(),
    )
    .unwrap();
    let data = program.compile(&CompileOptions::default()).unwrap();

    let cff = ReadScope::new(&data).read::<CFF<'_>>().unwrap();
    let font = cff.font(0).unwrap();
    assert_eq!(font.name, "Type1Test");
    assert_eq!(font.num_glyphs(), 4);
    assert_eq!(font.glyph_name(3), Some("Aacute"));
    assert_eq!(font.top_dict.font_bbox, vec![20.0, 0.0, 320.0, 570.0]);
    assert_eq!(font.private_dict(0).map(|p| p.default_width_x), Some(600.0));

    let mut outlines = CFFOutlines::new(&cff, &font);
    for (glyph_id, expected) in results.iter().enumerate() {
        let glyph = outlines
            .visit(glyph_id as u16, &InterpreterOptions::default(), &mut NullSink)
            .unwrap();
        assert_eq!(glyph.width, expected.width);
        assert_eq!(glyph.bbox, expected.bbox);
        // Composites are written as plain outlines
        assert_eq!(glyph.seac, None);
    }
}
