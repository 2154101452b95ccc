//! Charstring operators of both formats.
//!
//! Type 1 and Type 2 reuse many operator codes, sometimes for different operations. A single
//! table lists every operator with the formats it is valid in, and per format lookup maps are
//! built from it on first use.

use bitflags::bitflags;
use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use super::Format;

bitflags! {
    /// Set of charstring formats an operator belongs to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Formats: u8 {
        const TYPE1 = 1;
        const TYPE2 = 2;
        const BOTH = Self::TYPE1.bits() | Self::TYPE2.bits();
    }
}

impl From<Format> for Formats {
    fn from(format: Format) -> Self {
        match format {
            Format::Type1 => Formats::TYPE1,
            Format::Type2 => Formats::TYPE2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    HStem,
    VStem,
    VMoveTo,
    RLineTo,
    HLineTo,
    VLineTo,
    RRCurveTo,
    ClosePath,
    CallSubr,
    Return,
    HSbw,
    EndChar,
    RMoveTo,
    HMoveTo,
    VhCurveTo,
    HvCurveTo,
    DotSection,
    VStem3,
    HStem3,
    Seac,
    Sbw,
    Div,
    CallOtherSubr,
    Pop,
    SetCurrentPoint,
    HStemHm,
    HintMask,
    CntrMask,
    VStemHm,
    RCurveLine,
    RLineCurve,
    VvCurveTo,
    HhCurveTo,
    CallGsubr,
    And,
    Or,
    Not,
    Abs,
    Add,
    Sub,
    Neg,
    Eq,
    Drop,
    Put,
    Get,
    IfElse,
    Random,
    Mul,
    Sqrt,
    Dup,
    Exch,
    Index,
    Roll,
    HFlex,
    Flex,
    HFlex1,
    Flex1,
}

const fn escape(code: u8) -> u16 {
    (12 << 8) | code as u16
}

struct OperatorDef {
    code: u16,
    op: Op,
    formats: Formats,
    mnemonic: &'static str,
}

macro_rules! operators {
    ($($code:expr => $op:ident, $formats:ident, $mnemonic:literal;)*) => {
        &[$(OperatorDef { code: $code, op: Op::$op, formats: Formats::$formats, mnemonic: $mnemonic }),*]
    };
}

#[rustfmt::skip]
static OPERATORS: &[OperatorDef] = operators! {
    1 => HStem, BOTH, "hstem";
    3 => VStem, BOTH, "vstem";
    4 => VMoveTo, BOTH, "vmoveto";
    5 => RLineTo, BOTH, "rlineto";
    6 => HLineTo, BOTH, "hlineto";
    7 => VLineTo, BOTH, "vlineto";
    8 => RRCurveTo, BOTH, "rrcurveto";
    9 => ClosePath, TYPE1, "closepath";
    10 => CallSubr, BOTH, "callsubr";
    11 => Return, BOTH, "return";
    13 => HSbw, TYPE1, "hsbw";
    14 => EndChar, BOTH, "endchar";
    18 => HStemHm, TYPE2, "hstemhm";
    19 => HintMask, TYPE2, "hintmask";
    20 => CntrMask, TYPE2, "cntrmask";
    21 => RMoveTo, BOTH, "rmoveto";
    22 => HMoveTo, BOTH, "hmoveto";
    23 => VStemHm, TYPE2, "vstemhm";
    24 => RCurveLine, TYPE2, "rcurveline";
    25 => RLineCurve, TYPE2, "rlinecurve";
    26 => VvCurveTo, TYPE2, "vvcurveto";
    27 => HhCurveTo, TYPE2, "hhcurveto";
    29 => CallGsubr, TYPE2, "callgsubr";
    30 => VhCurveTo, BOTH, "vhcurveto";
    31 => HvCurveTo, BOTH, "hvcurveto";
    escape(0) => DotSection, BOTH, "dotsection";
    escape(1) => VStem3, TYPE1, "vstem3";
    escape(2) => HStem3, TYPE1, "hstem3";
    escape(3) => And, TYPE2, "and";
    escape(4) => Or, TYPE2, "or";
    escape(5) => Not, TYPE2, "not";
    escape(6) => Seac, TYPE1, "seac";
    escape(7) => Sbw, TYPE1, "sbw";
    escape(9) => Abs, TYPE2, "abs";
    escape(10) => Add, TYPE2, "add";
    escape(11) => Sub, TYPE2, "sub";
    escape(12) => Div, BOTH, "div";
    escape(14) => Neg, TYPE2, "neg";
    escape(15) => Eq, TYPE2, "eq";
    escape(16) => CallOtherSubr, TYPE1, "callothersubr";
    escape(17) => Pop, TYPE1, "pop";
    escape(18) => Drop, TYPE2, "drop";
    escape(20) => Put, TYPE2, "put";
    escape(21) => Get, TYPE2, "get";
    escape(22) => IfElse, TYPE2, "ifelse";
    escape(23) => Random, TYPE2, "random";
    escape(24) => Mul, TYPE2, "mul";
    escape(26) => Sqrt, TYPE2, "sqrt";
    escape(27) => Dup, TYPE2, "dup";
    escape(28) => Exch, TYPE2, "exch";
    escape(29) => Index, TYPE2, "index";
    escape(30) => Roll, TYPE2, "roll";
    escape(33) => SetCurrentPoint, TYPE1, "setcurrentpoint";
    escape(34) => HFlex, TYPE2, "hflex";
    escape(35) => Flex, TYPE2, "flex";
    escape(36) => HFlex1, TYPE2, "hflex1";
    escape(37) => Flex1, TYPE2, "flex1";
};

fn build_lookup(formats: Formats) -> FxHashMap<u16, usize> {
    let mut lookup = FxHashMap::default();
    for (i, def) in OPERATORS.iter().enumerate() {
        if def.formats.contains(formats) {
            let previous = lookup.insert(def.code, i);
            assert!(
                previous.is_none(),
                "operator code {:#x} defined twice",
                def.code
            );
        }
    }
    lookup
}

lazy_static! {
    static ref TYPE1_OPERATORS: FxHashMap<u16, usize> = build_lookup(Formats::TYPE1);
    static ref TYPE2_OPERATORS: FxHashMap<u16, usize> = build_lookup(Formats::TYPE2);
}

impl Op {
    /// Look up the operator with `code` in `format`.
    pub fn lookup(format: Format, code: u16) -> Option<Op> {
        let table = match format {
            Format::Type1 => &*TYPE1_OPERATORS,
            Format::Type2 => &*TYPE2_OPERATORS,
        };
        table.get(&code).map(|&i| OPERATORS[i].op)
    }

    fn def(self) -> &'static OperatorDef {
        // Every variant appears in the table.
        OPERATORS
            .iter()
            .find(|def| def.op == self)
            .unwrap_or(&OPERATORS[0])
    }

    pub fn code(self) -> u16 {
        self.def().code
    }

    pub fn formats(self) -> Formats {
        self.def().formats
    }

    pub fn mnemonic(self) -> &'static str {
        self.def().mnemonic
    }

    /// Returns true if this operator clears the operand stack once it has run.
    ///
    /// The first of these in a Type 2 program decides whether the glyph carries a width
    /// operand.
    pub fn clears_stack(self) -> bool {
        matches!(
            self,
            Op::HStem
                | Op::VStem
                | Op::HStemHm
                | Op::VStemHm
                | Op::HintMask
                | Op::CntrMask
                | Op::RMoveTo
                | Op::HMoveTo
                | Op::VMoveTo
                | Op::RLineTo
                | Op::HLineTo
                | Op::VLineTo
                | Op::RRCurveTo
                | Op::RCurveLine
                | Op::RLineCurve
                | Op::VvCurveTo
                | Op::HhCurveTo
                | Op::VhCurveTo
                | Op::HvCurveTo
                | Op::HFlex
                | Op::Flex
                | Op::HFlex1
                | Op::Flex1
                | Op::EndChar
                | Op::HSbw
                | Op::Sbw
                | Op::Seac
                | Op::VStem3
                | Op::HStem3
                | Op::ClosePath
                | Op::SetCurrentPoint
                | Op::DotSection
        )
    }

    /// Returns true for the hint declaring operators.
    pub fn is_stem(self) -> bool {
        matches!(self, Op::HStem | Op::VStem | Op::HStemHm | Op::VStemHm)
    }
}
