//! Tokenise charstring bytes into operators and operands.

use crate::binary::read::ReadCtxt;
use crate::binary::read::ReadScope;

use super::Format;

/// Escape byte introducing a two byte operator.
pub const ESCAPE: u8 = 12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Token {
    /// Operator code. Two byte operators are `(12 << 8) | second byte`.
    Operator(u16),
    Operand(f64),
    /// The program ran out of bytes.
    End,
}

/// A restartable cursor over a charstring program.
#[derive(Clone)]
pub struct Lexer<'a> {
    ctxt: ReadCtxt<'a>,
    format: Format,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8], format: Format) -> Self {
        Lexer {
            ctxt: ReadScope::new(data).ctxt(),
            format,
        }
    }

    /// Position of the next unread byte.
    pub fn position(&self) -> usize {
        self.ctxt.offset()
    }

    fn remaining(&self) -> usize {
        self.ctxt.scope().data().len().saturating_sub(self.ctxt.offset())
    }

    /// Read the next token. Running out of bytes mid-token yields `Token::End`.
    pub fn next_token(&mut self) -> Token {
        match self.read_token() {
            Some(token) => token,
            None => {
                // Park the cursor at the end so subsequent reads also yield `End`.
                let _ = self.ctxt.read_slice(self.remaining());
                Token::End
            }
        }
    }

    fn read_token(&mut self) -> Option<Token> {
        let b0 = self.ctxt.read_u8().ok()?;
        let token = match b0 {
            ESCAPE => {
                let b1 = self.ctxt.read_u8().ok()?;
                Token::Operator((u16::from(ESCAPE) << 8) | u16::from(b1))
            }
            0..=27 | 29..=31 => Token::Operator(u16::from(b0)),
            28 => Token::Operand(f64::from(self.ctxt.read_i16be().ok()?)),
            32..=246 => Token::Operand(f64::from(i32::from(b0) - 139)),
            247..=250 => {
                let b1 = self.ctxt.read_u8().ok()?;
                let n = (i32::from(b0) - 247) * 256 + i32::from(b1) + 108;
                Token::Operand(f64::from(n))
            }
            251..=254 => {
                let b1 = self.ctxt.read_u8().ok()?;
                let n = -(i32::from(b0) - 251) * 256 - i32::from(b1) - 108;
                Token::Operand(f64::from(n))
            }
            255 => {
                let n = self.ctxt.read_i32be().ok()?;
                match self.format {
                    Format::Type1 => Token::Operand(f64::from(n)),
                    Format::Type2 => Token::Operand(f64::from(n) / 65536.0),
                }
            }
        };
        Some(token)
    }

    /// Consume up to `count` bytes, stopping early at the end of the program.
    pub fn read_bytes(&mut self, count: usize) -> &'a [u8] {
        let count = count.min(self.remaining());
        self.ctxt.read_slice(count).unwrap_or(&[])
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        match self.next_token() {
            Token::End => None,
            token => Some(token),
        }
    }
}
