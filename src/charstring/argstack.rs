// This file is derived from ttf-parser, licenced under Apache-2.0.
// https://github.com/RazrFalcon/ttf-parser/blob/439aaaebd50eb8aed66302e3c1b51fae047f85b2/src/tables/cff/argstack.rs

use std::fmt::Debug;

use crate::error::CharStringError;

/// Operand stack of an in-flight charstring interpretation.
///
/// Operands are stored bottom first. Charstring operators read their arguments from the bottom
/// of the stack, the arithmetic operators work from the top.
pub struct ArgumentsStack {
    data: Vec<f64>,
    max_len: usize,
}

impl ArgumentsStack {
    pub fn new(max_len: usize) -> Self {
        ArgumentsStack {
            data: Vec::with_capacity(max_len),
            max_len,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn push(&mut self, n: f64) -> Result<(), CharStringError> {
        if self.data.len() == self.max_len {
            Err(CharStringError::StackOverflow)
        } else {
            self.data.push(n);
            Ok(())
        }
    }

    /// Value at `index` counted from the bottom of the stack.
    pub fn at(&self, index: usize) -> f64 {
        self.data[index]
    }

    pub fn pop(&mut self) -> Result<f64, CharStringError> {
        self.data.pop().ok_or(CharStringError::StackUnderflow)
    }

    /// Pop two values, returned in push order.
    pub fn pop2(&mut self) -> Result<(f64, f64), CharStringError> {
        if self.data.len() < 2 {
            return Err(CharStringError::StackUnderflow);
        }
        let b = self.pop()?;
        let a = self.pop()?;
        Ok((a, b))
    }

    pub fn peek(&self) -> Result<f64, CharStringError> {
        self.data
            .last()
            .copied()
            .ok_or(CharStringError::StackUnderflow)
    }

    pub fn all(&self) -> &[f64] {
        &self.data
    }

    /// Keep the bottom `len` values.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Remove `n` values from the bottom of the stack.
    pub fn drop_bottom(&mut self, n: usize) {
        let n = n.min(self.data.len());
        self.data.drain(..n);
    }

    /// Keep only the top `n` values.
    pub fn keep_top(&mut self, n: usize) {
        let len = self.data.len();
        if n < len {
            self.drop_bottom(len - n);
        }
    }

    pub fn reverse(&mut self) {
        self.data.reverse();
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Cyclically rotate the top `n` values by `j` positions towards the top.
    ///
    /// Negative `j` rotates towards the bottom.
    pub fn roll(&mut self, n: usize, j: isize) -> Result<(), CharStringError> {
        if n > self.data.len() {
            return Err(CharStringError::StackUnderflow);
        }
        if n == 0 {
            return Ok(());
        }
        let start = self.data.len() - n;
        let shift = j.rem_euclid(n as isize) as usize;
        self.data[start..].rotate_right(shift);
        Ok(())
    }

    /// Push a copy of the value `i` positions below the top. Negative `i` copies the top.
    pub fn index(&mut self, i: isize) -> Result<(), CharStringError> {
        let i = i.max(0) as usize;
        if i >= self.data.len() {
            return Err(CharStringError::StackUnderflow);
        }
        let value = self.data[self.data.len() - 1 - i];
        self.push(value)
    }

    pub fn dup(&mut self) -> Result<(), CharStringError> {
        let value = self.peek()?;
        self.push(value)
    }

    pub fn exch(&mut self) -> Result<(), CharStringError> {
        let (a, b) = self.pop2()?;
        self.push(b)?;
        self.push(a)
    }
}

impl Debug for ArgumentsStack {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(&self.data).finish()
    }
}
