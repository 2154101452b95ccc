// The path construction operators in this file are derived from ttf-parser, licenced under
// Apache-2.0.
// https://github.com/RazrFalcon/ttf-parser/blob/439aaaebd50eb8aed66302e3c1b51fae047f85b2/src/tables/cff/charstring.rs

use pathfinder_geometry::line_segment::LineSegment2F;
use pathfinder_geometry::vector::vec2f;

use crate::error::CharStringError;
use crate::outline::{BBox, OutlineSink};

use super::argstack::ArgumentsStack;
use super::program::Instruction;

/// Tracks the current point and forwards absolute path events to an `OutlineSink`.
///
/// All drawing methods take deltas relative to the current point. The bounding box covers every
/// point visited, including moves and curve control points. When a program is being recorded
/// the deltas are kept relative to the previously recorded point, starting at the origin.
pub(crate) struct PathBuilder<'s, S: OutlineSink> {
    sink: &'s mut S,
    pub bbox: BBox,
    pub x: f64,
    pub y: f64,
    has_move_to: bool,
    has_drawn: bool,
    program: Option<Vec<Instruction>>,
    pen: (f64, f64),
}

impl<'s, S: OutlineSink> PathBuilder<'s, S> {
    pub fn new(sink: &'s mut S, record: bool) -> Self {
        PathBuilder {
            sink,
            bbox: BBox::empty(),
            x: 0.0,
            y: 0.0,
            has_move_to: false,
            has_drawn: false,
            program: record.then(Vec::new),
            pen: (0.0, 0.0),
        }
    }

    /// Returns true once any move or drawing operator has run.
    pub fn has_drawn(&self) -> bool {
        self.has_drawn
    }

    pub fn record(&mut self, instruction: Instruction) {
        if let Some(program) = self.program.as_mut() {
            program.push(instruction);
        }
    }

    fn record_point(&mut self, make: impl FnOnce(f64, f64) -> Instruction) {
        if self.program.is_some() {
            let (dx, dy) = (self.x - self.pen.0, self.y - self.pen.1);
            self.pen = (self.x, self.y);
            self.record(make(dx, dy));
        }
    }

    /// Set the current point without drawing, as `hsbw`, `sbw` and `setcurrentpoint` do.
    pub fn set_current_point(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    pub fn move_to(&mut self, dx: f64, dy: f64) {
        if self.has_move_to {
            self.sink.close();
        }
        self.has_move_to = true;
        self.has_drawn = true;
        self.x += dx;
        self.y += dy;
        self.bbox.extend_by(self.x, self.y);
        self.sink.move_to(vec2f(self.x as f32, self.y as f32));
        self.record_point(Instruction::MoveTo);
    }

    fn ensure_move_to(&mut self) {
        // A path that starts without a moveto begins at the current point.
        if !self.has_move_to {
            self.move_to(0.0, 0.0);
        }
    }

    pub fn line_to(&mut self, dx: f64, dy: f64) {
        self.ensure_move_to();
        self.x += dx;
        self.y += dy;
        self.bbox.extend_by(self.x, self.y);
        self.sink.line_to(vec2f(self.x as f32, self.y as f32));
        self.record_point(Instruction::LineTo);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn curve_to(&mut self, dx1: f64, dy1: f64, dx2: f64, dy2: f64, dx3: f64, dy3: f64) {
        self.ensure_move_to();
        let x1 = self.x + dx1;
        let y1 = self.y + dy1;
        let x2 = x1 + dx2;
        let y2 = y1 + dy2;
        let x = x2 + dx3;
        let y = y2 + dy3;
        self.bbox.extend_by(x1, y1);
        self.bbox.extend_by(x2, y2);
        self.bbox.extend_by(x, y);
        self.sink.cubic_curve_to(
            LineSegment2F::new(vec2f(x1 as f32, y1 as f32), vec2f(x2 as f32, y2 as f32)),
            vec2f(x as f32, y as f32),
        );
        let (px, py) = self.pen;
        self.x = x;
        self.y = y;
        if self.program.is_some() {
            self.pen = (x, y);
            self.record(Instruction::CurveTo([
                x1 - px,
                y1 - py,
                x2 - x1,
                y2 - y1,
                x - x2,
                y - y2,
            ]));
        }
    }

    /// Curve through absolute points, used by Type 1 flex.
    pub fn curve_to_abs(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64) {
        let (cx, cy) = (self.x, self.y);
        self.curve_to(x1 - cx, y1 - cy, x2 - x1, y2 - y1, x - x2, y - y2);
    }

    /// Close the current path, if there is one.
    pub fn close_path(&mut self) {
        if self.has_move_to {
            self.sink.close();
            self.has_move_to = false;
        }
    }

    /// Close any open path and mark the end of the program.
    pub fn end(&mut self) {
        self.close_path();
        self.record(Instruction::EndChar);
    }

    pub fn finish(self) -> (BBox, Option<Vec<Instruction>>) {
        (self.bbox, self.program)
    }

    // Operand consuming forms of the drawing operators. Each reads its arguments from the bottom
    // of the stack starting at `offset`, then clears the stack.

    pub fn parse_move_to(
        &mut self,
        stack: &mut ArgumentsStack,
        offset: usize,
    ) -> Result<(), CharStringError> {
        // dx1 dy1
        if stack.len() < offset + 2 {
            return Err(CharStringError::StackUnderflow);
        }
        self.move_to(stack.at(offset), stack.at(offset + 1));
        stack.clear();
        Ok(())
    }

    pub fn parse_horizontal_move_to(
        &mut self,
        stack: &mut ArgumentsStack,
        offset: usize,
    ) -> Result<(), CharStringError> {
        // dx1
        if stack.len() < offset + 1 {
            return Err(CharStringError::StackUnderflow);
        }
        self.move_to(stack.at(offset), 0.0);
        stack.clear();
        Ok(())
    }

    pub fn parse_vertical_move_to(
        &mut self,
        stack: &mut ArgumentsStack,
        offset: usize,
    ) -> Result<(), CharStringError> {
        // dy1
        if stack.len() < offset + 1 {
            return Err(CharStringError::StackUnderflow);
        }
        self.move_to(0.0, stack.at(offset));
        stack.clear();
        Ok(())
    }

    pub fn parse_line_to(&mut self, stack: &mut ArgumentsStack) -> Result<(), CharStringError> {
        // {dxa dya}+
        if stack.len() < 2 {
            return Err(CharStringError::StackUnderflow);
        }

        let mut i = 0;
        while i + 2 <= stack.len() {
            self.line_to(stack.at(i), stack.at(i + 1));
            i += 2;
        }

        stack.clear();
        Ok(())
    }

    /// `hlineto` when `horizontal_first`, otherwise `vlineto`.
    pub fn parse_alternating_line_to(
        &mut self,
        stack: &mut ArgumentsStack,
        horizontal_first: bool,
    ) -> Result<(), CharStringError> {
        // dx1 {dya dxb}*  or  dy1 {dxa dyb}*
        if stack.is_empty() {
            return Err(CharStringError::StackUnderflow);
        }

        let mut horizontal = horizontal_first;
        for i in 0..stack.len() {
            let d = stack.at(i);
            if horizontal {
                self.line_to(d, 0.0);
            } else {
                self.line_to(0.0, d);
            }
            horizontal = !horizontal;
        }

        stack.clear();
        Ok(())
    }

    pub fn parse_curve_to(&mut self, stack: &mut ArgumentsStack) -> Result<(), CharStringError> {
        // {dxa dya dxb dyb dxc dyc}+
        if stack.len() < 6 {
            return Err(CharStringError::StackUnderflow);
        }

        let mut i = 0;
        while i + 6 <= stack.len() {
            self.curve_at(stack, i);
            i += 6;
        }

        stack.clear();
        Ok(())
    }

    fn curve_at(&mut self, stack: &ArgumentsStack, i: usize) {
        self.curve_to(
            stack.at(i),
            stack.at(i + 1),
            stack.at(i + 2),
            stack.at(i + 3),
            stack.at(i + 4),
            stack.at(i + 5),
        );
    }

    pub fn parse_curve_line(&mut self, stack: &mut ArgumentsStack) -> Result<(), CharStringError> {
        // {dxa dya dxb dyb dxc dyc}+ dxd dyd
        if stack.len() < 8 {
            return Err(CharStringError::StackUnderflow);
        }

        let curves_end = stack.len() - 2;
        let mut i = 0;
        while i + 6 <= curves_end {
            self.curve_at(stack, i);
            i += 6;
        }
        self.line_to(stack.at(curves_end), stack.at(curves_end + 1));

        stack.clear();
        Ok(())
    }

    pub fn parse_line_curve(&mut self, stack: &mut ArgumentsStack) -> Result<(), CharStringError> {
        // {dxa dya}+ dxb dyb dxc dyc dxd dyd
        if stack.len() < 8 {
            return Err(CharStringError::StackUnderflow);
        }

        let lines_end = stack.len() - 6;
        let mut i = 0;
        while i + 2 <= lines_end {
            self.line_to(stack.at(i), stack.at(i + 1));
            i += 2;
        }
        self.curve_at(stack, lines_end);

        stack.clear();
        Ok(())
    }

    pub fn parse_hh_curve_to(&mut self, stack: &mut ArgumentsStack) -> Result<(), CharStringError> {
        // dy1? {dxa dxb dyb dxc}+
        let mut i = 0;
        let mut dy1 = 0.0;

        // The odd argument count indicates an Y position.
        if stack.len() % 2 == 1 {
            dy1 = stack.at(0);
            i += 1;
        }

        if stack.len() - i < 4 {
            return Err(CharStringError::StackUnderflow);
        }

        while i + 4 <= stack.len() {
            self.curve_to(
                stack.at(i),
                dy1,
                stack.at(i + 1),
                stack.at(i + 2),
                stack.at(i + 3),
                0.0,
            );
            dy1 = 0.0;
            i += 4;
        }

        stack.clear();
        Ok(())
    }

    pub fn parse_vv_curve_to(&mut self, stack: &mut ArgumentsStack) -> Result<(), CharStringError> {
        // dx1? {dya dxb dyb dyc}+
        let mut i = 0;
        let mut dx1 = 0.0;

        // The odd argument count indicates an X position.
        if stack.len() % 2 == 1 {
            dx1 = stack.at(0);
            i += 1;
        }

        if stack.len() - i < 4 {
            return Err(CharStringError::StackUnderflow);
        }

        while i + 4 <= stack.len() {
            self.curve_to(
                dx1,
                stack.at(i),
                stack.at(i + 1),
                stack.at(i + 2),
                0.0,
                stack.at(i + 3),
            );
            dx1 = 0.0;
            i += 4;
        }

        stack.clear();
        Ok(())
    }

    /// `hvcurveto` when `horizontal_first`, otherwise `vhcurveto`.
    pub fn parse_alternating_curve_to(
        &mut self,
        stack: &mut ArgumentsStack,
        horizontal_first: bool,
    ) -> Result<(), CharStringError> {
        // dx1 dx2 dy2 dy3 {dya dxb dyb dxc dxd dxe dye dyf}* dxf?
        //                 {dxa dxb dyb dyc dyd dxe dye dxf}+ dyf?
        if stack.len() < 4 {
            return Err(CharStringError::StackUnderflow);
        }

        let len = stack.len();
        let mut horizontal = horizontal_first;
        let mut i = 0;
        while i + 4 <= len {
            let a = stack.at(i);
            let b = stack.at(i + 1);
            let c = stack.at(i + 2);
            let d = stack.at(i + 3);
            // A single trailing operand belongs to the last curve.
            let last = if len - (i + 4) == 1 {
                stack.at(i + 4)
            } else {
                0.0
            };
            if horizontal {
                self.curve_to(a, 0.0, b, c, last, d);
            } else {
                self.curve_to(0.0, a, b, c, d, last);
            }
            horizontal = !horizontal;
            i += 4;
        }

        stack.clear();
        Ok(())
    }

    pub fn parse_flex(&mut self, stack: &mut ArgumentsStack) -> Result<(), CharStringError> {
        // dx1 dy1 dx2 dy2 dx3 dy3 dx4 dy4 dx5 dy5 dx6 dy6 fd
        if stack.len() < 13 {
            return Err(CharStringError::StackUnderflow);
        }

        self.curve_at(stack, 0);
        self.curve_at(stack, 6);

        stack.clear();
        Ok(())
    }

    pub fn parse_flex1(&mut self, stack: &mut ArgumentsStack) -> Result<(), CharStringError> {
        // dx1 dy1 dx2 dy2 dx3 dy3 dx4 dy4 dx5 dy5 d6
        if stack.len() < 11 {
            return Err(CharStringError::StackUnderflow);
        }

        let mut dx = 0.0;
        let mut dy = 0.0;
        for i in (0..10).step_by(2) {
            dx += stack.at(i);
            dy += stack.at(i + 1);
        }

        // The last point moves along whichever axis saw the larger total change.
        let (dx6, dy6) = if dx.abs() > dy.abs() {
            (stack.at(10), -dy)
        } else {
            (-dx, stack.at(10))
        };

        self.curve_at(stack, 0);
        self.curve_to(
            stack.at(6),
            stack.at(7),
            stack.at(8),
            stack.at(9),
            dx6,
            dy6,
        );

        stack.clear();
        Ok(())
    }

    pub fn parse_hflex(&mut self, stack: &mut ArgumentsStack) -> Result<(), CharStringError> {
        // dx1 dx2 dy2 dx3 dx4 dx5 dx6
        if stack.len() < 7 {
            return Err(CharStringError::StackUnderflow);
        }

        let dy2 = stack.at(2);
        self.curve_to(stack.at(0), 0.0, stack.at(1), dy2, stack.at(3), 0.0);
        self.curve_to(stack.at(4), 0.0, stack.at(5), -dy2, stack.at(6), 0.0);

        stack.clear();
        Ok(())
    }

    pub fn parse_hflex1(&mut self, stack: &mut ArgumentsStack) -> Result<(), CharStringError> {
        // dx1 dy1 dx2 dy2 dx3 dx4 dx5 dy5 dx6
        if stack.len() < 9 {
            return Err(CharStringError::StackUnderflow);
        }

        let dy1 = stack.at(1);
        let dy2 = stack.at(3);
        let dy5 = stack.at(7);
        self.curve_to(stack.at(0), dy1, stack.at(2), dy2, stack.at(4), 0.0);
        self.curve_to(
            stack.at(5),
            0.0,
            stack.at(6),
            dy5,
            stack.at(8),
            -(dy1 + dy2 + dy5),
        );

        stack.clear();
        Ok(())
    }
}
