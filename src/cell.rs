use std::fmt::{Display, Formatter};

use crate::assembly::Instruction;
use crate::error::MachineError;

/// The signed integer datum a cell can hold.
pub type IntegerType = i32;

/// Concrete contents of one memory slot. A cell's variant never changes in
/// place; assignment replaces the whole cell.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Cell {
  /// Unfilled cell. Reading it for arithmetic is the caller's error.
  Empty,
  /// A plain numeric datum.
  Integer(IntegerType),
  /// A fully decoded instruction, placed by the loader; never synthesized by
  /// arithmetic.
  Instruction(Instruction)
}

/// The answer to `Cell::classify`, used by callers to branch safely instead of
/// assuming a variant.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CellKind {
  Empty,
  Number,
  Instruction
}

impl Display for CellKind{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self{
      CellKind::Empty       => write!(f, "empty"),
      CellKind::Number      => write!(f, "number"),
      CellKind::Instruction => write!(f, "instruction")
    }
  }
}

impl Cell {

  pub fn classify(&self) -> CellKind {
    match self{
      Cell::Empty          => CellKind::Empty,
      Cell::Integer(_)     => CellKind::Number,
      Cell::Instruction(_) => CellKind::Instruction
    }
  }

  /// The integer held by the cell, or a `TypeMismatch` for the other variants.
  pub fn as_integer(&self) -> Result<IntegerType, MachineError> {
    match self{

      Cell::Integer(value) => Ok(*value),

      _mismatch => {
        Err(MachineError::TypeMismatch {
          expected: CellKind::Number,
          found: self.classify()
        })
      }

    }
  }

  /// The instruction held by the cell, or a `TypeMismatch` for the other
  /// variants.
  pub fn as_instruction(&self) -> Result<&Instruction, MachineError> {
    match self{

      Cell::Instruction(instruction) => Ok(instruction),

      _mismatch => {
        Err(MachineError::TypeMismatch {
          expected: CellKind::Instruction,
          found: self.classify()
        })
      }

    }
  }

}

/// Integer cells render as decimal text and instruction cells as assembly
/// syntax. An empty cell renders as nothing at all, which keeps memory dumps
/// compact; it is not an error.
impl Display for Cell{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self{

      Cell::Empty => {
        write!(f, "")
      },

      Cell::Integer(value) => {
        write!(f, "{}", value)
      },

      Cell::Instruction(instruction) => {
        write!(f, "{}", instruction)
      }

    }
  }
}
