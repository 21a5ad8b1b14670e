/*!

  The assembly language: its AST, its parser, and its canonical text form.

  Instructions are not encoded into words. Each decoded instruction occupies
  exactly one memory cell, so an address names an instruction, not a byte, and
  disassembly is a pure recursive rendering of the AST rather than a decode
  step. The renderer has one case per variant and trusts the tags in the data;
  in particular it never guesses whether an identifier was meant as a register
  or a symbol.

  Symbols appear in operands by name. They are resolved to addresses against
  the symbol table at load time, and kept symbolic in the AST so that
  disassembly reproduces the name the programmer wrote.

*/

mod instruction;
mod parser;

pub use instruction::{
  Destination,
  Instruction,
  Location,
  Opcode,
  OperandShape,
  Source,
  Value
};
pub use parser::{parse, Declaration};
