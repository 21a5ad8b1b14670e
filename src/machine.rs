//! The machine environment: the accumulator, the stack pointer and program
//! counter, the cell store, the code-region boundary, the input and output
//! queues, and the resolved symbol table. The loader is the only component
//! that constructs a ready-to-run machine; the execution engine mutates one;
//! everything else looks at snapshots.

use std::collections::VecDeque;
use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};

use crate::cell::{Cell, IntegerType};
use crate::memory::Memory;
use crate::symboltable::ResolvedTable;

/// The architectural registers. Operand position decides what a register name
/// means; the verifier rejects names outside this set.
pub const REGISTERS: [&str; 3] = ["ACC", "SP", "PC"];

pub fn is_register(name: &str) -> bool {
  REGISTERS.contains(&name)
}

pub const DEFAULT_CAPACITY: usize = 20;

/// Construction-time configuration. The input seed stands in for interactive
/// input; real programs would be fed a meaningful queue by their host.
#[derive(Clone, Debug)]
pub struct MachineConfig {
  /// Total memory capacity in cells.
  pub capacity: usize,
  /// Values preloaded onto the input queue, consumed front-first by `READ`.
  pub input_seed: Vec<IntegerType>
}

impl Default for MachineConfig{
  fn default() -> MachineConfig {
    MachineConfig {
      capacity: DEFAULT_CAPACITY,
      input_seed: vec![5]
    }
  }
}

#[derive(Clone, Debug)]
pub struct Machine {
  /// The single dedicated register, initially empty.
  pub accumulator: Cell,
  /// Stack pointer. The stack grows downward from the top of memory, so the
  /// initial value is the capacity itself.
  pub sp: usize,
  /// Program counter.
  pub pc: usize,
  /// The cell store, in exactly one of its two modes at any time.
  pub memory: Memory,
  /// Number of leading cells occupied by loaded code: the code region is
  /// `[0, static_size)`, the heap/stack region everything after.
  pub static_size: usize,
  /// Values available to `READ`, front-first.
  pub input: VecDeque<IntegerType>,
  /// Values produced by `WRITE`, append-only.
  pub output: Vec<IntegerType>,
  pub symbols: ResolvedTable
}

impl Machine {

  // region Construction and snapshotting

  /// A machine with `capacity` empty cells, frozen memory, and nothing loaded.
  pub fn new(capacity: usize) -> Machine {
    Machine {
      accumulator : Cell::Empty,
      sp          : capacity,
      pc          : 0,
      memory      : Memory::empty(capacity),
      static_size : 0,
      input       : VecDeque::new(),
      output      : Vec::new(),
      symbols     : ResolvedTable::empty()
    }
  }

  /// Replaces the memory with a mutable copy of itself. The loader calls this
  /// once before writing code; execution requires it.
  pub fn thaw_memory(&mut self) {
    self.memory = self.memory.thaw();
  }

  /// An independent copy with frozen memory, safe to inspect, compare, or
  /// keep, while the original keeps running. Never changes the original's
  /// memory mode.
  pub fn snapshot(&self) -> Machine {
    let mut copy = self.clone();
    copy.memory = self.memory.freeze();
    copy
  }

  // endregion

  // region Display methods

  fn make_memory_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for (i, cell) in self.memory.cells().iter().enumerate() {
      // Addresses carrying a label are annotated with it.
      let address_text =
        match self.symbols.label_at(i) {
          Some(label) => format!("{}: M[{}] =", label, i),
          None        => format!("M[{}] =", i)
        };

      match i == self.pc {

        true  => {
          table.add_row(
            row![r->format!("* --> {}", address_text), format!("{}", cell)]
          );
        }

        false => {
          table.add_row(
            row![r->address_text, format!("{}", cell)]
          );
        }

      } // end match on highlight
    } // end for
    table
  }

  fn join_queue<'a, I>(values: I) -> String
    where I: Iterator<Item=&'a IntegerType>
  {
    values
      .map(IntegerType::to_string)
      .collect::<Vec<String>>()
      .join(", ")
  }

  // endregion

}

lazy_static! {
  pub(crate) static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

/// The human-readable dump: registers, queues, code-region size, every memory
/// cell in index order, and the symbol table. Rendering reads a frozen
/// representation; a machine whose memory is mutable is snapshotted first.
impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    if !self.memory.is_frozen() {
      return write!(f, "{}", self.snapshot());
    }

    writeln!(f, "ACC: {} │ SP: {} │ PC: {} │ code cells: {}",
             self.accumulator, self.sp, self.pc, self.static_size)?;
    writeln!(f, "Input:  [{}]", Machine::join_queue(self.input.iter()))?;
    writeln!(f, "Output: [{}]", Machine::join_queue(self.output.iter()))?;
    write!(f, "{}", self.make_memory_table())?;
    write!(f, "{}", self.symbols)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn initial_machine_state() {
    let machine = Machine::new(20);

    assert_eq!(machine.accumulator, Cell::Empty);
    assert_eq!(machine.sp, 20);
    assert_eq!(machine.pc, 0);
    assert_eq!(machine.static_size, 0);
    assert_eq!(machine.memory.capacity(), 20);
    assert!(machine.memory.is_frozen());
    assert!(machine.memory.cells().iter().all(|c| *c == Cell::Empty));
    assert!(machine.input.is_empty());
    assert!(machine.output.is_empty());
  }

  #[test]
  fn snapshot_copies_without_disturbing_the_original() {
    let mut machine = Machine::new(4);
    machine.thaw_memory();
    machine.memory.set(0, Cell::Integer(9));

    let snapshot = machine.snapshot();

    assert!(snapshot.memory.is_frozen());
    assert!(!machine.memory.is_frozen());
    assert_eq!(snapshot.memory, machine.memory);

    // The snapshot is independent of later writes.
    machine.memory.set(1, Cell::Integer(1));
    assert_eq!(*snapshot.memory.get(1), Cell::Empty);
  }

  #[test]
  fn rendering_snapshots_a_mutable_machine() {
    let mut machine = Machine::new(3);
    machine.thaw_memory();
    machine.memory.set(0, Cell::Integer(42));

    let dump = format!("{}", machine);
    assert!(dump.contains("42"));
    assert!(dump.contains("ACC:"));
    // Rendering did not freeze the live machine.
    assert!(!machine.memory.is_frozen());
  }
}
