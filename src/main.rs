#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

mod assembly;
mod cell;
mod error;
mod exec;
mod loader;
mod machine;
mod memory;
mod symboltable;

use crate::loader::load;
use crate::machine::MachineConfig;

fn main() {

  #[cfg(feature = "trace_computation")]
  println!("Computation Tracing ENABLED");

  let text = "\
; Multiply the input by its successor, n * (n + 1), using the stack.
        READ ACC            ; n arrives on the input queue
        PUSH ACC
        ADD #1 ACC          ; n + 1
        MULT (SP)+ ACC      ; times the saved n
        WRITE ACC
        HALT
";

  println!("# Source\n{}", text);

  let config = MachineConfig::default();
  let mut machine =
    match load(text, &config) {
      Ok(machine) => machine,
      Err(e) => {
        eprintln!("{}", e);
        return;
      }
    };

  println!("# Loaded\n{}\n", machine);

  match machine.run() {

    Ok(()) => {
      println!("# Halted\n{}", machine);
    }

    Err(e) => {
      eprintln!("{}", e);
      println!("# Failed\n{}", machine);
    }

  }
}
