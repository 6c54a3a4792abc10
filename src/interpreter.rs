use std::{cell::RefCell, fmt::Debug, io::Write, rc::Rc};

use crate::ast::{Element, Instruction, InstructionKind, Op, Program};

pub const TAPE_LEN: usize = 128;

pub struct Interpreter {
    tape: [u8; TAPE_LEN],
    pointer: usize,
    instruction_counter: u64,
    input: Vec<u8>,
    input_cursor: usize,
    output: Rc<RefCell<dyn Write>>,
}

impl Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("pointer", &self.pointer)
            .field("instruction_counter", &self.instruction_counter)
            .field("input_cursor", &self.input_cursor)
            .finish()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Vec::new(), Rc::new(RefCell::new(std::io::stdout())))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("instruction {instruction}: {kind}")]
    Halted {
        kind: ExecutionErrorKind,
        instruction: u64,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionErrorKind {
    #[error("display of dismay: cell {cell} holds {value}, outside printable range 32-126")]
    DisplayOfDismay { cell: usize, value: u8 },
    #[error("input exhausted")]
    InputExhausted,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Interpreter {
    pub fn new(input: Vec<u8>, output: Rc<RefCell<dyn Write>>) -> Self {
        Self {
            tape: [0; TAPE_LEN],
            pointer: 0,
            instruction_counter: 0,
            input,
            input_cursor: 0,
            output,
        }
    }

    pub fn interpret(&mut self, program: &Program) -> Result<(), ExecutionError> {
        for instruction in program.0.iter() {
            if let Err(error) = self.execute(instruction) {
                // Output produced before the error survives it.
                let _ = self.output.borrow_mut().flush();
                return Err(error);
            }
        }

        self.output
            .borrow_mut()
            .flush()
            .map_err(|e| ExecutionError::Halted {
                kind: e.into(),
                instruction: self.instruction_counter,
            })
    }

    pub fn tape(&self) -> &[u8; TAPE_LEN] {
        &self.tape
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn instructions_executed(&self) -> u64 {
        self.instruction_counter
    }

    fn execute(&mut self, instruction: &Instruction) -> Result<(), ExecutionError> {
        self.instruction_counter += 1;
        let own_number = self.instruction_counter;

        #[cfg(feature = "trace")]
        {
            println!(
                "#{} depth={} {:?} ptr={} cell={}",
                own_number,
                instruction.depth,
                instruction.kind,
                self.pointer,
                self.tape[self.pointer]
            );
        }

        let run_body = match instruction.kind {
            InstructionKind::Normal => true,
            InstructionKind::Conditional => self.tape[self.pointer] != 0,
        };

        // None: no ^/v authored directly in this instruction, the default
        // movement applies. Some(0): contributions cancelled, the pointer
        // stays put.
        let mut movement: Option<i64> = None;

        if run_body {
            // Even depth: + adds, - subtracts, ^ moves right, v moves left.
            // Odd depth inverts all four.
            let sign: i64 = if instruction.depth % 2 == 0 { 1 } else { -1 };
            let mut run: Option<(Op, u64)> = None;

            for element in instruction.elements.iter() {
                match element {
                    Element::Symbol(op) => match op {
                        Op::Plus | Op::Minus => {
                            // The k-th symbol of a maximal run applies
                            // magnitude k, not 1.
                            let length = match run {
                                Some((symbol, length)) if symbol == *op => length + 1,
                                _ => 1,
                            };
                            run = Some((*op, length));
                            let direction = if *op == Op::Plus { sign } else { -sign };
                            let delta = direction * length as i64;
                            self.tape[self.pointer] =
                                (i64::from(self.tape[self.pointer]) + delta).rem_euclid(256) as u8;
                        }
                        Op::Up => {
                            run = None;
                            *movement.get_or_insert(0) += sign;
                        }
                        Op::Down => {
                            run = None;
                            *movement.get_or_insert(0) -= sign;
                        }
                        Op::Print => {
                            run = None;
                            let value = self.tape[self.pointer];
                            if !(32..=126).contains(&value) {
                                return Err(ExecutionError::Halted {
                                    kind: ExecutionErrorKind::DisplayOfDismay {
                                        cell: self.pointer,
                                        value,
                                    },
                                    instruction: own_number,
                                });
                            }
                            self.output.borrow_mut().write_all(&[value]).map_err(|e| {
                                ExecutionError::Halted {
                                    kind: e.into(),
                                    instruction: own_number,
                                }
                            })?;
                        }
                        Op::Read => {
                            run = None;
                            let Some(&byte) = self.input.get(self.input_cursor) else {
                                return Err(ExecutionError::Halted {
                                    kind: ExecutionErrorKind::InputExhausted,
                                    instruction: own_number,
                                });
                            };
                            self.input_cursor += 1;
                            self.tape[self.pointer] = byte;
                        }
                        Op::Clear => {
                            run = None;
                            self.tape[self.pointer] = 0;
                        }
                    },
                    // A child neither resets the parent's run tracker nor
                    // contributes to the parent's movement.
                    Element::Nested(child) => self.execute(child)?,
                }
            }
        }

        let delta = match movement {
            Some(sum) => sum,
            None if own_number % 2 == 1 => -1,
            None => 1,
        };
        self.pointer = (self.pointer as i64 + delta).rem_euclid(TAPE_LEN as i64) as usize;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{parser, tokenizer};

    fn run(source: &str, input: &[u8]) -> (Interpreter, Result<(), ExecutionError>) {
        let tokens = tokenizer::tokens(source).unwrap();
        let program = parser::program(&tokens).unwrap();
        let output: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let mut interpreter = Interpreter::new(input.to_vec(), output);
        let result = interpreter.interpret(&program);
        (interpreter, result)
    }

    #[test]
    fn run_survives_a_nested_instruction() {
        // The child executes (and moves the pointer) between the second and
        // third '+', but the parent's run keeps chaining: 1+2 at cell 0,
        // then 3 at cell 1.
        let (interpreter, result) = run("(<++(<>)+>)", &[]);
        result.unwrap();
        assert_eq!(interpreter.tape()[0], 3);
        assert_eq!(interpreter.tape()[1], 3);
    }

    #[test]
    fn other_symbols_break_the_run() {
        // +++ then # then ++: the second run restarts at magnitude 1.
        let (interpreter, result) = run("(<+++#++>)", &[]);
        result.unwrap();
        assert_eq!(interpreter.tape()[0], 3);
    }

    #[test]
    fn switching_symbol_restarts_the_run() {
        // ++++ adds 10, then -- subtracts 1+2.
        let (interpreter, result) = run("(<++++-->)", &[]);
        result.unwrap();
        assert_eq!(interpreter.tape()[0], 7);
    }

    #[test]
    fn cancelled_override_still_suppresses_default_movement() {
        let (interpreter, result) = run("(<^v>)", &[]);
        result.unwrap();
        assert_eq!(interpreter.pointer(), 0);
    }

    #[test]
    fn override_is_scoped_to_the_authoring_instruction() {
        // Parent's own ^ is +1; the child's ^ (inverted at depth 1) moves
        // the pointer to 127 when the child finishes but never joins the
        // parent's accumulator, so the parent moves 127 -> 0.
        let (interpreter, result) = run("(<^(<^>)>)", &[]);
        result.unwrap();
        assert_eq!(interpreter.pointer(), 0);
    }

    #[test]
    fn odd_depth_inverts_pointer_symbols() {
        let (interpreter, result) = run("(<(<^>)+>)", &[]);
        result.unwrap();
        // Child's ^ at depth 1 moved 0 -> 127, the parent's + lands there,
        // then the parent's default movement (odd, left) lands on 126.
        assert_eq!(interpreter.tape()[127], 1);
        assert_eq!(interpreter.pointer(), 126);
    }

    #[test]
    fn counter_includes_skipped_conditionals_once() {
        let (interpreter, result) = run("(?+(<+>)?)", &[]);
        result.unwrap();
        assert_eq!(interpreter.instructions_executed(), 1);
        assert_eq!(interpreter.tape()[0], 0);
    }
}
