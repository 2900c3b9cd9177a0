use std::collections::{BTreeSet, HashMap};
use std::fmt;
use log::debug;
use thiserror::Error;
use crate::simple::{BinOp, Expr, Operand, Program, RelOp, Statement};
use crate::types::{Address, Image, Opcode, Word, MEMORY_WORDS};

// A named data cell discovered during compilation.
// The derived ordering (constants by value, then variables by letter, then
// the scratch cell) fixes the address layout, so the compiled image is a
// pure function of the source.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol
{
	Const(i32),
	Variable(char),
	Temp,
}

impl fmt::Display for Symbol
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{
		match self
		{
			Symbol::Const(value) 	=> write!(f, "constant {:}", value),
			Symbol::Variable(name) 	=> write!(f, "variable '{:}'", name),
			Symbol::Temp 			=> write!(f, "scratch cell"),
		}
	}
}

// The operand of a symbolic instruction, before the final patch.
// Simple line numbers and SML code addresses are deliberately distinct
// variants; mixing them up is the classic branch-patching bug.
#[derive(Copy, Clone, Debug)]
enum OperandRef
{
	// A data cell, resolved through the symbol table:
	Symbol(Symbol),

	// A Simple line number, resolved through the line-to-address map:
	Line(u32),

	// An already-final code address (the fall-through of !=, >=, <=):
	Addr(usize),

	// A literal operand (HALT 0):
	Immediate(u8),
}

// One emitted instruction with its not-yet-resolved operand:
#[derive(Copy, Clone, Debug)]
struct SymbolicInstruction
{
	opcode: Opcode,
	operand: OperandRef,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CompileError
{
	#[error("out of memory: {instructions} instruction words + {symbols} data cells = {total} words exceed the 100-word memory")]
	OutOfMemory
	{
		instructions: usize,
		symbols: usize,
		total: usize,
	},

	#[error("branch target {target} is not a defined line")]
	UnknownTarget
	{
		target: u32,
	},

	#[error("[line {line}] condition operand is too complex (assign it to a variable first)")]
	CompoundCondition
	{
		line: u32,
	},

	#[error("undefined symbol: {0}")]
	UndefinedSymbol(Symbol),
}

// The compiler lowers a statement tree to a Simpletron memory image in three
// phases: symbolic code emission, symbol discovery, then address assignment
// with a final patch pass. Data cells follow the code, so an image always
// occupies a single contiguous prefix of memory.
pub struct Compiler<'p>
{
	program: &'p Program,
	code: Vec<SymbolicInstruction>,
	line_to_address: HashMap<u32, usize>,
	symbol_table: HashMap<Symbol, Address>,
}

impl<'p> Compiler<'p>
{
	pub fn new(program: &'p Program) -> Compiler<'p>
	{
		Compiler
		{
			program,
			code: vec![],
			line_to_address: HashMap::new(),
			symbol_table: HashMap::new(),
		}
	}

	pub fn lower(mut self) -> Result<Image, CompileError>
	{
		self.emit_program()?;

		let symbols = self.discover_symbols();
		self.assign_addresses(symbols)?;

		self.patch()
	}

	// Phase 1: walk the statements in line order and emit symbolic code.
	// Each line is mapped to the address of its first instruction first, so
	// branches can be patched later.
	fn emit_program(&mut self) -> Result<(), CompileError>
	{
		for (line, statement) in self.program.statements()
		{
			self.line_to_address.insert(line, self.code.len());
			self.emit_statement(line, statement)?;
		}

		debug!("emitted {:} symbolic instructions for {:} lines", self.code.len(), self.program.len());

		Ok(())
	}

	fn emit(&mut self, opcode: Opcode, operand: OperandRef)
	{
		self.code.push(SymbolicInstruction
		{
			opcode,
			operand,
		});
	}

	fn emit_statement(&mut self, line: u32, statement: &Statement) -> Result<(), CompileError>
	{
		match statement
		{
			// Comments compile to nothing:
			Statement::Rem => (),

			Statement::Input(var) =>
			{
				self.emit(Opcode::Read, OperandRef::Symbol(Symbol::Variable(*var)));
			},
			Statement::Print(var) =>
			{
				self.emit(Opcode::Write, OperandRef::Symbol(Symbol::Variable(*var)));
			},
			Statement::End =>
			{
				self.emit(Opcode::Halt, OperandRef::Immediate(0));
			},
			Statement::Goto(target) =>
			{
				self.emit(Opcode::Branch, OperandRef::Line(*target));
			},
			Statement::Let(var, expr) =>
			{
				self.emit_assignment(*var, expr);
			},
			Statement::IfGoto { left, op, right, target } =>
			{
				self.emit_conditional(line, left, *op, right, *target)?;
			},
		}

		Ok(())
	}

	fn emit_assignment(&mut self, var: char, expr: &Expr)
	{
		match expr
		{
			Expr::Leaf(operand) =>
			{
				self.emit(Opcode::Load, OperandRef::Symbol(Compiler::operand_symbol(operand)));
			},
			Expr::Binary(left, BinOp::Mod, right) =>
			{
				// There is no remainder instruction; compute
				// left - (left / right) * right through the scratch cell.
				let left = OperandRef::Symbol(Compiler::operand_symbol(left));
				let right = OperandRef::Symbol(Compiler::operand_symbol(right));
				let temp = OperandRef::Symbol(Symbol::Temp);

				self.emit(Opcode::Load, left);
				self.emit(Opcode::Divide, right);
				self.emit(Opcode::Multiply, right);
				self.emit(Opcode::Store, temp);
				self.emit(Opcode::Load, left);
				self.emit(Opcode::Subtract, temp);
			},
			Expr::Binary(_, BinOp::Assign, right) =>
			{
				// An assignment used as operator has the value of its right side:
				self.emit(Opcode::Load, OperandRef::Symbol(Compiler::operand_symbol(right)));
			},
			Expr::Binary(left, op, right) =>
			{
				let opcode = match op
				{
					BinOp::Add 								=> Opcode::Add,
					BinOp::Sub 								=> Opcode::Subtract,
					BinOp::Mul 								=> Opcode::Multiply,
					BinOp::Div 								=> Opcode::Divide,
					BinOp::Mod | BinOp::Assign 				=> unreachable!("handled by the arms above"),
				};

				self.emit(Opcode::Load, OperandRef::Symbol(Compiler::operand_symbol(left)));
				self.emit(opcode, OperandRef::Symbol(Compiler::operand_symbol(right)));
			},
		}

		self.emit(Opcode::Store, OperandRef::Symbol(Symbol::Variable(var)));
	}

	fn emit_conditional(&mut self, line: u32, left: &Expr, op: RelOp, right: &Expr, target: u32) -> Result<(), CompileError>
	{
		// SML compares through the accumulator sign, so each side must be a
		// plain cell. The interpreter accepts richer conditions; here they
		// have to go through an intermediate variable.
		let left = OperandRef::Symbol(Compiler::condition_symbol(left, line)?);
		let right = OperandRef::Symbol(Compiler::condition_symbol(right, line)?);

		match op
		{
			RelOp::Equal =>
			{
				self.emit(Opcode::Load, left);
				self.emit(Opcode::Subtract, right);
				self.emit(Opcode::BranchZero, OperandRef::Line(target));
			},
			RelOp::Less =>
			{
				self.emit(Opcode::Load, left);
				self.emit(Opcode::Subtract, right);
				self.emit(Opcode::BranchNeg, OperandRef::Line(target));
			},
			RelOp::Greater =>
			{
				// left > right is right - left < 0:
				self.emit(Opcode::Load, right);
				self.emit(Opcode::Subtract, left);
				self.emit(Opcode::BranchNeg, OperandRef::Line(target));
			},
			RelOp::NotEqual =>
			{
				self.emit(Opcode::Load, left);
				self.emit(Opcode::Subtract, right);

				// Skip the unconditional branch when the difference is zero.
				// Two more instructions follow, so the fall-through address
				// is the current length plus two.
				let fall = self.code.len() + 2;
				self.emit(Opcode::BranchZero, OperandRef::Addr(fall));
				self.emit(Opcode::Branch, OperandRef::Line(target));
			},
			RelOp::GreaterEqual =>
			{
				self.emit(Opcode::Load, left);
				self.emit(Opcode::Subtract, right);

				let fall = self.code.len() + 2;
				self.emit(Opcode::BranchNeg, OperandRef::Addr(fall));
				self.emit(Opcode::Branch, OperandRef::Line(target));
			},
			RelOp::LessEqual =>
			{
				self.emit(Opcode::Load, right);
				self.emit(Opcode::Subtract, left);

				let fall = self.code.len() + 2;
				self.emit(Opcode::BranchNeg, OperandRef::Addr(fall));
				self.emit(Opcode::Branch, OperandRef::Line(target));
			},
		}

		Ok(())
	}

	fn operand_symbol(operand: &Operand) -> Symbol
	{
		match operand
		{
			Operand::Number(value) 		=> Symbol::Const(*value),
			Operand::Variable(name) 	=> Symbol::Variable(*name),
		}
	}

	fn condition_symbol(expr: &Expr, line: u32) -> Result<Symbol, CompileError>
	{
		match expr
		{
			Expr::Leaf(operand) 	=> Ok(Compiler::operand_symbol(operand)),
			Expr::Binary(..) 		=> Err(CompileError::CompoundCondition
			{
				line,
			}),
		}
	}

	// Phase 2: collect every variable and every literal used anywhere in the
	// tree. A modulo also claims the scratch cell. The set is ordered, which
	// makes the subsequent address assignment deterministic.
	fn discover_symbols(&self) -> BTreeSet<Symbol>
	{
		let mut symbols = BTreeSet::new();

		for (_, statement) in self.program.statements()
		{
			match statement
			{
				Statement::Input(var) | Statement::Print(var) =>
				{
					symbols.insert(Symbol::Variable(*var));
				},
				Statement::Let(var, expr) =>
				{
					symbols.insert(Symbol::Variable(*var));
					Compiler::discover_expr(expr, &mut symbols);
				},
				Statement::IfGoto { left, right, .. } =>
				{
					Compiler::discover_expr(left, &mut symbols);
					Compiler::discover_expr(right, &mut symbols);
				},
				Statement::Rem | Statement::Goto(_) | Statement::End => (),
			}
		}

		symbols
	}

	fn discover_expr(expr: &Expr, symbols: &mut BTreeSet<Symbol>)
	{
		match expr
		{
			Expr::Leaf(operand) =>
			{
				symbols.insert(Compiler::operand_symbol(operand));
			},
			Expr::Binary(left, op, right) =>
			{
				symbols.insert(Compiler::operand_symbol(left));
				symbols.insert(Compiler::operand_symbol(right));

				if let BinOp::Mod = op
				{
					symbols.insert(Symbol::Temp);
				}
			},
		}
	}

	// Phase 3a: data cells are assigned contiguously right behind the code.
	fn assign_addresses(&mut self, symbols: BTreeSet<Symbol>) -> Result<(), CompileError>
	{
		let code_size = self.code.len();
		let total = code_size + symbols.len();

		if total > MEMORY_WORDS
		{
			return Err(CompileError::OutOfMemory
			{
				instructions: code_size,
				symbols: symbols.len(),
				total,
			});
		}

		for (offset, symbol) in symbols.into_iter().enumerate()
		{
			self.symbol_table.insert(symbol, Address((code_size + offset) as u8));
		}

		debug!("assigned {:} data cells behind {:} code words", self.symbol_table.len(), code_size);

		Ok(())
	}

	// Phase 3b: preload the constants, then resolve every operand and pack
	// the final instruction words.
	fn patch(self) -> Result<Image, CompileError>
	{
		let mut words = [Word(0); MEMORY_WORDS];

		for (&symbol, &address) in self.symbol_table.iter()
		{
			if let Symbol::Const(value) = symbol
			{
				// Literals are range-checked by the parser, so the cast holds:
				words[address.0 as usize] = Word(value as i16);
			}
		}

		for (index, instruction) in self.code.iter().enumerate()
		{
			let operand = match instruction.operand
			{
				OperandRef::Symbol(symbol) =>
				{
					match self.symbol_table.get(&symbol)
					{
						Some(address) 	=> address.0,
						None 			=> return Err(CompileError::UndefinedSymbol(symbol)),
					}
				},
				OperandRef::Line(target) =>
				{
					match self.line_to_address.get(&target)
					{
						Some(&address) 	=> address as u8,
						None 			=> return Err(CompileError::UnknownTarget
						{
							target,
						}),
					}
				},
				OperandRef::Addr(address) 	=> address as u8,
				OperandRef::Immediate(value) 	=> value,
			};

			words[index] = Word::from(crate::types::Instruction
			{
				opcode: instruction.opcode,
				operand: Address(operand),
			});
		}

		Ok(Image(words))
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::simple::{Lexer, Parser};

	fn parse(source: &str) -> Program
	{
		let tokens = Lexer::new(source).tokenize().unwrap();
		Parser::new(&tokens).parse_program().unwrap()
	}

	fn lower(source: &str) -> Result<Image, CompileError>
	{
		let program = parse(source);
		Compiler::new(&program).lower()
	}

	fn words(image: &Image, count: usize) -> Vec<i16>
	{
		image.0[..count].iter().map(|word| word.0).collect()
	}

	#[test]
	fn sum_program_image()
	{
		// The classic two-number sum; its image is the canonical SML example:
		let source = "10 rem sum of two numbers\n20 input a\n30 input b\n40 let c = a + b\n50 print c\n60 end";
		let image = lower(source).unwrap();

		assert_eq!(words(&image, 10), vec!
		[
			1007, 	// READ a
			1008, 	// READ b
			2007, 	// LOAD a
			3008, 	// ADD b
			2109, 	// STORE c
			1109, 	// WRITE c
			4300, 	// HALT
			0, 0, 0,
		]);
	}

	#[test]
	fn data_follows_code_and_the_rest_is_zero()
	{
		let source = "10 input a\n20 print a\n30 end";
		let image = lower(source).unwrap();

		// Three instructions, one variable cell, 96 zero words:
		assert_eq!(words(&image, 4), vec![1003, 1103, 4300, 0]);
		assert!(image.0[4..].iter().all(|&word| word == Word(0)));
	}

	#[test]
	fn constants_are_preloaded()
	{
		let source = "10 let a = 5\n20 end";
		let image = lower(source).unwrap();

		// LOAD const5; STORE a; HALT; then const 5 at 03, a at 04:
		assert_eq!(words(&image, 5), vec![2003, 2104, 4300, 5, 0]);
	}

	#[test]
	fn constants_are_laid_out_in_numeric_order()
	{
		let source = "10 let a = 8 / 2\n20 print a\n30 end";
		let image = lower(source).unwrap();

		// Cells: const 2 = 05, const 8 = 06, a = 07:
		assert_eq!(words(&image, 8), vec![2006, 3205, 2107, 1107, 4300, 2, 8, 0]);
	}

	#[test]
	fn unary_minus_discovers_the_zero_constant()
	{
		let source = "10 let a = -x\n20 end";
		let image = lower(source).unwrap();

		// LOAD const0; SUBTRACT x; STORE a; HALT; cells: const0, a, x:
		assert_eq!(words(&image, 7), vec![2004, 3106, 2105, 4300, 0, 0, 0]);
	}

	#[test]
	fn goto_is_patched_through_the_line_map()
	{
		let source = "10 goto 30\n20 end\n30 end";
		let image = lower(source).unwrap();

		// BRANCH to the address of line 30 (instruction index 2):
		assert_eq!(words(&image, 3), vec![4002, 4300, 4300]);
	}

	#[test]
	fn equality_branch()
	{
		let source = "10 if a == b goto 30\n20 end\n30 end";
		let image = lower(source).unwrap();

		// LOAD a; SUBTRACT b; BRANCHZERO line30; HALT; HALT:
		assert_eq!(words(&image, 5), vec![2005, 3106, 4204, 4300, 4300]);
	}

	#[test]
	fn greater_swaps_the_operands()
	{
		let source = "10 if a > b goto 30\n20 end\n30 end";
		let image = lower(source).unwrap();

		// LOAD b; SUBTRACT a; BRANCHNEG line30:
		assert_eq!(words(&image, 5), vec![2006, 3105, 4104, 4300, 4300]);
	}

	#[test]
	fn not_equal_uses_a_fall_through_branch()
	{
		let source = "10 if a != b goto 40\n20 print a\n30 end\n40 end";
		let image = lower(source).unwrap();

		assert_eq!(words(&image, 7), vec!
		[
			2007, 	// LOAD a
			3108, 	// SUBTRACT b
			4204, 	// BRANCHZERO fall-through (address 4)
			4006, 	// BRANCH line 40 (address 6)
			1107, 	// WRITE a
			4300, 	// HALT (line 30)
			4300, 	// HALT (line 40)
		]);
	}

	#[test]
	fn modulo_lowers_to_a_remainder_sequence()
	{
		let source = "10 let r = a % b\n20 end";
		let image = lower(source).unwrap();

		// Cells: a = 08, b = 09, r = 10, scratch = 11:
		assert_eq!(words(&image, 8), vec!
		[
			2008, 	// LOAD a
			3209, 	// DIVIDE b
			3309, 	// MULTIPLY b
			2111, 	// STORE scratch
			2008, 	// LOAD a
			3111, 	// SUBTRACT scratch
			2110, 	// STORE r
			4300, 	// HALT
		]);
	}

	#[test]
	fn compilation_is_deterministic()
	{
		let source = "10 input a\n20 input b\n30 let c = a % b\n40 if c != 0 goto 60\n50 print a\n60 print c\n70 end";

		let first = lower(source).unwrap();
		let second = lower(source).unwrap();

		assert_eq!(first, second);
	}

	#[test]
	fn out_of_memory_reports_the_counts()
	{
		// 26 assignments (two words each) and 26 prints overflow the memory
		// together with the 27 data cells:
		let mut source = String::new();
		let mut line = 10;

		for name in (b'a'..=b'z').map(char::from)
		{
			source.push_str(&format!("{:} let {:} = 1\n", line, name));
			line += 10;
		}

		for name in (b'a'..=b'z').map(char::from)
		{
			source.push_str(&format!("{:} print {:}\n", line, name));
			line += 10;
		}

		source.push_str(&format!("{:} end\n", line));

		let error = lower(&source).unwrap_err();

		assert_eq!(error, CompileError::OutOfMemory
		{
			instructions: 79,
			symbols: 27,
			total: 106,
		});
	}

	#[test]
	fn unknown_branch_target_fails()
	{
		// The raw tree skips semantic analysis here, so the compiler has to
		// catch the dangling target itself:
		let error = lower("10 goto 99\n20 end").unwrap_err();

		assert_eq!(error, CompileError::UnknownTarget
		{
			target: 99,
		});
	}

	#[test]
	fn compound_condition_fails()
	{
		let error = lower("10 if a + 1 > b goto 30\n30 end").unwrap_err();

		assert_eq!(error, CompileError::CompoundCondition
		{
			line: 10,
		});
	}

	#[test]
	fn rem_emits_nothing()
	{
		let image = lower("10 rem nothing here\n20 end").unwrap();

		assert_eq!(words(&image, 2), vec![4300, 0]);
	}
}
