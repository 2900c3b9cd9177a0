use std::collections::BTreeMap;
use crate::simple::token::{BinOp, RelOp};

// A leaf of an expression: a literal or a variable reference.
// Literals are range-checked to [-9999, 9999] by the parser.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operand
{
	Number(i32),
	Variable(char),
}

// A Simple expression holds at most one binary operation; the depth bound of
// the language is enforced by the type. Unary minus is encoded as
// Binary(Number(0), Sub, operand).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Expr
{
	Leaf(Operand),
	Binary(Operand, BinOp, Operand),
}

// The statement kinds of Simple.
// The source line number a statement was declared on is the key it is stored
// under in the Program map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement
{
	Rem,
	Input(char),
	Print(char),
	Let(char, Expr),
	Goto(u32),
	IfGoto
	{
		left: Expr,
		op: RelOp,
		right: Expr,
		target: u32,
	},
	End,
}

// A program maps each declared line number to exactly one statement.
// The map is ordered, so iteration is the execution order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program
{
	lines: BTreeMap<u32, Statement>,
}

impl Program
{
	pub fn new() -> Program
	{
		Program
		{
			lines: BTreeMap::new(),
		}
	}

	pub(crate) fn insert(&mut self, line: u32, statement: Statement)
	{
		self.lines.insert(line, statement);
	}

	pub fn contains_line(&self, line: u32) -> bool
	{
		self.lines.contains_key(&line)
	}

	pub fn get(&self, line: u32) -> Option<&Statement>
	{
		self.lines.get(&line)
	}

	// The statements in ascending line-number order:
	pub fn statements(&self) -> impl Iterator<Item = (u32, &Statement)>
	{
		self.lines.iter().map(|(&line, statement)| (line, statement))
	}

	pub fn line_numbers(&self) -> Vec<u32>
	{
		self.lines.keys().copied().collect()
	}

	pub fn len(&self) -> usize
	{
		self.lines.len()
	}

	pub fn is_empty(&self) -> bool
	{
		self.lines.is_empty()
	}
}
