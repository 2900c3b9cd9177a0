use std::fmt;

// The arithmetic operators of Simple.
// The lexer hands out '=' as an arithmetic token too; the parser consumes it
// as the assignment sign of LET and never nests it inside an expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BinOp
{
	Add,
	Sub,
	Mul,
	Div,
	Mod,
	Assign,
}

impl BinOp
{
	pub fn lexeme(self) -> &'static str
	{
		use BinOp::*;

		match self
		{
			Add 	=> "+",
			Sub 	=> "-",
			Mul 	=> "*",
			Div 	=> "/",
			Mod 	=> "%",
			Assign 	=> "=",
		}
	}
}

impl fmt::Display for BinOp
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{
		write!(f, "{:}", self.lexeme())
	}
}

// The relational operators of the IF statement:
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RelOp
{
	Equal,
	NotEqual,
	Less,
	LessEqual,
	Greater,
	GreaterEqual,
}

impl RelOp
{
	pub fn lexeme(self) -> &'static str
	{
		use RelOp::*;

		match self
		{
			Equal 			=> "==",
			NotEqual 		=> "!=",
			Less 			=> "<",
			LessEqual 		=> "<=",
			Greater 		=> ">",
			GreaterEqual 	=> ">=",
		}
	}
}

impl fmt::Display for RelOp
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{
		write!(f, "{:}", self.lexeme())
	}
}

// The token kinds of the Simple language, payloads included:
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind
{
	LineNumber(i64),
	Rem,
	Input,
	Let,
	Print,
	Goto,
	If,
	End,
	Id(char),
	Number(i64),
	OpArith(BinOp),
	OpRel(RelOp),
	GotoKeyword,
	Newline,
	Eof,
}

impl fmt::Display for TokenKind
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{
		use TokenKind::*;

		match self
		{
			LineNumber(number) 	=> write!(f, "line number {:}", number),
			Rem 				=> write!(f, "'rem'"),
			Input 				=> write!(f, "'input'"),
			Let 				=> write!(f, "'let'"),
			Print 				=> write!(f, "'print'"),
			Goto 				=> write!(f, "'goto'"),
			If 					=> write!(f, "'if'"),
			End 				=> write!(f, "'end'"),
			Id(name) 			=> write!(f, "variable '{:}'", name),
			Number(value) 		=> write!(f, "number {:}", value),
			OpArith(op) 		=> write!(f, "operator '{:}'", op),
			OpRel(op) 			=> write!(f, "operator '{:}'", op),
			GotoKeyword 		=> write!(f, "'goto'"),
			Newline 			=> write!(f, "end of line"),
			Eof 				=> write!(f, "end of input"),
		}
	}
}

// A lexed token: its kind plus the 1-indexed source position it starts at.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Token
{
	pub kind: TokenKind,
	pub line: u32,
	pub column: u32,
}

impl Token
{
	pub fn new(kind: TokenKind, line: u32, column: u32) -> Token
	{
		Token
		{
			kind,
			line,
			column,
		}
	}
}
