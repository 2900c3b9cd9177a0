use nom::
{
	IResult,
	branch::alt,
	bytes::complete::{tag, take_while, take_while1, take_while_m_n},
	character::complete::char as single_char,
	combinator::{map, recognize},
	sequence::pair,
};
use crate::simple::error::{LexError, LexErrorKind};
use crate::simple::token::{BinOp, RelOp, Token, TokenKind};

// The nom recognizers below match single lexemes at the head of the remaining
// line slice. The scan loop drives them, tracks columns from slice offsets and
// performs the keyword classification that needs lexer state (REM, IF ... GOTO).

fn digit_run(i: &str) -> IResult<&str, &str>
{
	take_while1(|c: char| c.is_ascii_digit())(i)
}

// An identifier-shaped run: one alphabetic char, then 0...n alphanumeric chars
// or underscores. Everything longer than a single lowercase letter that is not
// a keyword is rejected by the classification step.
fn word_run(i: &str) -> IResult<&str, &str>
{
	let cond_alpha = |c: char| c.is_alphabetic();
	let cond_alphanum = |c: char| c.is_alphanumeric() || (c == '_');

	recognize(pair(take_while_m_n(1, 1, cond_alpha), take_while(cond_alphanum)))(i)
}

fn operator(i: &str) -> IResult<&str, TokenKind>
{
	// The two-char operators must come first; '==' vs. '=' and friends.
	alt((
		map(tag("=="), |_| TokenKind::OpRel(RelOp::Equal)),
		map(tag("!="), |_| TokenKind::OpRel(RelOp::NotEqual)),
		map(tag("<="), |_| TokenKind::OpRel(RelOp::LessEqual)),
		map(tag(">="), |_| TokenKind::OpRel(RelOp::GreaterEqual)),
		map(single_char('<'), |_| TokenKind::OpRel(RelOp::Less)),
		map(single_char('>'), |_| TokenKind::OpRel(RelOp::Greater)),
		map(single_char('='), |_| TokenKind::OpArith(BinOp::Assign)),
		map(single_char('+'), |_| TokenKind::OpArith(BinOp::Add)),
		map(single_char('-'), |_| TokenKind::OpArith(BinOp::Sub)),
		map(single_char('*'), |_| TokenKind::OpArith(BinOp::Mul)),
		map(single_char('/'), |_| TokenKind::OpArith(BinOp::Div)),
		map(single_char('%'), |_| TokenKind::OpArith(BinOp::Mod)),
	))(i)
}

// The lexer turns a source string into a flat token sequence, one EOF token at
// the end. It works line by line; that automatically scopes the "inside an IF
// statement" flag that distinguishes GOTO from GOTO_KEYWORD.
pub struct Lexer<'src>
{
	source: &'src str,
}

impl<'src> Lexer<'src>
{
	pub fn new(source: &'src str) -> Lexer<'src>
	{
		Lexer
		{
			source,
		}
	}

	pub fn tokenize(&self) -> Result<Vec<Token>, LexError>
	{
		let mut tokens = vec![];

		let lines: Vec<&str> = self.source.split('\n').collect();
		let line_count = lines.len();

		for (index, raw_line) in lines.into_iter().enumerate()
		{
			let line_number = (index + 1) as u32;

			// Treat a trailing '\r' like any other inline whitespace:
			let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);

			self.scan_line(line, line_number, &mut tokens)?;

			// Every line boundary that exists in the source becomes one NEWLINE token:
			if index + 1 < line_count
			{
				tokens.push(Token::new(TokenKind::Newline, line_number, (line.len() + 1) as u32));
			}
			else
			{
				tokens.push(Token::new(TokenKind::Eof, line_number, (line.len() + 1) as u32));
			}
		}

		Ok(tokens)
	}

	fn scan_line(&self, line: &str, line_number: u32, tokens: &mut Vec<Token>) -> Result<(), LexError>
	{
		let mut rest = line;
		let mut in_if = false;

		// A digit run at the very start of the line is its Simple line number:
		if let Ok((next, digits)) = digit_run(rest)
		{
			let value = Lexer::number_value(digits, line_number, 1)?;
			tokens.push(Token::new(TokenKind::LineNumber(value), line_number, 1));
			rest = next;
		}

		loop
		{
			rest = rest.trim_start_matches(|c| (c == ' ') || (c == '\t'));

			if rest.is_empty()
			{
				return Ok(());
			}

			let column = (line.len() - rest.len() + 1) as u32;

			// Identifiers and keywords:
			if let Ok((next, word)) = word_run(rest)
			{
				match Lexer::classify_word(word, in_if)
				{
					Some(TokenKind::Rem) =>
					{
						// The remainder of the line is a comment:
						tokens.push(Token::new(TokenKind::Rem, line_number, column));
						return Ok(());
					},
					Some(kind) =>
					{
						if let TokenKind::If = kind
						{
							in_if = true;
						}

						tokens.push(Token::new(kind, line_number, column));
					},
					None =>
					{
						return Err(LexError::new(LexErrorKind::BadIdentifier(word.to_string()), line_number, column));
					},
				}

				rest = next;
				continue;
			}

			// Numbers:
			if let Ok((next, digits)) = digit_run(rest)
			{
				let value = Lexer::number_value(digits, line_number, column)?;
				tokens.push(Token::new(TokenKind::Number(value), line_number, column));

				rest = next;
				continue;
			}

			// Operators:
			if let Ok((next, kind)) = operator(rest)
			{
				tokens.push(Token::new(kind, line_number, column));

				rest = next;
				continue;
			}

			// Nothing matched. Distinguish the lonely '!' for a better message:
			let offender = match rest.chars().next()
			{
				Some('!') 	=> LexErrorKind::BareExclamation,
				Some(c) 	=> LexErrorKind::InvalidCharacter(c),
				None 		=> unreachable!("empty rest is handled above"),
			};

			return Err(LexError::new(offender, line_number, column));
		}
	}

	// Classify an identifier-shaped word.
	// Keywords are case-insensitive; everything else must be a single lowercase letter.
	fn classify_word(word: &str, in_if: bool) -> Option<TokenKind>
	{
		match word.to_ascii_lowercase().as_str()
		{
			"rem" 		=> return Some(TokenKind::Rem),
			"input" 	=> return Some(TokenKind::Input),
			"let" 		=> return Some(TokenKind::Let),
			"print" 	=> return Some(TokenKind::Print),
			"if" 		=> return Some(TokenKind::If),
			"end" 		=> return Some(TokenKind::End),
			"goto" 		=> return Some(if in_if { TokenKind::GotoKeyword } else { TokenKind::Goto }),
			_ 			=> (),
		}

		let mut chars = word.chars();

		match (chars.next(), chars.next())
		{
			(Some(name), None) if name.is_ascii_lowercase() 	=> Some(TokenKind::Id(name)),
			_ 													=> None,
		}
	}

	fn number_value(digits: &str, line_number: u32, column: u32) -> Result<i64, LexError>
	{
		digits.parse().map_err(|_| LexError::new(LexErrorKind::NumberTooLarge, line_number, column))
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	fn kinds(source: &str) -> Vec<TokenKind>
	{
		Lexer::new(source).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
	}

	#[test]
	fn empty_source()
	{
		assert_eq!(kinds(""), vec![TokenKind::Eof]);
	}

	#[test]
	fn line_number_vs_number()
	{
		// The leading digit run is the line number, later ones are plain numbers:
		assert_eq!(kinds("10 let a = 5"), vec!
		[
			TokenKind::LineNumber(10),
			TokenKind::Let,
			TokenKind::Id('a'),
			TokenKind::OpArith(BinOp::Assign),
			TokenKind::Number(5),
			TokenKind::Eof,
		]);
	}

	#[test]
	fn keywords_are_case_insensitive()
	{
		assert_eq!(kinds("10 PRINT a"), vec!
		[
			TokenKind::LineNumber(10),
			TokenKind::Print,
			TokenKind::Id('a'),
			TokenKind::Eof,
		]);
	}

	#[test]
	fn uppercase_identifier_fails()
	{
		let error = Lexer::new("10 input A").tokenize().unwrap_err();

		assert_eq!(error.kind, LexErrorKind::BadIdentifier("A".to_string()));
		assert_eq!((error.line, error.column), (1, 10));
	}

	#[test]
	fn long_identifier_fails()
	{
		let error = Lexer::new("10 input abc").tokenize().unwrap_err();

		assert_eq!(error.kind, LexErrorKind::BadIdentifier("abc".to_string()));
	}

	#[test]
	fn rem_discards_the_rest()
	{
		assert_eq!(kinds("10 rem anything #!$ goes 123"), vec!
		[
			TokenKind::LineNumber(10),
			TokenKind::Rem,
			TokenKind::Eof,
		]);
	}

	#[test]
	fn goto_inside_if()
	{
		assert_eq!(kinds("10 if a > b goto 70"), vec!
		[
			TokenKind::LineNumber(10),
			TokenKind::If,
			TokenKind::Id('a'),
			TokenKind::OpRel(RelOp::Greater),
			TokenKind::Id('b'),
			TokenKind::GotoKeyword,
			TokenKind::Number(70),
			TokenKind::Eof,
		]);
	}

	#[test]
	fn goto_outside_if()
	{
		assert_eq!(kinds("10 goto 70"), vec!
		[
			TokenKind::LineNumber(10),
			TokenKind::Goto,
			TokenKind::Number(70),
			TokenKind::Eof,
		]);
	}

	#[test]
	fn if_flag_resets_at_line_boundaries()
	{
		// The GOTO on the second line is not inside an IF anymore:
		assert_eq!(kinds("10 if a > b goto 70\n20 goto 80"), vec!
		[
			TokenKind::LineNumber(10),
			TokenKind::If,
			TokenKind::Id('a'),
			TokenKind::OpRel(RelOp::Greater),
			TokenKind::Id('b'),
			TokenKind::GotoKeyword,
			TokenKind::Number(70),
			TokenKind::Newline,
			TokenKind::LineNumber(20),
			TokenKind::Goto,
			TokenKind::Number(80),
			TokenKind::Eof,
		]);
	}

	#[test]
	fn assignment_vs_equality()
	{
		assert_eq!(kinds("10 if a == b goto 30"), vec!
		[
			TokenKind::LineNumber(10),
			TokenKind::If,
			TokenKind::Id('a'),
			TokenKind::OpRel(RelOp::Equal),
			TokenKind::Id('b'),
			TokenKind::GotoKeyword,
			TokenKind::Number(30),
			TokenKind::Eof,
		]);
	}

	#[test]
	fn relational_operators()
	{
		for (source, op) in &[("<", RelOp::Less), ("<=", RelOp::LessEqual), (">", RelOp::Greater), (">=", RelOp::GreaterEqual), ("!=", RelOp::NotEqual)]
		{
			let tokens = kinds(&format!("10 if a {:} b goto 30", op.lexeme()));
			assert_eq!(tokens[3], TokenKind::OpRel(*op), "source operator {:}", source);
		}
	}

	#[test]
	fn bare_exclamation_fails()
	{
		let error = Lexer::new("10 if a ! b goto 30").tokenize().unwrap_err();

		assert_eq!(error.kind, LexErrorKind::BareExclamation);
		assert_eq!((error.line, error.column), (1, 9));
	}

	#[test]
	fn invalid_character_fails()
	{
		let error = Lexer::new("10 let a = 5 ; 3").tokenize().unwrap_err();

		assert_eq!(error.kind, LexErrorKind::InvalidCharacter(';'));
		assert_eq!((error.line, error.column), (1, 14));
	}

	#[test]
	fn positions_are_one_indexed()
	{
		let tokens = Lexer::new("10 input a").tokenize().unwrap();

		assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
		assert_eq!((tokens[1].line, tokens[1].column), (1, 4));
		assert_eq!((tokens[2].line, tokens[2].column), (1, 10));
	}

	#[test]
	fn blank_lines_produce_newlines()
	{
		assert_eq!(kinds("10 end\n\n"), vec!
		[
			TokenKind::LineNumber(10),
			TokenKind::End,
			TokenKind::Newline,
			TokenKind::Newline,
			TokenKind::Eof,
		]);
	}

	#[test]
	fn carriage_returns_are_ignored()
	{
		assert_eq!(kinds("10 end\r\n20 end"), vec!
		[
			TokenKind::LineNumber(10),
			TokenKind::End,
			TokenKind::Newline,
			TokenKind::LineNumber(20),
			TokenKind::End,
			TokenKind::Eof,
		]);
	}

	#[test]
	fn huge_number_fails()
	{
		let error = Lexer::new("10 let a = 99999999999999999999").tokenize().unwrap_err();

		assert_eq!(error.kind, LexErrorKind::NumberTooLarge);
	}
}
