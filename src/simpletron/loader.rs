use nom::
{
	IResult,
	branch::alt,
	bytes::complete::take_while_m_n,
	character::complete::{char as single_char, space0},
	combinator::{all_consuming, map_res, opt},
	sequence::{delimited, pair, terminated},
};
use thiserror::Error;
use crate::types::{Image, Word, MEMORY_WORDS};

// The direct-load SML source format: one word per non-empty line, either
// "AA: +NNNN" or just "+NNNN". The sign is mandatory. Without an explicit
// address, a word lands at its 0-indexed position among the non-empty lines.

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LoadError
{
	#[error("[line {line}] cannot parse \"{text}\" as an SML word")]
	BadLine
	{
		line: usize,
		text: String,
	},

	#[error("[line {line}] address {address} is outside the 100-word memory")]
	BadAddress
	{
		line: usize,
		address: usize,
	},
}

fn address_prefix(i: &str) -> IResult<&str, usize>
{
	// The canonical form is a two-digit address followed by ':'; longer runs
	// are accepted here and rejected by the range check below.
	map_res(terminated(take_while_m_n(1, 3, |c: char| c.is_ascii_digit()), single_char(':')), |s: &str| s.parse())(i)
}

fn signed_word(i: &str) -> IResult<&str, Word>
{
	// An explicit sign and exactly four digits:
	let sign = alt((single_char('+'), single_char('-')));
	let digits = take_while_m_n(4, 4, |c: char| c.is_ascii_digit());

	map_res(pair(sign, digits), |(sign, digits): (char, &str)|
	{
		digits.parse::<i16>().map(|value| Word(if sign == '-' { -value } else { value }))
	})(i)
}

fn memory_line(i: &str) -> IResult<&str, (Option<usize>, Word)>
{
	// Optional address prefix, then the word; surrounding whitespace is fine.
	// The line must be consumed completely.
	all_consuming(delimited(space0, pair(opt(terminated(address_prefix, space0)), signed_word), space0))(i)
}

pub fn load(source: &str) -> Result<Image, LoadError>
{
	let mut image = Image::zeroed();

	// The default address counts non-empty lines only:
	let mut position = 0;

	for (index, raw_line) in source.lines().enumerate()
	{
		let line = raw_line.trim();

		if line.is_empty()
		{
			continue;
		}

		let (_, (address, word)) = memory_line(line).map_err(|_| LoadError::BadLine
		{
			line: index + 1,
			text: line.to_string(),
		})?;

		let address = address.unwrap_or(position);

		if address >= MEMORY_WORDS
		{
			return Err(LoadError::BadAddress
			{
				line: index + 1,
				address,
			});
		}

		image.0[address] = word;
		position += 1;
	}

	Ok(image)
}
