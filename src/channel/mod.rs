use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use thiserror::Error;

// How long an interactive execution waits for an input item before giving up:
pub const DEFAULT_INPUT_TIMEOUT: Duration = Duration::from_secs(60);

// Errors while pulling from the input channel.
// Both executors wrap these into their own runtime error types.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InputError
{
	#[error("no more input values are available")]
	Exhausted,

	#[error("timed out after {0:?} while waiting for input")]
	TimedOut(Duration),

	#[error("input \"{0}\" is not an integer")]
	NotAnInteger(String),

	#[error("the input channel was closed")]
	Closed,
}

// A cooperative stop flag, shared between an executor and its host.
// Executors check it at every step boundary and terminate cleanly.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal
{
	pub fn new() -> StopSignal
	{
		StopSignal(Arc::new(AtomicBool::new(false)))
	}

	pub fn trigger(&self)
	{
		self.0.store(true, Ordering::Relaxed);
	}

	pub fn is_triggered(&self) -> bool
	{
		self.0.load(Ordering::Relaxed)
	}
}

// Where input items come from:
enum Source
{
	// A fixed queue, fully known up front (batch hosts, tests):
	Queue(VecDeque<String>),

	// A live channel fed by an interactive host.
	// Closing the sending side wakes a blocked read, so cancellation works
	// even while an executor is suspended on INPUT/READ.
	Channel(Receiver<String>),
}

// The sequential integer input stream both the interpreter and the Simpletron
// consume from. Items are parsed at consumption time; a malformed item is an
// input error, not a panic.
pub struct InputChannel
{
	source: Source,
	timeout: Duration,
}

impl InputChannel
{
	pub fn empty() -> InputChannel
	{
		InputChannel::from_items(Vec::new())
	}

	pub fn from_values(values: &[i64]) -> InputChannel
	{
		InputChannel::from_items(values.iter().map(|value| value.to_string()).collect())
	}

	pub fn from_items(items: Vec<String>) -> InputChannel
	{
		InputChannel
		{
			source: Source::Queue(items.into()),
			timeout: DEFAULT_INPUT_TIMEOUT,
		}
	}

	pub fn from_receiver(receiver: Receiver<String>, timeout: Duration) -> InputChannel
	{
		InputChannel
		{
			source: Source::Channel(receiver),
			timeout,
		}
	}

	// Pop the next input item and parse it as an integer:
	pub fn next_value(&mut self) -> Result<i64, InputError>
	{
		let item = match &mut self.source
		{
			Source::Queue(queue) =>
			{
				match queue.pop_front()
				{
					Some(item) 	=> item,
					None 		=> return Err(InputError::Exhausted),
				}
			},
			Source::Channel(receiver) =>
			{
				match receiver.recv_timeout(self.timeout)
				{
					Ok(item) 								=> item,
					Err(RecvTimeoutError::Timeout) 			=> return Err(InputError::TimedOut(self.timeout)),
					Err(RecvTimeoutError::Disconnected) 	=> return Err(InputError::Closed),
				}
			},
		};

		item.trim().parse().map_err(|_| InputError::NotAnInteger(item))
	}
}

// The streaming seam for produced values.
// Outputs appear in production order; one emitted value is one output line.
pub trait OutputSink
{
	fn emit(&mut self, value: i64);
}

// Collecting into a vector is what batch hosts and the tests use:
impl OutputSink for Vec<i64>
{
	fn emit(&mut self, value: i64)
	{
		self.push(value);
	}
}

// The CLI host prints every value as its own line:
pub struct StdoutSink;

impl OutputSink for StdoutSink
{
	fn emit(&mut self, value: i64)
	{
		println!("{:}", value);
	}
}
