//! Scripted in-memory interpreter for tests.
//!
//! [`fake_transport`] wires a [`PipeTransport`] to a task that parses the
//! framed scripts the transport writes and answers each command through a
//! caller-supplied closure, so connection logic can be exercised without a
//! real `tclsh`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tclbridge_protocol::split_list;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
use tokio::task::JoinHandle;

use crate::connection::Connection;
use crate::framing::{RESULT_VAR, Sentinel};
use crate::transport::PipeTransport;

const PIPE_CAPACITY: usize = 256 * 1024;
const SCRIPT_HEAD: &str = "puts -nonewline stdout {<<tclb:";
const SCRIPT_TAIL: &str = "flush stderr\n";

/// How the fake interpreter answers one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
	/// Command succeeded with this result.
	Ok(String),
	/// Command raised this error message.
	Error(String),
	/// Command succeeded after writing to stderr.
	OkWithStderr(String, String),
	/// Writes this text to stdout outside of any frame, then succeeds.
	OkAfterNoise(String, String),
	/// Succeeds with this result after a pause, watching stdin meanwhile.
	Delay(Duration, String),
	/// Never answers.
	Hang,
	/// Closes all pipes, as if the process died.
	Exit,
}

impl Reply {
	pub fn ok(text: impl Into<String>) -> Self {
		Reply::Ok(text.into())
	}

	pub fn error(message: impl Into<String>) -> Self {
		Reply::Error(message.into())
	}
}

/// Commands the fake interpreter has received, in order.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
	commands: Arc<Mutex<Vec<String>>>,
	overlapped: Arc<AtomicBool>,
}

impl CommandLog {
	pub fn commands(&self) -> Vec<String> {
		self.commands.lock().clone()
	}

	/// True once `exit` was written outside a framed script.
	pub fn exited(&self) -> bool {
		self.commands.lock().iter().any(|c| c == "exit")
	}

	/// True if a script arrived while an earlier one was still unanswered.
	pub fn overlapped(&self) -> bool {
		self.overlapped.load(Ordering::SeqCst)
	}

	fn push(&self, command: &str) {
		self.commands.lock().push(command.to_string());
	}

	fn mark_overlap(&self) {
		self.overlapped.store(true, Ordering::SeqCst);
	}
}

/// Creates a transport answered by `respond`.
pub fn fake_transport<F>(respond: F) -> (PipeTransport, CommandLog, JoinHandle<()>)
where
	F: FnMut(&str) -> Reply + Send + 'static,
{
	let (stdin_read, stdin_write) = duplex(PIPE_CAPACITY);
	let (stdout_read, stdout_write) = duplex(PIPE_CAPACITY);
	let (stderr_read, stderr_write) = duplex(PIPE_CAPACITY);

	let log = CommandLog::default();
	let task = tokio::spawn(serve(stdin_read, stdout_write, stderr_write, log.clone(), respond));

	(PipeTransport::new(stdin_write, stdout_read, stderr_read), log, task)
}

/// Creates a connection without a process, answered by `respond`.
pub fn fake_connection<F>(respond: F) -> (Connection, CommandLog)
where
	F: FnMut(&str) -> Reply + Send + 'static,
{
	let (transport, log, _task) = fake_transport(respond);
	(Connection::from_transport(transport, None), log)
}

async fn serve<F>(
	mut stdin: DuplexStream,
	mut stdout: DuplexStream,
	mut stderr: DuplexStream,
	log: CommandLog,
	mut respond: F,
) where
	F: FnMut(&str) -> Reply + Send + 'static,
{
	let mut pending = String::new();
	let mut chunk = vec![0u8; 8192];

	loop {
		while let Some(item) = next_item(&mut pending) {
			match item {
				Item::Line(line) => {
					if line.trim() == "exit" {
						log.push("exit");
						return;
					}
				}
				Item::Script { token, command } => {
					log.push(&command);
					if pending.contains(SCRIPT_HEAD) {
						log.mark_overlap();
					}
					let sentinel = Sentinel::from_token(token);
					let (out, err) = match respond(&command) {
						Reply::Ok(result) => (frame_stdout(&sentinel, &result, 0), frame_stderr(&sentinel, "")),
						Reply::Error(message) => (frame_stdout(&sentinel, &message, 1), frame_stderr(&sentinel, "")),
						Reply::OkWithStderr(result, text) => {
							(frame_stdout(&sentinel, &result, 0), frame_stderr(&sentinel, &text))
						}
						Reply::OkAfterNoise(noise, result) => (
							format!("{noise}{}", frame_stdout(&sentinel, &result, 0)),
							frame_stderr(&sentinel, ""),
						),
						Reply::Delay(wait, result) => {
							if !hold_reply(&mut stdin, &mut chunk, &mut pending, &log, wait).await {
								return;
							}
							(frame_stdout(&sentinel, &result, 0), frame_stderr(&sentinel, ""))
						}
						Reply::Hang => std::future::pending().await,
						Reply::Exit => return,
					};
					if stdout.write_all(out.as_bytes()).await.is_err() || stderr.write_all(err.as_bytes()).await.is_err() {
						return;
					}
				}
			}
		}

		match stdin.read(&mut chunk).await {
			Ok(0) | Err(_) => return,
			Ok(n) => pending.push_str(&String::from_utf8_lossy(&chunk[..n])),
		}
	}
}

/// Waits out `wait` while still reading stdin. Anything written meanwhile
/// is an overlapping script, since callers must wait for the trailer.
///
/// Returns false once stdin closes.
async fn hold_reply(
	stdin: &mut DuplexStream,
	chunk: &mut [u8],
	pending: &mut String,
	log: &CommandLog,
	wait: Duration,
) -> bool {
	let sleep = tokio::time::sleep(wait);
	tokio::pin!(sleep);

	loop {
		tokio::select! {
			_ = &mut sleep => return true,
			read = stdin.read(chunk) => match read {
				Ok(0) | Err(_) => return false,
				Ok(n) => {
					log.mark_overlap();
					pending.push_str(&String::from_utf8_lossy(&chunk[..n]));
				}
			},
		}
	}
}

enum Item {
	Line(String),
	Script { token: String, command: String },
}

fn next_item(pending: &mut String) -> Option<Item> {
	if pending.starts_with(SCRIPT_HEAD) {
		let end = pending.find(SCRIPT_TAIL)? + SCRIPT_TAIL.len();
		let script: String = pending.drain(..end).collect();
		return parse_script(&script);
	}
	// A prefix of a script header may still be arriving
	if SCRIPT_HEAD.starts_with(pending.as_str()) {
		return None;
	}
	let end = pending.find('\n')? + 1;
	let line: String = pending.drain(..end).collect();
	Some(Item::Line(line))
}

fn parse_script(script: &str) -> Option<Item> {
	let token_start = SCRIPT_HEAD.len();
	let token_end = token_start + script[token_start..].find(":begin>>")?;
	let token = script[token_start..token_end].to_string();

	// The command is a single quoted word between these two
	let open = "[catch ";
	let close = format!(" {RESULT_VAR}]\n");
	let word_start = script.find(open)? + open.len();
	let word_end = script.rfind(&close)?;
	let mut words = split_list(script.get(word_start..word_end)?).ok()?;
	if words.len() != 1 {
		return None;
	}
	let command = words.pop()?;

	Some(Item::Script { token, command })
}

fn frame_stdout(sentinel: &Sentinel, result: &str, status: i32) -> String {
	format!("{}{result}{}{status}>>", sentinel.begin(), sentinel.end_prefix())
}

fn frame_stderr(sentinel: &Sentinel, text: &str) -> String {
	format!("{}{text}{}", sentinel.begin(), sentinel.stderr_end())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_framed_script() {
		let sentinel = Sentinel::from_token("feed");
		let mut pending = format!("fconfigure stdout -translation lf\n{}", sentinel.script("set a {x\ny}"));

		assert!(matches!(next_item(&mut pending), Some(Item::Line(_))));
		match next_item(&mut pending) {
			Some(Item::Script { token, command }) => {
				assert_eq!(token, "feed");
				assert_eq!(command, "set a {x\ny}");
			}
			_ => panic!("expected a script"),
		}
		assert!(pending.is_empty());
	}

	#[test]
	fn parses_command_with_unbalanced_braces() {
		let sentinel = Sentinel::from_token("feed");
		let command = "set q \"a{\"\nputs \"\\} \\[x\\]\"";
		let mut pending = sentinel.script(command);

		match next_item(&mut pending) {
			Some(Item::Script { command: parsed, .. }) => assert_eq!(parsed, command),
			_ => panic!("expected a script"),
		}
	}

	#[test]
	fn waits_for_complete_script() {
		let script = Sentinel::from_token("feed").script("info patchlevel");
		let mut pending = script[..script.len() - 3].to_string();
		assert!(next_item(&mut pending).is_none());

		let mut partial_head = "puts -nonew".to_string();
		assert!(next_item(&mut partial_head).is_none());
	}

	#[tokio::test]
	async fn flags_script_sent_before_trailer() {
		let (stdin_read, mut stdin_write) = duplex(PIPE_CAPACITY);
		let (_stdout_read, stdout_write) = duplex(PIPE_CAPACITY);
		let (_stderr_read, stderr_write) = duplex(PIPE_CAPACITY);
		let log = CommandLog::default();
		let task = tokio::spawn(serve(stdin_read, stdout_write, stderr_write, log.clone(), |cmd: &str| {
			Reply::Delay(Duration::from_millis(50), cmd.to_string())
		}));

		let first = Sentinel::from_token("one").script("first");
		let second = Sentinel::from_token("two").script("second");
		stdin_write.write_all(first.as_bytes()).await.unwrap();
		tokio::time::sleep(Duration::from_millis(10)).await;
		stdin_write.write_all(second.as_bytes()).await.unwrap();
		drop(stdin_write);

		tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
		assert!(log.overlapped());
		assert_eq!(log.commands()[0], "first");
	}
}
