//! Pipe transport for the interpreter's standard streams.
//!
//! One [`PipeTransport::transact`] call writes a framed script to stdin and
//! reads stdout and stderr concurrently until both trailers arrive. Bytes
//! read past a trailer stay buffered for the next transaction.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::framing::{
	EXIT_COMMAND, FrameScan, SESSION_PREAMBLE, Sentinel, StderrFrame, StdoutFrame, Transaction, parse_stderr_frame,
	parse_stdout_frame,
};
use crate::process::InterpreterPipes;

const READ_CHUNK: usize = 64 * 1024;

type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;
type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;

/// Unconsumed bytes of one stream and the chunk reads land in.
struct StreamBuffer {
	pending: Vec<u8>,
	chunk: Box<[u8]>,
}

impl StreamBuffer {
	fn new() -> Self {
		Self {
			pending: Vec::new(),
			chunk: vec![0u8; READ_CHUNK].into_boxed_slice(),
		}
	}

	async fn fill(&mut self, reader: &mut BoxedReader, stream: &str) -> Result<()> {
		let n = reader
			.read(&mut self.chunk)
			.await
			.map_err(|e| Error::ProcessTerminated(format!("failed to read interpreter {stream}: {e}")))?;
		if n == 0 {
			return Err(Error::ProcessTerminated(format!("interpreter closed {stream}")));
		}
		self.pending.extend_from_slice(&self.chunk[..n]);
		Ok(())
	}
}

/// Framed request/response over stdin, stdout and stderr.
pub struct PipeTransport {
	stdin: BoxedWriter,
	stdout: BoxedReader,
	stderr: BoxedReader,
	stdout_buf: StreamBuffer,
	stderr_buf: StreamBuffer,
}

impl std::fmt::Debug for PipeTransport {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PipeTransport")
			.field("stdout_buffered", &self.stdout_buf.pending.len())
			.field("stderr_buffered", &self.stderr_buf.pending.len())
			.finish()
	}
}

impl PipeTransport {
	/// Create a transport over arbitrary streams.
	///
	/// # Arguments
	///
	/// * `stdin` - Interpreter's stdin (we write scripts here)
	/// * `stdout` - Interpreter's stdout (results arrive here)
	/// * `stderr` - Interpreter's stderr
	pub fn new<W, R, E>(stdin: W, stdout: R, stderr: E) -> Self
	where
		W: AsyncWrite + Unpin + Send + 'static,
		R: AsyncRead + Unpin + Send + 'static,
		E: AsyncRead + Unpin + Send + 'static,
	{
		Self {
			stdin: Box::new(stdin),
			stdout: Box::new(stdout),
			stderr: Box::new(stderr),
			stdout_buf: StreamBuffer::new(),
			stderr_buf: StreamBuffer::new(),
		}
	}

	pub fn from_pipes(pipes: InterpreterPipes) -> Self {
		Self::new(pipes.stdin, pipes.stdout, pipes.stderr)
	}

	/// Configures stream encodings. Sent once before the first transaction.
	pub async fn send_preamble(&mut self) -> Result<()> {
		self.write_all(SESSION_PREAMBLE).await
	}

	/// Asks the interpreter to exit.
	pub async fn send_exit(&mut self) -> Result<()> {
		self.write_all(EXIT_COMMAND).await
	}

	async fn write_all(&mut self, text: &str) -> Result<()> {
		self.stdin
			.write_all(text.as_bytes())
			.await
			.map_err(|e| Error::ProcessTerminated(format!("failed to write to interpreter stdin: {e}")))?;
		self.stdin
			.flush()
			.await
			.map_err(|e| Error::ProcessTerminated(format!("failed to flush interpreter stdin: {e}")))
	}

	/// Runs one command and waits for both stream trailers.
	///
	/// Interpreter errors come back as a [`Transaction`] with an error
	/// outcome; only process and protocol failures are `Err`.
	pub async fn transact(&mut self, command: &str) -> Result<Transaction> {
		let sentinel = Sentinel::new();
		debug!(target = "tclbridge", command, token = sentinel.token(), "evaluate");
		self.write_all(&sentinel.script(command)).await?;

		let (stdout, stderr) = tokio::try_join!(
			read_stdout_frame(&mut self.stdout, &mut self.stdout_buf, &sentinel),
			read_stderr_frame(&mut self.stderr, &mut self.stderr_buf, &sentinel),
		)?;

		if !stdout.stray.is_empty() {
			warn!(target = "tclbridge", bytes = stdout.stray.len(), stray = %stdout.stray.trim_end(), "discarding stdout before begin marker");
		}
		if !stderr.stray.is_empty() {
			warn!(target = "tclbridge", stray = %stderr.stray.trim_end(), "interpreter wrote to stderr outside a command");
		}
		if !stderr.payload.is_empty() {
			warn!(target = "tclbridge", command, stderr = %stderr.payload.trim_end(), "command wrote to stderr");
		}

		Ok(Transaction::from_frames(command, &sentinel, &stdout, &stderr))
	}

	/// Bytes received past the last trailer and not yet consumed.
	pub fn buffered(&self) -> (usize, usize) {
		(self.stdout_buf.pending.len(), self.stderr_buf.pending.len())
	}
}

async fn read_stdout_frame(reader: &mut BoxedReader, buf: &mut StreamBuffer, sentinel: &Sentinel) -> Result<StdoutFrame> {
	let mut scan = FrameScan::default();
	loop {
		if let Some(frame) = parse_stdout_frame(&buf.pending, sentinel, &mut scan)? {
			buf.pending.drain(..frame.consumed);
			return Ok(frame);
		}
		buf.fill(reader, "stdout").await?;
	}
}

async fn read_stderr_frame(reader: &mut BoxedReader, buf: &mut StreamBuffer, sentinel: &Sentinel) -> Result<StderrFrame> {
	let mut scan = FrameScan::default();
	loop {
		if let Some(frame) = parse_stderr_frame(&buf.pending, sentinel, &mut scan) {
			buf.pending.drain(..frame.consumed);
			return Ok(frame);
		}
		buf.fill(reader, "stderr").await?;
	}
}

#[cfg(test)]
mod tests;
