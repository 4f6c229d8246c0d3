use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

use super::*;
use crate::framing::Outcome;
use crate::testing::{Reply, fake_transport};

#[tokio::test]
async fn test_transact_ok() {
	let (mut transport, log, _task) = fake_transport(|cmd| match cmd {
		"expr {1 + 2}" => Reply::ok("3"),
		_ => Reply::error(format!("invalid command name \"{cmd}\"")),
	});

	let tx = transport.transact("expr {1 + 2}").await.unwrap();
	assert_eq!(tx.outcome, Outcome::Ok);
	assert_eq!(tx.output, "3");
	assert_eq!(tx.stderr, "");
	assert_eq!(log.commands(), vec!["expr {1 + 2}"]);
}

#[tokio::test]
async fn test_interpreter_error_is_not_fatal() {
	let (mut transport, _log, _task) = fake_transport(|cmd| match cmd {
		"bogus" => Reply::error("invalid command name \"bogus\""),
		_ => Reply::ok("fine"),
	});

	let tx = transport.transact("bogus").await.unwrap();
	assert_eq!(tx.outcome, Outcome::InterpreterError { code: 1 });
	assert_eq!(tx.output, "invalid command name \"bogus\"");

	let tx = transport.transact("next").await.unwrap();
	assert_eq!(tx.output, "fine");
}

#[tokio::test]
async fn test_multiple_transactions_in_sequence() {
	let (mut transport, log, _task) = fake_transport(|cmd| Reply::ok(cmd.to_uppercase()));

	for cmd in ["first", "second", "third"] {
		let tx = transport.transact(cmd).await.unwrap();
		assert_eq!(tx.output, cmd.to_uppercase());
	}
	assert_eq!(log.commands(), vec!["first", "second", "third"]);
	assert_eq!(transport.buffered(), (0, 0));
}

#[tokio::test]
async fn test_noise_before_begin_marker_is_discarded() {
	let (mut transport, _log, _task) =
		fake_transport(|_| Reply::OkAfterNoise("loading package...\n".into(), "value".into()));

	let tx = transport.transact("package require Foo").await.unwrap();
	assert_eq!(tx.output, "value");
}

#[tokio::test]
async fn test_stderr_is_captured() {
	let (mut transport, _log, _task) =
		fake_transport(|_| Reply::OkWithStderr("done".into(), "deprecated option\n".into()));

	let tx = transport.transact("configure -old 1").await.unwrap();
	assert_eq!(tx.output, "done");
	assert_eq!(tx.stderr, "deprecated option\n");
}

#[tokio::test]
async fn test_large_result() {
	let large = "x".repeat(300_000);
	let expected = large.clone();
	let (mut transport, _log, _task) = fake_transport(move |_| Reply::ok(large.clone()));

	let tx = transport.transact("string repeat x 300000").await.unwrap();
	assert_eq!(tx.output.len(), expected.len());
	assert_eq!(tx.output, expected);
}

#[tokio::test]
async fn test_closed_pipes_are_process_terminated() {
	let (mut transport, _log, _task) = fake_transport(|_| Reply::Exit);

	let err = transport.transact("anything").await.unwrap_err();
	assert!(matches!(err, Error::ProcessTerminated(_)));
	assert!(err.is_fatal());
}

#[tokio::test]
async fn test_trailing_bytes_carry_over() {
	let (stdin_read, stdin_write) = duplex(4096);
	let (stdout_read, mut stdout_write) = duplex(4096);
	let (stderr_read, mut stderr_write) = duplex(4096);
	let mut transport = PipeTransport::new(stdin_write, stdout_read, stderr_read);

	// Unframed output arrives before any command runs
	stdout_write.write_all(b"late output\n").await.unwrap();
	stderr_write.write_all(b"late warning\n").await.unwrap();

	let reader = tokio::spawn(async move {
		let mut script = vec![0u8; 4096];
		let mut stdin_read = stdin_read;
		let n = stdin_read.read(&mut script).await.unwrap();
		let text = String::from_utf8_lossy(&script[..n]).into_owned();
		let token = text
			.split("<<tclb:")
			.nth(1)
			.and_then(|rest| rest.split(":begin>>").next())
			.unwrap()
			.to_string();
		let sentinel = Sentinel::from_token(token);
		let out = format!("{}42{}0>>after", sentinel.begin(), sentinel.end_prefix());
		stdout_write.write_all(out.as_bytes()).await.unwrap();
		let err = format!("{}{}", sentinel.begin(), sentinel.stderr_end());
		stderr_write.write_all(err.as_bytes()).await.unwrap();
		(stdin_read, stdout_write, stderr_write)
	});

	let tx = transport.transact("set x 42").await.unwrap();
	assert_eq!(tx.output, "42");
	let _pipes = reader.await.unwrap();

	// "after" follows the trailer and waits for the next transaction
	assert_eq!(transport.buffered(), (5, 0));
}

#[tokio::test]
async fn test_frame_split_across_small_reads() {
	let (stdin_read, stdin_write) = duplex(4096);
	let (stdout_read, mut stdout_write) = duplex(16);
	let (stderr_read, mut stderr_write) = duplex(16);
	let mut transport = PipeTransport::new(stdin_write, stdout_read, stderr_read);
	let value = "0123456789".repeat(2000);
	let expected = value.clone();

	let writer = tokio::spawn(async move {
		let mut script = vec![0u8; 4096];
		let mut stdin_read = stdin_read;
		let n = stdin_read.read(&mut script).await.unwrap();
		let text = String::from_utf8_lossy(&script[..n]).into_owned();
		let token = text
			.split("<<tclb:")
			.nth(1)
			.and_then(|rest| rest.split(":begin>>").next())
			.unwrap()
			.to_string();
		let sentinel = Sentinel::from_token(token);
		let err = format!("{}{}", sentinel.begin(), sentinel.stderr_end());
		let out = format!("{}{value}{}0>>", sentinel.begin(), sentinel.end_prefix());
		let (a, b) = tokio::join!(stderr_write.write_all(err.as_bytes()), stdout_write.write_all(out.as_bytes()));
		a.unwrap();
		b.unwrap();
		(stdin_read, stdout_write, stderr_write)
	});

	let tx = transport.transact("string repeat 0123456789 2000").await.unwrap();
	assert_eq!(tx.output, expected);
	assert_eq!(transport.buffered(), (0, 0));
	let _pipes = writer.await.unwrap();
}

#[tokio::test]
async fn test_preamble_and_exit_are_plain_lines() {
	let (stdin_read, stdin_write) = duplex(4096);
	let (stdout_read, _stdout_write) = duplex(16);
	let (stderr_read, _stderr_write) = duplex(16);
	let mut transport = PipeTransport::new(stdin_write, stdout_read, stderr_read);

	transport.send_preamble().await.unwrap();
	transport.send_exit().await.unwrap();
	drop(transport);

	let mut written = String::new();
	let mut stdin_read = stdin_read;
	stdin_read.read_to_string(&mut written).await.unwrap();
	assert!(written.starts_with("fconfigure stdin -encoding utf-8\n"));
	assert!(written.ends_with("\nexit\n"));
}
