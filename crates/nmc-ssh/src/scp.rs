use std::io::{Read, Write};

use crate::SshError;

/// Exec command that starts an SCP sink on the card.
///
/// Must be sent verbatim. The cards fail on the quoted form some clients send.
pub fn sink_command(destination: &str) -> String {
    format!("scp -q -t {destination}")
}

/// Runs the SCP sink handshake for a single file on an already started `scp -t` channel.
///
/// Each step is acknowledged by a status byte. Anything but `0` is followed by a message line
/// and aborts the transfer.
pub fn send_file<S: Read + Write>(
    channel: &mut S,
    destination: &str,
    content: &[u8],
    mode: u32,
) -> Result<(), SshError> {
    read_status(channel)?;

    let header = format!(
        "C{:04o} {} {}\n",
        mode & 0o7777,
        content.len(),
        file_name(destination)
    );
    channel.write_all(header.as_bytes())?;
    channel.flush()?;
    read_status(channel)?;

    channel.write_all(content)?;
    channel.write_all(&[0])?;
    channel.flush()?;
    read_status(channel)
}

fn read_status<R: Read>(reader: &mut R) -> Result<(), SshError> {
    let mut status = [0u8; 1];
    reader.read_exact(&mut status)?;
    if status[0] == 0 {
        return Ok(());
    }

    // Byte at a time, the message is the last thing the sink sends.
    let mut message = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        reader.read_exact(&mut byte)?;
        if byte[0] == b'\n' {
            break;
        }
        message.push(byte[0]);
    }

    Err(SshError::ScpRemote {
        status: status[0],
        message: String::from_utf8_lossy(&message).into_owned(),
    })
}

fn file_name(destination: &str) -> &str {
    let trimmed = destination.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, name)) => name,
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};

    use super::*;

    /// Sink side scripted through `input`, everything the client writes lands in `output`.
    struct Sink {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Sink {
        fn new(input: &[u8]) -> Self {
            Self {
                input: Cursor::new(input.to_vec()),
                output: Vec::new(),
            }
        }
    }

    impl Read for Sink {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_command() {
        assert_eq!(sink_command("/ssl/nmc.key"), "scp -q -t /ssl/nmc.key");
    }

    #[test]
    fn test_send_file_writes_header_content_and_terminator() {
        let mut sink = Sink::new(&[0, 0, 0]);

        send_file(&mut sink, "/ssl/defaultcert.p15", b"bundle", 0o600).unwrap();

        assert_eq!(sink.output, b"C0600 6 defaultcert.p15\nbundle\0");
    }

    #[test]
    fn test_remote_error_stops_transfer() {
        let mut sink = Sink::new(b"\0\x01scp: /ssl/nmc.key: Permission denied\n");

        let err = send_file(&mut sink, "/ssl/nmc.key", b"key", 0o600).unwrap_err();

        assert!(matches!(
            err,
            SshError::ScpRemote { status: 1, ref message } if message == "scp: /ssl/nmc.key: Permission denied"
        ));
        // header went out, content did not
        assert_eq!(sink.output, b"C0600 3 nmc.key\n");
    }

    #[test]
    fn test_rejected_exec_sends_nothing() {
        let mut sink = Sink::new(b"\x02fatal\n");

        let err = send_file(&mut sink, "/ssl/nmc.crt", b"cert", 0o600).unwrap_err();

        assert!(matches!(err, SshError::ScpRemote { status: 2, .. }));
        assert!(sink.output.is_empty());
    }

    #[test]
    fn test_closed_channel_is_io_error() {
        let mut sink = Sink::new(&[0]);

        let err = send_file(&mut sink, "/ssl/nmc.crt", b"cert", 0o600).unwrap_err();

        assert!(matches!(err, SshError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("/ssl/nmc.key"), "nmc.key");
        assert_eq!(file_name("nmc.key"), "nmc.key");
        assert_eq!(file_name("/ssl/dir/"), "dir");
    }
}
