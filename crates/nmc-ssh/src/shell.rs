use std::{
    io::{ErrorKind, Read},
    sync::LazyLock,
};

use regex::bytes::Regex;

use crate::SshError;

const SUCCESS_CODE: &str = "E000";
const UNKNOWN_COMMAND_CODE: &str = "E101";

/// Splits interactive shell output on the card's prompt.
///
/// A prompt is a line break followed by `name>` or `user@name>`, where names consist of ASCII
/// letters, digits and dots (`apc>`, `apc@apc>`, `ups.lab>`). Everything before the prompt is
/// one output block.
#[derive(Debug, Default)]
pub struct PromptScanner {
    buffer: Vec<u8>,
}

impl PromptScanner {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads until the next prompt and returns the output preceding it, without a trailing CR.
    ///
    /// The reader closing before a prompt shows up is an error, as is a read timeout.
    pub fn next_output<R: Read>(&mut self, reader: &mut R) -> Result<Vec<u8>, SshError> {
        let mut chunk = [0u8; 4096];
        loop {
            if let Some((start, end)) = find_prompt(&self.buffer) {
                let mut output: Vec<u8> = self.buffer.drain(..end).take(start).collect();
                if output.last() == Some(&b'\r') {
                    output.pop();
                }
                return Ok(output);
            }

            match reader.read(&mut chunk) {
                Ok(0) => return Err(SshError::UnexpectedEof),
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Err(SshError::Timeout);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// A line break followed by `name>` or `user@name>`.
static PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\r\n|\r|\n)([A-Za-z0-9.]+@?)?[A-Za-z0-9.]+>").expect("prompt pattern is valid")
});

/// Position of the first prompt as `(start, end)`, `start` being the line break.
fn find_prompt(data: &[u8]) -> Option<(usize, usize)> {
    PROMPT.find(data).map(|m| (m.start(), m.end()))
}

/// A card's answer to one shell command.
///
/// ```text
/// ssl key -i /ssl/nmc.key
/// E000: Success
/// <result text>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    /// Command line as echoed by the card.
    pub command: String,
    /// Response code, e.g. `E000`.
    pub code: String,
    /// Text after the code.
    pub code_text: String,
    /// Any further output, possibly empty.
    pub result_text: String,
}

impl CommandResponse {
    /// Parses one output block returned by [`PromptScanner::next_output`].
    pub fn parse(raw: &str) -> Result<Self, SshError> {
        let unparsable = || SshError::UnparsableResponse(raw.to_owned());

        let (command, rest) = raw.split_once('\n').ok_or_else(unparsable)?;
        let (code, rest) = rest.split_once(": ").ok_or_else(unparsable)?;
        let (code_text, result_text) = rest.split_once('\n').unwrap_or((rest, ""));

        Ok(Self {
            command: strip_cr(command).to_owned(),
            code: code.to_owned(),
            code_text: strip_cr(code_text).to_owned(),
            result_text: result_text.trim_end_matches(['\r', '\n']).to_owned(),
        })
    }

    /// `E000`, compared case-insensitively.
    pub fn is_success(&self) -> bool {
        self.code.eq_ignore_ascii_case(SUCCESS_CODE)
    }

    /// `E101`, returned by firmware that lacks the command.
    pub fn is_unknown_command(&self) -> bool {
        self.code.eq_ignore_ascii_case(UNKNOWN_COMMAND_CODE)
    }

    /// Turns a non-success code into [`SshError::CommandFailed`].
    pub fn into_result(self) -> Result<Self, SshError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(SshError::CommandFailed {
                command: self.command,
                code: self.code,
                text: self.code_text,
            })
        }
    }
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}
