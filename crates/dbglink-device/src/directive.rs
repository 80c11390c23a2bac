use crate::error::{DeviceError, Result};

/// One received command buffer, interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `sendfile <addr>`: the next buffer is file data destined for `address`.
    SendFile { address: u32 },
    /// `getfile <addr> <len>`: stream `len` bytes of memory into the console.
    GetFile { address: u32, len: usize },
    /// Any other text, with the trailing newline removed.
    Line(String),
}

impl Directive {
    pub fn parse(input: &str) -> Result<Self> {
        let line = input
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(input);

        let mut words = line.split_whitespace();
        match words.next() {
            Some("sendfile") => {
                let address = required(line, words.next(), "missing address")?;
                no_trailing(line, words.next())?;
                Ok(Directive::SendFile {
                    address: parse_address(line, address)?,
                })
            }
            Some("getfile") => {
                let address = required(line, words.next(), "missing address")?;
                let len = required(line, words.next(), "missing length")?;
                no_trailing(line, words.next())?;
                Ok(Directive::GetFile {
                    address: parse_address(line, address)?,
                    len: parse_number(len)
                        .and_then(|n| usize::try_from(n).ok())
                        .ok_or_else(|| invalid(line, format!("bad length '{len}'")))?,
                })
            }
            _ => Ok(Directive::Line(line.to_string())),
        }
    }
}

/// Parse `0x`-prefixed hexadecimal or plain decimal.
pub fn parse_number(text: &str) -> Option<u64> {
    match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn parse_address(line: &str, text: &str) -> Result<u32> {
    parse_number(text)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| invalid(line, format!("bad address '{text}'")))
}

fn required<'a>(line: &str, word: Option<&'a str>, reason: &str) -> Result<&'a str> {
    word.ok_or_else(|| invalid(line, reason.to_string()))
}

fn no_trailing(line: &str, word: Option<&str>) -> Result<()> {
    match word {
        Some(extra) => Err(invalid(line, format!("unexpected argument '{extra}'"))),
        None => Ok(()),
    }
}

fn invalid(line: &str, reason: String) -> DeviceError {
    DeviceError::InvalidDirective {
        line: line.to_string(),
        reason,
    }
}
