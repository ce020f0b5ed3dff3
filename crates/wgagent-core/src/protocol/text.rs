//! Concatenated-text wire format
//!
//! A request is the plain concatenation of newline-terminated tokens:
//! `cmd:=HELLO\nsubcmd:=NAME\nfield_count:=N\nkey1:=...\n...keyN:=...\n`.
//! There are no length prefixes; position and token names delimit the message.
//! A reply is `cmd:=OK\n` or `cmd:=NOK\n`.

use crate::error::{DecodeError, EncodeError};
use super::message::{Command, Reply, Request};
use super::token::{self, CMD, FIELD_COUNT};

pub fn encode_request(request: &Request) -> Result<Vec<u8>, EncodeError> {
    Ok(token::request_tokens(request)?.concat().into_bytes())
}

pub fn decode_request(bytes: &[u8]) -> Result<Request, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
    let lines: Vec<&str> = text.lines().collect();

    // Blank lines after the last token are tolerated
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map(|i| i + 1)
        .ok_or(DecodeError::Empty)?;
    let lines = &lines[..end];

    let keys = lines.get(3..).unwrap_or(&[]);
    let request =
        token::assemble_request(lines[0], lines.get(1).copied(), lines.get(2).copied(), keys)?;

    let consumed = if lines.len() <= 1 { 1 } else { 3 + request.fields.len() };
    if let Some(extra) = lines.get(consumed) {
        return Err(DecodeError::TrailingData(extra.to_string()));
    }

    Ok(request)
}

/// Decode a request from a stream prefix.
///
/// Returns `Ok(None)` while the declared tokens have not all arrived with
/// their line terminators. Once the peer has closed (`eof`), whatever was
/// received is decoded as is, so a final token may lack its terminator.
pub fn frame_request(bytes: &[u8], eof: bool) -> Result<Option<Request>, DecodeError> {
    if eof {
        return decode_request(bytes).map(Some);
    }

    let complete = match bytes.iter().rposition(|&b| b == b'\n') {
        Some(last) => &bytes[..=last],
        None => return Ok(None),
    };
    let pending = &bytes[complete.len()..];
    let text = std::str::from_utf8(complete).map_err(|_| DecodeError::InvalidUtf8)?;
    let lines: Vec<&str> = text.lines().collect();

    let command = Command::parse(token::expect_token(lines[0], CMD)?);
    let needed = if command != Command::Hello && lines.len() == 1 && pending.is_empty() {
        // Bare `cmd:=BYE\n` and friends
        1
    } else {
        match lines.get(2) {
            Some(count) => 3 + token::parse_field_count(token::expect_token(count, FIELD_COUNT)?)?,
            None => return Ok(None),
        }
    };

    if lines.len() < needed {
        return Ok(None);
    }
    decode_request(bytes).map(Some)
}

pub fn encode_reply(reply: Reply) -> Vec<u8> {
    token::format_token(CMD, reply.as_str()).into_bytes()
}

pub fn decode_reply(bytes: &[u8]) -> Result<Reply, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
    let line = text
        .lines()
        .next()
        .filter(|l| !l.trim().is_empty())
        .ok_or(DecodeError::Empty)?;
    Ok(Reply::parse(token::expect_token(line, CMD)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_request_layout() {
        let request = Request::hello(
            "ADD_WIREGUARD_PEER",
            vec!["pubkeyABC".into(), "10.0.0.0/8".into(), "1.2.3.4:51820".into()],
        );
        let bytes = encode_request(&request).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "cmd:=HELLO\nsubcmd:=ADD_WIREGUARD_PEER\nfield_count:=3\n\
             key1:=pubkeyABC\nkey2:=10.0.0.0/8\nkey3:=1.2.3.4:51820\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let requests = [
            Request::hello("REBOOT_SYSTEM", vec![]),
            Request::hello("SET_HOST_NAME", vec!["edge-01".into()]),
            Request::hello("X", (0..16).map(|i| format!("v{}", i)).collect()),
            Request::bye(),
        ];
        for request in requests {
            let bytes = encode_request(&request).unwrap();
            assert_eq!(decode_request(&bytes).unwrap(), request);
        }
    }

    #[test]
    fn test_decode_bare_bye() {
        assert_eq!(decode_request(b"cmd:=BYE\n").unwrap(), Request::bye());
    }

    #[test]
    fn test_decode_without_final_terminator() {
        let request =
            decode_request(b"cmd:=HELLO\nsubcmd:=SET_HOST_NAME\nfield_count:=1\nkey1:=gw").unwrap();
        assert_eq!(request.fields, vec!["gw".to_string()]);
    }

    #[test]
    fn test_decode_truncated() {
        let err = decode_request(
            b"cmd:=HELLO\nsubcmd:=ADD_WIREGUARD_PEER\nfield_count:=3\nkey1:=abc\n",
        )
        .unwrap_err();
        assert_eq!(err, DecodeError::Truncated { expected: 3, found: 1 });
    }

    #[test]
    fn test_decode_rejects_extra_fields() {
        let err = decode_request(b"cmd:=HELLO\nsubcmd:=REBOOT_SYSTEM\nfield_count:=0\nkey1:=x\n")
            .unwrap_err();
        assert!(matches!(err, DecodeError::TrailingData(_)));
    }

    #[test]
    fn test_decode_rejects_seventeen_fields() {
        let mut text = String::from("cmd:=HELLO\nsubcmd:=X\nfield_count:=17\n");
        for i in 1..=17 {
            text.push_str(&format!("key{}:=v\n", i));
        }
        assert_eq!(decode_request(text.as_bytes()), Err(DecodeError::TooManyFields(17)));
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode_request(b""), Err(DecodeError::Empty));
        assert_eq!(decode_request(b"\n\n"), Err(DecodeError::Empty));
    }

    #[test]
    fn test_frame_waits_for_terminated_tokens() {
        let full: &[u8] = b"cmd:=HELLO\nsubcmd:=SET_HOST_NAME\nfield_count:=1\nkey1:=edge-01\n";

        for cut in [0, 5, 11, 30, full.len() - 4, full.len() - 1] {
            assert_eq!(frame_request(&full[..cut], false), Ok(None), "cut at {}", cut);
        }

        let request = frame_request(full, false).unwrap().unwrap();
        assert_eq!(request.fields, vec!["edge-01".to_string()]);
    }

    #[test]
    fn test_frame_accepts_unterminated_token_at_eof() {
        let partial = b"cmd:=HELLO\nsubcmd:=SET_HOST_NAME\nfield_count:=1\nkey1:=edge";
        assert_eq!(frame_request(partial, false), Ok(None));

        let request = frame_request(partial, true).unwrap().unwrap();
        assert_eq!(request.fields, vec!["edge".to_string()]);
    }

    #[test]
    fn test_frame_rejects_malformed_prefix_early() {
        assert!(matches!(
            frame_request(b"hello there\n", false),
            Err(DecodeError::MissingSeparator(_))
        ));
        assert_eq!(
            frame_request(b"cmd:=HELLO\nsubcmd:=X\nfield_count:=17\n", false),
            Err(DecodeError::TooManyFields(17))
        );
    }

    #[test]
    fn test_frame_bye() {
        assert_eq!(frame_request(b"cmd:=BYE\n", false), Ok(Some(Request::bye())));

        let bytes = encode_request(&Request::bye()).unwrap();
        assert_eq!(frame_request(&bytes, false), Ok(Some(Request::bye())));
    }

    #[test]
    fn test_frame_trailing_data() {
        let bytes = b"cmd:=HELLO\nsubcmd:=REBOOT_SYSTEM\nfield_count:=0\nkey1:=x";
        assert!(matches!(frame_request(bytes, false), Err(DecodeError::TrailingData(_))));
    }

    #[test]
    fn test_reply() {
        assert_eq!(encode_reply(Reply::Ok), b"cmd:=OK\n".to_vec());
        assert_eq!(encode_reply(Reply::Nok), b"cmd:=NOK\n".to_vec());
        assert_eq!(decode_reply(b"cmd:=NOK\n").unwrap(), Reply::Nok);
        assert!(matches!(decode_reply(b"OK\n"), Err(DecodeError::MissingSeparator(_))));
    }
}
