//! Decoding of Ollama's newline-delimited JSON generation stream.

use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::fmt::Display;
use std::pin::Pin;

use crate::domain::DomainError;

#[derive(Debug, Deserialize)]
struct GenerateLine {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

struct Decoder<S> {
    inner: Pin<Box<S>>,
    buf: Vec<u8>,
    finished: bool,
}

/// Turns raw body chunks into text fragments.
///
/// Lines may be split across chunks or several may share one chunk. Empty
/// fragments are dropped. The stream ends after the line flagged `done`; an
/// `error` line or an unparseable line ends it with an error.
pub fn decode_fragments<S, B, E>(
    inner: S,
) -> impl Stream<Item = Result<String, DomainError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    let decoder = Decoder {
        inner: Box::pin(inner),
        buf: Vec::new(),
        finished: false,
    };

    stream::unfold(decoder, |mut st| async move {
        loop {
            if st.finished {
                return None;
            }

            if let Some(pos) = st.buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = st.buf.drain(..=pos).collect();
                match parse_line(&line) {
                    Ok(None) => continue,
                    Ok(Some((text, done))) => {
                        st.finished = done;
                        if text.is_empty() {
                            continue;
                        }
                        return Some((Ok(text), st));
                    }
                    Err(e) => {
                        st.finished = true;
                        return Some((Err(e), st));
                    }
                }
            }

            match st.inner.next().await {
                Some(Ok(bytes)) => st.buf.extend_from_slice(bytes.as_ref()),
                Some(Err(e)) => {
                    st.finished = true;
                    let err = DomainError::external(format!("Ollama stream interrupted: {e}"));
                    return Some((Err(err), st));
                }
                None => {
                    if st.buf.iter().all(u8::is_ascii_whitespace) {
                        return None;
                    }
                    // Last line had no trailing newline.
                    st.buf.push(b'\n');
                }
            }
        }
    })
}

fn parse_line(line: &[u8]) -> Result<Option<(String, bool)>, DomainError> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let parsed: GenerateLine = serde_json::from_slice(line)
        .map_err(|e| DomainError::external(format!("Malformed Ollama stream line: {e}")))?;

    if let Some(error) = parsed.error {
        return Err(DomainError::external(format!("Ollama error: {error}")));
    }

    Ok(Some((parsed.response, parsed.done)))
}
