use std::io::{BufRead, Write};
use std::time::Duration;

use super::backend::ChatBackend;
use super::reveal;
use super::{ChatWidget, ERROR_BUBBLE, GREETING, PRESET_PHRASES};

/// Interactive session over any line reader. Numbers pick a preset phrase,
/// `quit` or `exit` (or end of input) stops.
pub fn run_session<B, R, W>(
    widget: &mut ChatWidget<B>,
    input: R,
    out: &mut W,
    delay: Duration,
) -> std::io::Result<()>
where
    B: ChatBackend,
    R: BufRead,
    W: Write,
{
    writeln!(out, "{}", GREETING)?;
    for (i, phrase) in PRESET_PHRASES.iter().enumerate() {
        writeln!(out, "  [{}] {}", i + 1, phrase)?;
    }

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let text = line
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| PRESET_PHRASES.get(i).copied())
            .unwrap_or(line);

        match widget.send(text) {
            Ok(reply) => {
                let shown = widget.reply_plain(&reply);
                write!(out, "> ")?;
                for step in reveal::steps(&shown) {
                    write!(out, "{}", step)?;
                    out.flush()?;
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
                writeln!(out)?;
            }
            Err(_) => writeln!(out, "> {}", ERROR_BUBBLE)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatError, ChatMessage};
    use serde_json::{json, Value};

    struct Canned;

    impl ChatBackend for Canned {
        fn complete(&self, messages: &[ChatMessage]) -> Result<Value, ChatError> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            if last == "boom" {
                return Err(ChatError::Network("down".into()));
            }
            Ok(json!({ "choices": [{ "message": { "content": format!("re: {}", last) } }] }))
        }
    }

    #[test]
    fn presets_replies_and_errors() {
        let mut widget = ChatWidget::new(Canned, "prompt");
        let input = "1\n\nboom\nhello\nquit\nignored\n".as_bytes();
        let mut out = Vec::new();
        run_session(&mut widget, input, &mut out, Duration::ZERO).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.starts_with(GREETING));
        assert!(out.contains(&format!("> re: {}", PRESET_PHRASES[0])));
        assert!(out.contains(&format!("> {}", ERROR_BUBBLE)));
        assert!(out.contains("> re: hello"));
        assert!(!out.contains("ignored"));
    }
}
