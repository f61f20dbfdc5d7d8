use std::time::Duration;

/// Delay between two reveal steps.
pub const REVEAL_INTERVAL: Duration = Duration::from_millis(5);

/// Progressive reveal of a reply, one character per step. A `<...>` run is
/// emitted in a single step so a partial tag is never shown.
///
/// Yields each successive prefix of the text; the last item is the full
/// text.
pub struct Reveal<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Reveal<'a> {
    pub fn new(text: &'a str) -> Self {
        Reveal { text, pos: 0 }
    }

    /// Byte offset where the next step ends.
    fn next_boundary(&self) -> Option<usize> {
        let rest = &self.text[self.pos..];
        let mut chars = rest.char_indices();
        let (_, first) = chars.next()?;
        if first == '<' {
            if let Some(close) = rest.find('>') {
                return Some(self.pos + close + 1);
            }
        }
        Some(self.pos + first.len_utf8())
    }
}

impl<'a> Iterator for Reveal<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let end = self.next_boundary()?;
        self.pos = end;
        Some(&self.text[..end])
    }
}

/// Pieces to append at each step; concatenated they give back the text.
pub fn steps(text: &str) -> impl Iterator<Item = &str> {
    let mut prev = 0;
    Reveal::new(text).map(move |prefix| {
        let piece = &prefix[prev..];
        prev = prefix.len();
        piece
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_grow_by_one_char() {
        let frames: Vec<&str> = Reveal::new("abc").collect();
        assert_eq!(frames, vec!["a", "ab", "abc"]);
    }

    #[test]
    fn tags_appear_whole() {
        let text = "Voir <a href=\"x\">ici</a>.";
        let frames: Vec<&str> = Reveal::new(text).collect();
        assert!(frames.contains(&"Voir <a href=\"x\">"));
        for f in &frames {
            assert_eq!(f.matches('<').count(), f.matches('>').count(), "{}", f);
        }
        assert_eq!(frames.last(), Some(&text));
    }

    #[test]
    fn multibyte_and_unclosed_bracket() {
        let frames: Vec<&str> = Reveal::new("é<").collect();
        assert_eq!(frames, vec!["é", "é<"]);
    }

    #[test]
    fn empty_text_has_no_frames() {
        assert_eq!(Reveal::new("").count(), 0);
    }

    #[test]
    fn steps_concatenate_to_text() {
        let text = "a <b>gras</b>";
        assert_eq!(steps(text).collect::<String>(), text);
    }
}
