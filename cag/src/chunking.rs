//! Split source text into chunks for preloading and indexing

/// Default upper bound on chunk length, in characters
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Paragraph chunks of at most `max_chars` characters
///
/// Paragraphs are separated by blank lines. Consecutive paragraphs are merged
/// while they fit; a paragraph longer than `max_chars` is split on word
/// boundaries (a single word longer than the limit stays whole).
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs(text) {
        if char_len(&paragraph) > max_chars {
            flush(&mut current, &mut chunks);
            split_words(&paragraph, max_chars, &mut chunks);
            continue;
        }

        let joined_len = if current.is_empty() {
            char_len(&paragraph)
        } else {
            char_len(&current) + 2 + char_len(&paragraph)
        };
        if joined_len > max_chars {
            flush(&mut current, &mut chunks);
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&paragraph);
    }
    flush(&mut current, &mut chunks);

    chunks
}

fn paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !lines.is_empty() {
                paragraphs.push(lines.join("\n"));
                lines.clear();
            }
        } else {
            lines.push(line.trim_end());
        }
    }
    if !lines.is_empty() {
        paragraphs.push(lines.join("\n"));
    }
    paragraphs
}

fn split_words(paragraph: &str, max_chars: usize, chunks: &mut Vec<String>) {
    let mut current = String::new();
    for word in paragraph.split_whitespace() {
        if !current.is_empty() && char_len(&current) + 1 + char_len(word) > max_chars {
            flush(&mut current, chunks);
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    flush(&mut current, chunks);
}

fn flush(current: &mut String, chunks: &mut Vec<String>) {
    if !current.is_empty() {
        chunks.push(std::mem::take(current));
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merges_small_paragraphs() {
        let text = "Paris is the capital of France.\n\nBerlin is the capital of Germany.\n";
        assert_eq!(
            chunk_text(text, 100),
            vec!["Paris is the capital of France.\n\nBerlin is the capital of Germany."]
        );
        assert_eq!(
            chunk_text(text, 40),
            vec!["Paris is the capital of France.", "Berlin is the capital of Germany."]
        );
    }

    #[test]
    fn test_splits_long_paragraph_on_words() {
        let chunks = chunk_text("one two three four five", 9);
        assert_eq!(chunks, vec!["one two", "three", "four five"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 9));
    }

    #[test]
    fn test_blank_input() {
        assert!(chunk_text("", 10).is_empty());
        assert!(chunk_text("\n   \n\t\n", 10).is_empty());
    }

    #[test]
    fn test_oversized_word_kept_whole() {
        assert_eq!(chunk_text("abcdefghij", 3), vec!["abcdefghij"]);
    }
}
