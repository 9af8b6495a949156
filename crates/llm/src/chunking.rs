use recap_common::{RecapError, Result};

/// Sentence terminators; the full-width forms end a sentence even without
/// trailing whitespace
const TERMINATORS: [char; 6] = ['.', '!', '?', '。', '！', '？'];
const WIDE_TERMINATORS: [char; 3] = ['。', '！', '？'];

/// Closing marks absorbed into the sentence they end
const CLOSERS: [char; 8] = ['"', '\'', ')', ']', '”', '’', '」', '』'];

/// Text chunk
///
/// Offsets are byte positions in the original text. `content` is exactly
/// `text[start_offset..end_offset]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk text
    pub content: String,

    /// 0-based position in the chunk sequence
    pub index: usize,

    /// Start index in original text
    pub start_offset: usize,

    /// End index in original text
    pub end_offset: usize,
}

impl Chunk {
    /// Size of the chunk in the chunker's unit (words)
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Sentence {
    start: usize,
    end: usize,
    words: usize,
}

impl Sentence {
    fn new(text: &str, start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            words: text[start..end].split_whitespace().count(),
        }
    }
}

/// Split text into overlapping chunks of at most `max_size` words
///
/// Sentences are packed greedily. Each chunk after the first starts with the
/// last `overlap` words of its predecessor, reduced when the carried words and
/// the next sentence would not fit together. A sentence longer than
/// `max_size` becomes a chunk of its own and is never cut.
///
/// Whitespace-only input yields no chunks.
pub fn chunk_text(text: &str, max_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    if max_size == 0 {
        return Err(RecapError::config("Chunk size must be greater than 0"));
    }
    if overlap >= max_size {
        return Err(RecapError::config(format!(
            "Chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, max_size
        )));
    }

    let sentences = split_sentences(text);
    let mut chunks = Vec::new();

    let Some(first) = sentences.first() else {
        return Ok(chunks);
    };

    let mut start = first.start;
    let mut end = first.end;
    let mut words = first.words;

    for sentence in &sentences[1..] {
        if words + sentence.words <= max_size {
            end = sentence.end;
            words += sentence.words;
            continue;
        }

        chunks.push(make_chunk(text, chunks.len(), start, end));

        let budget = overlap.min(max_size.saturating_sub(sentence.words));
        let starts = word_starts(text, start, end);
        let carried = budget.min(starts.len());

        start = if carried > 0 {
            starts[starts.len() - carried]
        } else {
            sentence.start
        };
        end = sentence.end;
        words = carried + sentence.words;
    }

    chunks.push(make_chunk(text, chunks.len(), start, end));

    Ok(chunks)
}

fn make_chunk(text: &str, index: usize, start: usize, end: usize) -> Chunk {
    Chunk {
        content: text[start..end].to_string(),
        index,
        start_offset: start,
        end_offset: end,
    }
}

/// Segment text into sentence spans
///
/// A sentence ends at a terminator run followed by whitespace or end of
/// text, after a full-width terminator, or at a line break. Spans exclude
/// surrounding whitespace.
fn split_sentences(text: &str) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    let mut start: Option<usize> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if start.is_none() && c.is_whitespace() {
            continue;
        }
        let s = *start.get_or_insert(i);

        let end = if c == '\n' {
            Some(s + text[s..i].trim_end().len())
        } else if TERMINATORS.contains(&c) {
            let mut end = i + c.len_utf8();
            let mut wide = WIDE_TERMINATORS.contains(&c);

            while let Some(&(j, next)) = chars.peek() {
                if !TERMINATORS.contains(&next) && !CLOSERS.contains(&next) {
                    break;
                }
                wide |= WIDE_TERMINATORS.contains(&next);
                end = j + next.len_utf8();
                chars.next();
            }

            match chars.peek() {
                None => Some(end),
                Some(&(_, next)) if wide || next.is_whitespace() => Some(end),
                _ => None,
            }
        } else {
            None
        };

        if let Some(end) = end {
            sentences.push(Sentence::new(text, s, end));
            start = None;
        }
    }

    if let Some(s) = start {
        sentences.push(Sentence::new(text, s, text.trim_end().len()));
    }

    sentences
}

/// Byte offsets of every word start within `text[start..end]`
fn word_starts(text: &str, start: usize, end: usize) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut in_word = false;

    for (i, c) in text[start..end].char_indices() {
        if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            starts.push(start + i);
            in_word = true;
        }
    }

    starts
}
