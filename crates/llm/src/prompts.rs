//! Prompt templates for transcript summarization

/// Shared guidance prepended to every summarization prompt
pub const BASE_PROMPT: &str = r#"You summarize meeting and video transcripts.

Guidelines:
- Stay factual. Do not speculate or add opinions.
- Keep names, numbers, dates and other specifics exactly as spoken.
- Follow the order in which things were said.
- Write in clear, plain prose; use bullet points only for lists."#;

/// Separator placed between chunk summaries before reduction
pub const SUMMARY_SEPARATOR: &str = "\n\n";

/// Prompt for summarizing one transcript segment
///
/// `chunk_index` is 0-based; the prompt states the 1-based position so the
/// model can judge how much of the whole it is looking at.
pub fn chunk_prompt(chunk_text: &str, chunk_index: usize, total_chunks: usize) -> String {
    format!(
        "{}\n\nThis is segment {} of {} from a longer transcript. \
         Write a focused summary of this segment only, capturing its main topics and key points.\n\n\
         Transcript segment:\n---\n{}\n---\n\nSegment summary:",
        BASE_PROMPT,
        chunk_index + 1,
        total_chunks,
        chunk_text
    )
}

/// Prompt for the reduce phase (combining segment summaries)
pub fn reduction_prompt(joined_summaries: &str) -> String {
    format!(
        "{}\n\nBelow are summaries of consecutive parts of one transcript, in order. \
         Merge them into a single cohesive summary: remove repetition, reconcile overlaps \
         between neighbouring parts, and keep a logical, chronological structure. \
         Close with the main conclusions or decisions, if any.\n\n\
         Segment summaries:\n---\n{}\n---\n\nFinal summary:",
        BASE_PROMPT, joined_summaries
    )
}
