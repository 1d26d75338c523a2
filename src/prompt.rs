//! Prompt compilation
//!
//! The hosted model is a plain text-completion endpoint, so the whole
//! conversation is flattened into a single string: the fixed transliteration
//! instruction, every transcript turn tagged `User:` or `Assistant:`, then the
//! new utterance and an open `Assistant:` cue for the model to complete.

use crate::transcript::{Role, Transcript};

/// Fixed instruction that turns the model into a transliterator
pub const SYSTEM_INSTRUCTION: &str = "You are a transliterator, expertly converting text from Romanized format (using English alphabets) to Nepali script (Devanagari). You should focus strictly on transliteration without engaging in conversations. Your transliteration skills apply to any text written in English alphabets, regardless of the underlying language. Special attention is given to correctly interpreting and transliterating common modifiers and context-sensitive words. Rules: 1) Always transliterate text directly, without requiring explicit commands. 2) Use a dataset of Romanized and pure Nepali words to enhance transliteration accuracy. 3) For words like 'vala' which can be interpreted as 'भाला' or 'वाला' and phrases such as 'tara' where context changes the meaning, ensure correct translation: - 'Mero naam tara ho' transliterates to 'मेरो नाम तारा हो' (name/star). 'Malai dudhko tara man pardaina' transliterates to 'मलाइ दुधको तर मन पर्दैन' (but). - 'Mero gharma rato tara chha' transliterates to 'मेरो घरमा रातो तार छ' (wire). 4) Notify the user if input is in any script other than Roman alphabets.";

const USER_TAG: &str = "User: ";
const ASSISTANT_TAG: &str = "Assistant: ";
const TURN_SEPARATOR: &str = "\n\n";
const ASSISTANT_CUE: &str = " Assistant: ";

/// Compiles the prompt for the next model call
///
/// Output is `SYSTEM_INSTRUCTION`, then `"User: "`/`"Assistant: "` + content +
/// `"\n\n"` for each turn in order, then `utterance` followed by
/// `" Assistant: "`. Nothing is escaped or truncated; a long transcript gives
/// a long prompt.
///
/// # Examples
///
/// ```
/// use lipi::prompt::{compile_prompt, SYSTEM_INSTRUCTION};
/// use lipi::transcript::Transcript;
///
/// let transcript = Transcript::new();
/// let prompt = compile_prompt(&transcript, "k cha");
/// assert!(prompt.starts_with(SYSTEM_INSTRUCTION));
/// assert!(prompt.ends_with("k cha Assistant: "));
/// ```
pub fn compile_prompt(transcript: &Transcript, utterance: &str) -> String {
    let dialogue_len: usize = transcript
        .iter()
        .map(|turn| ASSISTANT_TAG.len() + turn.content().len() + TURN_SEPARATOR.len())
        .sum();
    let mut prompt = String::with_capacity(
        SYSTEM_INSTRUCTION.len() + dialogue_len + utterance.len() + ASSISTANT_CUE.len(),
    );

    prompt.push_str(SYSTEM_INSTRUCTION);
    for turn in transcript {
        let tag = match turn.role() {
            Role::User => USER_TAG,
            Role::Assistant => ASSISTANT_TAG,
        };
        prompt.push_str(tag);
        prompt.push_str(turn.content());
        prompt.push_str(TURN_SEPARATOR);
    }
    prompt.push_str(utterance);
    prompt.push_str(ASSISTANT_CUE);

    tracing::debug!(
        "Compiled prompt: {} turns, {} bytes",
        transcript.len(),
        prompt.len()
    );
    prompt
}
