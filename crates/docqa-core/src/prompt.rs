//! Prompt text handed to the answer generator.

/// Returned instead of calling the generator when retrieval finds nothing.
pub const NO_CONTEXT_ANSWER: &str = "I don't know. No relevant context found.";

/// What the model is told to say when the passages do not contain the answer.
pub const NOT_IN_CONTEXT_ANSWER: &str = "The answer is not available in the provided context.";

pub const SYSTEM_INSTRUCTIONS: &str = "You are a helpful AI chatbot assistant.";

pub fn build_prompt(question: &str, contexts: &[String]) -> String {
    format!(
        "{SYSTEM_INSTRUCTIONS}\n\
         Answer the user's question clearly and accurately using ONLY the information provided in the context below.\n\
         If the answer is not present in the context, respond with: \"{NOT_IN_CONTEXT_ANSWER}\"\n\
         \n\
         Context:\n\
         {}\n\
         \n\
         Question:\n\
         {}\n",
        contexts.join("\n"),
        question.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_keeps_context_order() {
        let p = build_prompt(" what? ", &["first".into(), "second".into()]);
        let first = p.find("first").expect("first");
        let second = p.find("second").expect("second");
        assert!(first < second);
        assert!(p.ends_with("Question:\nwhat?\n"));
        assert!(p.contains(NOT_IN_CONTEXT_ANSWER));
    }
}
