use crate::error::Result;

/// Produces an answer from a question and the ranked passages supporting it.
///
/// Callers never invoke a generator with an empty context list.
pub trait AnswerGenerator: Send + Sync {
    fn generate(&self, question: &str, contexts: &[String]) -> Result<String>;
}

impl<G: AnswerGenerator + ?Sized> AnswerGenerator for Box<G> {
    fn generate(&self, question: &str, contexts: &[String]) -> Result<String> {
        (**self).generate(question, contexts)
    }
}
