use serde::{Deserialize, Serialize};

use crate::domain::SearchResult;

/// Text pattern with `{context}`, `{history}` and `{question}` slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptTemplate(String);

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fills the slots in one pass over the template; braces inside the
    /// substituted values are never read as slots.
    pub fn render(&self, context: &str, history: &str, question: &str) -> String {
        let slots = [
            ("{context}", context),
            ("{history}", history),
            ("{question}", question),
        ];
        let mut out = String::with_capacity(self.0.len() + context.len() + history.len());
        let mut rest = self.0.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            rest = &rest[open..];
            match slots.iter().find(|(slot, _)| rest.starts_with(slot)) {
                Some((slot, value)) => {
                    out.push_str(value);
                    rest = &rest[slot.len()..];
                }
                None => {
                    out.push('{');
                    rest = &rest[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

pub const DEFAULT_TEMPLATE: &str = "Vous êtes un chatbot bien informé qui répond en français. \
Vous devez donner des réponses concises et directement liées à la question posée. Limitez \
votre réponse à quelques phrases seulement mais bien detaillé. Si les informations ne sont \
pas disponibles, indiquez poliment que vous ne pouvez pas répondre.

Contexte: {context}
Historique: {history}

Utilisateur: {question}
Chatbot (en français):";

/// One fully rendered prompt plus the chunks that fed it.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub question: String,
    pub retrieved: Vec<SearchResult>,
    pub history: String,
    pub prompt: String,
}

impl PromptContext {
    pub fn build(
        template: &PromptTemplate,
        retrieved: Vec<SearchResult>,
        history: String,
        question: &str,
    ) -> Self {
        let mut ctx = Self {
            question: question.to_string(),
            retrieved,
            history,
            prompt: String::new(),
        };
        ctx.prompt = template.render(&ctx.context_text(), &ctx.history, question);
        ctx
    }

    pub fn context_text(&self) -> String {
        self.retrieved
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
