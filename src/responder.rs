use rand::seq::SliceRandom;
use rand::Rng;

use crate::constants::{
    ANSWER_SUFFIX, FAREWELLS, FAREWELL_WORDS, FUN_FACTS, GREETINGS, GREETING_WORDS, JOKES,
    QUOTES, TEACH_PROMPT,
};
use crate::knowledge_base::{normalize, KnowledgeBase};

/// The canned reply tables reachable by a fixed phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunKind {
    Fact,
    Joke,
    Quote,
}

impl FunKind {
    fn from_phrase(phrase: &str) -> Option<Self> {
        match phrase {
            "fun fact" => Some(FunKind::Fact),
            "tell me a joke" => Some(FunKind::Joke),
            "inspire me" => Some(FunKind::Quote),
            _ => None,
        }
    }

    fn table(self) -> &'static [&'static str] {
        match self {
            FunKind::Fact => FUN_FACTS,
            FunKind::Joke => JOKES,
            FunKind::Quote => QUOTES,
        }
    }
}

fn pick<R: Rng + ?Sized>(table: &[&str], rng: &mut R) -> String {
    table.choose(rng).copied().unwrap_or_default().to_string()
}

/// Produces the bot's reply for one user message.
pub fn respond<R: Rng + ?Sized>(input: &str, kb: &KnowledgeBase, rng: &mut R) -> String {
    let input = normalize(input);

    if GREETING_WORDS.contains(&input.as_str()) {
        return pick(GREETINGS, rng);
    }
    if FAREWELL_WORDS.contains(&input.as_str()) {
        return pick(FAREWELLS, rng);
    }
    if let Some(kind) = FunKind::from_phrase(&input) {
        return pick(kind.table(), rng);
    }

    kb.find_best_match(&input)
        .and_then(|question| kb.answer_for(question, rng))
        .map(|answer| format!("{}{}", answer, ANSWER_SUFFIX))
        .unwrap_or_else(|| TEACH_PROMPT.to_string())
}

/// True when a bot reply is asking the user to teach it.
pub fn is_teach_request(response: &str) -> bool {
    response.contains(crate::constants::TEACH_MARKER)
}
