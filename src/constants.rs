// Runtime defaults, overridable through the environment (or a .env file).

use std::env;

lazy_static::lazy_static! {
    pub static ref DEFAULT_PORT: u16 = env::var("TEACHBOT_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000);
    pub static ref KNOWLEDGE_BASE_PATH: String = env::var("TEACHBOT_KB_PATH").unwrap_or_else(|_| "knowledge_base.json".to_string());
    pub static ref STATIC_DIR: String = env::var("TEACHBOT_STATIC_DIR").unwrap_or_else(|_| "static".to_string());
    pub static ref SERVER_URL: String = env::var("TEACHBOT_URL").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());
    pub static ref PAGE_TITLE: String = env::var("TEACHBOT_TITLE").unwrap_or_else(|_| "Teachbot".to_string());
}

/// Marker the clients look for in a bot reply to offer teaching.
pub const TEACH_MARKER: &str = "Can you teach me?";
pub const TEACH_PROMPT: &str = "I don't know the answer to that. Can you teach me? 🧐";
pub const ANSWER_PROMPT: &str = "Type an answer or \"skip\" to skip:";
pub const SKIP_WORD: &str = "skip";
pub const LEARNED_RESPONSE: &str = "Thank you! I learned new responses! 🙌";
pub const ANSWER_SUFFIX: &str = " 😊";

/// Minimum similarity for a stored question to count as a candidate.
pub const MATCH_CUTOFF: f64 = 0.6;
/// Number of candidates kept before re-ranking.
pub const MATCH_CANDIDATES: usize = 3;

pub const GREETING_WORDS: &[&str] = &["hi", "hello", "hey"];
pub const FAREWELL_WORDS: &[&str] = &["bye", "goodbye", "see you"];

pub const GREETINGS: &[&str] = &[
    "Hello! How can I assist you today? 😊",
    "Hi there! What can I do for you? 👋",
    "Hey! Need any help? 🤗",
];

pub const FAREWELLS: &[&str] = &[
    "Goodbye! Have a great day! 👋",
    "See you soon! Take care! 😊",
    "Bye! Don't hesitate to come back if you need anything else! 🙌",
];

pub const FUN_FACTS: &[&str] = &[
    "Did you know? Honey never spoils. Archaeologists have found pots of honey in ancient Egyptian tombs that are over 3000 years old and still perfectly edible. 🍯",
    "Fun fact: A day on Venus is longer than a year on Venus! 🌌",
    "Did you know? Octopuses have three hearts. 🐙",
];

pub const JOKES: &[&str] = &[
    "Why don't scientists trust atoms? Because they make up everything! 😂",
    "I'm reading a book on anti-gravity. It's impossible to put down! 📚",
];

pub const QUOTES: &[&str] = &[
    "Believe you can and you're halfway there. -Theodore Roosevelt 💪",
    "Success is not final, failure is not fatal: It is the courage to continue that counts. -Winston Churchill 🌟",
];
