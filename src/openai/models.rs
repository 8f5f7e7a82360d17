//! The fixed catalog of models offered in the selection menu.

pub const DEFAULT_MODEL: &str = "deepseek-r1";

/// Menu entries in display order. The menu number is the index + 1.
pub const MODELS: [(&str, &str); 10] = [
    ("DeepSeek", "deepseek-r1"),
    ("GPT-5-Nano", "gpt-5-nano"),
    ("GPT-5-Mini", "gpt-5-mini"),
    ("GPT-4.1-Nano", "gpt-4.1-nano"),
    ("Qwen3-Coder", "qwen3-coder-30b-a3b-instruct"),
    ("Gemini-2.5", "gemini-2.5-flash-lite"),
    ("Qwen-3-30b", "qwen3-30b-a3b"),
    ("Qwen-3-235b", "qwen3-235b-a22b-2507"),
    ("Grok-4", "grok-4-fast"),
    ("Grok-Code", "grok-code-fast-1"),
];

/// Parses a menu choice, returning `None` unless it is an integer in
/// `1..=10`.
pub fn parse_choice(input: &str) -> Option<usize> {
    input
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=MODELS.len()).contains(n))
}

pub fn model_for_choice(choice: usize) -> &'static str {
    choice
        .checked_sub(1)
        .and_then(|i| MODELS.get(i))
        .map(|(_, id)| *id)
        .unwrap_or(DEFAULT_MODEL)
}

/// Resolves free-form menu input to a model id. Anything that isn't a
/// valid choice falls back to the default model.
pub fn resolve_model(input: &str) -> &'static str {
    parse_choice(input)
        .map(model_for_choice)
        .unwrap_or(DEFAULT_MODEL)
}

pub fn menu_lines() -> Vec<String> {
    MODELS
        .iter()
        .enumerate()
        .map(|(i, (label, _))| format!("{}. {}", i + 1, label))
        .collect()
}
