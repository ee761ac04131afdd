//! Prompt templates for every model call the agent makes.

/// Prompt that turns a task into a single web search query.
pub fn search_query_prompt(task: &str, dependent_outputs: &str) -> String {
    let reference = if dependent_outputs.trim().is_empty() {
        String::new()
    } else {
        format!(
            "Use the dependent task output below as reference to help craft the correct search query for the provided task above. Dependent task output: {}. ",
            dependent_outputs
        )
    };
    format!(
        "You are an AI assistant tasked with generating a web search query based on the following task: {}. \
If the task looks like a search query, return the identical search query as your response. {}\
Return only the search query.\nSearch Query:",
        task, reference
    )
}

/// Prompt that extracts objective-relevant notes from one chunk of page text.
///
/// `notes` carries what earlier chunks of the same page produced; the model
/// answers with the updated notes.
pub fn extraction_prompt(objective: &str, task: &str, chunk: &str, notes: &str) -> String {
    format!(
        "Objective: {objective}\nCurrent Task: {task}\n\
Analyze the following text and extract information relevant to the objective and current task, and only information relevant to the objective and current task. \
If there is no relevant information do not say that there is no relevant information related to our objective.\n\
### Then, update or start our notes provided here (keep blank if currently blank): {notes}.\n\
### Text to analyze: {chunk}.\n\
### Updated Notes:"
    )
}

/// Prompt that rewrites the collected notes as one report in `language`.
pub fn analyst_prompt(results: &str, language: &str) -> String {
    format!(
        "You are an expert analyst. Rewrite the following information as one report without removing any facts.\n\
###\n{}\n###\n\
The report must be answered in {}.",
        results,
        language_name(language)
    )
}

/// Prompt for the plain text completion skill.
pub fn text_completion_prompt(objective: &str, task: &str, dependent_outputs: &str) -> String {
    format!(
        "Complete your assigned task based on the objective and only based on information provided in the dependent task output, if provided.\n###\n\
Your objective: {objective}.\n###\n\
Your task: {task}\n###\n\
Dependent tasks output: {dependent_outputs}\n###\n\
Your task: {task}\n###\n\
RESPONSE:"
    )
}

/// English name for a language tag; unknown tags are returned unchanged.
///
/// Region subtags are ignored (`pt-BR` is Portuguese).
pub fn language_name(tag: &str) -> &str {
    let primary = tag
        .split(['-', '_'])
        .next()
        .unwrap_or(tag)
        .to_ascii_lowercase();
    match primary.as_str() {
        "en" => "English",
        "ja" => "Japanese",
        "zh" => "Chinese",
        "ko" => "Korean",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "nl" => "Dutch",
        "pl" => "Polish",
        "tr" => "Turkish",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "id" => "Indonesian",
        "vi" => "Vietnamese",
        "th" => "Thai",
        "uk" => "Ukrainian",
        "sv" => "Swedish",
        "hu" => "Hungarian",
        _ => tag,
    }
}
