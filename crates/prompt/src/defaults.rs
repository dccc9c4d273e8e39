//! Built-in prompt definitions.
//!
//! Every prompt the retrieval and citation stages send is defined here and
//! can be replaced by a YAML file of the same id (see [`crate::loader`]).

use crate::types::PromptDefinition;

/// Identifiers of the built-in prompts.
pub mod ids {
    pub const REWRITE_PAGES: &str = "rewrite.lecture_pages";
    pub const REWRITE_TRANSCRIPTIONS: &str = "rewrite.transcriptions";
    pub const HYPOTHETICAL_PAGES: &str = "hypothetical.lecture_pages";
    pub const HYPOTHETICAL_TRANSCRIPTIONS: &str = "hypothetical.transcriptions";

    pub const REWRITE_PAGES_EXERCISE: &str = "rewrite.lecture_pages.exercise";
    pub const REWRITE_TRANSCRIPTIONS_EXERCISE: &str = "rewrite.transcriptions.exercise";
    pub const HYPOTHETICAL_PAGES_EXERCISE: &str = "hypothetical.lecture_pages.exercise";
    pub const HYPOTHETICAL_TRANSCRIPTIONS_EXERCISE: &str = "hypothetical.transcriptions.exercise";

    pub const CITATION_KEYWORDS: &str = "citation.keywords";
}

const SYSTEM_PREAMBLE: &str = "You support a tutoring assistant for the course \"{{course_name}}\". \
The course is taught in {{course_language}}; always write in {{course_language}}.";

const HISTORY_BLOCK: &str = "{{#if chat_history}}Recent conversation:\n{{chat_history}}\n\n{{/if}}";

const EXERCISE_BLOCK: &str = "The student is working on the exercise \"{{exercise_title}}\".\n\
Problem statement:\n{{problem_statement}}\n\n";

fn def(id: &str, title: &str, system: String, template: String, temperature: f32) -> PromptDefinition {
    PromptDefinition {
        id: id.to_string(),
        title: title.to_string(),
        api_version: "1.0".to_string(),
        system: Some(system),
        template,
        temperature: Some(temperature),
    }
}

fn rewrite_task(target: &str) -> String {
    format!(
        "Rewrite the student's latest question into a standalone search query that \
         finds matching {target}. Resolve pronouns and references using the \
         conversation, keep technical terms, drop greetings and filler. Answer with \
         the query only, without quotes or explanation."
    )
}

fn hypothetical_task(target: &str) -> String {
    format!(
        "Write a short passage, at most five sentences, that reads like {target} \
         answering the student's latest question. It is only used to search for \
         similar content, so prefer precise terminology over hedging. Answer with the \
         passage only."
    )
}

fn user_template(with_exercise: bool) -> String {
    let exercise = if with_exercise { EXERCISE_BLOCK } else { "" };
    format!("{exercise}{HISTORY_BLOCK}Student question:\n{{{{query}}}}")
}

/// All built-in prompt definitions.
pub fn builtin_prompts() -> Vec<PromptDefinition> {
    let pages = "slides of a university lecture";
    let transcriptions = "the spoken transcript of a lecture recording";

    let mut prompts = Vec::new();
    for (with_exercise, suffix) in [(false, ""), (true, " (exercise)")] {
        let pick = |plain: &'static str, exercise: &'static str| {
            if with_exercise {
                exercise
            } else {
                plain
            }
        };

        prompts.push(def(
            pick(ids::REWRITE_PAGES, ids::REWRITE_PAGES_EXERCISE),
            &format!("Slide query rewrite{}", suffix),
            format!("{}\n\n{}", SYSTEM_PREAMBLE, rewrite_task(pages)),
            user_template(with_exercise),
            0.2,
        ));
        prompts.push(def(
            pick(ids::REWRITE_TRANSCRIPTIONS, ids::REWRITE_TRANSCRIPTIONS_EXERCISE),
            &format!("Transcription query rewrite{}", suffix),
            format!("{}\n\n{}", SYSTEM_PREAMBLE, rewrite_task(transcriptions)),
            user_template(with_exercise),
            0.2,
        ));
        prompts.push(def(
            pick(ids::HYPOTHETICAL_PAGES, ids::HYPOTHETICAL_PAGES_EXERCISE),
            &format!("Hypothetical slide content{}", suffix),
            format!("{}\n\n{}", SYSTEM_PREAMBLE, hypothetical_task("lecture slide text")),
            user_template(with_exercise),
            0.7,
        ));
        prompts.push(def(
            pick(ids::HYPOTHETICAL_TRANSCRIPTIONS, ids::HYPOTHETICAL_TRANSCRIPTIONS_EXERCISE),
            &format!("Hypothetical transcript{}", suffix),
            format!("{}\n\n{}", SYSTEM_PREAMBLE, hypothetical_task("a lecturer speaking")),
            user_template(with_exercise),
            0.7,
        ));
    }

    prompts.push(def(
        ids::CITATION_KEYWORDS,
        "Citation keywords and summaries",
        "You label citations in a tutor's answer. For every numbered source listed, \
         give a keyword of at most three words naming what the source contributes to \
         the answer, and a one-sentence summary of that contribution.\n\n\
         Reply with exactly one line per source and nothing else, in this format:\n\
         [n] Keyword: <keyword>; Summary: <summary>"
            .to_string(),
        "Student question:\n{{query}}\n\nAnswer:\n{{answer}}\n\nSources:\n{{citations}}"
            .to_string(),
        0.2,
    ));

    prompts
}
