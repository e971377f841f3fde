//! Prompt Builder
//!
//! Turns a lesson topic into the instructional-design prompts the user pastes
//! into an external AI assistant. Pure templating, no I/O.

use crate::content::TemplateCatalog;
use crate::error::{DeckError, Result};
use serde::Serialize;
use std::fmt;

const PERSONA: &str = "You're an instructional designer with experience in creating learning content for online courses designed for young adults.";

/// Which step of the design process a prompt drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStage {
    TopicBreakdown,
    LessonPlan,
    LessonContent,
}

impl PromptStage {
    pub const ALL: [PromptStage; 3] = [
        PromptStage::TopicBreakdown,
        PromptStage::LessonPlan,
        PromptStage::LessonContent,
    ];

    pub fn heading(&self) -> &'static str {
        match self {
            PromptStage::TopicBreakdown => "Defining Topics and Subtopics",
            PromptStage::LessonPlan => "Define and Refine the List",
            PromptStage::LessonContent => "Generating Main Content",
        }
    }
}

impl fmt::Display for PromptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.heading())
    }
}

/// One prompt ready to copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub stage: PromptStage,
    pub text: String,
}

fn validated_topic(topic: &str) -> Result<&str> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(DeckError::invalid_input("topic must not be empty"));
    }
    Ok(topic)
}

/// Build the three prompts in fixed order: topic breakdown, lesson plan,
/// lesson content.
pub fn build_prompts(topic: &str) -> Result<[Prompt; 3]> {
    let topic = validated_topic(topic)?;
    tracing::debug!("Building prompts for topic {:?}", topic);

    Ok(PromptStage::ALL.map(|stage| Prompt {
        stage,
        text: render(stage, topic),
    }))
}

fn render(stage: PromptStage, topic: &str) -> String {
    match stage {
        PromptStage::TopicBreakdown => format!(
            "{PERSONA} For the following theme, define the list of topics and subtopics that need to be covered by the learners in order to completely understand and apply the theme. Create this as a list (with sublists if needed).\n\nThe topic is: {topic}\n"
        ),
        PromptStage::LessonPlan => format!(
            "{PERSONA} For the theme {topic}, redefine the topics and subtopics generated in the previous step into 4 lessons. Create 4 lesson outlines in a logical order, limiting each lesson to 3-4 topics or subtopics that are most relevant to the theme.\n"
        ),
        PromptStage::LessonContent => format!(
            "{PERSONA} For the lessons outlined above for {topic}, create a detailed set of content that will help learners fully understand the concepts and be able to apply them. Create this content as a series of lessons set up in a logical sequence. Make use of questions, interesting facts, relevant examples and case studies to keep learners engaged.\n"
        ),
    }
}

const SLIDE_RULES: &str = "\
Start with a \"Title Slide\". This should share the topic and a quick explainer of the idea / framework / tool that will be shared.

Structure the slides in a logical manner.

You MUST strictly follow all character count limits provided in the templates (e.g., Max 240 characters). This is not a suggestion but a mandatory rule for the output. Write very concisely to ensure your responses fit within these limits. Any output that exceeds the specified character count for a field is considered incorrect.

For each lesson, start with a \"Segment Slide\". This should include a question that peaks interest in the topic or poses the topic as a relatable question. This should follow a very brief description to help give context to the question, or create interest in what follows.

For each lesson, create slide content in the \"Explanation Slide\" format. This is where you provide a more detailed explanation of the concept, in 2 paragraphs.

For each lesson, create slide content in the \"List Slide\" format. This can contain further details about the lesson concept, tips, facts, or examples. For this slide, generate between 2 and 5 distinct points, with each point being a complete sentence.

For each lesson, create slide content in the \"Case or Example Slide\" format. This is where you can provide details of an example of case study that further explains the concepts.

At the end of the deck, add a challenge or activity that learners can use to apply, practice or reflect on their learning from the content. This needs to be a set of instructions on how to conduct the activity in the \"Activity Slide\" format.";

/// Fourth prompt: asks the AI to answer with one `{{Placeholder}} value`
/// line per catalog field, under each field's character limit.
pub fn slide_content_prompt(topic: &str, catalog: &TemplateCatalog) -> Result<String> {
    let topic = validated_topic(topic)?;

    let mut templates = String::from("Templates and Examples\n");
    let mut example_output = String::new();
    for slide in catalog.slides() {
        templates.push('\n');
        templates.push_str(&slide.label);
        templates.push('\n');
        for field in &slide.fields {
            templates.push_str(&format!("{} Max {} characters", field.token(), field.max_chars));
            if field.optional {
                templates.push_str(" (optional, leave empty if not needed)");
            }
            if !field.example.is_empty() {
                templates.push_str(" Example: ");
                templates.push_str(field.example);
            }
            templates.push('\n');
            example_output.push_str(&format!("{} {}\n", field.token(), field.example));
        }
    }

    Ok(format!(
        "{PERSONA} The following is course content related to the topic: {topic}, which is divided into {lessons} lessons. \
Use this content to create a set of slide content that will help learners review everything from the content. \
Follow these rules when creating this slide deck content, and format the output in line with the relevant slide type from the Templates and Examples Section:\n\n\
{SLIDE_RULES}\n\n\
{templates}\n\
Before providing the final output, perform a final check to ensure every single field's content is under its specified character limit.\n\n\
Output requirements:\n\
For your output, you will ONLY share each of the required {{{{content}}}} sections followed by the exact content. Use double curly braces for all placeholders, like {{{{Title}}}}:\n\n\
Output Example:\n\n\
{example_output}",
        lessons = catalog.lesson_count(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_prompts_in_order() {
        let prompts = build_prompts("Photosynthesis").unwrap();
        let stages: Vec<_> = prompts.iter().map(|p| p.stage).collect();
        assert_eq!(stages, PromptStage::ALL.to_vec());

        for prompt in &prompts {
            assert!(!prompt.text.trim().is_empty());
            assert!(prompt.text.contains("Photosynthesis"));
        }
        assert!(prompts[0].text.contains("The topic is: Photosynthesis"));
        assert!(prompts[1].text.contains("into 4 lessons"));
    }

    #[test]
    fn test_topic_is_trimmed() {
        let prompts = build_prompts("  Knowing Yourself \n").unwrap();
        assert!(prompts[1].text.contains("For the theme Knowing Yourself, redefine"));
    }

    #[test]
    fn test_empty_topic_rejected() {
        assert!(matches!(build_prompts(""), Err(DeckError::InvalidInput { .. })));
        assert!(matches!(build_prompts(" \t\n"), Err(DeckError::InvalidInput { .. })));
    }

    #[test]
    fn test_slide_content_prompt_lists_every_placeholder() {
        let catalog = TemplateCatalog::lesson_deck();
        let prompt = slide_content_prompt("Knowing Yourself", &catalog).unwrap();

        for field in catalog.placeholders() {
            assert!(prompt.contains(&field.token()), "missing {}", field.token());
        }
        assert!(prompt.contains("{{Lesson 1 Explainer 1}} Max 240 characters"));
        assert!(prompt.contains("like {{Title}}:"));
        assert!(prompt.contains("{{content}} sections"));
        assert!(prompt.contains("divided into 4 lessons"));
    }

    #[test]
    fn test_slide_content_prompt_requires_topic() {
        let catalog = TemplateCatalog::lesson_deck();
        assert!(matches!(
            slide_content_prompt("   ", &catalog),
            Err(DeckError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_build_prompts_is_deterministic() {
        let first = build_prompts("Knowing Yourself").unwrap();
        let second = build_prompts("Knowing Yourself").unwrap();
        assert_eq!(first, second);

        let stages: Vec<_> = second.iter().map(|p| p.stage).collect();
        assert_eq!(
            stages,
            vec![
                PromptStage::TopicBreakdown,
                PromptStage::LessonPlan,
                PromptStage::LessonContent
            ]
        );
    }

    #[test]
    fn test_slide_content_prompt_follows_catalog() {
        let infographic = TemplateCatalog::infographic();
        let prompt = slide_content_prompt("Knowing Yourself", &infographic).unwrap();
        assert!(prompt.contains(
            "{{Lesson 1 List Point 4}} Max 150 characters (optional, leave empty if not needed)\n"
        ));
        assert!(prompt.contains("{{Lesson 4 List Point 5}} Don't interrupt as they speak."));

        let lesson_deck = slide_content_prompt("Knowing Yourself", &TemplateCatalog::lesson_deck()).unwrap();
        assert!(!lesson_deck.contains("List Point 4"));
        assert_ne!(prompt, lesson_deck);
    }
}
