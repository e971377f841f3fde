//! Placeholder catalog and parsing of pasted AI output
//!
//! The AI answers the slide-content prompt with lines such as
//! `{{Lesson 1 Title}} What is PICS?`. [`parse_content`] turns that text into
//! placeholder values; [`ParsedContent::approve`] checks every catalog
//! placeholder is present before a deck is built.

use crate::deck::SlideContent;
use crate::error::{DeckError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// One `{{Name}}` field with its character limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placeholder {
    pub name: String,
    pub max_chars: usize,
    pub example: &'static str,
    /// May be left out or empty; the template token is then cleared
    pub optional: bool,
}

impl Placeholder {
    fn new(name: impl Into<String>, max_chars: usize, example: &'static str) -> Self {
        Self {
            name: name.into(),
            max_chars,
            example,
            optional: false,
        }
    }

    fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// `{{Name}}` as it appears in templates and AI output
    pub fn token(&self) -> String {
        format!("{{{{{}}}}}", self.name)
    }
}

/// Placeholders shown together on one slide
#[derive(Debug, Clone, Serialize)]
pub struct SlideTemplate {
    pub label: String,
    /// Field used as the slide title in blank-deck mode
    pub title_field: Option<usize>,
    pub fields: Vec<Placeholder>,
}

/// Placeholder set a template presentation is built around
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    /// Three list points per lesson
    #[default]
    LessonDeck,
    /// Up to five list points per lesson; points 4 and 5 may stay empty
    Infographic,
}

impl CatalogKind {
    pub fn catalog(self) -> TemplateCatalog {
        match self {
            CatalogKind::LessonDeck => TemplateCatalog::lesson_deck(),
            CatalogKind::Infographic => TemplateCatalog::infographic(),
        }
    }
}

/// Ordered slide layouts of a lesson deck
#[derive(Debug, Clone, Serialize)]
pub struct TemplateCatalog {
    kind: CatalogKind,
    slides: Vec<SlideTemplate>,
    lessons: usize,
}

struct LessonExample {
    title: &'static str,
    subtitle: &'static str,
    explainers: [&'static str; 2],
    list_title: &'static str,
    points: [&'static str; 3],
    /// List points 4 and 5 of the infographic layout, often left blank
    extra_points: [&'static str; 2],
    case_title: &'static str,
    case_description: &'static str,
}

const LESSON_EXAMPLES: [LessonExample; 4] = [
    LessonExample {
        title: "What is PICS?",
        subtitle: "PICS is a simple, powerful tool for self-reflection and building self-awareness. It helps you uncover what drives you (Passions), what excites your curiosity (Interests), what you care deeply about (Causes), and what you naturally do well (Strengths).",
        explainers: [
            "Instead of just reacting, you recognize \"I'm thinking this\" or \"I'm feeling that\", and you can see how those inner states influence what you say and do.",
            "Self-awareness is a lifelong journey, and the picture of you in your mind becomes clearer as you collect more experiences.",
        ],
        list_title: "Using PICS",
        points: [
            "Repeat this process at least once every month to track your personal growth.",
            "It's fine if your answers change over time as you continue to learn about yourself.",
            "Be honest with yourself, as genuine self-reflection is the key to progress.",
        ],
        extra_points: ["", ""],
        case_title: "Maria Finds Direction",
        case_description: "Maria felt adrift in her job. Using PICS she journaled to build self-awareness. Passion: she loses track of time when mentoring junior colleagues. Interest: she reads about sustainable farming. Cause: the lack of green spaces in her city frustrates her. Strength: friends ask her to organize trips. The exercise gave her a clearer picture of what drives her.",
    },
    LessonExample {
        title: "Aligning Actions",
        subtitle: "Now that you have your PICS, the next step is to see how your daily life matches up. This lesson is about auditing your time and commitments so you live in alignment with what truly matters to you.",
        explainers: [
            "Think of your values (from PICS) as a destination and your daily actions as the path. If your actions don't point toward your destination, you'll feel lost.",
            "Alignment starts with small shifts: a hobby that matches an Interest, or one hour a week for a Cause you care about.",
        ],
        list_title: "Weekly Alignment Check",
        points: [
            "At the end of the week, review your calendar to see how much time went to your PICS.",
            "Identify one activity that drained you and did not align with your values.",
            "Schedule one activity next week that directly fuels a Passion, Interest, or Cause.",
        ],
        extra_points: [
            "Reflect on previous similar activities to inform your starting points for these activities.",
            "",
        ],
        case_title: "Jamal's Realignment",
        case_description: "Jamal named Creative Writing as a Passion but spent his evenings watching TV he didn't enjoy. Audit: 10+ hours of TV and 0 hours of writing a week. Small shift: he replaced the first 30 minutes of TV with story-writing. Result: a month later he had a new routine, more energy and the first chapter of a story.",
    },
    LessonExample {
        title: "Limiting Beliefs",
        subtitle: "Sometimes the biggest obstacle to living our PICS is our own mindset. Limiting beliefs are the stories we tell ourselves about why we can't do something. This lesson helps you identify these barriers and reframe them.",
        explainers: [
            "A limiting belief often sounds like a fact, such as \"I'm just not good with numbers.\" Recognizing it as a belief you can question is the first step to dismantling it.",
            "The goal isn't to never have negative thoughts. It's to build a stronger inner voice that can challenge them.",
        ],
        list_title: "The 3 R's of Reframing",
        points: [
            "Recognize and write down a limiting thought that holds you back.",
            "Re-examine the thought by questioning if it is 100% true and finding counter-evidence.",
            "Reframe the statement into an empowering one that focuses on your strengths.",
        ],
        extra_points: ["", ""],
        case_title: "Priya's Breakthrough",
        case_description: "Priya cared about the environment but believed \"I'm just one person, I can't make a difference.\" She recognized the thought kept her from volunteering, researched local activists and reframed it: \"My actions can inspire others.\" She joined a community garden project and found her contributions valued.",
    },
    LessonExample {
        title: "Growth Through Feedback",
        subtitle: "Self-awareness isn't built in a vacuum. To understand our Strengths and blind spots we must be open to how others see us. This lesson is about seeking and using constructive feedback to accelerate your growth.",
        explainers: [
            "Think of feedback not as criticism but as data. It helps you adjust your course and grow. The key is to separate the feedback from your sense of self-worth.",
            "A growth mindset means believing your abilities can be developed through dedication and practice.",
        ],
        list_title: "Seeking Great Feedback",
        points: [
            "Be specific with your questions when asking for feedback to get actionable advice.",
            "Choose your sources carefully, asking people you trust with a relevant perspective.",
            "Listen to understand, not to defend, and thank the person for their input.",
        ],
        extra_points: [
            "Pay attention to what they're saying and make them feel comfortable.",
            "Don't interrupt as they speak.",
        ],
        case_title: "David's Development",
        case_description: "David saw leadership as a Strength but felt stuck. He asked a colleague what he could start or stop doing to make check-ins more productive. The answer: he jumps in with solutions before others speak. In the next meeting he listened first, and the team called it their most collaborative session yet.",
    },
];

impl TemplateCatalog {
    /// Title slide, four lessons of four slides each, and an activity slide
    pub fn lesson_deck() -> Self {
        Self::build(CatalogKind::LessonDeck)
    }

    /// Same layout as [`lesson_deck`](Self::lesson_deck) with two more
    /// optional list points per lesson
    pub fn infographic() -> Self {
        Self::build(CatalogKind::Infographic)
    }

    fn build(kind: CatalogKind) -> Self {
        let mut slides = vec![SlideTemplate {
            label: "Title Slide".to_string(),
            title_field: Some(0),
            fields: vec![
                Placeholder::new("Title", 30, "Knowing Yourself"),
                Placeholder::new(
                    "Subtitle",
                    75,
                    "Why is self awareness important and how to do it?",
                ),
            ],
        }];

        for (i, ex) in LESSON_EXAMPLES.iter().enumerate() {
            let n = i + 1;
            let lesson = format!("Lesson {n}");
            slides.push(SlideTemplate {
                label: format!("{lesson}: Segment Slide"),
                title_field: Some(0),
                fields: vec![
                    Placeholder::new(format!("{lesson} Title"), 30, ex.title),
                    Placeholder::new(format!("{lesson} Subtitle"), 450, ex.subtitle),
                ],
            });
            slides.push(SlideTemplate {
                label: format!("{lesson}: Explanation Slide"),
                title_field: None,
                fields: vec![
                    Placeholder::new(format!("{lesson} Explainer 1"), 240, ex.explainers[0]),
                    Placeholder::new(format!("{lesson} Explainer 2"), 180, ex.explainers[1]),
                ],
            });

            let mut list = vec![Placeholder::new(format!("{lesson} List Title"), 30, ex.list_title)];
            for (p, point) in ex.points.iter().enumerate() {
                list.push(Placeholder::new(
                    format!("{lesson} List Point {}", p + 1),
                    150,
                    point,
                ));
            }
            if kind == CatalogKind::Infographic {
                for (p, point) in ex.extra_points.iter().enumerate() {
                    list.push(
                        Placeholder::new(
                            format!("{lesson} List Point {}", ex.points.len() + p + 1),
                            150,
                            point,
                        )
                        .optional(),
                    );
                }
            }
            slides.push(SlideTemplate {
                label: format!("{lesson}: List Slide"),
                title_field: Some(0),
                fields: list,
            });

            slides.push(SlideTemplate {
                label: format!("{lesson}: Case Slide"),
                title_field: Some(0),
                fields: vec![
                    Placeholder::new(format!("{lesson} Case Title"), 30, ex.case_title),
                    Placeholder::new(
                        format!("{lesson} Case Description"),
                        640,
                        ex.case_description,
                    ),
                ],
            });
        }

        slides.push(SlideTemplate {
            label: "Activity Slide".to_string(),
            title_field: Some(0),
            fields: vec![
                Placeholder::new("Activity Title", 30, "Your Challenge"),
                Placeholder::new(
                    "Activity Instructions",
                    640,
                    "In the chat, share one thing you're passionate about, one thing that piques your interest, one cause you're willing to act on, and one strength you're proud of. Look at what others share to get inspired!",
                ),
            ],
        });

        Self {
            kind,
            slides,
            lessons: LESSON_EXAMPLES.len(),
        }
    }

    pub fn kind(&self) -> CatalogKind {
        self.kind
    }

    pub fn slides(&self) -> &[SlideTemplate] {
        &self.slides
    }

    pub fn lesson_count(&self) -> usize {
        self.lessons
    }

    /// Every placeholder in slide order
    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.slides.iter().flat_map(|s| s.fields.iter())
    }

    pub fn find(&self, name: &str) -> Option<&Placeholder> {
        self.placeholders().find(|p| p.name == name)
    }
}

fn placeholder_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // One or more braces around the name, value on the rest of the line
        Regex::new(r"^(\{+[^}]+\}+)\s*(.*)$").expect("valid placeholder regex")
    })
}

/// `{{ Name }}`, `{Name}` or `{{{Name}}}` -> `Name`
fn normalize_name(raw: &str) -> String {
    raw.trim_start_matches('{')
        .trim_end_matches('}')
        .trim()
        .to_string()
}

/// A field whose value exceeds its limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimitWarning {
    pub token: String,
    pub length: usize,
    pub max_chars: usize,
}

/// Placeholder values extracted from pasted text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedContent {
    values: HashMap<String, String>,
}

/// Parse AI output against `catalog`.
///
/// Unknown placeholder names are ignored. A placeholder with nothing after it
/// takes the next non-empty line, unless that line is itself a placeholder.
/// The last occurrence of a name wins.
pub fn parse_content(text: &str, catalog: &TemplateCatalog) -> ParsedContent {
    let re = placeholder_line();
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut values = HashMap::new();

    for (idx, line) in lines.iter().enumerate() {
        let Some(caps) = re.captures(line) else {
            continue;
        };
        let name = normalize_name(&caps[1]);
        if catalog.find(&name).is_none() {
            tracing::debug!("Ignoring unknown placeholder {:?}", name);
            continue;
        }

        let mut value = caps[2].trim().to_string();
        if value.is_empty() {
            value = lines[idx + 1..]
                .iter()
                .find(|l| !l.is_empty())
                .filter(|l| !re.is_match(l))
                .map(|l| l.to_string())
                .unwrap_or_default();
        }

        values.insert(name, value);
    }

    ParsedContent { values }
}

impl ParsedContent {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.values().filter(|v| !v.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Required catalog placeholders without a value, as `{{Name}}` tokens in
    /// catalog order
    pub fn missing(&self, catalog: &TemplateCatalog) -> Vec<String> {
        catalog
            .placeholders()
            .filter(|p| !p.optional && self.get(&p.name).is_none())
            .map(Placeholder::token)
            .collect()
    }

    /// Fields longer than their limit, in catalog order
    pub fn over_limit(&self, catalog: &TemplateCatalog) -> Vec<LimitWarning> {
        catalog
            .placeholders()
            .filter_map(|p| {
                let length = self.get(&p.name)?.chars().count();
                (length > p.max_chars).then(|| LimitWarning {
                    token: p.token(),
                    length,
                    max_chars: p.max_chars,
                })
            })
            .collect()
    }

    /// Accept the content once every catalog placeholder has a value
    pub fn approve(self, catalog: &TemplateCatalog) -> Result<ApprovedContent> {
        let missing = self.missing(catalog);
        if !missing.is_empty() {
            return Err(DeckError::invalid_input(format!(
                "the following placeholders were not found in your text: {}",
                missing.join(", ")
            )));
        }

        for warning in self.over_limit(catalog) {
            tracing::warn!(
                "{} is {} characters (limit {})",
                warning.token,
                warning.length,
                warning.max_chars
            );
        }

        Ok(ApprovedContent {
            values: self.values,
        })
    }
}

/// Complete content, ready to become a deck
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedContent {
    values: HashMap<String, String>,
}

impl ApprovedContent {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Value of the deck's `{{Title}}` field
    pub fn title(&self) -> Option<&str> {
        self.get("Title").map(str::trim).filter(|t| !t.is_empty())
    }

    /// `({{Name}}, value)` pairs for template text replacement, in catalog
    /// order. Optional fields without a value replace their token with "".
    pub fn replacements(&self, catalog: &TemplateCatalog) -> Vec<(String, String)> {
        catalog
            .placeholders()
            .filter_map(|p| match self.get(&p.name) {
                Some(v) => Some((p.token(), v.to_string())),
                None if p.optional => Some((p.token(), String::new())),
                None => None,
            })
            .collect()
    }

    /// One slide per catalog slide, for decks built without a template
    pub fn to_slides(&self, catalog: &TemplateCatalog) -> Vec<SlideContent> {
        catalog
            .slides()
            .iter()
            .map(|slide| {
                let title = slide
                    .title_field
                    .and_then(|i| slide.fields.get(i))
                    .and_then(|p| self.get(&p.name))
                    .unwrap_or(&slide.label)
                    .to_string();

                let body = slide
                    .fields
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| Some(*i) != slide.title_field)
                    .filter_map(|(_, p)| self.get(&p.name))
                    .collect::<Vec<_>>()
                    .join("\n");

                SlideContent { title, body }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Complete AI answer with one line per catalog placeholder
    fn full_answer(catalog: &TemplateCatalog) -> String {
        catalog
            .placeholders()
            .map(|p| format!("{} {}", p.token(), p.example))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_catalog_shape() {
        let catalog = TemplateCatalog::lesson_deck();
        assert_eq!(catalog.placeholders().count(), 44);
        assert_eq!(catalog.slides().len(), 1 + 4 * 4 + 1);
        assert_eq!(catalog.find("Lesson 3 List Point 2").unwrap().max_chars, 150);
        assert_eq!(catalog.find("Activity Instructions").unwrap().max_chars, 640);
        assert_eq!(catalog.find("Title").unwrap().token(), "{{Title}}");
    }

    #[test]
    fn test_examples_fit_their_limits() {
        let catalog = TemplateCatalog::lesson_deck();
        for p in catalog.placeholders() {
            assert!(
                p.example.chars().count() <= p.max_chars,
                "{} example exceeds {}",
                p.token(),
                p.max_chars
            );
        }
    }

    #[test]
    fn test_parse_inline_values_and_normalization() {
        let catalog = TemplateCatalog::lesson_deck();
        let parsed = parse_content(
            "{{Title}} Knowing Yourself\n  {{ Subtitle }}   Why it matters\n{Lesson 1 Title} What is PICS?\n{{Unknown}} ignored",
            &catalog,
        );
        assert_eq!(parsed.get("Title"), Some("Knowing Yourself"));
        assert_eq!(parsed.get("Subtitle"), Some("Why it matters"));
        assert_eq!(parsed.get("Lesson 1 Title"), Some("What is PICS?"));
        assert_eq!(parsed.get("Unknown"), None);
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn test_value_on_next_line() {
        let catalog = TemplateCatalog::lesson_deck();
        let parsed = parse_content("{{Title}}\n\n   Knowing Yourself\n{{Subtitle}}\n{{Activity Title}} Go", &catalog);
        assert_eq!(parsed.get("Title"), Some("Knowing Yourself"));
        // The next line is another placeholder, so Subtitle has no value
        assert_eq!(parsed.get("Subtitle"), None);
        assert_eq!(parsed.get("Activity Title"), Some("Go"));
    }

    #[test]
    fn test_last_occurrence_wins() {
        let catalog = TemplateCatalog::lesson_deck();
        let parsed = parse_content("{{Title}} First\n{{Title}} Second", &catalog);
        assert_eq!(parsed.get("Title"), Some("Second"));
    }

    #[test]
    fn test_missing_in_catalog_order_and_approve() {
        let catalog = TemplateCatalog::lesson_deck();
        let parsed = parse_content("{{Subtitle}} s", &catalog);
        let missing = parsed.missing(&catalog);
        assert_eq!(missing.len(), 43);
        assert_eq!(missing[0], "{{Title}}");
        assert_eq!(missing[1], "{{Lesson 1 Title}}");

        match parsed.approve(&catalog) {
            Err(DeckError::InvalidInput { message }) => {
                assert!(message.contains("{{Title}}, {{Lesson 1 Title}}"))
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_over_limit_is_reported() {
        let catalog = TemplateCatalog::lesson_deck();
        let long = "x".repeat(31);
        let parsed = parse_content(&format!("{{{{Title}}}} {long}\n{{{{Subtitle}}}} ok"), &catalog);
        let warnings = parsed.over_limit(&catalog);
        assert_eq!(
            warnings,
            vec![LimitWarning {
                token: "{{Title}}".to_string(),
                length: 31,
                max_chars: 30
            }]
        );
    }

    #[test]
    fn test_approved_content_to_slides() {
        let catalog = TemplateCatalog::lesson_deck();
        let approved = parse_content(&full_answer(&catalog), &catalog)
            .approve(&catalog)
            .unwrap();

        assert_eq!(approved.title(), Some("Knowing Yourself"));
        assert_eq!(approved.replacements(&catalog).len(), 44);
        assert_eq!(approved.replacements(&catalog)[0].0, "{{Title}}");

        let slides = approved.to_slides(&catalog);
        assert_eq!(slides.len(), 18);
        assert_eq!(slides[0].title, "Knowing Yourself");
        assert_eq!(slides[0].body, "Why is self awareness important and how to do it?");
        // Explanation slides have no title field and use the layout label
        assert_eq!(slides[2].title, "Lesson 1: Explanation Slide");
        assert_eq!(slides[3].title, "Using PICS");
        assert_eq!(slides[3].body.lines().count(), 3);
        assert_eq!(slides[17].title, "Your Challenge");
    }

    #[test]
    fn test_infographic_catalog_shape() {
        let catalog = TemplateCatalog::infographic();
        assert_eq!(catalog.kind(), CatalogKind::Infographic);
        assert_eq!(catalog.slides().len(), 18);
        assert_eq!(catalog.placeholders().count(), 52);
        assert!(catalog.find("Lesson 4 List Point 5").unwrap().optional);
        assert!(!catalog.find("Lesson 4 List Point 3").unwrap().optional);
        assert!(TemplateCatalog::lesson_deck().find("Lesson 1 List Point 4").is_none());
    }

    #[test]
    fn test_optional_points_may_be_blank() {
        let catalog = TemplateCatalog::infographic();
        let answer = full_answer(&catalog);
        assert!(answer.contains("{{Lesson 1 List Point 4}} \n{{Lesson 1 List Point 5}} \n"));

        let parsed = parse_content(&answer, &catalog);
        assert!(parsed.missing(&catalog).is_empty());
        assert_eq!(parsed.get("Lesson 1 List Point 4"), None);

        // The same text is incomplete for a catalog without those fields
        let lesson_deck = TemplateCatalog::lesson_deck();
        let trimmed = answer.replace("{{Lesson 2 List Point 3}}", "{{Lesson 2 List Point 9}}");
        assert_eq!(
            parse_content(&trimmed, &lesson_deck).missing(&lesson_deck),
            vec!["{{Lesson 2 List Point 3}}".to_string()]
        );
    }

    #[test]
    fn test_infographic_to_slides_and_replacements() {
        let catalog = TemplateCatalog::infographic();
        let approved = parse_content(&full_answer(&catalog), &catalog)
            .approve(&catalog)
            .unwrap();

        let slides = approved.to_slides(&catalog);
        assert_eq!(slides.len(), 18);
        // Lesson 1 list: three points, blank 4 and 5 dropped
        assert_eq!(slides[3].title, "Using PICS");
        assert_eq!(slides[3].body.lines().count(), 3);
        // Lesson 2 list: fourth point filled in
        assert_eq!(slides[7].title, "Weekly Alignment Check");
        assert_eq!(slides[7].body.lines().count(), 4);
        assert!(slides[7].body.ends_with("starting points for these activities."));
        // Lesson 4 list: all five points
        assert_eq!(slides[15].body.lines().count(), 5);
        assert_eq!(slides[15].body.lines().last(), Some("Don't interrupt as they speak."));

        let replacements = approved.replacements(&catalog);
        assert_eq!(replacements.len(), 52);
        assert!(replacements.contains(&("{{Lesson 1 List Point 5}}".to_string(), String::new())));
    }

    #[test]
    fn test_catalog_kind_selects_catalog() {
        assert_eq!(CatalogKind::default(), CatalogKind::LessonDeck);
        assert_eq!(CatalogKind::LessonDeck.catalog().placeholders().count(), 44);
        assert_eq!(CatalogKind::Infographic.catalog().placeholders().count(), 52);
    }
}
