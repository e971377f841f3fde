//! Server-rendered HTML pages

use crate::sessions::{Flash, FlashKind};
use lessondeck_core::auth::AuthMode;
use lessondeck_core::{FlowState, NamedTemplate, Session};
use std::fmt::Write;

const STYLE: &str = r#"
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: system-ui, -apple-system, sans-serif;
            background: #f5f5f5;
            color: #1a1a1a;
            line-height: 1.6;
        }
        main {
            max-width: 860px;
            margin: 2rem auto;
            background: white;
            padding: 2rem;
            border-radius: 8px;
            box-shadow: 0 2px 8px rgba(0,0,0,0.1);
        }
        h1 { font-size: 2rem; margin-bottom: 0.5rem; }
        h2 { font-size: 1.25rem; margin: 1.5rem 0 0.75rem; }
        p { margin-bottom: 1rem; color: #333; }
        .step {
            margin: 1.5rem 0;
            padding: 1rem;
            background: #f8f8f8;
            border-left: 3px solid #333;
        }
        .flash { padding: 0.75rem 1rem; border-radius: 4px; margin: 1rem 0; }
        .flash.info { background: #e7f3ff; }
        .flash.warning { background: #fff6dd; }
        .flash.error { background: #ffe7e7; }
        .flash small { display: block; color: #555; }
        input[type=text], textarea { width: 100%; padding: 0.5rem; font: inherit; margin-bottom: 0.5rem; }
        textarea { font-family: monospace; font-size: 0.85rem; }
        button, .button {
            display: inline-block;
            padding: 0.5rem 1rem;
            border: 1px solid #333;
            border-radius: 4px;
            background: #333;
            color: white;
            text-decoration: none;
            cursor: pointer;
            font: inherit;
        }
        .secondary { background: white; color: #333; }
        .actions { display: flex; gap: 0.5rem; flex-wrap: wrap; margin: 1rem 0; }
        details { margin: 0.5rem 0; }
        summary { cursor: pointer; font-weight: 600; }
        iframe { width: 100%; height: 480px; border: 0; margin-top: 1rem; }
        footer { margin-top: 2rem; padding-top: 1rem; border-top: 1px solid #ddd; }
        a { color: #0066cc; }
"#;

/// Escape text for HTML element content and attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{STYLE}</style>
</head>
<body>
<main>
{body}
<footer>
    <a href="/">Lesson deck</a> &middot; <a href="/export">Export any deck</a>
</footer>
</main>
</body>
</html>"#,
        title = escape_html(title),
    )
}

fn flash_html(flash: Option<&Flash>) -> String {
    let Some(flash) = flash else {
        return String::new();
    };
    let class = match flash.kind {
        FlashKind::Info => "info",
        FlashKind::Warning => "warning",
        FlashKind::Error => "error",
    };
    let suggestion = flash
        .suggestion
        .as_deref()
        .map(|s| format!("<small>{}</small>", escape_html(s)))
        .unwrap_or_default();
    format!(
        r#"<div class="flash {class}">{}{suggestion}</div>"#,
        escape_html(&flash.message)
    )
}

/// What the main page needs to render
pub struct IndexView<'a> {
    pub session: &'a Session,
    pub flash: Option<&'a Flash>,
    pub mode: AuthMode,
    pub folder_url: Option<&'a str>,
    /// Templates offered with the topic
    pub templates: &'a [NamedTemplate],
    /// Template preselected in the picker
    pub selected_template: Option<&'a str>,
}

/// `<select>` over the configured templates; nothing when there is no choice
fn template_picker(templates: &[NamedTemplate], selected: Option<&str>) -> String {
    if templates.len() < 2 {
        return String::new();
    }
    let mut html = String::from(
        r#"<label for="template">Slide template</label>
    <select id="template" name="template">"#,
    );
    for template in templates {
        let name = escape_html(&template.name);
        let chosen = if Some(template.name.as_str()) == selected {
            " selected"
        } else {
            ""
        };
        let _ = write!(html, r#"<option value="{name}"{chosen}>{name}</option>"#);
    }
    html.push_str("</select>\n");
    html
}

pub fn index_page(view: &IndexView<'_>) -> String {
    let session = view.session;
    let state = session.state();
    let mut body = String::new();

    body.push_str("<h1>Lesson Deck Generator</h1>\n");
    body.push_str(
        "<p>Turn AI-generated lesson content into a Google Slides deck: enter a topic, \
         run the prompts in your AI assistant, paste the answer, and get a shareable deck.</p>\n",
    );
    body.push_str(&flash_html(view.flash));

    if let FlowState::Failed(reason) = state {
        let _ = write!(
            body,
            r#"<div class="step"><h2>Something went wrong</h2><p>{}</p>"#,
            escape_html(reason)
        );
        if let Some(deck) = &session.deck {
            let _ = write!(
                body,
                r#"<p>The partially built deck is still available: <a href="{url}" target="_blank">{url}</a></p>"#,
                url = escape_html(&deck.edit_url())
            );
        }
        body.push_str(
            r#"<form method="post" action="/reset"><button>Start over</button></form></div>"#,
        );
        return layout("Lesson Deck Generator", &body);
    }

    if *state == FlowState::Idle && view.mode == AuthMode::OAuthUser {
        body.push_str(
            r#"<p><a class="button secondary" href="/auth/start">Connect Google account</a></p>"#,
        );
    }

    let topic = session.topic.as_deref().unwrap_or_default();
    if matches!(
        state,
        FlowState::Idle | FlowState::Authenticated | FlowState::PromptsGenerated
    ) {
        let _ = write!(
            body,
            r#"<div class="step"><h2>1. Topic</h2>
<form method="post" action="/topic">
    <input type="text" name="topic" placeholder="e.g. Knowing Yourself" value="{}" required>
    {}<button>Generate prompts</button>
</form></div>"#,
            escape_html(topic),
            template_picker(view.templates, view.selected_template)
        );
    } else if !topic.is_empty() {
        let _ = write!(body, "<p><strong>Topic:</strong> {}</p>", escape_html(topic));
        if let (Some(template), true) = (&session.template, view.templates.len() > 1) {
            let _ = write!(
                body,
                "<p><strong>Template:</strong> {}</p>",
                escape_html(&template.name)
            );
        }
    }

    if let Some(prompts) = &session.prompts {
        body.push_str(r#"<div class="step"><h2>2. Run these prompts in order</h2>"#);
        for (i, prompt) in prompts.iter().enumerate() {
            let _ = write!(
                body,
                r#"<details><summary>Prompt {n}: {heading}</summary><textarea rows="8" readonly>{text}</textarea></details>"#,
                n = i + 1,
                heading = escape_html(prompt.stage.heading()),
                text = escape_html(&prompt.text)
            );
        }
        if let Some(slide_prompt) = &session.slide_prompt {
            let _ = write!(
                body,
                r#"<details><summary>Prompt 4: Generating Slide Content</summary><textarea rows="16" readonly>{}</textarea></details>"#,
                escape_html(slide_prompt)
            );
        }
        body.push_str("</div>");
    }

    if matches!(state, FlowState::PromptsGenerated | FlowState::ContentApproved) {
        body.push_str(
            r#"<div class="step"><h2>3. Paste the filled-in content</h2>
<form method="post" action="/content">
    <textarea name="content" rows="14" placeholder="{{Title}} Knowing Yourself&#10;{{Subtitle}} Why is self awareness important and how to do it?&#10;..." required></textarea>
    <button>Check content</button>
</form></div>"#,
        );
    }

    if *state == FlowState::ContentApproved {
        if !session.warnings.is_empty() {
            body.push_str(r#"<div class="flash warning">Over the character limit:<ul>"#);
            for w in &session.warnings {
                let _ = write!(
                    body,
                    "<li>{}: {} of {} characters</li>",
                    escape_html(&w.token),
                    w.length,
                    w.max_chars
                );
            }
            body.push_str("</ul></div>");
        }
        body.push_str(
            r#"<div class="step"><h2>4. Build the deck</h2>
<form method="post" action="/deck"><button>Generate slide deck</button></form></div>"#,
        );
    }

    if let Some(deck) = &session.deck {
        let link = session
            .share_link
            .as_ref()
            .map(|l| l.url.clone())
            .unwrap_or_else(|| deck.edit_url());
        let _ = write!(
            body,
            r#"<div class="step"><h2>Your slide deck</h2><p>{title}</p>
<iframe src="{link}" allowfullscreen></iframe>
<div class="actions"><a class="button" href="{link}" target="_blank">Open Slides</a>"#,
            title = escape_html(&deck.title),
            link = escape_html(&link)
        );
        if let Some(folder) = view.folder_url {
            let _ = write!(
                body,
                r#"<a class="button secondary" href="{}" target="_blank">Open Folder</a>"#,
                escape_html(folder)
            );
        }
        match state {
            FlowState::DeckCreated => body.push_str(
                r#"<form method="post" action="/publish"><button class="secondary">Share with link</button></form>"#,
            ),
            FlowState::Published | FlowState::Exported => body.push_str(
                r#"<a class="button secondary" href="/deck/images.zip">Download images</a>"#,
            ),
            _ => {}
        }
        body.push_str("</div></div>");
    }

    if *state != FlowState::Idle {
        body.push_str(
            r#"<form method="post" action="/reset"><button class="secondary">Start over</button></form>"#,
        );
    }

    layout("Lesson Deck Generator", &body)
}

/// Standalone page exporting the images of any deck
pub fn export_page(error: Option<&Flash>, value: &str) -> String {
    let body = format!(
        r#"<h1>Export slide images</h1>
<p>Paste a Google Slides link or presentation id to download every slide as a PNG in one ZIP.</p>
{flash}
<div class="step">
<form method="post" action="/export">
    <input type="text" name="link" placeholder="https://docs.google.com/presentation/d/..." value="{value}" required>
    <button>Download images</button>
</form>
</div>"#,
        flash = flash_html(error),
        value = escape_html(value)
    );
    layout("Export slide images", &body)
}

/// Minimal page shown after a completed sign-in in the CLI flow
pub fn signed_in_page() -> String {
    layout(
        "Signed in",
        "<h1>Signed in</h1><p>Google authorization is complete. You can close this tab.</p>",
    )
}
