//! # Description Rendering
//!
//! The renderer collaborator: `enrich(text) -> markup`.
//!
//! Catalog descriptions are HTML fragments that may embed content links of
//! the form `@UUID[<uuid>]{<label>}`. `MarkupRenderer` rewrites every link
//! into an anchor; a link it cannot parse fails the render.

use async_trait::async_trait;
use class_pages_core::ClassPagesError;
use regex::Regex;

/// Turns raw description text into presentation markup.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn enrich(&self, text: &str) -> Result<String, ClassPagesError>;
}

/// Content-link renderer.
#[derive(Debug, Clone)]
pub struct MarkupRenderer {
    link: Regex,
}

impl MarkupRenderer {
    pub fn new() -> Result<Self, ClassPagesError> {
        let link = Regex::new(r"@UUID\[([^\]\s]+)\](?:\{([^}]*)\})?")
            .map_err(|e| ClassPagesError::RenderError(e.to_string()))?;
        Ok(Self { link })
    }

    /// Synchronous form of [`Renderer::enrich`].
    pub fn render(&self, text: &str) -> Result<String, ClassPagesError> {
        let rendered = self.link.replace_all(text, |caps: &regex::Captures<'_>| {
            let uuid = &caps[1];
            let label = caps
                .get(2)
                .map(|m| m.as_str())
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| uuid.rsplit('.').next().unwrap_or(uuid));
            format!(
                r#"<a class="content-link" data-uuid="{}">{}</a>"#,
                escape(uuid),
                escape(label)
            )
        });

        if let Some(position) = rendered.find("@UUID[") {
            return Err(ClassPagesError::RenderError(format!(
                "malformed content link at byte {}",
                position
            )));
        }
        Ok(rendered.into_owned())
    }
}

#[async_trait]
impl Renderer for MarkupRenderer {
    async fn enrich(&self, text: &str) -> Result<String, ClassPagesError> {
        self.render(text)
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
