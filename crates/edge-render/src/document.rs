//! Document structure returned by templates.

use crate::embed::{escape_attr, escape_html};

/// Head content for the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadContent {
    /// Page title.
    pub title: Option<String>,
    /// Character set declared with `<meta charset>`.
    pub charset: Option<String>,
    /// Meta tags.
    pub meta: Vec<(String, String)>,
    /// Link tags (stylesheets, etc.).
    pub links: Vec<String>,
    /// External scripts loaded from the head.
    pub scripts: Vec<String>,
}

impl HeadContent {
    /// Create new head content with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Declare the character set.
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Add a meta tag.
    pub fn with_meta(mut self, name: &str, content: &str) -> Self {
        self.meta.push((name.to_string(), content.to_string()));
        self
    }

    /// Add a stylesheet link.
    pub fn with_stylesheet(mut self, href: &str) -> Self {
        self.links.push(format!(
            r#"<link rel="stylesheet" href="{}"/>"#,
            escape_attr(href)
        ));
        self
    }

    /// Add inline CSS styles.
    pub fn with_style(mut self, css: &str) -> Self {
        self.links.push(format!("<style>{}</style>", css));
        self
    }

    /// Load a script from the head.
    pub fn with_script(mut self, src: &str) -> Self {
        self.scripts.push(src.to_string());
        self
    }

    /// Render head content to markup.
    pub fn render(&self) -> String {
        let mut html = String::new();

        if let Some(charset) = &self.charset {
            html.push_str(&format!(r#"<meta charSet="{}"/>"#, escape_attr(charset)));
        }

        if let Some(title) = &self.title {
            html.push_str(&format!("<title>{}</title>", escape_html(title)));
        }

        for (name, content) in &self.meta {
            html.push_str(&format!(
                r#"<meta name="{}" content="{}"/>"#,
                escape_attr(name),
                escape_attr(content)
            ));
        }

        for link in &self.links {
            html.push_str(link);
        }

        for src in &self.scripts {
            html.push_str(&format!(r#"<script src="{}"></script>"#, escape_attr(src)));
        }

        html
    }
}

/// A piece of the document body.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Trusted markup inserted as is.
    Html(String),
    /// Text, escaped on output.
    Text(String),
    /// An element with an id whose inner markup is inserted as is.
    Mount {
        /// Tag name, e.g. `div`.
        tag: String,
        /// Element id.
        id: String,
        /// Inner markup.
        html: String,
    },
    /// External script.
    Script { src: String },
    /// Inline script body, inserted as is.
    InlineScript(String),
}

impl Block {
    fn render(&self, out: &mut String) {
        match self {
            Self::Html(html) => out.push_str(html),
            Self::Text(text) => out.push_str(&escape_html(text)),
            Self::Mount { tag, id, html } => {
                out.push_str(&format!(r#"<{tag} id="{}">{html}</{tag}>"#, escape_attr(id)));
            }
            Self::Script { src } => {
                out.push_str(&format!(r#"<script src="{}"></script>"#, escape_attr(src)));
            }
            Self::InlineScript(body) => {
                out.push_str("<script>");
                out.push_str(body);
                out.push_str("</script>");
            }
        }
    }
}

/// Full document structure a template produces.
///
/// Serialized to static markup by [`Document::to_markup`]; the doctype is
/// added by the renderer, not here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// `lang` attribute of the root element.
    pub lang: Option<String>,
    /// Head content.
    pub head: HeadContent,
    /// Body blocks in order.
    pub body: Vec<Block>,
}

impl Document {
    /// Create a document with the given head.
    pub fn new(head: HeadContent) -> Self {
        Self {
            lang: None,
            head,
            body: Vec::new(),
        }
    }

    /// Set the document language.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// Append a body block.
    pub fn with_block(mut self, block: Block) -> Self {
        self.body.push(block);
        self
    }

    /// Append trusted markup.
    pub fn with_html(self, html: impl Into<String>) -> Self {
        self.with_block(Block::Html(html.into()))
    }

    /// Append a mount point holding rendered markup.
    pub fn with_mount(self, id: impl Into<String>, html: impl Into<String>) -> Self {
        self.with_block(Block::Mount {
            tag: "div".to_string(),
            id: id.into(),
            html: html.into(),
        })
    }

    /// Append an external script.
    pub fn with_script(self, src: impl Into<String>) -> Self {
        self.with_block(Block::Script { src: src.into() })
    }

    /// Append an inline script.
    pub fn with_inline_script(self, body: impl Into<String>) -> Self {
        self.with_block(Block::InlineScript(body.into()))
    }

    /// Serialize to static markup.
    pub fn to_markup(&self) -> String {
        let mut html = String::new();

        match &self.lang {
            Some(lang) => html.push_str(&format!(r#"<html lang="{}">"#, escape_attr(lang))),
            None => html.push_str("<html>"),
        }

        html.push_str("<head>");
        html.push_str(&self.head.render());
        html.push_str("</head><body>");
        for block in &self.body {
            block.render(&mut html);
        }
        html.push_str("</body></html>");

        html
    }
}
