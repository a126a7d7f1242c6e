//! Server-side views for the hello workload.

use edge_sdk::prelude::*;

pub fn home(props: &Props) -> anyhow::Result<String> {
    let title = props
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("Hello from the edge");
    Ok(format!(
        "<main><h1>{}</h1><p>Rendered on the server, hydrated in the browser.</p></main>",
        escape_html(title)
    ))
}

pub fn greeting(props: &Props) -> anyhow::Result<String> {
    let name = props
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("stranger");
    Ok(format!(
        r#"<p class="greeting">Hello, {}!</p>"#,
        escape_html(name)
    ))
}

pub fn layout(markup: &str, ctx: &TemplateContext<'_>) -> anyhow::Result<Document> {
    let title = ctx
        .props
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("Hello Gateway");

    let mut doc = Document::new(
        HeadContent::new(title)
            .with_charset("utf-8")
            .with_meta("viewport", "width=device-width, initial-scale=1"),
    )
    .with_lang("en")
    .with_mount("app", markup);

    if ctx.meta.get("hydrate").and_then(|v| v.as_bool()) != Some(true) {
        return Ok(doc);
    }
    if let Some(src) = ctx.meta_str("bundlePath") {
        doc = doc.with_script(src);
    }
    let expose = ctx.meta_str("bundleExpose").unwrap_or("app");
    Ok(doc.with_inline_script(format!(
        "var dom = require('runtime-dom');\
         var View = require({});\
         dom.hydrate(View({}), document.getElementById('app'));",
        safe_json(expose),
        safe_json(ctx.props)
    )))
}
