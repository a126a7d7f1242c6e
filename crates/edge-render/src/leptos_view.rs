//! Leptos views as gateway components.

use edge_core::Props;
use leptos::prelude::IntoView;
use leptos::reactive::owner::Owner;
use leptos::tachys::view::RenderHtml;

use crate::artifact::Component;

/// A component rendered through Leptos server-side rendering.
///
/// Each render runs under a fresh reactive owner, so no reactive state leaks
/// between requests.
pub struct LeptosComponent<F> {
    view: F,
}

impl<F, V> LeptosComponent<F>
where
    F: Fn(Props) -> V + Send + Sync + 'static,
    V: IntoView + 'static,
{
    /// Wrap a view function taking the request props.
    pub fn new(view: F) -> Self {
        Self { view }
    }
}

impl<F, V> Component for LeptosComponent<F>
where
    F: Fn(Props) -> V + Send + Sync + 'static,
    V: IntoView + 'static,
{
    fn render(&self, props: &Props) -> anyhow::Result<String> {
        let owner = Owner::new();
        let html = owner.with(|| (self.view)(props.clone()).to_html());
        Ok(html)
    }
}
